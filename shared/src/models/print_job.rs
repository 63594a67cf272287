//! Print job model
//!
//! Upstream job records arrive from several integration routes with
//! inconsistent field names and casing. They are normalized exactly once,
//! at deserialization, into the canonical [`PrintJob`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Card sequence used when the upstream record carries none
pub const DEFAULT_PCARD_SEQ: &str = "0";

/// Canonical print job (one passcard)
///
/// All fields are trimmed strings; an absent upstream value is `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PrintJob {
    pub plant_cd: String,
    pub sfc_cd: String,
    pub order_number: String,
    pub next_order_number: String,
    pub bar_key: String,
    pub pcard_seq: String,
    pub day_seq: String,
    pub work_center: String,
    pub pcard_qty: String,
    pub size_cd: String,
}

/// Upstream aliases per canonical field, in priority order
const PLANT_ALIASES: &[&str] = &["PLANT_CD", "plantCd", "plant_cd", "PLANT", "plant", "WERKS"];
const SFC_ALIASES: &[&str] = &["SFC_CD", "sfcCd", "sfc_cd", "SFC", "sfc"];
const ORDER_ALIASES: &[&str] = &[
    "ORDER_NUMBER",
    "orderNumber",
    "order_number",
    "ORDER_NO",
    "orderNo",
    "AUFNR",
];
const NEXT_ORDER_ALIASES: &[&str] = &[
    "NEXT_ORDER_NUMBER",
    "nextOrderNumber",
    "next_order_number",
    "NEXT_ORDER_NO",
    "nextOrderNo",
];
const BAR_KEY_ALIASES: &[&str] = &["BAR_KEY", "barKey", "bar_key", "BARKEY", "barcode"];
const PCARD_SEQ_ALIASES: &[&str] = &[
    "PCARD_SEQ",
    "pcardSeq",
    "pcard_seq",
    "CARD_SEQ",
    "cardSeq",
    "SEQ",
    "seq",
];
const DAY_SEQ_ALIASES: &[&str] = &["DAY_SEQ", "daySeq", "day_seq"];
const WORK_CENTER_ALIASES: &[&str] = &[
    "WORK_CENTER",
    "workCenter",
    "work_center",
    "WORKCENTER",
    "ARBPL",
];
const QTY_ALIASES: &[&str] = &[
    "PCARD_QTY",
    "pcardQty",
    "pcard_qty",
    "QTY",
    "qty",
    "QUANTITY",
    "quantity",
];
const SIZE_ALIASES: &[&str] = &["SIZE_CD", "sizeCd", "size_cd", "SIZE", "size"];

impl PrintJob {
    /// Normalize an arbitrary upstream record
    ///
    /// Non-object values produce a job with only the fallback card sequence.
    pub fn from_value(value: &Value) -> Self {
        match value.as_object() {
            Some(map) => Self::from_map(map),
            None => Self::from_map(&Map::new()),
        }
    }

    /// Normalize an upstream record given as a JSON object
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let pcard_seq = first_non_empty(map, PCARD_SEQ_ALIASES);
        Self {
            plant_cd: first_non_empty(map, PLANT_ALIASES),
            sfc_cd: first_non_empty(map, SFC_ALIASES),
            order_number: first_non_empty(map, ORDER_ALIASES),
            next_order_number: first_non_empty(map, NEXT_ORDER_ALIASES),
            bar_key: first_non_empty(map, BAR_KEY_ALIASES),
            pcard_seq: if pcard_seq.is_empty() {
                DEFAULT_PCARD_SEQ.to_string()
            } else {
                pcard_seq
            },
            day_seq: first_non_empty(map, DAY_SEQ_ALIASES),
            work_center: first_non_empty(map, WORK_CENTER_ALIASES),
            pcard_qty: first_non_empty(map, QTY_ALIASES),
            size_cd: first_non_empty(map, SIZE_ALIASES),
        }
    }
}

impl<'de> Deserialize<'de> for PrintJob {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// First alias whose value renders to a non-empty trimmed string
fn first_non_empty(map: &Map<String, Value>, aliases: &[&str]) -> String {
    aliases
        .iter()
        .filter_map(|alias| map.get(*alias))
        .map(scalar_to_string)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_fields() {
        let job = PrintJob::from_value(&json!({
            "PLANT_CD": "1000",
            "SFC_CD": "SFC-42",
            "ORDER_NUMBER": "4711",
            "NEXT_ORDER_NUMBER": "4712",
            "BAR_KEY": "B1",
            "PCARD_SEQ": "3",
            "DAY_SEQ": "017H",
            "WORK_CENTER": "WC-CUT",
            "PCARD_QTY": 12,
            "SIZE_CD": "XL"
        }));

        assert_eq!(job.plant_cd, "1000");
        assert_eq!(job.sfc_cd, "SFC-42");
        assert_eq!(job.order_number, "4711");
        assert_eq!(job.next_order_number, "4712");
        assert_eq!(job.bar_key, "B1");
        assert_eq!(job.pcard_seq, "3");
        assert_eq!(job.day_seq, "017H");
        assert_eq!(job.work_center, "WC-CUT");
        assert_eq!(job.pcard_qty, "12");
        assert_eq!(job.size_cd, "XL");
    }

    #[test]
    fn test_first_non_empty_alias_wins() {
        let job = PrintJob::from_value(&json!({
            "ORDER_NUMBER": "   ",
            "orderNumber": "",
            "ORDER_NO": " 900 ",
            "AUFNR": "901"
        }));
        assert_eq!(job.order_number, "900");
    }

    #[test]
    fn test_missing_seq_falls_back_to_zero() {
        let job = PrintJob::from_value(&json!({ "ORDER_NUMBER": "1" }));
        assert_eq!(job.pcard_seq, DEFAULT_PCARD_SEQ);

        let job = PrintJob::from_value(&json!("not an object"));
        assert_eq!(job.pcard_seq, "0");
        assert!(job.order_number.is_empty());
    }

    #[test]
    fn test_deserialize_normalizes() {
        let jobs: Vec<PrintJob> =
            serde_json::from_str(r#"[{"plantCd":"P1","qty":5,"workCenter":"W"}]"#).unwrap();
        assert_eq!(jobs[0].plant_cd, "P1");
        assert_eq!(jobs[0].pcard_qty, "5");
        assert_eq!(jobs[0].work_center, "W");
    }

    #[test]
    fn test_serialize_canonical_names() {
        let job = PrintJob {
            order_number: "O1".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(&job).unwrap();
        assert_eq!(v["ORDER_NUMBER"], "O1");
        assert_eq!(v["PCARD_SEQ"], "");
    }
}
