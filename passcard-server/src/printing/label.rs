//! Label model builder
//!
//! Projects a [`PrintJob`] onto the fields printed on a passcard. Every
//! field is trimmed, composed and cut to its budget. Values stay plain text;
//! the document template escapes them on output.

use chrono::NaiveDateTime;
use serde::Serialize;
use shared::PrintJob;
use shared::models::normalize_day_seq;
use shared::util::truncate_chars;

pub const HEADER_MAX: usize = 32;
pub const PRODUCT_MAX: usize = 24;
pub const NEXT_MAX: usize = 24;
pub const BIG_CODE_MAX: usize = 12;
pub const STYLE_MAX: usize = 36;
pub const PROCESS_MAX: usize = 42;
pub const FOOTER_MAX: usize = 44;
pub const DATETIME_MAX: usize = 19;
pub const SIZE_MAX: usize = 8;
pub const QTY_MAX: usize = 5;
pub const PAYLOAD_MAX: usize = 160;

/// Placeholder for fields without a value
pub const NOT_AVAILABLE: &str = "N/A";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Display projection of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelModel {
    pub header: String,
    pub product: String,
    pub next: String,
    pub big_code: String,
    pub style: String,
    pub process: String,
    pub footer: String,
    pub datetime: String,
    pub size: String,
    pub qty: String,
    /// Data encoded into the barcode matrix
    pub payload: String,
}

impl LabelModel {
    /// Build the model; pure, `printed_at` is supplied by the caller
    pub fn build(job: &PrintJob, printed_at: NaiveDateTime) -> Self {
        let header = [job.plant_cd.trim(), job.work_center.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let footer = format!("SFC {} / SEQ {}", job.sfc_cd.trim(), job.pcard_seq.trim());

        Self {
            header: field(&header, HEADER_MAX),
            product: field(&job.order_number, PRODUCT_MAX),
            next: field(&job.next_order_number, NEXT_MAX),
            big_code: field(&normalize_day_seq(&job.day_seq), BIG_CODE_MAX),
            style: field("", STYLE_MAX),
            process: field("", PROCESS_MAX),
            footer: field(&footer, FOOTER_MAX),
            datetime: field(&printed_at.format(DATETIME_FORMAT).to_string(), DATETIME_MAX),
            size: field(&job.size_cd, SIZE_MAX),
            qty: field(&job.pcard_qty, QTY_MAX),
            payload: truncate_chars(&barcode_payload(job), PAYLOAD_MAX),
        }
    }
}

/// `_`-joined `{barKey, orderNumber, nextOrderNumber, quantity}`, empty parts dropped
pub fn barcode_payload(job: &PrintJob) -> String {
    [
        &job.bar_key,
        &job.order_number,
        &job.next_order_number,
        &job.pcard_qty,
    ]
    .into_iter()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join("_")
}

/// trim, fall back to `N/A`, cut
fn field(raw: &str, max: usize) -> String {
    let trimmed = raw.trim();
    let value = if trimmed.is_empty() {
        NOT_AVAILABLE
    } else {
        trimmed
    };
    truncate_chars(value, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn printed_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap()
    }

    fn job() -> PrintJob {
        PrintJob {
            plant_cd: "1000".into(),
            sfc_cd: "SFC0001".into(),
            order_number: "4711".into(),
            next_order_number: "4712".into(),
            bar_key: "B1".into(),
            pcard_seq: "3".into(),
            day_seq: "12".into(),
            work_center: "WC-A".into(),
            pcard_qty: "25".into(),
            size_cd: "XL".into(),
        }
    }

    #[test]
    fn test_composition() {
        let model = LabelModel::build(&job(), printed_at());
        assert_eq!(model.header, "1000 WC-A");
        assert_eq!(model.product, "4711");
        assert_eq!(model.next, "4712");
        assert_eq!(model.big_code, "12H");
        assert_eq!(model.style, "N/A");
        assert_eq!(model.process, "N/A");
        assert_eq!(model.footer, "SFC SFC0001 / SEQ 3");
        assert_eq!(model.datetime, "2024-03-05 07:08:09");
        assert_eq!(model.size, "XL");
        assert_eq!(model.qty, "25");
        assert_eq!(model.payload, "B1_4711_4712_25");
    }

    #[test]
    fn test_payload_drops_empty_parts() {
        let job = PrintJob {
            bar_key: "B1".into(),
            order_number: "O1".into(),
            next_order_number: "".into(),
            pcard_qty: "5".into(),
            ..Default::default()
        };
        assert_eq!(barcode_payload(&job), "B1_O1_5");
        assert_eq!(LabelModel::build(&job, printed_at()).payload, "B1_O1_5");
    }

    #[test]
    fn test_missing_values_become_na() {
        let model = LabelModel::build(&PrintJob::default(), printed_at());
        assert_eq!(model.next, "N/A");
        assert_eq!(model.size, "N/A");
        assert_eq!(model.qty, "N/A");
        assert_eq!(model.big_code, "N/A");
    }

    #[test]
    fn test_truncate_counts_raw_chars() {
        let job = PrintJob {
            order_number: format!("{}<b>", "A".repeat(22)),
            pcard_qty: "123456789".into(),
            ..Default::default()
        };
        let model = LabelModel::build(&job, printed_at());
        assert_eq!(model.product, format!("{}<b", "A".repeat(22)));
        assert_eq!(model.qty, "12345");
    }

    #[test]
    fn test_payload_budget() {
        let job = PrintJob {
            bar_key: "K".repeat(200),
            ..Default::default()
        };
        let model = LabelModel::build(&job, printed_at());
        assert_eq!(model.payload.chars().count(), PAYLOAD_MAX);
    }

    #[test]
    fn test_build_is_idempotent() {
        let a = LabelModel::build(&job(), printed_at());
        let b = LabelModel::build(&job(), printed_at());
        assert_eq!(a, b);
    }
}
