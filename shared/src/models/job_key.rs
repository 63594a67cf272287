//! Job identity tuple
//!
//! The key is the correlation id shared by the UI (job result events) and the
//! backend tracking service (commit calls). It must be a pure function of the
//! job record.

use serde::{Deserialize, Serialize};

use super::print_job::PrintJob;
use crate::util::truncate_chars;

pub const PLANT_CD_MAX: usize = 4;
pub const SFC_CD_MAX: usize = 128;
pub const ORDER_NUMBER_MAX: usize = 10;
pub const BAR_KEY_MAX: usize = 20;
pub const PCARD_SEQ_MAX: usize = 20;
pub const DAY_SEQ_MAX: usize = 6;
pub const WORK_CENTER_MAX: usize = 50;

/// Day sequences always end with this marker
pub const DAY_SEQ_SUFFIX: char = 'H';

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct JobKey {
    pub plant_cd: String,
    pub sfc_cd: String,
    pub order_number: String,
    pub bar_key: String,
    pub pcard_seq: String,
    pub day_seq: String,
    pub work_center: String,
}

impl JobKey {
    /// Derive the identity tuple of a job
    pub fn of(job: &PrintJob) -> Self {
        Self {
            plant_cd: truncate_chars(&job.plant_cd, PLANT_CD_MAX),
            sfc_cd: truncate_chars(&job.sfc_cd, SFC_CD_MAX),
            order_number: truncate_chars(&job.order_number, ORDER_NUMBER_MAX),
            bar_key: truncate_chars(&job.bar_key, BAR_KEY_MAX),
            pcard_seq: truncate_chars(&job.pcard_seq, PCARD_SEQ_MAX),
            day_seq: normalize_day_seq(&job.day_seq),
            work_center: truncate_chars(&job.work_center, WORK_CENTER_MAX),
        }
    }
}

/// Normalize a day sequence to at most six chars ending in `H`
///
/// Existing trailing markers are stripped before the budget is applied so the
/// marker is never truncated away. An empty sequence stays empty.
pub fn normalize_day_seq(raw: &str) -> String {
    let base = raw
        .trim()
        .trim_end_matches(|c| c == 'H' || c == 'h')
        .trim_end();
    if base.is_empty() && raw.trim().is_empty() {
        return String::new();
    }
    let mut seq = truncate_chars(base, DAY_SEQ_MAX - 1);
    seq.push(DAY_SEQ_SUFFIX);
    seq
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_job() -> PrintJob {
        PrintJob {
            plant_cd: "PLANT-123".into(),
            sfc_cd: "S".repeat(300),
            order_number: "000012345678".into(),
            next_order_number: "ignored".into(),
            bar_key: "B".repeat(40),
            pcard_seq: "9".repeat(30),
            day_seq: "1234567".into(),
            work_center: "W".repeat(80),
            pcard_qty: "5".into(),
            size_cd: "M".into(),
        }
    }

    #[test]
    fn test_key_is_deterministic() {
        let job = long_job();
        assert_eq!(JobKey::of(&job), JobKey::of(&job));
    }

    #[test]
    fn test_key_respects_budgets() {
        let key = JobKey::of(&long_job());
        assert_eq!(key.plant_cd, "PLAN");
        assert_eq!(key.sfc_cd.chars().count(), SFC_CD_MAX);
        assert_eq!(key.order_number, "0000123456");
        assert_eq!(key.bar_key.chars().count(), BAR_KEY_MAX);
        assert_eq!(key.pcard_seq.chars().count(), PCARD_SEQ_MAX);
        assert_eq!(key.day_seq, "12345H");
        assert_eq!(key.work_center.chars().count(), WORK_CENTER_MAX);
    }

    #[test]
    fn test_day_seq_suffix() {
        assert_eq!(normalize_day_seq("017"), "017H");
        assert_eq!(normalize_day_seq("017H"), "017H");
        assert_eq!(normalize_day_seq(" 017h "), "017H");
        assert_eq!(normalize_day_seq("H"), "H");
        assert_eq!(normalize_day_seq(""), "");
    }

    #[test]
    fn test_key_serializes_with_upstream_names() {
        let key = JobKey::of(&PrintJob {
            plant_cd: "1000".into(),
            day_seq: "5".into(),
            ..Default::default()
        });
        let v = serde_json::to_value(&key).unwrap();
        assert_eq!(v["PLANT_CD"], "1000");
        assert_eq!(v["DAY_SEQ"], "5H");
    }
}
