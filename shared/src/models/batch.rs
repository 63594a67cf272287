//! Batch result and event models
//!
//! Results travel from the orchestrator to callers over the event channel;
//! both event kinds carry the batch correlation id.

use serde::{Deserialize, Serialize};

use super::job_key::JobKey;

/// Printing mode of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintMode {
    /// Sequential one-page dispatch, no completion verification
    Fast,
    /// One multi-page document shown before printing
    Preview,
}

impl std::fmt::Display for PrintMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Fast => "fast",
            Self::Preview => "preview",
        })
    }
}

/// Job-level failure reason reported to callers and the tracking backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobErrorCode {
    /// Requested device has no match in the enumerated printer list
    PrinterNotFound,
    /// Render surface never reached the ready barrier
    LoadOrPrintError,
    /// Every dispatch tier was rejected by the print facility
    PrintError,
}

impl JobErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PrinterNotFound => "PRINTER_NOT_FOUND",
            Self::LoadOrPrintError => "LOAD_OR_PRINT_ERROR",
            Self::PrintError => "PRINT_ERROR",
        }
    }
}

impl std::fmt::Display for JobErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one job within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub index: usize,
    pub key: JobKey,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<bool>,
}

impl JobResult {
    pub fn success(index: usize, key: JobKey) -> Self {
        Self {
            index,
            key,
            ok: true,
            error: None,
            preview: None,
        }
    }

    pub fn failure(index: usize, key: JobKey, error: JobErrorCode) -> Self {
        Self {
            index,
            key,
            ok: false,
            error: Some(error),
            preview: None,
        }
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Accepted, but only shown for operator confirmation
    pub fn is_pending(&self) -> bool {
        self.ok && self.preview == Some(true)
    }
}

/// Aggregate of one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub batch_id: String,
    pub total: usize,
    pub ok_count: usize,
    pub pend_count: usize,
    pub fail_count: usize,
    pub results: Vec<JobResult>,
}

impl BatchSummary {
    /// Aggregate counts from per-job results
    ///
    /// `ok` preview results count as pending, other `ok` results as ok.
    pub fn from_results(batch_id: impl Into<String>, results: Vec<JobResult>) -> Self {
        let pend_count = results.iter().filter(|r| r.is_pending()).count();
        let ok_count = results.iter().filter(|r| r.ok).count() - pend_count;
        let fail_count = results.iter().filter(|r| !r.ok).count();
        Self {
            batch_id: batch_id.into(),
            total: results.len(),
            ok_count,
            pend_count,
            fail_count,
            results,
        }
    }
}

/// Event emitted by a running batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrintEvent {
    JobResult {
        #[serde(rename = "batchId")]
        batch_id: String,
        #[serde(flatten)]
        result: JobResult,
    },
    BatchDone(BatchSummary),
}

impl PrintEvent {
    pub fn batch_id(&self) -> &str {
        match self {
            Self::JobResult { batch_id, .. } => batch_id,
            Self::BatchDone(summary) => &summary.batch_id,
        }
    }
}
