//! Shared types for the passcard print service
//!
//! Common types used across crates: error codes and API envelopes, the
//! canonical print job, its identity key, and batch result events.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use models::{BatchSummary, JobErrorCode, JobKey, JobResult, PrintEvent, PrintJob, PrintMode};
