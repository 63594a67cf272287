//! Data models
//!
//! Shared between the print server and its callers (via API and event stream).

pub mod batch;
pub mod job_key;
pub mod print_job;

// Re-exports
pub use batch::*;
pub use job_key::*;
pub use print_job::*;
