//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// IO error during staging or printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for a surface or the print subsystem
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Target device does not exist on this host
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The print subsystem refused the job
    #[error("Print rejected: {0}")]
    Rejected(String),

    /// Surface has no document loaded
    #[error("Surface has no document loaded")]
    NotLoaded,

    /// Surface was closed and can no longer be used
    #[error("Surface destroyed: {0}")]
    SurfaceDestroyed(String),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
