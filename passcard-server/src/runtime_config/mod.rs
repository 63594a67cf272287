//! Runtime label configuration
//!
//! - [`types`] - config, geometry and merge types
//! - [`xml`] - flat XML reader
//! - [`store`] - active snapshot, load/merge/reload
//! - [`api_base`] - backend URL resolution
//! - [`watcher`] - reload on file change

pub mod api_base;
pub mod store;
pub mod types;
pub mod watcher;
pub mod xml;

use std::path::PathBuf;

use thiserror::Error;

pub use store::{ConfigInfo, ConfigSnapshot, ConfigStore, merge_options};
pub use types::{
    BarcodeConfig, EcLevel, Geometry, MergedOptions, PrintOptions, RuntimeConfig, mm_to_microns,
};
pub use watcher::spawn_watcher;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Document has no root element")]
    Empty,
}
