//! Runtime configuration store
//!
//! Holds the active [`RuntimeConfig`] as an immutable snapshot. `load()`
//! builds a fresh snapshot from the first parsable candidate file and swaps
//! it in; readers holding an older `Arc` keep a consistent view.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::types::{MergedOptions, PrintOptions, RuntimeConfig, mm_to_microns};
use super::{ConfigError, api_base, xml};

/// Config file name looked up in packaged and development locations
pub const CONFIG_FILE_NAME: &str = "passcard-config.xml";

/// One immutable view of the active configuration
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub cfg: Arc<RuntimeConfig>,
    /// File the config came from; `None` when defaults are active
    pub file: Option<PathBuf>,
    /// Resolved backend API base
    pub api_base: String,
}

/// Response of the config-info command
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInfo {
    pub file: Option<String>,
    pub cfg: RuntimeConfig,
    pub api_base: String,
}

pub struct ConfigStore {
    candidates: Vec<PathBuf>,
    active: RwLock<Arc<ConfigSnapshot>>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("candidates", &self.candidates)
            .field("file", &self.active.read().file)
            .finish()
    }
}

impl ConfigStore {
    /// Create a store with defaults active; call [`load`](Self::load) to read files
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        let defaults = ConfigSnapshot {
            cfg: Arc::new(RuntimeConfig::default()),
            file: None,
            api_base: api_base::resolve(None),
        };
        Self {
            candidates,
            active: RwLock::new(Arc::new(defaults)),
        }
    }

    /// Candidate paths in lookup order
    ///
    /// `override_path` (the `PASSCARD_CONFIG` environment value) comes
    /// first, then packaged locations next to the executable, then the
    /// development locations relative to the working directory.
    pub fn default_candidates(override_path: Option<&Path>) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(path) = override_path {
            candidates.push(path.to_path_buf());
        }
        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            candidates.push(dir.join("resources").join(CONFIG_FILE_NAME));
            candidates.push(dir.join(CONFIG_FILE_NAME));
        }
        candidates.push(PathBuf::from("config").join(CONFIG_FILE_NAME));
        candidates.push(PathBuf::from(CONFIG_FILE_NAME));
        candidates
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.active.read().clone()
    }

    /// Current config
    pub fn current(&self) -> Arc<RuntimeConfig> {
        self.active.read().cfg.clone()
    }

    pub fn api_base(&self) -> String {
        self.active.read().api_base.clone()
    }

    /// Read the first parsable candidate and make it active
    ///
    /// Never fails: when no candidate parses, defaults become active.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Arc<ConfigSnapshot> {
        let mut loaded: Option<(PathBuf, RuntimeConfig)> = None;
        for path in &self.candidates {
            match read_candidate(path).await {
                Ok(Some(cfg)) => {
                    loaded = Some((path.clone(), cfg));
                    break;
                }
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping config candidate"),
            }
        }

        let snapshot = match loaded {
            Some((path, mut cfg)) => {
                cfg.source_path = Some(path.clone());
                let api_base = api_base::resolve(cfg.api_base.as_deref());
                info!(
                    file = %path.display(),
                    device = ?cfg.device_name,
                    width_mm = cfg.width_mm,
                    height_mm = cfg.height_mm,
                    api_base = %api_base,
                    "Runtime config loaded"
                );
                ConfigSnapshot {
                    cfg: Arc::new(cfg),
                    file: Some(path),
                    api_base,
                }
            }
            None => {
                warn!(
                    candidates = self.candidates.len(),
                    "No parsable config file, using defaults"
                );
                ConfigSnapshot {
                    cfg: Arc::new(RuntimeConfig::default()),
                    file: None,
                    api_base: api_base::resolve(None),
                }
            }
        };

        let snapshot = Arc::new(snapshot);
        *self.active.write() = snapshot.clone();
        snapshot
    }

    /// Manual reload
    pub async fn reload(&self) -> ConfigInfo {
        self.load().await;
        self.info()
    }

    /// Merge the active config with per-call overrides; explicit fields win
    pub fn merge(&self, overrides: &PrintOptions) -> MergedOptions {
        merge_options(self.current(), overrides)
    }

    pub fn info(&self) -> ConfigInfo {
        let snapshot = self.snapshot();
        ConfigInfo {
            file: snapshot.file.as_ref().map(|p| p.display().to_string()),
            cfg: (*snapshot.cfg).clone(),
            api_base: snapshot.api_base.clone(),
        }
    }

    /// Existing candidate paths (watched for changes)
    pub async fn existing_candidates(&self) -> Vec<PathBuf> {
        let mut existing = Vec::new();
        for path in &self.candidates {
            if let Ok(meta) = tokio::fs::metadata(path).await
                && meta.is_file()
            {
                existing.push(path.clone());
            }
        }
        existing
    }
}

/// `Ok(None)` when the file does not exist
async fn read_candidate(path: &Path) -> Result<Option<RuntimeConfig>, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    xml::parse_config(&content).map(Some)
}

/// Defaults, then `cfg`, then explicit overrides
pub fn merge_options(cfg: Arc<RuntimeConfig>, overrides: &PrintOptions) -> MergedOptions {
    let device_name = match overrides.device_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(name.to_string()),
        _ => cfg.device_name.clone(),
    };
    MergedOptions {
        device_name,
        preview: overrides.preview.unwrap_or(cfg.preview),
        preview_count_as_print: cfg.preview_count_as_print,
        width_microns: overrides
            .width_microns
            .unwrap_or_else(|| mm_to_microns(cfg.width_mm)),
        height_microns: overrides
            .height_microns
            .unwrap_or_else(|| mm_to_microns(cfg.height_mm)),
        config: cfg,
    }
}
