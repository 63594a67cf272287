//! Print facilities
//!
//! A facility enumerates the host's devices and accepts staged documents.
//! Acceptance is terminal: no facility waits for physical completion.
//!
//! Supports:
//! - Spool directories (virtual printers, one subdirectory per device)
//! - CUPS (`lp`/`lpstat`, unix only), see [`crate::cups`]

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{PrintError, PrintResult};
use crate::surface::StagedDocument;

/// Physical page size in micrometers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSize {
    pub width_microns: u32,
    pub height_microns: u32,
}

impl PageSize {
    pub fn width_mm(&self) -> f64 {
        self.width_microns as f64 / 1000.0
    }

    pub fn height_mm(&self) -> f64 {
        self.height_microns as f64 / 1000.0
    }
}

/// Margin handling requested from the print subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginType {
    /// Explicit custom margins, all zero
    CustomZero,
    /// No margins at all
    None,
}

/// Options for one print call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintSettings {
    /// Suppress any confirmation dialog
    pub silent: bool,
    pub print_background: bool,
    pub page_size: PageSize,
    pub margins: MarginType,
    /// Target device; `None` prints to the host default
    pub device_name: Option<String>,
}

/// Native print facility
#[async_trait]
pub trait PrintFacility: Send + Sync {
    /// Enumerate devices known to the host
    async fn list_printers(&self) -> PrintResult<Vec<String>>;

    /// Submit a staged document; `Ok` means the subsystem accepted it
    async fn print(&self, document: &StagedDocument, settings: &PrintSettings) -> PrintResult<()>;
}

/// Directory-backed virtual printer
///
/// Each subdirectory of the spool root is a device. Accepted documents are
/// copied into the device directory together with a JSON sidecar holding the
/// print settings.
#[derive(Debug, Clone)]
pub struct SpoolPrinter {
    root: PathBuf,
    default_device: Option<String>,
}

impl SpoolPrinter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_device: None,
        }
    }

    /// Device used when a job names none (otherwise the first device)
    pub fn with_default_device(mut self, device: impl Into<String>) -> Self {
        self.default_device = Some(device.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure a device directory exists
    pub async fn add_device(&self, name: &str) -> PrintResult<()> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(PrintError::InvalidConfig(format!(
                "Invalid device name: {:?}",
                name
            )));
        }
        tokio::fs::create_dir_all(self.root.join(name)).await?;
        Ok(())
    }

    async fn device_exists(&self, name: &str) -> bool {
        tokio::fs::metadata(self.root.join(name))
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    async fn resolve_target(&self, requested: Option<&str>) -> PrintResult<String> {
        if let Some(name) = requested {
            if self.device_exists(name).await {
                return Ok(name.to_string());
            }
            return Err(PrintError::DeviceNotFound(name.to_string()));
        }

        if let Some(default) = &self.default_device
            && self.device_exists(default).await
        {
            return Ok(default.clone());
        }

        self.list_printers()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PrintError::DeviceNotFound("<host default>".to_string()))
    }
}

#[async_trait]
impl PrintFacility for SpoolPrinter {
    async fn list_printers(&self) -> PrintResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir()
                && let Some(name) = entry.file_name().to_str()
                && !name.starts_with('.')
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    #[instrument(skip(self, document, settings), fields(title = %document.title, device = ?settings.device_name))]
    async fn print(&self, document: &StagedDocument, settings: &PrintSettings) -> PrintResult<()> {
        let device = self.resolve_target(settings.device_name.as_deref()).await?;
        let dir = self.root.join(&device);

        let stem = format!(
            "{}-{}",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%3f"),
            sanitize_file_stem(&document.title)
        );
        tokio::fs::copy(&document.path, dir.join(format!("{}.html", stem))).await?;

        let sidecar = serde_json::to_vec_pretty(settings)
            .map_err(|e| PrintError::Rejected(format!("settings not serializable: {}", e)))?;
        tokio::fs::write(dir.join(format!("{}.json", stem)), sidecar).await?;

        info!(device = %device, bytes = document.bytes, "Print job spooled");
        Ok(())
    }
}

/// Make a document title safe to use as a file name
fn sanitize_file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(80)
        .collect();
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem
    }
}
