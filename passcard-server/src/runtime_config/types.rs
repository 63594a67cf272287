//! Runtime (label) configuration types

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH_MM: f64 = 79.0;
pub const DEFAULT_HEIGHT_MM: f64 = 54.0;

/// Barcode error-correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EcLevel {
    L,
    #[default]
    M,
    Q,
    H,
}

impl FromStr for EcLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(Self::L),
            "M" => Ok(Self::M),
            "Q" => Ok(Self::Q),
            "H" => Ok(Self::H),
            other => Err(format!("unknown EC level: {}", other)),
        }
    }
}

impl fmt::Display for EcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(s)
    }
}

/// Share of the page width taken by the right (barcode) column
pub const DEFAULT_COL_SPLIT_RATIO: f64 = 0.40;
/// Shares of the page height taken by the fixed rows
pub const DEFAULT_HEADER_RATIO: f64 = 0.16;
pub const DEFAULT_META_RATIO: f64 = 0.10;
pub const DEFAULT_FOOTER_RATIO: f64 = 0.10;

/// Label geometry, in the units the config file uses
///
/// Region sizes left at `None` are derived from the page size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub pad_left_cm: f64,
    pub pad_right_cm: f64,
    /// Extra inset of the right column from the page edge
    pub right_inset_cm: f64,
    /// Border line width
    pub line_w_cm: f64,
    /// Feed compensation subtracted from the printable height
    pub feed_comp_mm: f64,
    /// Base top padding, `top_pad_delta_cm` is added on top
    pub top_pad_cm: f64,
    pub top_pad_delta_cm: f64,
    /// Shifts the whole label down (negative: up)
    pub top_shift_cm: f64,
    /// Width of the key column in the left block
    pub key_col_w_cm: f64,
    /// Width of the right column
    pub col_split_cm: Option<f64>,
    pub header_h_cm: Option<f64>,
    pub meta_h_cm: Option<f64>,
    pub footer_h_cm: Option<f64>,
}

impl Geometry {
    pub fn col_split(&self, page_w_cm: f64) -> f64 {
        self.col_split_cm
            .unwrap_or(page_w_cm * DEFAULT_COL_SPLIT_RATIO)
    }

    pub fn header_h(&self, page_h_cm: f64) -> f64 {
        self.header_h_cm.unwrap_or(page_h_cm * DEFAULT_HEADER_RATIO)
    }

    pub fn meta_h(&self, page_h_cm: f64) -> f64 {
        self.meta_h_cm.unwrap_or(page_h_cm * DEFAULT_META_RATIO)
    }

    pub fn footer_h(&self, page_h_cm: f64) -> f64 {
        self.footer_h_cm.unwrap_or(page_h_cm * DEFAULT_FOOTER_RATIO)
    }

    pub fn top_pad(&self) -> f64 {
        (self.top_pad_cm + self.top_pad_delta_cm).max(0.0)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            pad_left_cm: 0.3,
            pad_right_cm: 0.3,
            right_inset_cm: 0.0,
            line_w_cm: 0.03,
            feed_comp_mm: 0.0,
            top_pad_cm: 0.15,
            top_pad_delta_cm: 0.0,
            top_shift_cm: 0.0,
            key_col_w_cm: 1.3,
            col_split_cm: None,
            header_h_cm: None,
            meta_h_cm: None,
            footer_h_cm: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeConfig {
    /// Quiet zone in modules
    pub margin: u32,
    /// Pixels per module when pre-rendering
    pub scale: u32,
    pub ec_level: EcLevel,
}

impl Default for BarcodeConfig {
    fn default() -> Self {
        Self {
            margin: 0,
            scale: 4,
            ec_level: EcLevel::M,
        }
    }
}

/// Active label configuration
///
/// Replaced wholesale on reload, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Forced device; `None` prints to the host default
    pub device_name: Option<String>,
    pub preview: bool,
    pub preview_count_as_print: bool,
    pub width_mm: f64,
    pub height_mm: f64,
    pub preview_zoom_pct: u32,
    pub geometry: Geometry,
    pub barcode: BarcodeConfig,
    /// `API_BASE` as written in the file (before resolution)
    pub api_base: Option<String>,
    /// File this config was loaded from
    pub source_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            preview: false,
            preview_count_as_print: false,
            width_mm: DEFAULT_WIDTH_MM,
            height_mm: DEFAULT_HEIGHT_MM,
            preview_zoom_pct: 100,
            geometry: Geometry::default(),
            barcode: BarcodeConfig::default(),
            api_base: None,
            source_path: None,
        }
    }
}

/// Per-call overrides supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub preview: Option<bool>,
    #[serde(default)]
    pub width_microns: Option<u32>,
    #[serde(default)]
    pub height_microns: Option<u32>,
}

/// Result of merging the active config with per-call overrides
#[derive(Debug, Clone)]
pub struct MergedOptions {
    pub device_name: Option<String>,
    pub preview: bool,
    pub preview_count_as_print: bool,
    pub width_microns: u32,
    pub height_microns: u32,
    /// Snapshot the merge was computed from
    pub config: Arc<RuntimeConfig>,
}

/// Convert millimeters to micrometers
pub fn mm_to_microns(mm: f64) -> u32 {
    (mm * 1000.0).round().max(0.0) as u32
}
