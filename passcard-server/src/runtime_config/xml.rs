//! Flat XML label config reader
//!
//! The file is a single root element holding leaf tags:
//!
//! ```xml
//! <passcard>
//!   <DEVICE_NAME>Zebra ZD421</DEVICE_NAME>
//!   <WIDTH_MM>79</WIDTH_MM>
//!   <QR_EC_LEVEL>Q</QR_EC_LEVEL>
//! </passcard>
//! ```
//!
//! Tag names are case-insensitive. Unknown tags are ignored, no tag is
//! required, and a value that does not parse keeps the default.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::ConfigError;
use super::types::{EcLevel, RuntimeConfig};

/// Legacy tag names and the canonical tag they stand for
const ALIASES: &[(&str, &str)] = &[
    ("PRINTER_NAME", "DEVICE_NAME"),
    ("PRINTER", "DEVICE_NAME"),
    ("LABEL_WIDTH_MM", "WIDTH_MM"),
    ("LABEL_HEIGHT_MM", "HEIGHT_MM"),
    ("QR_ECL", "QR_EC_LEVEL"),
    ("EC_LEVEL", "QR_EC_LEVEL"),
    ("APIBASE", "API_BASE"),
    ("API_URL", "API_BASE"),
    ("PREVIEW_SCALE_PCT", "PREVIEW_ZOOM"),
];

fn canonical_tag(tag: &str) -> String {
    let upper = tag.trim().to_ascii_uppercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(upper)
}

struct Element {
    name: String,
    text: String,
    has_children: bool,
}

/// Collect `TAG -> value` for every leaf element
///
/// Keys are canonical upper-case tag names. When a tag appears twice the
/// canonical spelling beats an alias, otherwise the last one wins.
pub fn read_entries(xml: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut entries: HashMap<String, String> = HashMap::new();
    let mut canonical_seen: Vec<String> = Vec::new();
    let mut saw_root = false;

    let mut commit = |raw_name: &str, value: &str, entries: &mut HashMap<String, String>| {
        let key = canonical_tag(raw_name);
        let is_canonical = raw_name.eq_ignore_ascii_case(&key);
        if !is_canonical && canonical_seen.contains(&key) {
            return;
        }
        if is_canonical {
            canonical_seen.push(key.clone());
        }
        entries.insert(key, value.trim().to_string());
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = decode_name(&reader, e.name().as_ref())?;
                if let Some(parent) = stack.last_mut() {
                    parent.has_children = true;
                }
                saw_root = true;
                stack.push(Element {
                    name,
                    text: String::new(),
                    has_children: false,
                });
            }
            Ok(Event::Empty(e)) => {
                let name = decode_name(&reader, e.name().as_ref())?;
                saw_root = true;
                // A bare `<passcard/>` root is a valid, empty document
                if let Some(parent) = stack.last_mut() {
                    parent.has_children = true;
                    commit(&name, "", &mut entries);
                }
            }
            Ok(Event::End(_)) => {
                if let Some(element) = stack.pop()
                    && !element.has_children
                    && !stack.is_empty()
                {
                    commit(&element.name, &element.text, &mut entries);
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.decode().map_err(|err| ConfigError::Xml(err.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| ConfigError::Xml(err.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                let entity = e.decode().map_err(|err| ConfigError::Xml(err.to_string()))?;
                let raw = format!("&{};", entity);
                let resolved = quick_xml::escape::unescape(&raw)
                    .map_err(|err| ConfigError::Xml(err.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&resolved);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(ConfigError::Xml(format!(
                    "at byte {}: {}",
                    reader.error_position(),
                    err
                )));
            }
        }
    }

    if !saw_root {
        return Err(ConfigError::Empty);
    }
    if !stack.is_empty() {
        return Err(ConfigError::Xml("unexpected end of document".to_string()));
    }
    Ok(entries)
}

fn decode_name(reader: &Reader<&[u8]>, raw: &[u8]) -> Result<String, ConfigError> {
    let decoded = reader
        .decoder()
        .decode(raw)
        .map_err(|err| ConfigError::Xml(err.to_string()))?;
    // Drop any namespace prefix
    let local = decoded.rsplit(':').next().unwrap_or(decoded.as_ref());
    Ok(local.to_string())
}

/// Parse a whole config document on top of the defaults
pub fn parse_config(xml: &str) -> Result<RuntimeConfig, ConfigError> {
    let entries = read_entries(xml)?;
    Ok(apply_entries(RuntimeConfig::default(), &entries))
}

/// Overlay recognized entries onto `cfg`
pub fn apply_entries(mut cfg: RuntimeConfig, entries: &HashMap<String, String>) -> RuntimeConfig {
    for (key, value) in entries {
        match key.as_str() {
            "DEVICE_NAME" => {
                cfg.device_name = if value.is_empty() {
                    None
                } else {
                    Some(value.clone())
                };
            }
            "PREVIEW" => set_bool(&mut cfg.preview, key, value),
            "PREVIEW_COUNT_AS_PRINT" => set_bool(&mut cfg.preview_count_as_print, key, value),
            "WIDTH_MM" => set_positive(&mut cfg.width_mm, key, value),
            "HEIGHT_MM" => set_positive(&mut cfg.height_mm, key, value),
            "PREVIEW_ZOOM" => match value.trim_end_matches('%').trim().parse::<u32>() {
                Ok(pct) if (10..=400).contains(&pct) => cfg.preview_zoom_pct = pct,
                _ => ignored(key, value),
            },
            "PAD_LEFT_CM" => set_f64(&mut cfg.geometry.pad_left_cm, key, value),
            "PAD_RIGHT_CM" => set_f64(&mut cfg.geometry.pad_right_cm, key, value),
            "RIGHT_INSET_CM" => set_f64(&mut cfg.geometry.right_inset_cm, key, value),
            "LINE_W_CM" => set_f64(&mut cfg.geometry.line_w_cm, key, value),
            "FEED_COMP_MM" => set_f64(&mut cfg.geometry.feed_comp_mm, key, value),
            "TOP_PAD_CM" => set_f64(&mut cfg.geometry.top_pad_cm, key, value),
            "KEY_COL_W_CM" => set_positive(&mut cfg.geometry.key_col_w_cm, key, value),
            "COL_SPLIT_CM" => set_region(&mut cfg.geometry.col_split_cm, key, value),
            "HEADER_H_CM" => set_region(&mut cfg.geometry.header_h_cm, key, value),
            "META_H_CM" => set_region(&mut cfg.geometry.meta_h_cm, key, value),
            "FOOTER_H_CM" => set_region(&mut cfg.geometry.footer_h_cm, key, value),
            "TOP_PAD_DELTA_CM" => set_f64(&mut cfg.geometry.top_pad_delta_cm, key, value),
            "TOP_SHIFT_CM" => set_f64(&mut cfg.geometry.top_shift_cm, key, value),
            "QR_MARGIN" => match value.parse::<u32>() {
                Ok(m) if m <= 16 => cfg.barcode.margin = m,
                _ => ignored(key, value),
            },
            "QR_SCALE" => match value.parse::<u32>() {
                Ok(s) if (1..=32).contains(&s) => cfg.barcode.scale = s,
                _ => ignored(key, value),
            },
            "QR_EC_LEVEL" => match value.parse::<EcLevel>() {
                Ok(level) => cfg.barcode.ec_level = level,
                Err(_) => ignored(key, value),
            },
            "API_BASE" => {
                cfg.api_base = if value.is_empty() {
                    None
                } else {
                    Some(value.clone())
                };
            }
            _ => {}
        }
    }
    cfg
}

/// `1/0/true/false/yes/no/on/off`, case-insensitive
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_number(value: &str) -> Option<f64> {
    // Decimal comma is common in shop-floor locales
    let n: f64 = value.trim().replace(',', ".").parse().ok()?;
    n.is_finite().then_some(n)
}

fn set_bool(slot: &mut bool, key: &str, value: &str) {
    match parse_bool(value) {
        Some(b) => *slot = b,
        None => ignored(key, value),
    }
}

fn set_f64(slot: &mut f64, key: &str, value: &str) {
    match parse_number(value) {
        Some(n) => *slot = n,
        None => ignored(key, value),
    }
}

fn set_positive(slot: &mut f64, key: &str, value: &str) {
    match parse_number(value) {
        Some(n) if n > 0.0 => *slot = n,
        _ => ignored(key, value),
    }
}

/// Empty keeps the page-derived size
fn set_region(slot: &mut Option<f64>, key: &str, value: &str) {
    if value.trim().is_empty() {
        *slot = None;
        return;
    }
    match parse_number(value) {
        Some(n) if n > 0.0 => *slot = Some(n),
        _ => ignored(key, value),
    }
}

fn ignored(key: &str, value: &str) {
    tracing::warn!(tag = %key, value = %value, "Invalid config value, keeping default");
}
