//! Printer resolver
//!
//! Matches a requested device name against the enumerated printer list:
//! exact, then case-insensitive exact, then case-insensitive substring.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Resolution {
    /// Nothing requested; print to the host default
    HostDefault,
    Matched(String),
    /// A device was requested but none matched
    NotFound(String),
}

impl Resolution {
    /// Device to hand to the print facility
    pub fn device(&self) -> Option<&str> {
        match self {
            Self::Matched(name) => Some(name),
            Self::HostDefault | Self::NotFound(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub fn resolve(requested: Option<&str>, printers: &[String]) -> Resolution {
    let Some(requested) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return Resolution::HostDefault;
    };

    if let Some(exact) = printers.iter().find(|p| p.as_str() == requested) {
        return Resolution::Matched(exact.clone());
    }

    let wanted = requested.to_lowercase();
    if let Some(ci) = printers.iter().find(|p| p.to_lowercase() == wanted) {
        return Resolution::Matched(ci.clone());
    }
    if let Some(partial) = printers.iter().find(|p| p.to_lowercase().contains(&wanted)) {
        return Resolution::Matched(partial.clone());
    }

    Resolution::NotFound(requested.to_string())
}
