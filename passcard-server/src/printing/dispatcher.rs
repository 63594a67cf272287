//! Print dispatcher
//!
//! Submits a staged document through a fallback chain:
//!
//! ```text
//! Full -> NoMargins -> NoDevice -> Failed
//! ```
//!
//! Preview runs the short chain `Full -> NoDevice`, non-silent. Acceptance by
//! the print facility ends the chain; completion is never awaited.

use std::fmt;
use std::sync::Arc;

use passcard_printer::{MarginType, PageSize, PrintError, PrintFacility, PrintSettings, StagedDocument};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Explicit page size, zero custom margins, resolved device
    Full,
    /// Same, with margin handling left to the driver
    NoMargins,
    /// Device dropped, host default printer
    NoDevice,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Full => "full",
            Self::NoMargins => "no_margins",
            Self::NoDevice => "no_device",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("All {attempts} print attempts failed, last: {last}")]
    Exhausted {
        attempts: usize,
        #[source]
        last: PrintError,
    },
}

/// What to print and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub page_size: PageSize,
    /// Resolved device; `None` = host default
    pub device: Option<String>,
    /// Preview prints show the system dialog and use the short chain
    pub preview: bool,
}

impl DispatchRequest {
    /// Attempt order for this request
    ///
    /// `NoDevice` is skipped when no device was set, it would repeat the
    /// previous attempt verbatim.
    pub fn tiers(&self) -> Vec<Tier> {
        let mut tiers = if self.preview {
            vec![Tier::Full]
        } else {
            vec![Tier::Full, Tier::NoMargins]
        };
        if self.device.is_some() {
            tiers.push(Tier::NoDevice);
        }
        tiers
    }

    pub fn settings(&self, tier: Tier) -> PrintSettings {
        let margins = match tier {
            Tier::Full => MarginType::CustomZero,
            Tier::NoMargins => MarginType::None,
            // Preview keeps its layout on the host printer
            Tier::NoDevice if self.preview => MarginType::CustomZero,
            Tier::NoDevice => MarginType::None,
        };
        PrintSettings {
            silent: !self.preview,
            print_background: true,
            page_size: self.page_size,
            margins,
            device_name: match tier {
                Tier::NoDevice => None,
                _ => self.device.clone(),
            },
        }
    }
}

#[derive(Clone)]
pub struct PrintDispatcher {
    facility: Arc<dyn PrintFacility>,
}

impl fmt::Debug for PrintDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintDispatcher").finish_non_exhaustive()
    }
}

impl PrintDispatcher {
    pub fn new(facility: Arc<dyn PrintFacility>) -> Self {
        Self { facility }
    }

    pub fn facility(&self) -> &Arc<dyn PrintFacility> {
        &self.facility
    }

    /// Run the fallback chain; returns the tier that was accepted
    #[instrument(skip(self, document, request), fields(title = %document.title, device = ?request.device))]
    pub async fn dispatch(
        &self,
        document: &StagedDocument,
        request: &DispatchRequest,
    ) -> Result<Tier, DispatchError> {
        let tiers = request.tiers();
        let mut last = None;
        for tier in &tiers {
            let settings = request.settings(*tier);
            match self.facility.print(document, &settings).await {
                Ok(()) => {
                    info!(tier = %tier, "Print accepted");
                    return Ok(*tier);
                }
                Err(e) => {
                    warn!(tier = %tier, error = %e, "Print attempt failed, trying next");
                    last = Some(e);
                }
            }
        }
        Err(DispatchError::Exhausted {
            attempts: tiers.len(),
            last: last.unwrap_or(PrintError::NotLoaded),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use passcard_printer::PrintResult;
    use std::path::PathBuf;

    /// Rejects the first `fail` calls
    struct Flaky {
        fail: usize,
        calls: Mutex<Vec<PrintSettings>>,
    }

    #[async_trait]
    impl PrintFacility for Flaky {
        async fn list_printers(&self) -> PrintResult<Vec<String>> {
            Ok(vec![])
        }

        async fn print(&self, _doc: &StagedDocument, settings: &PrintSettings) -> PrintResult<()> {
            let mut calls = self.calls.lock();
            calls.push(settings.clone());
            if calls.len() <= self.fail {
                Err(PrintError::Rejected("busy".into()))
            } else {
                Ok(())
            }
        }
    }

    fn doc() -> StagedDocument {
        StagedDocument {
            path: PathBuf::from("/tmp/x.html"),
            title: "T".into(),
            bytes: 1,
        }
    }

    fn request(device: Option<&str>, preview: bool) -> DispatchRequest {
        DispatchRequest {
            page_size: PageSize {
                width_microns: 79_000,
                height_microns: 54_000,
            },
            device: device.map(str::to_string),
            preview,
        }
    }

    async fn run(fail: usize, req: DispatchRequest) -> (Result<Tier, DispatchError>, Vec<PrintSettings>) {
        let facility = Arc::new(Flaky {
            fail,
            calls: Mutex::new(Vec::new()),
        });
        let dispatcher = PrintDispatcher::new(facility.clone());
        let result = dispatcher.dispatch(&doc(), &req).await;
        let calls = facility.calls.lock().clone();
        (result, calls)
    }

    #[tokio::test]
    async fn test_first_tier_accepted() {
        let (result, calls) = run(0, request(Some("Label-1"), false)).await;
        assert_eq!(result.unwrap(), Tier::Full);
        assert_eq!(calls.len(), 1);
        assert!(calls[0].silent);
        assert_eq!(calls[0].margins, MarginType::CustomZero);
        assert_eq!(calls[0].device_name.as_deref(), Some("Label-1"));
    }

    #[tokio::test]
    async fn test_full_chain() {
        let (result, calls) = run(2, request(Some("Label-1"), false)).await;
        assert_eq!(result.unwrap(), Tier::NoDevice);
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].margins, MarginType::None);
        assert_eq!(calls[1].device_name.as_deref(), Some("Label-1"));
        assert!(calls[2].device_name.is_none());
    }

    #[tokio::test]
    async fn test_exhausted() {
        let (result, calls) = run(usize::MAX, request(Some("Label-1"), false)).await;
        assert!(matches!(result, Err(DispatchError::Exhausted { attempts: 3, .. })));
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn test_host_default_skips_no_device() {
        let (result, calls) = run(usize::MAX, request(None, false)).await;
        assert!(result.is_err());
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_preview_chain() {
        let (result, calls) = run(1, request(Some("Label-1"), true)).await;
        assert_eq!(result.unwrap(), Tier::NoDevice);
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| !c.silent));
        assert!(calls[1].device_name.is_none());
    }
}
