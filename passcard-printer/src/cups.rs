//! CUPS print facility
//!
//! Uses the `lpstat`/`lp` command line tools so no client library has to be
//! linked. A zero exit status from `lp` means the scheduler queued the job.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, instrument, warn};

use crate::error::{PrintError, PrintResult};
use crate::facility::{MarginType, PrintFacility, PrintSettings};
use crate::surface::StagedDocument;

/// CUPS-backed printer
#[derive(Debug, Clone)]
pub struct CupsPrinter {
    timeout: Duration,
}

impl CupsPrinter {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the timeout for each `lp`/`lpstat` invocation
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, command: &mut Command) -> PrintResult<String> {
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| PrintError::Timeout(format!("{:?}", command.as_std().get_program())))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(PrintError::Rejected(if stderr.is_empty() {
                format!("exit status {}", output.status)
            } else {
                stderr
            }));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Build the `lp` argument list for a job
    fn lp_args(document: &StagedDocument, settings: &PrintSettings) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(device) = &settings.device_name {
            args.push("-d".to_string());
            args.push(device.clone());
        }
        args.push("-t".to_string());
        args.push(document.title.clone());
        args.push("-o".to_string());
        args.push(format!(
            "media=Custom.{}x{}mm",
            format_mm(settings.page_size.width_mm()),
            format_mm(settings.page_size.height_mm())
        ));
        if settings.margins == MarginType::CustomZero {
            for side in ["page-left", "page-right", "page-top", "page-bottom"] {
                args.push("-o".to_string());
                args.push(format!("{}=0", side));
            }
        }
        args.push("--".to_string());
        args.push(document.path.to_string_lossy().into_owned());
        args
    }
}

impl Default for CupsPrinter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrintFacility for CupsPrinter {
    #[instrument(skip(self))]
    async fn list_printers(&self) -> PrintResult<Vec<String>> {
        let stdout = match self.run(Command::new("lpstat").arg("-e")).await {
            Ok(out) => out,
            Err(PrintError::Rejected(msg)) => {
                // lpstat exits non-zero when no destinations exist
                warn!(error = %msg, "lpstat returned no destinations");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        Ok(parse_lpstat_destinations(&stdout))
    }

    #[instrument(skip(self, document, settings), fields(title = %document.title, device = ?settings.device_name))]
    async fn print(&self, document: &StagedDocument, settings: &PrintSettings) -> PrintResult<()> {
        let args = Self::lp_args(document, settings);
        let stdout = self.run(Command::new("lp").args(&args)).await?;
        info!(response = %stdout.trim(), "Print job queued");
        Ok(())
    }
}

fn parse_lpstat_destinations(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn format_mm(mm: f64) -> String {
    let s = format!("{:.2}", mm);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::PageSize;
    use std::path::PathBuf;

    fn doc() -> StagedDocument {
        StagedDocument {
            path: PathBuf::from("/tmp/surface-1.html"),
            title: "PASSCARD 1-2-x".to_string(),
            bytes: 10,
        }
    }

    fn settings(margins: MarginType, device: Option<&str>) -> PrintSettings {
        PrintSettings {
            silent: true,
            print_background: true,
            page_size: PageSize {
                width_microns: 79_000,
                height_microns: 54_500,
            },
            margins,
            device_name: device.map(str::to_string),
        }
    }

    #[test]
    fn test_lp_args_full() {
        let args = CupsPrinter::lp_args(&doc(), &settings(MarginType::CustomZero, Some("Zebra")));
        assert_eq!(&args[..4], &["-d", "Zebra", "-t", "PASSCARD 1-2-x"]);
        assert!(args.contains(&"media=Custom.79x54.5mm".to_string()));
        assert!(args.contains(&"page-left=0".to_string()));
        assert_eq!(args.last().unwrap(), "/tmp/surface-1.html");
    }

    #[test]
    fn test_lp_args_no_margins_no_device() {
        let args = CupsPrinter::lp_args(&doc(), &settings(MarginType::None, None));
        assert!(!args.contains(&"-d".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("page-")));
    }

    #[test]
    fn test_parse_lpstat() {
        let out = "Label-1\nLABEL-2\n\n  Office  \n";
        assert_eq!(
            parse_lpstat_destinations(out),
            vec!["Label-1", "LABEL-2", "Office"]
        );
    }

    #[test]
    fn test_format_mm() {
        assert_eq!(format_mm(79.0), "79");
        assert_eq!(format_mm(54.5), "54.5");
        assert_eq!(format_mm(54.25), "54.25");
    }
}
