//! # passcard-printer
//!
//! Low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - Render surfaces that stage a document for printing
//! - Print facilities that enumerate devices and accept staged documents
//!   (spool directories, CUPS)
//!
//! Business logic (WHAT to print) stays in the server:
//! - Label layout and document generation
//! - Fallback chains and batch orchestration
//!
//! ## Example
//!
//! ```ignore
//! use passcard_printer::{
//!     MarginType, PageSize, PrintFacility, PrintSettings, RenderSurface, SpoolPrinter,
//!     StagedSurface,
//! };
//!
//! let mut surface = StagedSurface::create("work/surfaces".as_ref(), false).await?;
//! surface.load("PASSCARD 4711-1", "<html>...</html>").await?;
//! surface.when_ready(std::time::Duration::from_millis(2500)).await?;
//!
//! let printer = SpoolPrinter::new("work/spool");
//! let settings = PrintSettings {
//!     silent: true,
//!     print_background: true,
//!     page_size: PageSize { width_microns: 79_000, height_microns: 54_000 },
//!     margins: MarginType::CustomZero,
//!     device_name: Some("Label-1".into()),
//! };
//! printer.print(surface.staged().unwrap(), &settings).await?;
//! ```

mod cups;
mod error;
mod facility;
mod surface;

// Re-exports
pub use cups::CupsPrinter;
pub use error::{PrintError, PrintResult};
pub use facility::{MarginType, PageSize, PrintFacility, PrintSettings, SpoolPrinter};
pub use surface::{
    FRAME_INTERVAL, RenderSurface, StagedDocument, StagedSurface, StagedSurfaceFactory,
    SurfaceFactory,
};
