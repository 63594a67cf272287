//! Passcard printing pipeline
//!
//! ```text
//! BatchOrchestrator
//!   -> resolver (device, once per batch)
//!   -> label -> document (markup per job or per preview)
//!   -> surface (fast lease / transient)
//!   -> dispatcher (fallback chain over a PrintFacility)
//!   -> notifier (tracking backend) + events (callers)
//! ```

pub mod barcode;
pub mod dispatcher;
pub mod document;
pub mod events;
pub mod label;
pub mod notifier;
pub mod orchestrator;
pub mod resolver;
pub mod surface;

pub use dispatcher::{DispatchError, DispatchRequest, PrintDispatcher, Tier};
pub use document::{RenderOptions, render};
pub use events::EventBus;
pub use label::LabelModel;
pub use notifier::{Commit, CommitNotifier, HttpCommitNotifier, NoopNotifier, ResultOptions};
pub use orchestrator::{
    Accepted, BatchOrchestrator, DocumentError, DocumentSource, PreparedDocument,
};
pub use resolver::Resolution;
pub use surface::{SurfaceError, SurfaceManager};
