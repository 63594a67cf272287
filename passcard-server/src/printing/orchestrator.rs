//! Batch orchestrator
//!
//! Runs one batch end to end:
//!
//! 1. merge the active config with the caller's overrides
//! 2. resolve the device once (a requested but unknown device fails the
//!    whole batch before anything is printed)
//! 3. fast path: one page per job on the leased hidden surface, strictly
//!    sequential; preview: one multi-page document on a visible surface
//! 4. emit a `job_result` per job and one `batch_done`
//!
//! External commits are awaited in-line but can never fail a job.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::util::{batch_id as new_batch_id, random_token};
use shared::{BatchSummary, JobErrorCode, JobKey, JobResult, PrintEvent, PrintJob, PrintMode};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use passcard_printer::PageSize;

use super::dispatcher::{DispatchError, DispatchRequest, PrintDispatcher, Tier};
use super::document::{self, RenderOptions};
use super::events::EventBus;
use super::label::LabelModel;
use super::notifier::{Commit, CommitNotifier, ResultOptions};
use super::resolver::{self, Resolution};
use super::surface::{
    FAST_READY_TIMEOUT, PREVIEW_READY_TIMEOUT, SurfaceError, SurfaceManager, stage_on,
};
use crate::runtime_config::{ConfigStore, MergedOptions, PrintOptions};

/// Pause between two fast-path jobs
pub const INTER_JOB_DELAY: Duration = Duration::from_millis(10);

const TITLE_TOKEN_LEN: usize = 6;
const DOCUMENT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Immediate answer to a print command; outcomes follow on the event channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accepted {
    pub ok: bool,
    pub accepted: usize,
    pub mode: PrintMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

/// Content of a single-document print
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Html(String),
    Url(String),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to fetch document: {0}")]
    Fetch(String),

    #[error("Printer not found: {0}")]
    PrinterNotFound(String),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        let code = match &err {
            DocumentError::Fetch(_) | DocumentError::Surface(_) => ErrorCode::DocumentLoadFailed,
            DocumentError::PrinterNotFound(_) => ErrorCode::PrinterNotFound,
            DocumentError::Dispatch(_) => ErrorCode::PrintFailed,
        };
        let app = AppError::with_message(code, err.to_string());
        match err {
            DocumentError::PrinterNotFound(device) => app.with_detail("device", device),
            _ => app,
        }
    }
}

/// Markup plus the resolved dispatch target of a single-document print
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    markup: String,
    request: DispatchRequest,
}

impl PreparedDocument {
    pub fn mode(&self) -> PrintMode {
        mode_of(self.request.preview)
    }

    pub fn device(&self) -> Option<&str> {
        self.request.device.as_deref()
    }
}

pub struct BatchOrchestrator {
    config: Arc<ConfigStore>,
    surfaces: Arc<SurfaceManager>,
    dispatcher: PrintDispatcher,
    notifier: Arc<dyn CommitNotifier>,
    events: EventBus,
    http: reqwest::Client,
    inter_job_delay: Duration,
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("config", &self.config)
            .field("inter_job_delay", &self.inter_job_delay)
            .finish_non_exhaustive()
    }
}

impl BatchOrchestrator {
    pub fn new(
        config: Arc<ConfigStore>,
        surfaces: Arc<SurfaceManager>,
        dispatcher: PrintDispatcher,
        notifier: Arc<dyn CommitNotifier>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            surfaces,
            dispatcher,
            notifier,
            events,
            http: reqwest::Client::new(),
            inter_job_delay: INTER_JOB_DELAY,
        }
    }

    pub fn with_inter_job_delay(mut self, delay: Duration) -> Self {
        self.inter_job_delay = delay;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Start a batch in the background and acknowledge it immediately
    pub fn spawn_batch(
        self: &Arc<Self>,
        jobs: Vec<PrintJob>,
        options: PrintOptions,
        batch_id: Option<String>,
    ) -> Accepted {
        let batch_id = normalize_batch_id(batch_id);
        let mode = mode_of(self.config.merge(&options).preview);
        let accepted = Accepted {
            ok: true,
            accepted: jobs.len(),
            mode,
            batch_id: Some(batch_id.clone()),
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run(jobs, options, Some(batch_id)).await;
        });
        accepted
    }

    /// Run a batch to completion
    #[instrument(skip(self, jobs, options), fields(batch_id, jobs = jobs.len()))]
    pub async fn run(
        &self,
        jobs: Vec<PrintJob>,
        options: PrintOptions,
        batch_id: Option<String>,
    ) -> BatchSummary {
        let batch_id = normalize_batch_id(batch_id);
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let merged = self.config.merge(&options);
        let resolution = self.resolve_device(merged.device_name.as_deref()).await;
        info!(
            mode = %mode_of(merged.preview),
            device = ?resolution,
            width_microns = merged.width_microns,
            height_microns = merged.height_microns,
            "Batch started"
        );

        let results = if let Resolution::NotFound(requested) = &resolution {
            error!(device = %requested, "Requested printer not found, failing batch");
            self.fail_all(&batch_id, &jobs, &merged).await
        } else if merged.preview {
            self.run_preview(&batch_id, &jobs, &merged, &resolution).await
        } else {
            self.run_fast(&batch_id, &jobs, &merged, &resolution).await
        };

        let summary = BatchSummary::from_results(batch_id, results);
        info!(
            total = summary.total,
            ok = summary.ok_count,
            pending = summary.pend_count,
            failed = summary.fail_count,
            "Batch done"
        );
        self.events.emit(PrintEvent::BatchDone(summary.clone()));
        summary
    }

    async fn resolve_device(&self, requested: Option<&str>) -> Resolution {
        if requested.is_none() {
            return Resolution::HostDefault;
        }
        let printers = match self.dispatcher.facility().list_printers().await {
            Ok(printers) => printers,
            Err(e) => {
                warn!(error = %e, "Printer enumeration failed");
                Vec::new()
            }
        };
        resolver::resolve(requested, &printers)
    }

    /// Gate failure: every job fails, nothing is dispatched
    async fn fail_all(
        &self,
        batch_id: &str,
        jobs: &[PrintJob],
        merged: &MergedOptions,
    ) -> Vec<JobResult> {
        let code = JobErrorCode::PrinterNotFound;
        let message = format!(
            "Printer not found: {}",
            merged.device_name.as_deref().unwrap_or_default()
        );
        let mut results = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            self.notifier
                .notify(Commit::result(
                    job,
                    false,
                    Some(code.as_str()),
                    Some(&message),
                    ResultOptions {
                        preview: merged.preview,
                        preview_count_as_print: merged.preview_count_as_print,
                    },
                ))
                .await;
            let mut result = JobResult::failure(index, JobKey::of(job), code);
            if merged.preview {
                result = result.with_preview(true);
            }
            self.emit_job(batch_id, &result);
            results.push(result);
        }
        results
    }

    async fn run_fast(
        &self,
        batch_id: &str,
        jobs: &[PrintJob],
        merged: &MergedOptions,
        resolution: &Resolution,
    ) -> Vec<JobResult> {
        let device = resolution.device().map(str::to_string);
        let request = DispatchRequest {
            page_size: page_size(merged),
            device: device.clone(),
            preview: false,
        };
        let result_opts = ResultOptions::default();

        let mut results = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            let key = JobKey::of(job);
            let title = fast_title(&key);
            let model = LabelModel::build(job, Local::now().naive_local());
            let markup = document::render(
                std::slice::from_ref(&model),
                merged.width_microns,
                merged.height_microns,
                &merged.config,
                &RenderOptions {
                    with_toolbar: false,
                    title: Some(&title),
                    skip_barcode_script: true,
                },
            );

            self.notifier
                .notify(Commit::start(job, device.as_deref(), None))
                .await;

            let outcome = match &markup {
                Ok(markup) => self.print_on_fast_surface(&title, markup, &request).await,
                Err(e) => {
                    error!(index, title = %title, error = %e, "Label document render failed");
                    Err(JobErrorCode::LoadOrPrintError)
                }
            };
            let result = match &outcome {
                Ok(tier) => {
                    info!(index, title = %title, tier = %tier, "Job printed");
                    JobResult::success(index, key)
                }
                Err(code) => JobResult::failure(index, key, *code),
            };

            self.notifier
                .notify(Commit::result(
                    job,
                    result.ok,
                    result.error.map(|c| c.as_str()),
                    None,
                    result_opts,
                ))
                .await;
            self.emit_job(batch_id, &result);
            results.push(result);

            tokio::time::sleep(self.inter_job_delay).await;
        }
        results
    }

    /// Stage and dispatch while holding the fast surface lease
    async fn print_on_fast_surface(
        &self,
        title: &str,
        markup: &str,
        request: &DispatchRequest,
    ) -> Result<Tier, JobErrorCode> {
        let mut lease = self.surfaces.fast_surface().await.map_err(|e| {
            warn!(error = %e, "Fast surface unavailable");
            JobErrorCode::LoadOrPrintError
        })?;
        let staged = lease
            .stage(title, markup, FAST_READY_TIMEOUT)
            .await
            .map_err(|e| {
                warn!(title = %title, error = %e, "Document not ready");
                JobErrorCode::LoadOrPrintError
            })?;
        self.dispatcher.dispatch(&staged, request).await.map_err(|e| {
            error!(title = %title, error = %e, "Print failed");
            JobErrorCode::PrintError
        })
    }

    async fn run_preview(
        &self,
        batch_id: &str,
        jobs: &[PrintJob],
        merged: &MergedOptions,
        resolution: &Resolution,
    ) -> Vec<JobResult> {
        let device = resolution.device().map(str::to_string);
        let request = DispatchRequest {
            page_size: page_size(merged),
            device: device.clone(),
            preview: true,
        };

        let printed_at = Local::now().naive_local();
        let models: Vec<LabelModel> = jobs
            .iter()
            .map(|job| LabelModel::build(job, printed_at))
            .collect();
        let title = format!("PASSCARD PREVIEW {}", batch_id);
        let markup = document::render(
            &models,
            merged.width_microns,
            merged.height_microns,
            &merged.config,
            &RenderOptions {
                with_toolbar: true,
                title: Some(&title),
                skip_barcode_script: false,
            },
        );

        for job in jobs {
            self.notifier
                .notify(Commit::start(job, device.as_deref(), Some("PREVIEW")))
                .await;
        }

        let outcome = match &markup {
            _ if jobs.is_empty() => Ok(()),
            Ok(markup) => self.print_preview(&title, markup, &request).await,
            Err(e) => {
                error!(error = %e, "Preview document render failed");
                Err(JobErrorCode::LoadOrPrintError)
            }
        };
        if let Err(code) = outcome {
            warn!(code = %code, "Preview failed");
        }

        let result_opts = ResultOptions {
            preview: true,
            preview_count_as_print: merged.preview_count_as_print,
        };
        let mut results = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            let key = JobKey::of(job);
            let result = match outcome {
                Ok(()) => JobResult::success(index, key),
                Err(code) => JobResult::failure(index, key, code),
            }
            .with_preview(true);

            self.notifier
                .notify(Commit::result(
                    job,
                    result.ok,
                    result.error.map(|c| c.as_str()),
                    None,
                    result_opts,
                ))
                .await;
            self.emit_job(batch_id, &result);
            results.push(result);
        }
        results
    }

    async fn print_preview(
        &self,
        title: &str,
        markup: &str,
        request: &DispatchRequest,
    ) -> Result<(), JobErrorCode> {
        let mut surface = self.surfaces.transient_surface(true).await.map_err(|e| {
            warn!(error = %e, "Preview surface unavailable");
            JobErrorCode::LoadOrPrintError
        })?;

        let outcome = match stage_on(surface.as_mut(), title, markup, PREVIEW_READY_TIMEOUT).await {
            Ok(staged) => self
                .dispatcher
                .dispatch(&staged, request)
                .await
                .map(|tier| info!(tier = %tier, "Preview handed to print dialog"))
                .map_err(|e| {
                    error!(error = %e, "Preview print failed");
                    JobErrorCode::PrintError
                }),
            Err(e) => {
                warn!(error = %e, "Preview document not ready");
                Err(JobErrorCode::LoadOrPrintError)
            }
        };
        surface.close().await;
        outcome
    }

    fn emit_job(&self, batch_id: &str, result: &JobResult) {
        self.events.emit(PrintEvent::JobResult {
            batch_id: batch_id.to_string(),
            result: result.clone(),
        });
    }

    /// Print one arbitrary document (inline markup or fetched from a URL)
    #[instrument(skip(self, source, options))]
    pub async fn print_document(
        &self,
        source: DocumentSource,
        options: PrintOptions,
    ) -> Result<Tier, DocumentError> {
        let prepared = self.prepare_document(source, options).await?;
        self.print_prepared(prepared).await
    }

    /// Fetch the markup and resolve the device without touching a surface
    pub async fn prepare_document(
        &self,
        source: DocumentSource,
        options: PrintOptions,
    ) -> Result<PreparedDocument, DocumentError> {
        let markup = match source {
            DocumentSource::Html(html) => html,
            DocumentSource::Url(url) => self.fetch_document(&url).await?,
        };

        let merged = self.config.merge(&options);
        let resolution = self.resolve_device(merged.device_name.as_deref()).await;
        if let Resolution::NotFound(requested) = resolution {
            return Err(DocumentError::PrinterNotFound(requested));
        }
        let request = DispatchRequest {
            page_size: page_size(&merged),
            device: resolution.device().map(str::to_string),
            preview: merged.preview,
        };
        Ok(PreparedDocument { markup, request })
    }

    /// Stage and dispatch a document returned by [`Self::prepare_document`]
    pub async fn print_prepared(&self, prepared: PreparedDocument) -> Result<Tier, DocumentError> {
        let PreparedDocument { markup, request } = prepared;
        let title = format!("PASSCARD DOCUMENT {}", random_token(TITLE_TOKEN_LEN));

        if request.preview {
            let mut surface = self.surfaces.transient_surface(true).await?;
            let staged = stage_on(surface.as_mut(), &title, &markup, PREVIEW_READY_TIMEOUT).await;
            let outcome = match staged {
                Ok(staged) => self.dispatcher.dispatch(&staged, &request).await.map_err(Into::into),
                Err(e) => Err(e.into()),
            };
            surface.close().await;
            return outcome;
        }

        let mut lease = self.surfaces.fast_surface().await?;
        let staged = lease.stage(&title, &markup, FAST_READY_TIMEOUT).await?;
        Ok(self.dispatcher.dispatch(&staged, &request).await?)
    }

    async fn fetch_document(&self, url: &str) -> Result<String, DocumentError> {
        let resp = self
            .http
            .get(url)
            .timeout(DOCUMENT_FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| DocumentError::Fetch(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(DocumentError::Fetch(format!("{} returned {}", url, resp.status())));
        }
        resp.text()
            .await
            .map_err(|e| DocumentError::Fetch(e.to_string()))
    }
}

fn normalize_batch_id(batch_id: Option<String>) -> String {
    batch_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(new_batch_id)
}

fn mode_of(preview: bool) -> PrintMode {
    if preview { PrintMode::Preview } else { PrintMode::Fast }
}

fn page_size(merged: &MergedOptions) -> PageSize {
    PageSize {
        width_microns: merged.width_microns,
        height_microns: merged.height_microns,
    }
}

/// `PASSCARD {order}-{seq}[-{barKey}]-{token}`
pub fn fast_title(key: &JobKey) -> String {
    let mut title = format!("PASSCARD {}-{}", key.order_number, key.pcard_seq);
    if !key.bar_key.is_empty() {
        title.push('-');
        title.push_str(&key.bar_key);
    }
    title.push('-');
    title.push_str(&random_token(TITLE_TOKEN_LEN));
    title
}
