//! Print command handlers
//!
//! Commands are acknowledged immediately; outcomes arrive on the event
//! stream (batches) or in the log (single documents). A single document
//! whose URL cannot be fetched or whose device is unknown is refused.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use serde::Deserialize;
use serde_json::Value;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::{PrintEvent, PrintJob};
use tokio::sync::broadcast::error::RecvError;

use crate::core::ServerState;
use crate::printing::{Accepted, DocumentSource};
use crate::runtime_config::PrintOptions;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPrintRequest {
    #[serde(default)]
    pub jobs: Vec<Value>,
    #[serde(default)]
    pub options: PrintOptions,
    #[serde(default)]
    pub batch_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSizeRequest {
    pub width_microns: u32,
    pub height_microns: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPrintRequest {
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub page_size: Option<PageSizeRequest>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub preview: Option<bool>,
}

/// POST /api/print/batch
pub async fn print_batch(
    State(state): State<ServerState>,
    Json(req): Json<BatchPrintRequest>,
) -> AppResult<Json<Accepted>> {
    if req.jobs.is_empty() {
        return Err(AppError::new(ErrorCode::JobListEmpty));
    }
    if let Some(index) = req.jobs.iter().position(|j| !j.is_object()) {
        return Err(AppError::new(ErrorCode::InvalidJob).with_detail("index", index));
    }

    let jobs: Vec<PrintJob> = req.jobs.iter().map(PrintJob::from_value).collect();
    let accepted = state
        .orchestrator
        .spawn_batch(jobs, req.options, req.batch_id);
    tracing::info!(
        batch_id = ?accepted.batch_id,
        accepted = accepted.accepted,
        mode = %accepted.mode,
        "Batch accepted"
    );
    Ok(Json(accepted))
}

/// POST /api/print
pub async fn print_document(
    State(state): State<ServerState>,
    Json(req): Json<DocumentPrintRequest>,
) -> AppResult<Json<Accepted>> {
    let source = match (req.html, req.url) {
        (Some(html), _) if !html.trim().is_empty() => DocumentSource::Html(html),
        (_, Some(url)) if !url.trim().is_empty() => DocumentSource::Url(url.trim().to_string()),
        _ => return Err(AppError::validation("Either url or html is required")),
    };
    let options = PrintOptions {
        device_name: req.device_name,
        preview: req.preview,
        width_microns: req.page_size.map(|p| p.width_microns),
        height_microns: req.page_size.map(|p| p.height_microns),
    };
    // Fetch and device resolution fail the request; staging and dispatch
    // only reach the log.
    let prepared = state.orchestrator.prepare_document(source, options).await?;
    let mode = prepared.mode();

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        match orchestrator.print_prepared(prepared).await {
            Ok(tier) => tracing::info!(tier = %tier, "Document printed"),
            Err(e) => {
                let err = AppError::from(e);
                tracing::error!(code = %err.code, error = %err, "Document print failed");
            }
        }
    });

    Ok(Json(Accepted {
        ok: true,
        accepted: 1,
        mode,
        batch_id: None,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    /// Only forward events of this batch
    #[serde(default)]
    pub batch_id: Option<String>,
}

/// GET /api/print/events
///
/// Server-sent events named `job_result` and `batch_done`.
pub async fn events(
    State(state): State<ServerState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.orchestrator.events().subscribe();
    let filter = query.batch_id;

    let stream = futures::stream::unfold((rx, filter), |(mut rx, filter)| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(id) = &filter
                        && event.batch_id() != id.as_str()
                    {
                        continue;
                    }
                    let sse = to_sse(&event);
                    return Some((Ok(sse), (rx, filter)));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event stream subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &PrintEvent) -> Event {
    let name = match event {
        PrintEvent::JobResult { .. } => "job_result",
        PrintEvent::BatchDone(_) => "batch_done",
    };
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(name).data(data)
}
