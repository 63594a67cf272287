//! Printer enumeration handler

use axum::Json;
use axum::extract::State;
use shared::error::{AppError, AppResult};

use crate::core::ServerState;

/// GET /api/printers
///
/// Device names as reported by the print facility.
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<String>>> {
    let printers = state.facility.list_printers().await.map_err(|e| {
        tracing::error!(error = %e, "Printer enumeration failed");
        AppError::printer_unavailable(e.to_string())
    })?;
    Ok(Json(printers))
}
