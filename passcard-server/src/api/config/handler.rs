//! Runtime config handlers

use axum::Json;
use axum::extract::State;

use crate::core::ServerState;
use crate::runtime_config::ConfigInfo;

/// GET /api/config
///
/// Active label config, the file it came from and the resolved API base.
pub async fn info(State(state): State<ServerState>) -> Json<ConfigInfo> {
    Json(state.config_store.info())
}

/// POST /api/config/reload
///
/// Re-reads the candidate files. A missing or broken file activates the
/// defaults, it never fails the request.
pub async fn reload(State(state): State<ServerState>) -> Json<ConfigInfo> {
    let info = state.config_store.reload().await;
    tracing::info!(file = ?info.file, "Runtime config reloaded on request");
    Json(info)
}
