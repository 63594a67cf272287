//! Runtime config API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/config", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::info))
        .route("/reload", post(handler::reload))
}
