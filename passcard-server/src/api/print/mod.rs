//! Print API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/print | POST | 打印单个文档 (url 或 html) |
//! | /api/print/batch | POST | 批量打印通行卡 |
//! | /api/print/events | GET | 打印结果事件流 (SSE) |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub use handler::{BatchPrintRequest, DocumentPrintRequest, PageSizeRequest};

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/print", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::print_document))
        .route("/batch", post(handler::print_batch))
        .route("/events", get(handler::events))
}
