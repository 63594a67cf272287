//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`print`] - 打印命令与事件流
//! - [`printers`] - 设备枚举
//! - [`config`] - 标签配置查看与重载

pub mod config;
pub mod health;
pub mod print;
pub mod printers;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(print::router())
        .merge(printers::router())
        .merge(config::router())
        .merge(health::router())
}

/// Build the application with middleware
pub fn build_app() -> Router<ServerState> {
    build_router()
        // CORS - the UI is served from another origin
        .layer(CorsLayer::permissive())
        // Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
}
