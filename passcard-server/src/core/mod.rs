//! 核心模块 - 服务配置、状态和错误定义
//!
//! # 模块结构
//!
//! - [`Config`] - 进程配置 (环境变量)
//! - [`ServerState`] - 服务状态 (配置存储、打印设施、编排器)
//! - [`Server`] - HTTP 服务器
//! - [`ServerError`] - 启动与运行错误

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::{Config, PrintBackend};
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
