//! Passcard Print Server - 通行卡标签批量打印服务
//!
//! # 架构概述
//!
//! 接收批量打印命令，将每条通行卡记录渲染为带二维码的标签页，
//! 通过打印设施输出，并把每个任务的结果提交给跟踪后端、推送给调用方。
//!
//! # 模块结构
//!
//! ```text
//! passcard-server/src/
//! ├── core/            # 配置、状态、错误、HTTP 服务器
//! ├── runtime_config/  # 标签 XML 配置、API 地址解析、热加载
//! ├── printing/        # 标签模型、文档渲染、回退打印、批量编排
//! ├── api/             # HTTP 路由和处理器
//! └── utils/           # 日志与环境
//! ```

pub mod api;
pub mod core;
pub mod printing;
pub mod runtime_config;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerError, ServerState};
pub use printing::BatchOrchestrator;
pub use runtime_config::{ConfigStore, RuntimeConfig};
pub use utils::setup_environment;

// Re-export logger functions
pub use utils::logger::{init_from_config, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
    ____                                      __
   / __ \____ _______________ __________ ____/ /
  / /_/ / __ `/ ___/ ___/ ___/ __ `/ ___/ __  /
 / ____/ /_/ (__  |__  ) /__/ /_/ / /  / /_/ /
/_/    \__,_/____/____/\___/\__,_/_/   \__,_/
    "#
    );
}
