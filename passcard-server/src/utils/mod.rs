//! 工具模块
//!
//! - 日志初始化
//! - 运行环境准备

pub mod logger;

use crate::core::Config;

/// 准备运行环境
///
/// 1. 加载 `.env` (不存在时忽略)
/// 2. 读取 [`Config`] 并按其日志项初始化日志
/// 3. 创建工作目录
pub fn setup_environment() -> std::io::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    logger::init_from_config(&config);
    config.ensure_work_dir_structure()?;
    Ok(config)
}
