use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 打印后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrintBackend {
    /// 目录虚拟打印机 (每个子目录 = 一台设备)
    #[default]
    Spool,
    /// CUPS (`lp` / `lpstat`)
    Cups,
}

impl FromStr for PrintBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spool" => Ok(Self::Spool),
            "cups" => Ok(Self::Cups),
            other => Err(format!("unknown print backend: {}", other)),
        }
    }
}

/// 服务配置 - 进程级配置项
///
/// 标签相关的运行时配置 (设备、尺寸、几何参数) 不在这里，
/// 见 [`crate::runtime_config`]。
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./passcard-data | 工作目录 |
/// | HTTP_PORT | 3030 | HTTP 服务端口 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (无) | 日志目录，存在时按天滚动写文件 |
/// | LOG_JSON | false | 日志输出为 JSON |
/// | PASSCARD_CONFIG | (无) | 标签配置文件路径 (优先于其他候选路径) |
/// | CONFIG_POLL_MS | 1000 | 配置文件变更检测间隔 (毫秒) |
/// | PRINT_BACKEND | spool | spool 或 cups |
/// | NOTIFY_ENABLED | true | 是否向后端提交打印记录 |
/// | PREVIEW_RETENTION_SECS | 900 | 预览文档保留时间 (秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/passcard HTTP_PORT=8080 PRINT_BACKEND=cups cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存放暂存文档、虚拟打印队列
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 日志级别 (`RUST_LOG` 优先)
    pub log_level: String,
    /// 日志目录，设置后按天滚动写文件
    pub log_dir: Option<String>,
    pub log_json: bool,
    /// 标签配置文件路径覆盖
    pub passcard_config: Option<String>,
    /// 配置文件轮询间隔 (毫秒)
    pub config_poll_ms: u64,
    pub print_backend: PrintBackend,
    /// 是否启用后端提交
    pub notify_enabled: bool,
    /// 预览文档保留时间 (秒)
    pub preview_retention_secs: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./passcard-data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3030),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            passcard_config: std::env::var("PASSCARD_CONFIG")
                .ok()
                .filter(|p| !p.trim().is_empty()),
            config_poll_ms: std::env::var("CONFIG_POLL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(1000),
            print_backend: std::env::var("PRINT_BACKEND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            notify_enabled: std::env::var("NOTIFY_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            preview_retention_secs: std::env::var("PREVIEW_RETENTION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
    }

    /// 虚拟打印队列根目录
    pub fn spool_dir(&self) -> PathBuf {
        self.work_dir().join("spool")
    }

    /// 渲染暂存目录
    pub fn staging_dir(&self) -> PathBuf {
        self.work_dir().join("staging")
    }

    pub fn config_poll_interval(&self) -> Duration {
        Duration::from_millis(self.config_poll_ms)
    }

    pub fn preview_retention(&self) -> Duration {
        Duration::from_secs(self.preview_retention_secs)
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.spool_dir())?;
        std::fs::create_dir_all(self.staging_dir())?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
