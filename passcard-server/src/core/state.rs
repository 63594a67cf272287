use std::path::Path;
use std::sync::Arc;

use passcard_printer::{
    CupsPrinter, PrintFacility, SpoolPrinter, StagedSurfaceFactory, SurfaceFactory,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::config::PrintBackend;
use crate::core::{Config, Result};
use crate::printing::{
    BatchOrchestrator, CommitNotifier, EventBus, HttpCommitNotifier, NoopNotifier,
    PrintDispatcher, SurfaceManager,
};
use crate::runtime_config::{ConfigStore, spawn_watcher};

/// 虚拟打印后端在没有任何设备时创建的设备
pub const SPOOL_DEFAULT_DEVICE: &str = "Passcard-Spool";

/// 服务器状态 - 持有所有共享服务的引用
///
/// 克隆开销很小 (内部均为 `Arc`)，可直接作为 axum 的 State。
#[derive(Clone)]
pub struct ServerState {
    /// 进程配置
    pub config: Config,
    /// 标签运行时配置
    pub config_store: Arc<ConfigStore>,
    /// 打印设施 (spool / CUPS)
    pub facility: Arc<dyn PrintFacility>,
    /// 渲染面管理
    pub surfaces: Arc<SurfaceManager>,
    /// 批量打印编排
    pub orchestrator: Arc<BatchOrchestrator>,
    /// 关闭信号 (停止配置监听等后台任务)
    pub shutdown: CancellationToken,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("config", &self.config)
            .field("config_store", &self.config_store)
            .finish_non_exhaustive()
    }
}

impl ServerState {
    /// 由已构造的组件组装状态
    ///
    /// 测试中用于注入假的打印设施、渲染面和提交通知
    pub fn from_parts(
        config: Config,
        config_store: Arc<ConfigStore>,
        facility: Arc<dyn PrintFacility>,
        surface_factory: Arc<dyn SurfaceFactory>,
        notifier: Arc<dyn CommitNotifier>,
    ) -> Self {
        let surfaces = Arc::new(SurfaceManager::new(surface_factory));
        let orchestrator = Arc::new(BatchOrchestrator::new(
            config_store.clone(),
            surfaces.clone(),
            PrintDispatcher::new(facility.clone()),
            notifier,
            EventBus::new(),
        ));
        Self {
            config,
            config_store,
            facility,
            surfaces,
            orchestrator,
            shutdown: CancellationToken::new(),
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 标签配置 (首次加载)
    /// 3. 打印设施
    /// 4. 渲染面、提交通知、编排器
    pub async fn initialize(config: &Config) -> Result<Self> {
        config.ensure_work_dir_structure()?;

        let candidates =
            ConfigStore::default_candidates(config.passcard_config.as_deref().map(Path::new));
        let config_store = Arc::new(ConfigStore::new(candidates));
        config_store.load().await;

        let facility: Arc<dyn PrintFacility> = match config.print_backend {
            PrintBackend::Spool => {
                let spool = SpoolPrinter::new(config.spool_dir());
                if spool.list_printers().await?.is_empty() {
                    spool.add_device(SPOOL_DEFAULT_DEVICE).await?;
                }
                Arc::new(spool.with_default_device(SPOOL_DEFAULT_DEVICE))
            }
            PrintBackend::Cups => Arc::new(CupsPrinter::new()),
        };
        tracing::info!(backend = ?config.print_backend, "Print facility ready");

        let notifier: Arc<dyn CommitNotifier> = if config.notify_enabled {
            Arc::new(HttpCommitNotifier::for_store(config_store.clone())?)
        } else {
            tracing::info!("Commit notifications disabled");
            Arc::new(NoopNotifier)
        };

        let surface_factory = Arc::new(
            StagedSurfaceFactory::new(config.staging_dir())
                .with_preview_retention(config.preview_retention()),
        );

        Ok(Self::from_parts(
            config.clone(),
            config_store,
            facility,
            surface_factory,
            notifier,
        ))
    }

    /// 启动后台任务
    ///
    /// - 标签配置文件变更监听
    pub fn start_background_tasks(&self) -> JoinHandle<()> {
        spawn_watcher(
            self.config_store.clone(),
            self.config.config_poll_interval(),
            self.shutdown.child_token(),
        )
    }

    /// 停止后台任务并释放渲染面
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.surfaces.close().await;
    }
}
