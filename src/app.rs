use anyhow::{Context, Result};
use surge_config::AppConfig;
use surge_worker::WorkerService;
use tokio::sync::broadcast;
use tracing::info;

/// 主应用程序
pub struct Application {
    service: WorkerService,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        info!(
            "初始化应用程序: worker_id={}, queue={}",
            config.queue.worker_id, config.queue.server_hostname
        );
        Self {
            service: WorkerService::new(config),
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.service.config()
    }

    /// 运行直到队列会话结束或收到关闭信号
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        self.service
            .run(shutdown_rx)
            .await
            .context("Worker服务运行失败")
    }
}
