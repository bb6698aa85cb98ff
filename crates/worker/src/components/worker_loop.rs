use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use surge_domain::{Job, OutboundFrame};
use surge_errors::{SurgeError, SurgeResult};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::worker_state::{NextAction, WorkerState};
use crate::pipeline::JobOutcome;

/// 任务处理器: 把一个任务执行到终态
///
/// `Err` 只用于必须停止 Worker 的故障; 需要以 `FAILED:` 上报给队列的失败
/// 返回 [`JobOutcome::Failed`]。
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> SurgeResult<JobOutcome>;
}

/// 工作循环: 空闲时请求任务, 有任务时执行, 结果经发件箱上报
pub struct WorkerLoop {
    state: WorkerState,
    outbox: mpsc::Sender<OutboundFrame>,
    handler: Arc<dyn JobHandler>,
    poll_interval: Duration,
}

impl WorkerLoop {
    pub fn new(
        state: WorkerState,
        outbox: mpsc::Sender<OutboundFrame>,
        handler: Arc<dyn JobHandler>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            state,
            outbox,
            handler,
            poll_interval,
        }
    }

    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> SurgeResult<()> {
        // 第一次 tick 在启动一个周期之后, 不立即触发
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Worker loop started, poll interval {}ms",
            self.poll_interval.as_millis()
        );

        loop {
            // 停止信号优先; 进行中的任务在 tick 内跑完并上报后才会检查它
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Worker loop shutting down");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.tick().await?;
                }
            }
        }
    }

    /// 执行一次循环; 持有的任务跑完才返回, 不会有两个任务同时执行
    pub async fn tick(&self) -> SurgeResult<()> {
        match self.state.next_action().await {
            NextAction::Wait => {
                debug!("Job request outstanding, waiting for the queue");
                Ok(())
            }
            NextAction::RequestJob => {
                debug!("Requesting job");
                self.send(OutboundFrame::RequestJob).await
            }
            NextAction::Execute(job) => self.execute(job).await,
        }
    }

    async fn execute(&self, job: Job) -> SurgeResult<()> {
        info!(job_id = %job.id(), mode = job.mode(), "Executing job");

        let frame = match self.handler.handle(&job).await {
            Ok(JobOutcome::Completed) => {
                info!(job_id = %job.id(), "Job completed");
                OutboundFrame::complete(job.id())
            }
            Ok(JobOutcome::Failed { reason }) => {
                warn!(job_id = %job.id(), "Job failed: {}", reason);
                OutboundFrame::JobFailed
            }
            Err(e) if e.is_fatal() => {
                error!(job_id = %job.id(), "Job aborted, stopping worker: {}", e);
                return Err(e);
            }
            Err(e) => {
                warn!(job_id = %job.id(), "Job failed: {}", e);
                OutboundFrame::JobFailed
            }
        };

        self.send(frame).await?;
        self.state.finish_job(&job).await;
        Ok(())
    }

    async fn send(&self, frame: OutboundFrame) -> SurgeResult<()> {
        self.outbox
            .send(frame)
            .await
            .map_err(|e| SurgeError::ChannelClosed(format!("outbox: {e}")))
    }
}
