use std::sync::Arc;

use futures::StreamExt;
use surge_config::AppConfig;
use surge_errors::{SurgeError, SurgeResult};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::collaborators::Collaborators;
use crate::components::{
    JobHandler, QueueConnector, ReceiveTask, SendTask, WorkerLoop, WorkerState,
};
use crate::executors::{CommandRunner, ProcessCommandRunner};
use crate::pipeline::JobPipeline;
use crate::storage::AwsCliStore;

const OUTBOX_CAPACITY: usize = 8;

const SEND_TASK: &str = "send";
const RECEIVE_TASK: &str = "receive";
const WORKER_LOOP: &str = "worker_loop";

type TaskExit = (&'static str, SurgeResult<()>);

/// Worker服务: 一条队列连接, 三个任务 (发送, 接收, 工作循环)
pub struct WorkerService {
    config: AppConfig,
    handler: Arc<dyn JobHandler>,
}

impl WorkerService {
    /// 生产环境装配: 外部程序走 `tokio::process`, 存储走 AWS CLI
    pub fn new(config: AppConfig) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessCommandRunner::new());
        let store = Arc::new(AwsCliStore::new(runner.clone(), config.storage.clone()));
        let collaborators = Collaborators::new(runner, config.collaborators.clone());
        let handler = Arc::new(JobPipeline::new(store, collaborators));
        Self::with_handler(config, handler)
    }

    pub fn with_handler(config: AppConfig, handler: Arc<dyn JobHandler>) -> Self {
        Self { config, handler }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 运行一个队列会话, 直到某个任务结束或收到关闭信号
    ///
    /// 关闭顺序: 先停工作循环 (进行中的任务跑完并上报), 发件箱随之关闭,
    /// 发送任务写完剩余帧后关闭连接, 最后停接收任务; 整个过程受 `shutdown_timeout` 限制。
    /// 返回停止前第一个任务错误, 收尾阶段的错误只记录日志。
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> SurgeResult<()> {
        info!(
            worker_id = %self.config.queue.worker_id,
            host = %self.config.queue.server_hostname,
            "启动Worker服务"
        );

        let stream = QueueConnector::new(self.config.queue.clone())
            .connect()
            .await?;
        let (writer, reader) = stream.split();

        let state = WorkerState::new();
        let (outbox_tx, outbox_rx) = mpsc::channel(OUTBOX_CAPACITY);
        let (loop_stop_tx, _) = broadcast::channel::<()>(1);
        let (receive_stop_tx, _) = broadcast::channel::<()>(1);
        let mut tasks: JoinSet<TaskExit> = JoinSet::new();

        // 发件箱关闭时退出, 不订阅停止信号
        let send_task = SendTask::new(
            writer,
            outbox_rx,
            self.config.queue.ping_interval(),
            self.config.queue.write_timeout(),
        );
        tasks.spawn(async move { (SEND_TASK, send_task.run().await) });

        let receive_task =
            ReceiveTask::new(reader, state.clone(), self.config.queue.read_timeout());
        let stop = receive_stop_tx.subscribe();
        tasks.spawn(async move { (RECEIVE_TASK, receive_task.run(stop).await) });

        let worker_loop = WorkerLoop::new(
            state,
            outbox_tx,
            Arc::clone(&self.handler),
            self.config.worker.poll_interval(),
        );
        let stop = loop_stop_tx.subscribe();
        tasks.spawn(async move { (WORKER_LOOP, worker_loop.run(stop).await) });

        let mut first_error = None;
        tokio::select! {
            joined = tasks.join_next() => {
                if let Some(joined) = joined {
                    let (name, error) = Self::settle(joined);
                    first_error = error;
                    if Self::releases_connection(name) {
                        let _ = receive_stop_tx.send(());
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("收到关闭信号");
            }
        }

        let _ = loop_stop_tx.send(());
        self.drain(&mut tasks, &receive_stop_tx).await;

        match first_error {
            Some(e) => {
                error!("Worker服务异常终止: {}", e);
                Err(e)
            }
            None => {
                info!("Worker服务已停止");
                Ok(())
            }
        }
    }

    async fn drain(&self, tasks: &mut JoinSet<TaskExit>, receive_stop_tx: &broadcast::Sender<()>) {
        let grace = self.config.worker.shutdown_timeout();
        let drained = timeout(grace, async {
            while let Some(joined) = tasks.join_next().await {
                let (name, error) = Self::settle(joined);
                if let Some(e) = error {
                    debug!("Task error while shutting down: {}", e);
                }
                if Self::releases_connection(name) {
                    let _ = receive_stop_tx.send(());
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                "Tasks still running after {}s, aborting",
                grace.as_secs()
            );
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }
    }

    /// 工作循环结束后不会再有出站帧, 接收任务可以停止
    fn releases_connection(name: Option<&'static str>) -> bool {
        !matches!(name, Some(SEND_TASK) | Some(RECEIVE_TASK))
    }

    fn settle(joined: Result<TaskExit, JoinError>) -> (Option<&'static str>, Option<SurgeError>) {
        match joined {
            Ok((name, Ok(()))) => {
                info!("{} task finished", name);
                (Some(name), None)
            }
            Ok((name, Err(e))) => {
                warn!("{} task failed: {}", name, e);
                (Some(name), Some(e))
            }
            Err(e) => (None, Some(SurgeError::Internal(format!("task panicked: {e}")))),
        }
    }
}
