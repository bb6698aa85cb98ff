use std::time::Duration;

use futures::{Stream, StreamExt};
use surge_domain::InboundFrame;
use surge_errors::{SurgeError, SurgeResult};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use super::worker_state::WorkerState;

/// 把队列发来的一个文本帧应用到共享状态
pub async fn apply_inbound_frame(state: &WorkerState, text: &str) -> SurgeResult<()> {
    match InboundFrame::decode(text)? {
        InboundFrame::QueueEmpty => {
            debug!("Queue empty");
            state.queue_empty().await;
        }
        InboundFrame::Job(job) => {
            info!(
                job_id = %job.id(),
                folder = %job.folder(),
                mode = job.mode(),
                "Job received"
            );
            if let Some(previous) = state.job_received(job).await {
                warn!(job_id = %previous.id(), "Job replaced before it was executed");
            }
        }
    }
    Ok(())
}

/// 接收任务: 持续读帧直到连接结束, 任何帧 (包括控制帧) 都会刷新读超时
pub struct ReceiveTask<R> {
    reader: R,
    state: WorkerState,
    read_timeout: Duration,
}

impl<R> ReceiveTask<R>
where
    R: Stream<Item = Result<Message, WsError>> + Unpin + Send,
{
    pub fn new(reader: R, state: WorkerState, read_timeout: Duration) -> Self {
        Self {
            reader,
            state,
            read_timeout,
        }
    }

    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> SurgeResult<()> {
        loop {
            let next = tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Receive task shutting down");
                    return Ok(());
                }
                next = timeout(self.read_timeout, self.reader.next()) => next,
            };
            let next = next.map_err(|_| {
                SurgeError::Timeout(format!(
                    "no frame from queue within {}s",
                    self.read_timeout.as_secs()
                ))
            })?;

            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    return Err(SurgeError::Connection(format!("read failed: {e}")));
                }
                None => {
                    return Err(SurgeError::Connection("queue closed the stream".to_string()));
                }
            };

            match message {
                Message::Text(text) => apply_inbound_frame(&self.state, &text).await?,
                Message::Ping(_) => debug!("Ping from queue"),
                Message::Pong(_) => debug!("Pong from queue"),
                Message::Binary(data) => {
                    warn!("Ignoring {} byte binary frame", data.len());
                }
                Message::Close(frame) => {
                    return Err(SurgeError::Connection(format!(
                        "queue closed the connection: {frame:?}"
                    )));
                }
                Message::Frame(_) => {}
            }
        }
    }
}
