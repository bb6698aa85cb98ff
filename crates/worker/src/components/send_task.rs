use std::time::Duration;

use futures::{Sink, SinkExt};
use surge_domain::OutboundFrame;
use surge_errors::{SurgeError, SurgeResult};
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

/// 连接上唯一的写入者: 工作循环的出站帧和周期性的心跳 ping, 每次写入共用同一个超时。
///
/// 没有单独的停止信号: 工作循环退出后发件箱关闭, 已排队的帧全部写出后才关闭连接,
/// 关闭前完成的任务结果不会丢失。
pub struct SendTask<S> {
    writer: S,
    outbox: mpsc::Receiver<OutboundFrame>,
    ping_interval: Duration,
    write_timeout: Duration,
}

impl<S> SendTask<S>
where
    S: Sink<Message, Error = WsError> + Unpin + Send,
{
    pub fn new(
        writer: S,
        outbox: mpsc::Receiver<OutboundFrame>,
        ping_interval: Duration,
        write_timeout: Duration,
    ) -> Self {
        Self {
            writer,
            outbox,
            ping_interval,
            write_timeout,
        }
    }

    pub async fn run(mut self) -> SurgeResult<()> {
        let mut keepalive = interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                frame = self.outbox.recv() => {
                    let Some(frame) = frame else {
                        info!("Outbox closed, closing connection");
                        self.close().await;
                        return Ok(());
                    };
                    debug!("Sending {}", frame);
                    self.write(Message::Text(frame.encode())).await?;
                    keepalive.reset();
                }
                _ = keepalive.tick() => {
                    debug!("Sending keepalive ping");
                    self.write(Message::Ping(Vec::new())).await?;
                }
            }
        }
    }

    async fn write(&mut self, message: Message) -> SurgeResult<()> {
        match timeout(self.write_timeout, self.writer.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SurgeError::Connection(format!("write failed: {e}"))),
            Err(_) => Err(SurgeError::Timeout(format!(
                "write not completed within {}s",
                self.write_timeout.as_secs()
            ))),
        }
    }

    async fn close(&mut self) {
        match timeout(self.write_timeout, self.writer.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Closing connection failed: {}", e),
            Err(_) => warn!("Closing connection timed out"),
        }
    }
}
