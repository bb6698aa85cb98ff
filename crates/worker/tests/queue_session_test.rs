use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use surge_config::AppConfig;
use surge_domain::Job;
use surge_errors::{SurgeError, SurgeResult};
use surge_worker::components::JobHandler;
use surge_worker::{JobOutcome, WorkerService};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex, Notify};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

struct RecordingHandler {
    handled: Mutex<Vec<String>>,
}

#[async_trait]
impl JobHandler for RecordingHandler {
    async fn handle(&self, job: &Job) -> SurgeResult<JobOutcome> {
        self.handled.lock().await.push(job.id().to_string());
        Ok(JobOutcome::Completed)
    }
}

// 任务开始后通知测试, 然后模拟一段耗时的计算
struct SlowHandler {
    started: Arc<Notify>,
    duration: Duration,
}

#[async_trait]
impl JobHandler for SlowHandler {
    async fn handle(&self, _job: &Job) -> SurgeResult<JobOutcome> {
        self.started.notify_one();
        tokio::time::sleep(self.duration).await;
        Ok(JobOutcome::Completed)
    }
}

fn config(port: u16) -> AppConfig {
    let mut config = AppConfig::default();
    config.queue.server_hostname = format!("127.0.0.1:{port}");
    config.queue.worker_id = "pod-7".to_string();
    config.queue.http_user = Some("surge".to_string());
    config.queue.http_pass = Some("secret".to_string());
    config.queue.write_timeout_seconds = 2;
    config.worker.poll_interval_ms = 20;
    config.worker.shutdown_timeout_seconds = 5;
    config
}

/// Plain `ws://` queue server. The worker's TLS attempt fails the HTTP
/// upgrade and is skipped; the first upgrade that succeeds is returned
/// together with the request line and auth header it carried.
async fn accept_plain(listener: &TcpListener) -> (WebSocketStream<TcpStream>, String, String) {
    loop {
        let (socket, _) = listener.accept().await.unwrap();
        let mut seen = (String::new(), String::new());
        let callback = |request: &Request, response: Response| {
            seen.0 = request.uri().to_string();
            seen.1 = request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Ok::<_, ErrorResponse>(response)
        };
        if let Ok(ws) = tokio_tungstenite::accept_hdr_async(socket, callback).await {
            return (ws, seen.0, seen.1);
        }
    }
}

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> Option<String> {
    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}

#[tokio::test]
async fn test_session_falls_back_and_serves_a_job() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (transcript_tx, mut transcript_rx) = mpsc::unbounded_channel::<String>();
    let server = tokio::spawn(async move {
        let (mut ws, uri, auth) = accept_plain(&listener).await;
        transcript_tx.send(format!("uri {uri}")).unwrap();
        transcript_tx.send(format!("auth {auth}")).unwrap();

        let mut served = false;
        while let Some(text) = next_text(&mut ws).await {
            let _ = transcript_tx.send(text.clone());
            if text == "GET:" {
                let reply = if served {
                    "DATA:".to_string()
                } else {
                    served = true;
                    r#"DATA:{"id":"job-42","folder":"users/1/sim","slr":0,"protection":0,"tide":-1,"analysis":-1}"#.to_string()
                };
                let _ = ws.send(Message::Text(reply)).await;
            }
        }
    });

    let handler = Arc::new(RecordingHandler {
        handled: Mutex::new(Vec::new()),
    });
    let service = WorkerService::with_handler(config(port), handler.clone());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let running = tokio::spawn(async move { service.run(shutdown_rx).await });

    let mut transcript = Vec::new();
    while !transcript.iter().any(|t: &String| t.starts_with("COMPLETE:")) {
        let line = timeout(Duration::from_secs(10), transcript_rx.recv())
            .await
            .unwrap()
            .unwrap();
        transcript.push(line);
    }

    shutdown_tx.send(()).unwrap();
    let result = timeout(Duration::from_secs(10), running).await.unwrap().unwrap();
    assert!(result.is_ok(), "{result:?}");
    let _ = timeout(Duration::from_secs(5), server).await;

    assert_eq!(transcript[0], "uri /queue?id=pod-7");
    assert_eq!(transcript[1], "auth Basic c3VyZ2U6c2VjcmV0");
    assert_eq!(&transcript[2..], ["GET:", "COMPLETE:job-42"]);
    assert_eq!(*handler.handled.lock().await, vec!["job-42".to_string()]);
}

#[tokio::test]
async fn test_shutdown_mid_job_still_reports_outcome() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut ws, _, _) = accept_plain(&listener).await;
        let mut frames = Vec::new();
        let mut served = false;
        while let Some(text) = next_text(&mut ws).await {
            frames.push(text.clone());
            if text == "GET:" {
                let reply = if served {
                    "DATA:".to_string()
                } else {
                    served = true;
                    r#"DATA:{"id":"job-42","folder":"users/1/sim","slr":0,"protection":0,"tide":-1,"analysis":-1}"#.to_string()
                };
                let _ = ws.send(Message::Text(reply)).await;
            }
        }
        frames
    });

    let started = Arc::new(Notify::new());
    let handler = Arc::new(SlowHandler {
        started: started.clone(),
        duration: Duration::from_millis(500),
    });
    let service = WorkerService::with_handler(config(port), handler);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let running = tokio::spawn(async move { service.run(shutdown_rx).await });

    timeout(Duration::from_secs(10), started.notified())
        .await
        .unwrap();
    shutdown_tx.send(()).unwrap();

    let result = timeout(Duration::from_secs(10), running).await.unwrap().unwrap();
    assert!(result.is_ok(), "{result:?}");

    // 连接关闭前结果已送达, 停止后不再请求新任务
    let frames = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert_eq!(frames, ["GET:", "COMPLETE:job-42"]);
}

#[tokio::test]
async fn test_unknown_frame_stops_the_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut ws, _, _) = accept_plain(&listener).await;
        ws.send(Message::Text("HELLO".to_string())).await.unwrap();
        while next_text(&mut ws).await.is_some() {}
    });

    let handler = Arc::new(RecordingHandler {
        handled: Mutex::new(Vec::new()),
    });
    let service = WorkerService::with_handler(config(port), handler);
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let err = timeout(Duration::from_secs(10), service.run(shutdown_rx))
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, SurgeError::Protocol(_)));
    let _ = timeout(Duration::from_secs(5), server).await;
}

#[tokio::test]
async fn test_unreachable_queue_is_fatal() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let handler = Arc::new(RecordingHandler {
        handled: Mutex::new(Vec::new()),
    });
    let service = WorkerService::with_handler(config(port), handler);
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let err = service.run(shutdown_rx).await.unwrap_err();
    assert!(matches!(err, SurgeError::Connection(_)));
}
