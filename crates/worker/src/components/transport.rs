use surge_config::QueueConfig;
use surge_errors::{SurgeError, SurgeResult};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};
use url::Url;

pub type QueueStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 队列连接器: 先尝试 `wss://`, 失败后用相同的请求头重试一次 `ws://`, 不再重试
pub struct QueueConnector {
    config: QueueConfig,
}

impl QueueConnector {
    pub fn new(config: QueueConfig) -> Self {
        Self { config }
    }

    pub fn websocket_config(&self) -> WebSocketConfig {
        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(self.config.read_limit_bytes);
        ws_config.max_frame_size = Some(self.config.read_limit_bytes);
        ws_config
    }

    pub fn build_request(&self, url: &Url) -> SurgeResult<Request> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| SurgeError::config_error(format!("无效的队列地址 {url}: {e}")))?;

        if let Some(credentials) = self.config.authorization_header() {
            let value = HeaderValue::from_str(&credentials)
                .map_err(|e| SurgeError::config_error(format!("无效的认证信息: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Ok(request)
    }

    pub async fn connect(&self) -> SurgeResult<QueueStream> {
        // 可能链接了多个 TLS 后端, 固定进程级 provider
        let _ = rustls::crypto::ring::default_provider().install_default();

        let secure = self
            .config
            .endpoint_url()
            .map_err(|e| SurgeError::config_error(e.to_string()))?;
        let secure_err = match self.attempt(&secure).await {
            Ok(stream) => return Ok(stream),
            Err(e) => e,
        };
        warn!("Secure connection failed, retrying without TLS: {}", secure_err);

        let insecure = self
            .config
            .insecure_endpoint_url()
            .map_err(|e| SurgeError::config_error(e.to_string()))?;
        self.attempt(&insecure).await.map_err(|insecure_err| {
            SurgeError::Connection(format!(
                "{secure}: {secure_err}; {insecure}: {insecure_err}"
            ))
        })
    }

    async fn attempt(&self, url: &Url) -> SurgeResult<QueueStream> {
        info!("Connecting to {}", url);
        let request = self.build_request(url)?;
        let handshake = connect_async_with_config(request, Some(self.websocket_config()), false);

        match timeout(self.config.write_timeout(), handshake).await {
            Ok(Ok((stream, response))) => {
                info!("Connected to {} ({})", url, response.status());
                Ok(stream)
            }
            Ok(Err(e)) => Err(SurgeError::Connection(e.to_string())),
            Err(_) => Err(SurgeError::Timeout(format!("handshake with {url}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> QueueConfig {
        QueueConfig {
            server_hostname: "queue.example.org".to_string(),
            worker_id: "pod-7".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_websocket_config_limits_frames() {
        let ws_config = QueueConnector::new(config()).websocket_config();
        assert_eq!(ws_config.max_message_size, Some(2048));
        assert_eq!(ws_config.max_frame_size, Some(2048));
    }

    #[test]
    fn test_request_without_credentials() {
        let connector = QueueConnector::new(config());
        let url = config().endpoint_url().unwrap();
        let request = connector.build_request(&url).unwrap();

        assert_eq!(request.uri().to_string(), "wss://queue.example.org/queue?id=pod-7");
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_request_carries_basic_auth() {
        let config = QueueConfig {
            http_user: Some("surge".to_string()),
            http_pass: Some("secret".to_string()),
            ..config()
        };
        let connector = QueueConnector::new(config.clone());
        let request = connector
            .build_request(&config.insecure_endpoint_url().unwrap())
            .unwrap();

        assert_eq!(request.uri().scheme_str(), Some("ws"));
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Basic c3VyZ2U6c2VjcmV0"
        );
    }

    #[tokio::test]
    async fn test_both_attempts_failing_reports_both() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = QueueConfig {
            server_hostname: format!("127.0.0.1:{port}"),
            ..config()
        };
        let err = QueueConnector::new(config).connect().await.unwrap_err();

        assert!(matches!(err, SurgeError::Connection(_)));
        let message = err.to_string();
        assert!(message.contains("wss://"));
        assert!(message.contains("ws://"));
    }
}
