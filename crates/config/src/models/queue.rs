use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::{ConfigError, ConfigResult};

/// 任务队列端点的连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub server_hostname: String,
    pub worker_id: String,
    pub http_user: Option<String>,
    pub http_pass: Option<String>,
    pub path: String,
    pub read_limit_bytes: usize,
    pub read_timeout_seconds: u64,
    pub write_timeout_seconds: u64,
    pub ping_interval_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            server_hostname: String::new(),
            worker_id: default_worker_id(),
            http_user: None,
            http_pass: None,
            path: "/queue".to_string(),
            read_limit_bytes: 2048,
            read_timeout_seconds: 60,
            write_timeout_seconds: 10,
            ping_interval_seconds: 30,
        }
    }
}

/// 未设置 `POD_NAME` 时使用主机名作为 Worker 标识
fn default_worker_id() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "surge-worker".to_string())
}

impl QueueConfig {
    /// `wss://<host><path>?id=<worker-id>`
    pub fn endpoint_url(&self) -> ConfigResult<Url> {
        ValidationUtils::validate_host(&self.server_hostname, "queue.server_hostname")?;

        let mut url = Url::parse(&format!("wss://{}{}", self.server_hostname, self.path))?;
        if url.host_str().is_none() {
            return Err(ConfigError::Validation(format!(
                "queue.server_hostname has no host: {}",
                self.server_hostname
            )));
        }
        url.query_pairs_mut().append_pair("id", &self.worker_id);
        Ok(url)
    }

    /// 同一端点的明文 `ws://` 地址
    pub fn insecure_endpoint_url(&self) -> ConfigResult<Url> {
        let mut url = self.endpoint_url()?;
        url.set_scheme("ws").map_err(|_| {
            ConfigError::Configuration(format!("cannot downgrade scheme of {url}"))
        })?;
        Ok(url)
    }

    /// `Basic base64(user:pass)`, 仅在用户名和密码都设置时生成
    pub fn authorization_header(&self) -> Option<String> {
        match (self.http_user.as_deref(), self.http_pass.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{user}:{pass}"))
            )),
            _ => None,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_seconds)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }
}

impl ConfigValidator for QueueConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_host(&self.server_hostname, "queue.server_hostname")?;
        ValidationUtils::validate_not_empty(&self.worker_id, "queue.worker_id")?;
        if !self.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "queue.path must start with '/'".to_string(),
            ));
        }
        ValidationUtils::validate_count(self.read_limit_bytes, "queue.read_limit_bytes", 1 << 20)?;
        ValidationUtils::validate_timeout_seconds(
            self.read_timeout_seconds,
            "queue.read_timeout_seconds",
        )?;
        ValidationUtils::validate_timeout_seconds(
            self.write_timeout_seconds,
            "queue.write_timeout_seconds",
        )?;
        ValidationUtils::validate_timeout_seconds(
            self.ping_interval_seconds,
            "queue.ping_interval_seconds",
        )?;

        // 读超时到期前必须能收到 ping
        if self.ping_interval_seconds >= self.read_timeout_seconds {
            return Err(ConfigError::Validation(format!(
                "queue.ping_interval_seconds ({}) must be shorter than queue.read_timeout_seconds ({})",
                self.ping_interval_seconds, self.read_timeout_seconds
            )));
        }

        // 端点地址必须能解析
        self.endpoint_url()?;
        Ok(())
    }
}
