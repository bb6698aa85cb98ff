use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    logging::ObservabilityConfig,
    queue::QueueConfig,
    storage::{CollaboratorConfig, StorageConfig},
    worker::WorkerConfig,
};
use crate::validation::ConfigValidator;

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/surge.toml",
    "surge.toml",
    "/etc/surge/worker.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub storage: StorageConfig,
    pub collaborators: CollaboratorConfig,
    pub observability: ObservabilityConfig,
}

/// 容器部署一直提供的无前缀环境变量
#[derive(Debug, Clone, Default)]
pub struct LegacyEnv {
    pub server_hostname: Option<String>,
    pub pod_name: Option<String>,
    pub http_user: Option<String>,
    pub http_pass: Option<String>,
}

impl LegacyEnv {
    pub fn from_process() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        }

        Self {
            server_hostname: var("SERVER_HOSTNAME"),
            pod_name: var("POD_NAME"),
            http_user: var("HTTP_USER"),
            http_pass: var("HTTP_PASS"),
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_with(config_path, &LegacyEnv::from_process())
    }

    /// 默认值 → TOML 文件 → `SURGE_*` 环境变量 → 旧版环境变量
    pub fn load_with(config_path: Option<&str>, legacy: &LegacyEnv) -> Result<Self> {
        let mut builder = ConfigBuilder::builder().add_source(
            ConfigBuilder::try_from(&AppConfig::default()).context("构建默认配置失败")?,
        );

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder
            .add_source(
                Environment::with_prefix("SURGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("queue.server_hostname", legacy.server_hostname.clone())?
            .set_override_option("queue.worker_id", legacy.pod_name.clone())?
            .set_override_option("queue.http_user", legacy.http_user.clone())?
            .set_override_option("queue.http_pass", legacy.http_pass.clone())?;

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.queue.validate()?;
        self.worker.validate()?;
        self.storage.validate()?;
        self.collaborators.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.queue.read_limit_bytes, 2048);
        assert_eq!(config.queue.ping_interval_seconds, 30);
        assert_eq!(config.worker.poll_interval_ms, 5000);
        assert_eq!(config.storage.bucket, "simulation.njcoast.us");
    }

    #[test]
    fn test_default_config_needs_a_host() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_app_config_from_toml() {
        let toml_str = r#"
[queue]
server_hostname = "queue.example.org"
worker_id = "surge-worker-0"

[worker]
poll_interval_ms = 250

[observability]
log_level = "debug"
log_format = "json"
"#;

        let config = AppConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.queue.server_hostname, "queue.example.org");
        assert_eq!(config.queue.worker_id, "surge-worker-0");
        assert_eq!(config.queue.read_timeout_seconds, 60);
        assert_eq!(config.worker.poll_interval_ms, 250);
        assert_eq!(config.observability.log_level, super::super::LogLevel::Debug);
        assert_eq!(config.collaborators.runtime_path, "/opt/matlab/runtime");
    }

    #[test]
    fn test_app_config_toml_round_trip_keeps_host() {
        let mut config = AppConfig::default();
        config.queue.server_hostname = "queue.example.org".to_string();
        let toml_str = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.queue.server_hostname, "queue.example.org");
    }
}
