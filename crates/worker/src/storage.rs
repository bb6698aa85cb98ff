use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use surge_config::StorageConfig;
use surge_errors::{SurgeError, SurgeResult};
use tracing::{debug, info};

use crate::executors::{CommandRunner, CommandSpec};

/// 按目录组织的对象存储, 保存任务的输入和输出
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 下载 `<folder>/<name>` 到 `destination`
    async fn fetch(&self, folder: &str, name: &str, destination: &Path) -> SurgeResult<()>;

    /// 上传 `source` 为 `<folder>/<name>`, 覆盖已有对象
    async fn put(&self, source: &Path, folder: &str, name: &str) -> SurgeResult<()>;
}

/// 通过 `aws s3 cp` 实现的对象存储
pub struct AwsCliStore {
    runner: Arc<dyn CommandRunner>,
    config: StorageConfig,
}

impl AwsCliStore {
    pub fn new(runner: Arc<dyn CommandRunner>, config: StorageConfig) -> Self {
        Self { runner, config }
    }

    pub fn fetch_command(&self, uri: &str, destination: &Path) -> CommandSpec {
        CommandSpec::new(&self.config.cli_program)
            .args(["s3", "cp"])
            .arg(uri)
            .arg(destination.to_string_lossy())
    }

    pub fn put_command(&self, source: &Path, uri: &str) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.config.cli_program).args(["s3", "cp"]);
        if self.config.public_read {
            spec = spec.args(["--acl", "public-read"]);
        }
        spec.arg(source.to_string_lossy()).arg(uri)
    }

    async fn transfer(&self, spec: CommandSpec, key: &str) -> SurgeResult<()> {
        let output = self
            .runner
            .run(&spec)
            .await
            .map_err(|e| SurgeError::storage_error(key, e.to_string()))?;

        if !output.success {
            return Err(SurgeError::storage_error(
                key,
                format!(
                    "exit code {:?}: {}",
                    output.exit_code,
                    output.combined_output()
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for AwsCliStore {
    async fn fetch(&self, folder: &str, name: &str, destination: &Path) -> SurgeResult<()> {
        let uri = self.config.object_uri(folder, name);
        info!("Downloading {} to {}", uri, destination.display());
        self.transfer(self.fetch_command(&uri, destination), &uri)
            .await
    }

    async fn put(&self, source: &Path, folder: &str, name: &str) -> SurgeResult<()> {
        let uri = self.config.object_uri(folder, name);
        debug!("Uploading {} to {}", source.display(), uri);
        self.transfer(self.put_command(source, &uri), &uri).await
    }
}
