use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::ConfigResult;

/// 通过存储命令行工具 (`aws s3 cp`) 访问的对象存储
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub cli_program: String,
    pub bucket: String,
    pub public_read: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cli_program: "aws".to_string(),
            bucket: "simulation.njcoast.us".to_string(),
            public_read: true,
        }
    }
}

impl StorageConfig {
    /// `s3://<bucket>/<folder>/<name>`
    pub fn object_uri(&self, folder: &str, name: &str) -> String {
        format!(
            "s3://{}/{}/{}",
            self.bucket,
            folder.trim_matches('/'),
            name
        )
    }
}

impl ConfigValidator for StorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.cli_program, "storage.cli_program")?;
        ValidationUtils::validate_not_empty(&self.bucket, "storage.bucket")?;
        Ok(())
    }
}

/// 任务流水线调用的外部程序
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    pub working_dir: PathBuf,
    pub runtime_path: String,
    pub track_generator: String,
    pub simulation: String,
    pub converter_program: String,
    pub converter_args: Vec<String>,
    /// 下载的 `input.geojson` 在本地的文件名, 供路径生成器读取
    pub track_input_file: String,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("/app"),
            runtime_path: "/opt/matlab/runtime".to_string(),
            track_generator: "/app/run_ObtainingParametersCrossingPoint.sh".to_string(),
            simulation: "/app/run_WebCentralAnalysis.sh".to_string(),
            converter_program: "node".to_string(),
            converter_args: vec!["/root/convert.js".to_string()],
            track_input_file: "sandy.geojson".to_string(),
        }
    }
}

impl ConfigValidator for CollaboratorConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_not_empty(
            &self.working_dir.to_string_lossy(),
            "collaborators.working_dir",
        )?;
        ValidationUtils::validate_not_empty(&self.track_generator, "collaborators.track_generator")?;
        ValidationUtils::validate_not_empty(&self.simulation, "collaborators.simulation")?;
        ValidationUtils::validate_not_empty(
            &self.converter_program,
            "collaborators.converter_program",
        )?;
        ValidationUtils::validate_not_empty(
            &self.track_input_file,
            "collaborators.track_input_file",
        )?;
        Ok(())
    }
}
