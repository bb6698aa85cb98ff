use std::path::{Path, PathBuf};
use std::sync::Arc;

use surge_config::CollaboratorConfig;
use surge_errors::SurgeResult;
use tracing::{info, warn};

use crate::executors::{CommandRunner, CommandSpec};

/// 任务调用的外部程序: 路径生成器, 模拟程序和结果转换器, 共用一个工作目录
pub struct Collaborators {
    runner: Arc<dyn CommandRunner>,
    config: CollaboratorConfig,
}

impl Collaborators {
    pub fn new(runner: Arc<dyn CommandRunner>, config: CollaboratorConfig) -> Self {
        Self { runner, config }
    }

    pub fn working_dir(&self) -> &Path {
        &self.config.working_dir
    }

    pub fn local_path(&self, file_name: &str) -> PathBuf {
        self.config.working_dir.join(file_name)
    }

    pub fn track_input_path(&self) -> PathBuf {
        self.local_path(&self.config.track_input_file)
    }

    pub fn track_generator_command(&self) -> CommandSpec {
        CommandSpec::new(&self.config.track_generator)
            .arg(&self.config.runtime_path)
            .current_dir(&self.config.working_dir)
    }

    pub fn simulation_command(&self) -> CommandSpec {
        CommandSpec::new(&self.config.simulation)
            .arg(&self.config.runtime_path)
            .current_dir(&self.config.working_dir)
    }

    pub fn converter_command(&self) -> CommandSpec {
        CommandSpec::new(&self.config.converter_program)
            .args(self.config.converter_args.iter().cloned())
            .current_dir(&self.config.working_dir)
    }

    /// 根据风暴路径生成 `input_params.json` 和 `cone.json`
    pub async fn generate_track(&self) -> SurgeResult<()> {
        info!("Generating Track");
        let spec = self.track_generator_command();
        self.runner.run(&spec).await?.into_result(&spec)?;
        Ok(())
    }

    pub async fn run_simulation(&self) -> SurgeResult<()> {
        info!("Executing Model");
        let spec = self.simulation_command();
        self.runner.run(&spec).await?.into_result(&spec)?;
        Ok(())
    }

    /// 把 KMZ 输出转换为 GeoJSON; 失败只影响可选的 GeoJSON 产物, 记录日志后忽略
    pub async fn convert_results(&self) {
        let spec = self.converter_command();
        let result = match self.runner.run(&spec).await {
            Ok(output) => output.into_result(&spec).map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("Result conversion failed, continuing: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::ProcessCommandRunner;

    fn collaborators() -> Collaborators {
        Collaborators::new(
            Arc::new(ProcessCommandRunner::new()),
            CollaboratorConfig::default(),
        )
    }

    #[test]
    fn test_default_commands() {
        let collaborators = collaborators();

        let track = collaborators.track_generator_command();
        assert_eq!(
            track.command_line(),
            "/app/run_ObtainingParametersCrossingPoint.sh /opt/matlab/runtime"
        );
        assert_eq!(track.working_dir, Some(PathBuf::from("/app")));

        assert_eq!(
            collaborators.simulation_command().command_line(),
            "/app/run_WebCentralAnalysis.sh /opt/matlab/runtime"
        );
        assert_eq!(
            collaborators.converter_command().command_line(),
            "node /root/convert.js"
        );
    }

    #[test]
    fn test_local_paths() {
        let collaborators = collaborators();
        assert_eq!(
            collaborators.local_path("heatmap.json"),
            PathBuf::from("/app/heatmap.json")
        );
        assert_eq!(
            collaborators.track_input_path(),
            PathBuf::from("/app/sandy.geojson")
        );
    }
}
