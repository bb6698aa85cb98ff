use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use surge_domain::{
    parameter_artifacts, result_artifacts, ArtifactSpec, Job, Scenario, SimulationParameters,
    INPUT_PARAMS_FILE, TRACK_INPUT_OBJECT,
};
use surge_errors::{SurgeError, SurgeResult};
use tracing::{debug, error, info, warn};

use crate::collaborators::Collaborators;
use crate::components::JobHandler;
use crate::storage::ObjectStore;

/// 任务的终态, 即上报给队列的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed { reason: String },
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed)
    }
}

/// 任务流水线: 为一个任务依次驱动外部程序
///
/// 路径生成器和模拟程序失败以 [`JobOutcome::Failed`] 结束任务;
/// 本地文件读写, 下载和必需上传失败返回 `Err`, Worker 随之停止。
pub struct JobPipeline {
    store: Arc<dyn ObjectStore>,
    collaborators: Collaborators,
}

impl JobPipeline {
    pub fn new(store: Arc<dyn ObjectStore>, collaborators: Collaborators) -> Self {
        Self {
            store,
            collaborators,
        }
    }

    pub async fn execute(&self, job: &Job) -> SurgeResult<JobOutcome> {
        let start = Instant::now();
        let suffix = job.artifact_suffix();

        self.remove_stale_results().await?;

        let prepared = match job {
            Job::PrecomputedParameters { folder, .. } => self.prepare_precomputed(folder).await,
            Job::DerivedParameters {
                folder, scenario, ..
            } => self.prepare_derived(folder, scenario).await,
        };
        let params = match prepared {
            Ok(params) => params,
            Err(e) => return Self::abandon(job, e),
        };

        if let Err(e) = self.collaborators.run_simulation().await {
            return Self::abandon(job, e);
        }

        self.collaborators.convert_results().await;

        info!("Upload Results");
        for artifact in result_artifacts(params.has_transect()) {
            self.upload(job.folder(), &artifact, suffix.as_deref())
                .await?;
        }

        info!(
            job_id = %job.id(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Job pipeline finished"
        );
        Ok(JobOutcome::Completed)
    }

    async fn prepare_precomputed(&self, folder: &str) -> SurgeResult<SimulationParameters> {
        info!("Downloading Input");
        let params_path = self.collaborators.local_path(INPUT_PARAMS_FILE);
        self.store
            .fetch(folder, INPUT_PARAMS_FILE, &params_path)
            .await?;

        read_parameters(&params_path).await
    }

    async fn prepare_derived(
        &self,
        folder: &str,
        scenario: &Scenario,
    ) -> SurgeResult<SimulationParameters> {
        info!("Downloading Input");
        self.store
            .fetch(
                folder,
                TRACK_INPUT_OBJECT,
                &self.collaborators.track_input_path(),
            )
            .await?;

        self.collaborators.generate_track().await?;

        info!("Updating Parameters");
        let params_path = self.collaborators.local_path(INPUT_PARAMS_FILE);
        let mut params = read_parameters(&params_path).await?;
        params.apply_scenario(scenario);
        write_parameters(&params_path, &params).await?;

        info!("Uploading Parameters");
        let suffix = scenario.artifact_suffix();
        for artifact in parameter_artifacts() {
            self.upload(folder, &artifact, Some(&suffix)).await?;
        }

        Ok(params)
    }

    /// 清理上一个任务留在工作目录中的结果, 避免以本任务的名字上传;
    /// 在路径生成器之前执行, 因为它自己也会写出其中一部分文件
    async fn remove_stale_results(&self) -> SurgeResult<()> {
        for artifact in result_artifacts(true) {
            let path = self.collaborators.local_path(artifact.local_file);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Removed stale result {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(SurgeError::io_error(path.display().to_string(), e)),
            }
        }
        Ok(())
    }

    async fn upload(
        &self,
        folder: &str,
        artifact: &ArtifactSpec,
        suffix: Option<&str>,
    ) -> SurgeResult<()> {
        let source = self.collaborators.local_path(artifact.local_file);
        let name = artifact.remote_name(suffix);

        match self.store.put(&source, folder, &name).await {
            Ok(()) => Ok(()),
            Err(e) if artifact.is_required() => {
                error!("Required upload of {} failed: {}", name, e);
                Err(e)
            }
            Err(e) => {
                warn!("Optional upload of {} failed, continuing: {}", name, e);
                Ok(())
            }
        }
    }

    fn abandon(job: &Job, err: SurgeError) -> SurgeResult<JobOutcome> {
        if err.is_fatal() {
            return Err(err);
        }
        warn!(job_id = %job.id(), "Job failed: {}", err);
        Ok(JobOutcome::Failed {
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl JobHandler for JobPipeline {
    async fn handle(&self, job: &Job) -> SurgeResult<JobOutcome> {
        self.execute(job).await
    }
}

async fn read_parameters(path: &Path) -> SurgeResult<SimulationParameters> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| SurgeError::io_error(path.display().to_string(), e))?;
    SimulationParameters::from_slice(&bytes)
}

async fn write_parameters(path: &Path, params: &SimulationParameters) -> SurgeResult<()> {
    tokio::fs::write(path, params.to_vec()?)
        .await
        .map_err(|e| SurgeError::io_error(path.display().to_string(), e))
}
