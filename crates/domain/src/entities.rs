use serde::{Deserialize, Serialize};
use surge_errors::{SurgeError, SurgeResult};

use crate::value_objects::{AnalysisMode, ProtectionLevel, Scenario, TideLevel, UNSET_CODE};

/// 队列在 `DATA:` 前缀之后发送的任务负载
///
/// 旧版队列把任务 ID 放在 `string` 键下。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobPayload {
    #[serde(alias = "string")]
    pub id: String,
    pub folder: String,
    pub slr: f64,
    pub protection: i32,
    pub tide: i32,
    pub analysis: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    /// 直接使用目录中已有的 `input_params.json`
    PrecomputedParameters { id: String, folder: String },
    /// 先生成路径, 再覆盖情景参数
    DerivedParameters {
        id: String,
        folder: String,
        scenario: Scenario,
    },
}

impl Job {
    pub fn precomputed<I: Into<String>, F: Into<String>>(id: I, folder: F) -> Self {
        Job::PrecomputedParameters {
            id: id.into(),
            folder: folder.into(),
        }
    }

    pub fn derived<I: Into<String>, F: Into<String>>(id: I, folder: F, scenario: Scenario) -> Self {
        Job::DerivedParameters {
            id: id.into(),
            folder: folder.into(),
            scenario,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Job::PrecomputedParameters { id, .. } | Job::DerivedParameters { id, .. } => id,
        }
    }

    pub fn folder(&self) -> &str {
        match self {
            Job::PrecomputedParameters { folder, .. } | Job::DerivedParameters { folder, .. } => {
                folder
            }
        }
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        match self {
            Job::PrecomputedParameters { .. } => None,
            Job::DerivedParameters { scenario, .. } => Some(scenario),
        }
    }

    pub fn is_precomputed(&self) -> bool {
        matches!(self, Job::PrecomputedParameters { .. })
    }

    /// 上传产物的名称后缀; 预计算任务不加后缀
    pub fn artifact_suffix(&self) -> Option<String> {
        self.scenario().map(Scenario::artifact_suffix)
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Job::PrecomputedParameters { .. } => "precomputed",
            Job::DerivedParameters { .. } => "derived",
        }
    }
}

impl TryFrom<JobPayload> for Job {
    type Error = SurgeError;

    fn try_from(payload: JobPayload) -> SurgeResult<Self> {
        if payload.tide == UNSET_CODE && payload.analysis == UNSET_CODE {
            return Ok(Job::PrecomputedParameters {
                id: payload.id,
                folder: payload.folder,
            });
        }

        if !payload.slr.is_finite() {
            return Err(SurgeError::protocol_error(format!(
                "invalid sea level rise: {}",
                payload.slr
            )));
        }

        let scenario = Scenario {
            sea_level_rise: payload.slr,
            tide: TideLevel::from_code(payload.tide)?,
            protection: ProtectionLevel::from_code(payload.protection)?,
            analysis: AnalysisMode::from_code(payload.analysis)?,
        };

        Ok(Job::DerivedParameters {
            id: payload.id,
            folder: payload.folder,
            scenario,
        })
    }
}

impl From<&Job> for JobPayload {
    fn from(job: &Job) -> Self {
        match job {
            Job::PrecomputedParameters { id, folder } => JobPayload {
                id: id.clone(),
                folder: folder.clone(),
                slr: 0.0,
                protection: 0,
                tide: UNSET_CODE,
                analysis: UNSET_CODE,
            },
            Job::DerivedParameters {
                id,
                folder,
                scenario,
            } => JobPayload {
                id: id.clone(),
                folder: folder.clone(),
                slr: scenario.sea_level_rise,
                protection: scenario.protection.code(),
                tide: scenario.tide_code(),
                analysis: scenario.analysis.map_or(UNSET_CODE, AnalysisMode::code),
            },
        }
    }
}
