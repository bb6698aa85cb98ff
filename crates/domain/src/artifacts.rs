//! 与对象存储和外部程序交换的固定文件名

/// 模拟输入: 预计算任务从存储下载, 派生任务由路径生成器生成
pub const INPUT_PARAMS_FILE: &str = "input_params.json";
/// 派生任务的风暴路径输入, 存放在任务目录中
pub const TRACK_INPUT_OBJECT: &str = "input.geojson";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPolicy {
    /// 失败时停止 Worker
    Required,
    /// 失败时记录日志并忽略
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub local_file: &'static str,
    pub remote_stem: &'static str,
    pub remote_extension: &'static str,
    pub policy: UploadPolicy,
}

impl ArtifactSpec {
    const fn new(
        local_file: &'static str,
        remote_stem: &'static str,
        remote_extension: &'static str,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            local_file,
            remote_stem,
            remote_extension,
            policy,
        }
    }

    pub fn remote_name(&self, suffix: Option<&str>) -> String {
        format!(
            "{}{}{}",
            self.remote_stem,
            suffix.unwrap_or_default(),
            self.remote_extension
        )
    }

    pub fn is_required(&self) -> bool {
        self.policy == UploadPolicy::Required
    }
}

pub const INPUT_PARAMS_ARTIFACT: ArtifactSpec =
    ArtifactSpec::new(INPUT_PARAMS_FILE, "input_params", ".json", UploadPolicy::Required);
pub const CONE_ARTIFACT: ArtifactSpec =
    ArtifactSpec::new("cone.json", "cone", ".json", UploadPolicy::Required);

const HEATMAP: ArtifactSpec =
    ArtifactSpec::new("heatmap.json", "heatmap", ".json", UploadPolicy::Required);
const WIND_HEATMAP: ArtifactSpec =
    ArtifactSpec::new("wind_heatmap.json", "wind_heatmap", ".json", UploadPolicy::Required);
const WIND_GEOJSON: ArtifactSpec =
    ArtifactSpec::new("wind.geojson", "wind", ".geojson", UploadPolicy::BestEffort);
const SURGE_LINE: ArtifactSpec =
    ArtifactSpec::new("surge_line.json", "surge_line", ".json", UploadPolicy::Required);
const SURGE_GEOJSON: ArtifactSpec =
    ArtifactSpec::new("surge.geojson", "surge", ".geojson", UploadPolicy::BestEffort);
const TRACK_GEOJSON: ArtifactSpec =
    ArtifactSpec::new("track.json", "track", ".geojson", UploadPolicy::BestEffort);
const TRANSECT_LINE: ArtifactSpec =
    ArtifactSpec::new("transect_line.json", "transect_line", ".json", UploadPolicy::Required);

/// 派生任务在运行模拟之前上传的产物
pub fn parameter_artifacts() -> [ArtifactSpec; 2] {
    [INPUT_PARAMS_ARTIFACT, CONE_ARTIFACT]
}

/// 按上传顺序排列的模拟输出; 断面线只在参数标记为断面风暴时存在
pub fn result_artifacts(include_transect: bool) -> Vec<ArtifactSpec> {
    let mut artifacts = vec![
        HEATMAP,
        WIND_HEATMAP,
        WIND_GEOJSON,
        SURGE_LINE,
        SURGE_GEOJSON,
        TRACK_GEOJSON,
    ];
    if include_transect {
        artifacts.push(TRANSECT_LINE);
    }
    artifacts
}
