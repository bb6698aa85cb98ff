use serde::{Deserialize, Serialize};
use surge_errors::SurgeResult;

use crate::value_objects::Scenario;

/// 会生成断面线的风暴的 `indicator` 值
pub const TRANSECT_STORM_TYPE: i64 = 1;

/// 模拟程序的磁盘输入 (`input_params.json`)
///
/// 只修改情景字段; 未知键原样保留, 读取-修改-写回之后文档内容不丢失。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimulationParameters {
    #[serde(rename = "index_SLT")]
    pub storm_index: [i64; 2],
    #[serde(rename = "index_W")]
    pub wind_index: i64,
    pub index_prob: f64,
    #[serde(rename = "param")]
    pub coefficients: [f64; 6],
    #[serde(rename = "timeMC")]
    pub time_to_landfall: f64,
    #[serde(rename = "lat_track")]
    pub latitude: Vec<f64>,
    #[serde(rename = "long_track")]
    pub longitude: Vec<f64>,
    #[serde(rename = "SLR")]
    pub sea_level_rise: f64,
    pub tide: f64,
    pub protection: i32,
    #[serde(rename = "ne_strength")]
    pub strength: i64,
    #[serde(rename = "indicator")]
    pub storm_type: i64,
    pub surge_file: String,
    pub wind_file: String,
    pub runup_file: String,
    pub workspace_file: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SimulationParameters {
    pub fn from_slice(bytes: &[u8]) -> SurgeResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// 紧凑 JSON, 末尾带换行
    pub fn to_vec(&self) -> SurgeResult<Vec<u8>> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// 覆盖海平面上升, 潮位, 防护等级; 设置了分析模式时同时覆盖概率索引
    pub fn apply_scenario(&mut self, scenario: &Scenario) {
        self.sea_level_rise = scenario.sea_level_rise;
        self.tide = 0.5 * f64::from(scenario.tide_code());
        self.protection = scenario.protection.code();
        if let Some(probability) = scenario.probability_index() {
            self.index_prob = probability;
        }
    }

    pub fn has_transect(&self) -> bool {
        self.storm_type == TRANSECT_STORM_TYPE
    }
}
