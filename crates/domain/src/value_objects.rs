use std::fmt;

use surge_errors::{SurgeError, SurgeResult};

/// 潮位和分析模式表示 "未设置" 的编码
pub const UNSET_CODE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TideLevel {
    Low,
    Zero,
    High,
}

impl TideLevel {
    /// 未设置时返回 `Ok(None)`
    pub fn from_code(code: i32) -> SurgeResult<Option<Self>> {
        match code {
            UNSET_CODE => Ok(None),
            0 => Ok(Some(TideLevel::Low)),
            1 => Ok(Some(TideLevel::Zero)),
            2 => Ok(Some(TideLevel::High)),
            other => Err(SurgeError::protocol_error(format!(
                "invalid tide code: {other}"
            ))),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            TideLevel::Low => 0,
            TideLevel::Zero => 1,
            TideLevel::High => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TideLevel::Low => "low",
            TideLevel::Zero => "zero",
            TideLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtectionLevel {
    #[default]
    None,
    Current,
    Degraded,
    Compromised,
}

impl ProtectionLevel {
    pub fn from_code(code: i32) -> SurgeResult<Self> {
        match code {
            0 => Ok(ProtectionLevel::None),
            1 => Ok(ProtectionLevel::Current),
            2 => Ok(ProtectionLevel::Degraded),
            3 => Ok(ProtectionLevel::Compromised),
            other => Err(SurgeError::protocol_error(format!(
                "invalid protection code: {other}"
            ))),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ProtectionLevel::None => 0,
            ProtectionLevel::Current => 1,
            ProtectionLevel::Degraded => 2,
            ProtectionLevel::Compromised => 3,
        }
    }

    /// 无防护情景没有防护标签, 返回 `None`
    pub fn label(self) -> Option<&'static str> {
        match self {
            ProtectionLevel::None => None,
            ProtectionLevel::Current => Some("current"),
            ProtectionLevel::Degraded => Some("degraded"),
            ProtectionLevel::Compromised => Some("compromised"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisMode {
    Deterministic,
    Expected,
    Extreme,
}

impl AnalysisMode {
    pub fn from_code(code: i32) -> SurgeResult<Option<Self>> {
        match code {
            UNSET_CODE => Ok(None),
            0 => Ok(Some(AnalysisMode::Deterministic)),
            1 => Ok(Some(AnalysisMode::Expected)),
            2 => Ok(Some(AnalysisMode::Extreme)),
            other => Err(SurgeError::protocol_error(format!(
                "invalid analysis code: {other}"
            ))),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            AnalysisMode::Deterministic => 0,
            AnalysisMode::Expected => 1,
            AnalysisMode::Extreme => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AnalysisMode::Deterministic => "deterministic",
            AnalysisMode::Expected => "expected",
            AnalysisMode::Extreme => "extreme",
        }
    }

    /// 写入模拟参数 `index_prob` 的值
    pub fn probability_index(self) -> f64 {
        match self {
            AnalysisMode::Deterministic => 0.0,
            AnalysisMode::Expected => 0.5,
            AnalysisMode::Extreme => 0.1,
        }
    }
}

/// 派生参数任务的情景值
///
/// 潮位和分析模式只有一个为未设置编码时, 任务仍按派生处理,
/// 缺失的部分不进入产物后缀, 也不覆盖参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenario {
    pub sea_level_rise: f64,
    pub tide: Option<TideLevel>,
    pub protection: ProtectionLevel,
    pub analysis: Option<AnalysisMode>,
}

impl Scenario {
    pub fn new(
        sea_level_rise: f64,
        tide: TideLevel,
        protection: ProtectionLevel,
        analysis: AnalysisMode,
    ) -> Self {
        Self {
            sea_level_rise,
            tide: Some(tide),
            protection,
            analysis: Some(analysis),
        }
    }

    pub fn tide_code(&self) -> i32 {
        self.tide.map_or(UNSET_CODE, TideLevel::code)
    }

    pub fn probability_index(&self) -> Option<f64> {
        self.analysis.map(AnalysisMode::probability_index)
    }

    /// 以十分之一为单位的海平面上升值, 用于产物名称
    pub fn sea_level_rise_tenths(&self) -> i64 {
        (self.sea_level_rise * 10.0).round() as i64
    }

    /// 产物名称后缀, 例如 `__slr_12__tide_high__analysis_expected__protection_degraded`
    ///
    /// 海平面上升值按四舍五入取十分之一 (2.3 → `__slr_23`)。旧版 Worker 直接截断
    /// (2.3 → `__slr_22`), 同一情景在两种 Worker 上产生的名称可能不同。
    pub fn artifact_suffix(&self) -> String {
        let mut suffix = format!("__slr_{}", self.sea_level_rise_tenths());
        if let Some(tide) = self.tide {
            suffix.push_str("__tide_");
            suffix.push_str(tide.label());
        }
        if let Some(analysis) = self.analysis {
            suffix.push_str("__analysis_");
            suffix.push_str(analysis.label());
        }
        if let Some(protection) = self.protection.label() {
            suffix.push_str("__protection_");
            suffix.push_str(protection);
        }
        suffix
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.artifact_suffix())
    }
}
