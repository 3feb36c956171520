// ==========================================
// 跨境报价系统 - 税则参考数据模型
// ==========================================
// 红线: 只读参考数据，按编码索引
// 用途: 导入层/仓储层写入快照，引擎层只读
// ==========================================

use crate::domain::types::WeightSource;
use crate::domain::weight::{WeightCandidate, WeightRange};
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

// ==========================================
// TariffEntry - 税则条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffEntry {
    pub code: String,                          // HSN/税则编码（规范化后仅数字）
    pub canonical_weight_min_kg: f64,          // 规范重量下限
    pub canonical_weight_max_kg: f64,          // 规范重量上限
    pub description: String,                   // 品目描述
    pub default_duty_rate_percent: f64,        // 默认关税税率（%）
    #[serde(default)]
    pub representative_weight_kg: Option<f64>, // 配置的代表重量（缺省取区间中点）
}

impl TariffEntry {
    pub fn new(
        code: &str,
        canonical_weight_min_kg: f64,
        canonical_weight_max_kg: f64,
        description: impl Into<String>,
        default_duty_rate_percent: f64,
    ) -> Self {
        Self {
            code: normalize_tariff_code(code),
            canonical_weight_min_kg,
            canonical_weight_max_kg,
            description: description.into(),
            default_duty_rate_percent,
            representative_weight_kg: None,
        }
    }

    pub fn with_representative_weight(self, weight_kg: f64) -> Self {
        Self {
            representative_weight_kg: Some(weight_kg),
            ..self
        }
    }

    pub fn weight_range(&self) -> WeightRange {
        WeightRange::new(self.canonical_weight_min_kg, self.canonical_weight_max_kg)
    }

    /// 代表重量：配置值优先，否则取区间中点
    pub fn representative_weight(&self) -> f64 {
        self.representative_weight_kg
            .unwrap_or_else(|| self.weight_range().midpoint())
    }

    /// 条目校验（导入与快照构建时执行）
    pub fn validate(&self) -> EngineResult<()> {
        if self.code.is_empty() {
            return Err(EngineError::invalid_input("code", "税则编码不能为空"));
        }
        if !self.canonical_weight_min_kg.is_finite() || self.canonical_weight_min_kg <= 0.0 {
            return Err(EngineError::invalid_input(
                "canonical_weight_min_kg",
                format!("code={} 重量下限必须为正数: {}", self.code, self.canonical_weight_min_kg),
            ));
        }
        if !self.canonical_weight_max_kg.is_finite()
            || self.canonical_weight_max_kg < self.canonical_weight_min_kg
        {
            return Err(EngineError::invalid_input(
                "canonical_weight_max_kg",
                format!(
                    "code={} 重量上限必须 ≥ 下限: [{}, {}]",
                    self.code, self.canonical_weight_min_kg, self.canonical_weight_max_kg
                ),
            ));
        }
        if !self.default_duty_rate_percent.is_finite()
            || !(0.0..=100.0).contains(&self.default_duty_rate_percent)
        {
            return Err(EngineError::invalid_input(
                "default_duty_rate_percent",
                format!("code={} 税率超出 [0, 100]: {}", self.code, self.default_duty_rate_percent),
            ));
        }
        if let Some(rep) = self.representative_weight_kg {
            if !self.weight_range().contains(rep) {
                return Err(EngineError::invalid_input(
                    "representative_weight_kg",
                    format!("code={} 代表重量 {} 不在规范区间内", self.code, rep),
                ));
            }
        }
        Ok(())
    }

    /// 生成税则来源的重量候选
    pub fn to_candidate(&self, confidence: f64) -> EngineResult<WeightCandidate> {
        let value = self.representative_weight();
        let basis = if self.representative_weight_kg.is_some() {
            "representative"
        } else {
            "range_midpoint"
        };
        let rationale = format!(
            "TARIFF: code={} ({}), range=[{}, {}]kg, {}={}kg",
            self.code,
            self.description,
            self.canonical_weight_min_kg,
            self.canonical_weight_max_kg,
            basis,
            value
        );
        Ok(WeightCandidate::new(WeightSource::Tariff, value, confidence, rationale)?
            .with_range(self.weight_range()))
    }
}

/// 规范化税则编码：去掉点号、空格等分隔符，仅保留数字
///
/// "8517.13.00" → "85171300"
pub fn normalize_tariff_code(code: &str) -> String {
    code.chars().filter(|c| c.is_ascii_digit()).collect()
}
