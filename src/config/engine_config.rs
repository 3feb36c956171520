// ==========================================
// 跨境报价系统 - 引擎配置
// ==========================================
// 来源: 默认值 ← config_kv 覆写（ConfigManager::load_engine_config）
// ==========================================

use crate::domain::types::ValuationMethod;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::resolution::DEFAULT_DISCREPANCY_THRESHOLD;
use crate::engine::volumetric::{DEFAULT_CARRIER_DIVISOR, DEFAULT_VOLUMETRIC_CONFIDENCE};
use serde::{Deserialize, Serialize};

/// 税则候选默认置信度
pub const DEFAULT_TARIFF_CONFIDENCE: f64 = 0.95;

/// 引擎配置（请求间共享，只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 偏差阈值（相对差）
    pub discrepancy_threshold: f64,
    /// 承运商体积重除数（cm³/kg）
    pub carrier_divisor: f64,
    /// 请求未指定时的完税价格方法
    pub default_valuation_method: ValuationMethod,
    /// 税则候选置信度
    pub tariff_confidence: f64,
    /// 体积重候选置信度
    pub volumetric_confidence: f64,
    /// 税则未命中时使用的税率（%）
    pub fallback_duty_rate_percent: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            discrepancy_threshold: DEFAULT_DISCREPANCY_THRESHOLD,
            carrier_divisor: DEFAULT_CARRIER_DIVISOR,
            default_valuation_method: ValuationMethod::Auto,
            tariff_confidence: DEFAULT_TARIFF_CONFIDENCE,
            volumetric_confidence: DEFAULT_VOLUMETRIC_CONFIDENCE,
            fallback_duty_rate_percent: 0.0,
        }
    }
}

impl EngineConfig {
    /// 配置校验
    pub fn validate(&self) -> EngineResult<()> {
        if !self.discrepancy_threshold.is_finite() || self.discrepancy_threshold < 0.0 {
            return Err(EngineError::invalid_input(
                "discrepancy_threshold",
                format!("必须为非负数: {}", self.discrepancy_threshold),
            ));
        }
        if !self.carrier_divisor.is_finite() || self.carrier_divisor <= 0.0 {
            return Err(EngineError::invalid_input(
                "carrier_divisor",
                format!("必须为正数: {}", self.carrier_divisor),
            ));
        }
        for (field, value) in [
            ("tariff_confidence", self.tariff_confidence),
            ("volumetric_confidence", self.volumetric_confidence),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(EngineError::invalid_input(
                    field,
                    format!("必须在 [0, 1]: {}", value),
                ));
            }
        }
        if !self.fallback_duty_rate_percent.is_finite()
            || !(0.0..=100.0).contains(&self.fallback_duty_rate_percent)
        {
            return Err(EngineError::invalid_input(
                "fallback_duty_rate_percent",
                format!("必须在 [0, 100]: {}", self.fallback_duty_rate_percent),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.discrepancy_threshold, 0.5);
        assert_eq!(config.carrier_divisor, 5000.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"carrier_divisor": 6000.0}"#).unwrap();
        assert_eq!(config.carrier_divisor, 6000.0);
        assert_eq!(config.default_valuation_method, ValuationMethod::Auto);
    }

    #[test]
    fn test_validate_rejects_confidence_above_one() {
        let config = EngineConfig {
            tariff_confidence: 1.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
