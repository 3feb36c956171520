// ==========================================
// 跨境报价系统 - 领域类型定义
// ==========================================
// 职责: 重量来源 / 完税价格方法 / 尺寸单位 等枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与 config_kv / JSON 输出一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 重量来源 (Weight Source)
// ==========================================
// 红线: 人工输入永远胜出；无人工时官方税则数据权威
// 顺序: Tariff > Pattern > Volumetric（同置信度时的裁决优先级）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeightSource {
    Tariff,     // 官方 HSN/税则重量表
    Pattern,    // 商品名规则估算
    Volumetric, // 包裹体积重
    Manual,     // 人工录入
}

impl fmt::Display for WeightSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl WeightSource {
    /// 同置信度裁决优先级（数值越大越优先）
    ///
    /// Manual 不参与置信度比较，但给出最高值以保证排序稳定
    pub fn priority(&self) -> u8 {
        match self {
            WeightSource::Manual => 4,
            WeightSource::Tariff => 3,
            WeightSource::Pattern => 2,
            WeightSource::Volumetric => 1,
        }
    }

    /// 从字符串解析重量来源
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TARIFF" => Some(WeightSource::Tariff),
            "PATTERN" => Some(WeightSource::Pattern),
            "VOLUMETRIC" => Some(WeightSource::Volumetric),
            "MANUAL" => Some(WeightSource::Manual),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            WeightSource::Tariff => "TARIFF",
            WeightSource::Pattern => "PATTERN",
            WeightSource::Volumetric => "VOLUMETRIC",
            WeightSource::Manual => "MANUAL",
        }
    }
}

// ==========================================
// 完税价格方法 (Valuation Method)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValuationMethod {
    ProductValue,     // 按商品申报价值
    MinimumValuation, // 按官方最低估价
    HigherOfBoth,     // 取两者较高者
    Auto,             // 自动（当前等同 HigherOfBoth）
}

impl fmt::Display for ValuationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ValuationMethod {
    /// 从字符串解析完税价格方法
    ///
    /// 同时接受 snake_case（前端表单值）与 SCREAMING_SNAKE_CASE（配置值）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "PRODUCT_VALUE" => Some(ValuationMethod::ProductValue),
            "MINIMUM_VALUATION" => Some(ValuationMethod::MinimumValuation),
            "HIGHER_OF_BOTH" => Some(ValuationMethod::HigherOfBoth),
            "AUTO" => Some(ValuationMethod::Auto),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ValuationMethod::ProductValue => "PRODUCT_VALUE",
            ValuationMethod::MinimumValuation => "MINIMUM_VALUATION",
            ValuationMethod::HigherOfBoth => "HIGHER_OF_BOTH",
            ValuationMethod::Auto => "AUTO",
        }
    }
}

// ==========================================
// 完税价格取值来源 (Basis Source)
// ==========================================
// 用途: 记录最终 resolved_base 取自哪个数字（审计/前端展示）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BasisSource {
    ProductValue,
    MinimumValuation,
}

impl fmt::Display for BasisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasisSource::ProductValue => write!(f, "PRODUCT_VALUE"),
            BasisSource::MinimumValuation => write!(f, "MINIMUM_VALUATION"),
        }
    }
}

// ==========================================
// 尺寸单位 (Dimension Unit)
// ==========================================
// 体积重统一换算到厘米计算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DimensionUnit {
    Mm,
    Cm,
    M,
    Inch,
}

impl fmt::Display for DimensionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionUnit::Mm => write!(f, "mm"),
            DimensionUnit::Cm => write!(f, "cm"),
            DimensionUnit::M => write!(f, "m"),
            DimensionUnit::Inch => write!(f, "in"),
        }
    }
}

impl DimensionUnit {
    /// 换算到厘米的系数
    pub fn to_cm_factor(&self) -> f64 {
        match self {
            DimensionUnit::Mm => 0.1,
            DimensionUnit::Cm => 1.0,
            DimensionUnit::M => 100.0,
            DimensionUnit::Inch => 2.54,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mm" => Some(DimensionUnit::Mm),
            "cm" => Some(DimensionUnit::Cm),
            "m" => Some(DimensionUnit::M),
            "in" | "inch" | "inches" => Some(DimensionUnit::Inch),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_source_priority_order() {
        assert!(WeightSource::Tariff.priority() > WeightSource::Pattern.priority());
        assert!(WeightSource::Pattern.priority() > WeightSource::Volumetric.priority());
    }

    #[test]
    fn test_valuation_method_accepts_form_values() {
        assert_eq!(
            ValuationMethod::from_str("minimum_valuation"),
            Some(ValuationMethod::MinimumValuation)
        );
        assert_eq!(
            ValuationMethod::from_str("higher-of-both"),
            Some(ValuationMethod::HigherOfBoth)
        );
        assert_eq!(ValuationMethod::from_str("AUTO"), Some(ValuationMethod::Auto));
        assert_eq!(ValuationMethod::from_str("cheapest"), None);
    }

    #[test]
    fn test_valuation_method_serde_format() {
        let json = serde_json::to_string(&ValuationMethod::HigherOfBoth).unwrap();
        assert_eq!(json, "\"HIGHER_OF_BOTH\"");
    }

    #[test]
    fn test_dimension_unit_factor() {
        assert_eq!(DimensionUnit::Inch.to_cm_factor(), 2.54);
        assert_eq!(DimensionUnit::from_str("IN"), Some(DimensionUnit::Inch));
    }
}
