// ==========================================
// 跨境报价系统 - 体积重计算器
// ==========================================
// 公式: 体积(cm³) = 长 × 宽 × 高；体积重 = 体积 / 承运商除数
// 红线: 任一边 ≤ 0 直接拒绝（InvalidInput）
// 说明: 体积重是运费代理值，不是商品质量事实，置信度固定偏低
// ==========================================

use crate::domain::product::PackageDimensions;
use crate::domain::types::WeightSource;
use crate::domain::weight::WeightCandidate;
use crate::engine::error::{EngineError, EngineResult};

/// 常见快递除数（cm³/kg）
pub const DEFAULT_CARRIER_DIVISOR: f64 = 5000.0;
/// 体积重候选的固定置信度
pub const DEFAULT_VOLUMETRIC_CONFIDENCE: f64 = 0.3;

// ==========================================
// VolumetricCalculator - 体积重计算器
// ==========================================
#[derive(Debug, Clone)]
pub struct VolumetricCalculator {
    confidence: f64,
}

impl VolumetricCalculator {
    pub fn new(confidence: f64) -> Self {
        Self {
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// 计算体积重候选
    ///
    /// # 参数
    /// - `dimensions`: 包裹尺寸（任意单位，内部换算为 cm）
    /// - `carrier_divisor`: 承运商除数（> 0）
    pub fn compute(
        &self,
        dimensions: &PackageDimensions,
        carrier_divisor: f64,
    ) -> EngineResult<WeightCandidate> {
        dimensions.validate()?;

        if !carrier_divisor.is_finite() || carrier_divisor <= 0.0 {
            return Err(EngineError::invalid_input(
                "carrier_divisor",
                format!("承运商除数必须为正数: {}", carrier_divisor),
            ));
        }

        let (l, w, h) = dimensions.to_cm();
        let volume_cm3 = l * w * h;
        let weight_kg = round3(volume_cm3 / carrier_divisor);

        // 极小包裹四舍五入后可能为 0，保留原值以满足候选 > 0 约束
        let weight_kg = if weight_kg > 0.0 {
            weight_kg
        } else {
            volume_cm3 / carrier_divisor
        };

        let rationale = format!(
            "VOLUMETRIC: {}×{}×{}{} → {}cm³ / {} = {}kg",
            dimensions.length,
            dimensions.width,
            dimensions.height,
            dimensions.unit,
            round3(volume_cm3),
            carrier_divisor,
            weight_kg
        );

        WeightCandidate::new(WeightSource::Volumetric, weight_kg, self.confidence, rationale)
    }
}

impl Default for VolumetricCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUMETRIC_CONFIDENCE)
    }
}

/// 计费重：实际重量与体积重取大
pub fn chargeable_weight(actual_kg: f64, volumetric_kg: Option<f64>) -> f64 {
    match volumetric_kg {
        Some(v) if v > actual_kg => v,
        _ => actual_kg,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
