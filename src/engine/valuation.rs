// ==========================================
// 跨境报价系统 - 完税价格基准选择器
// ==========================================
// 方法: PRODUCT_VALUE / MINIMUM_VALUATION / HIGHER_OF_BOTH / AUTO
// 关税: resolved_base × rate / 100，保留 2 位小数（四舍五入 half-up）
// 红线: 负的商品价值是输入校验失败，不做静默截断
// 红线: MINIMUM_VALUATION 缺少最低估价 → 回退商品价值并记录原因
// ==========================================

use crate::domain::types::{BasisSource, ValuationMethod};
use crate::domain::valuation::ValuationBasis;
use crate::engine::error::{EngineError, EngineResult};
use tracing::{instrument, warn};

/// 货币金额四舍五入（half-up，2 位小数）
///
/// 先在 1e-6 精度上吸收二进制浮点误差，避免 1.005 → 1.00 这类偏差
pub fn round_currency(value: f64) -> f64 {
    let cents = (value * 100.0 * 1e6).round() / 1e6;
    cents.round() / 100.0
}

/// 关税金额
pub fn duty_amount(resolved_base: f64, tariff_rate_percent: f64) -> f64 {
    round_currency(resolved_base * tariff_rate_percent / 100.0)
}

// ==========================================
// ValuationSelector - 完税价格基准选择器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ValuationSelector;

impl ValuationSelector {
    pub fn new() -> Self {
        Self
    }

    /// 选择完税价格基准并计算关税
    ///
    /// # 参数
    /// - `product_value`: 商品申报价值（≥ 0）
    /// - `minimum_valuation`: 官方最低估价（可选，≥ 0）
    /// - `method`: 完税价格方法
    /// - `tariff_rate_percent`: 税率（%，0 ~ 100）
    #[instrument(skip(self))]
    pub fn select_basis(
        &self,
        product_value: f64,
        minimum_valuation: Option<f64>,
        method: ValuationMethod,
        tariff_rate_percent: f64,
    ) -> EngineResult<ValuationBasis> {
        validate_inputs(product_value, minimum_valuation, tariff_rate_percent)?;

        let (resolved_base, basis_source, fallback_applied, rationale) = match method {
            ValuationMethod::ProductValue => (
                product_value,
                BasisSource::ProductValue,
                false,
                format!("PRODUCT_VALUE: base=product_value={}", product_value),
            ),
            ValuationMethod::MinimumValuation => match minimum_valuation {
                Some(min) => (
                    min,
                    BasisSource::MinimumValuation,
                    false,
                    format!("MINIMUM_VALUATION: base=minimum_valuation={}", min),
                ),
                None => {
                    warn!(
                        product_value = product_value,
                        "选择了最低估价方法但无最低估价，回退到商品价值"
                    );
                    (
                        product_value,
                        BasisSource::ProductValue,
                        true,
                        format!(
                            "MINIMUM_VALUATION_FALLBACK: minimum_valuation absent, base=product_value={}",
                            product_value
                        ),
                    )
                }
            },
            ValuationMethod::HigherOfBoth | ValuationMethod::Auto => {
                let label = method.to_db_str();
                match minimum_valuation {
                    Some(min) if min > product_value => (
                        min,
                        BasisSource::MinimumValuation,
                        false,
                        format!(
                            "{}: minimum_valuation={} > product_value={}, base={}",
                            label, min, product_value, min
                        ),
                    ),
                    Some(min) => (
                        product_value,
                        BasisSource::ProductValue,
                        false,
                        format!(
                            "{}: product_value={} >= minimum_valuation={}, base={}",
                            label, product_value, min, product_value
                        ),
                    ),
                    None => (
                        product_value,
                        BasisSource::ProductValue,
                        false,
                        format!(
                            "{}: minimum_valuation absent, base=product_value={}",
                            label, product_value
                        ),
                    ),
                }
            }
        };

        let duty = duty_amount(resolved_base, tariff_rate_percent);
        let rationale = format!("{}; duty={}×{}%={}", rationale, resolved_base, tariff_rate_percent, duty);

        Ok(ValuationBasis {
            method,
            product_value,
            minimum_valuation,
            resolved_base,
            basis_source,
            duty_rate_percent: tariff_rate_percent,
            duty_amount: duty,
            fallback_applied,
            rationale,
        })
    }
}

fn validate_inputs(
    product_value: f64,
    minimum_valuation: Option<f64>,
    tariff_rate_percent: f64,
) -> EngineResult<()> {
    if !product_value.is_finite() || product_value < 0.0 {
        return Err(EngineError::invalid_input(
            "product_value",
            format!("商品价值必须为非负数: {}", product_value),
        ));
    }
    if let Some(min) = minimum_valuation {
        if !min.is_finite() || min < 0.0 {
            return Err(EngineError::invalid_input(
                "minimum_valuation",
                format!("最低估价必须为非负数: {}", min),
            ));
        }
    }
    if !tariff_rate_percent.is_finite() || !(0.0..=100.0).contains(&tariff_rate_percent) {
        return Err(EngineError::invalid_input(
            "tariff_rate_percent",
            format!("税率超出 [0, 100]: {}", tariff_rate_percent),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_currency_half_up() {
        assert_eq!(round_currency(1.005), 1.01);
        assert_eq!(round_currency(2.675), 2.68);
        assert_eq!(round_currency(1.004), 1.0);
        assert_eq!(round_currency(0.0), 0.0);
    }

    #[test]
    fn test_product_value_method() {
        let b = ValuationSelector::new()
            .select_basis(100.0, Some(150.0), ValuationMethod::ProductValue, 20.0)
            .unwrap();
        assert_eq!(b.resolved_base, 100.0);
        assert_eq!(b.duty_amount, 20.0);
        assert_eq!(b.basis_source, BasisSource::ProductValue);
    }

    #[test]
    fn test_minimum_valuation_method() {
        let b = ValuationSelector::new()
            .select_basis(100.0, Some(150.0), ValuationMethod::MinimumValuation, 20.0)
            .unwrap();
        assert_eq!(b.resolved_base, 150.0);
        assert_eq!(b.duty_amount, 30.0);
        assert!(!b.fallback_applied);
    }

    #[test]
    fn test_minimum_valuation_absent_falls_back() {
        let b = ValuationSelector::new()
            .select_basis(1200.0, None, ValuationMethod::MinimumValuation, 20.0)
            .unwrap();
        assert_eq!(b.resolved_base, 1200.0);
        assert!(b.fallback_applied);
        assert!(b.rationale.contains("FALLBACK"));
        assert_eq!(b.duty_amount, 240.0);
    }

    #[test]
    fn test_higher_of_both_and_auto() {
        let selector = ValuationSelector::new();
        for method in [ValuationMethod::HigherOfBoth, ValuationMethod::Auto] {
            let b = selector.select_basis(100.0, Some(150.0), method, 10.0).unwrap();
            assert_eq!(b.resolved_base, 150.0);
            assert!(b.resolved_base >= b.product_value);

            let b = selector.select_basis(200.0, Some(150.0), method, 10.0).unwrap();
            assert_eq!(b.resolved_base, 200.0);

            let b = selector.select_basis(200.0, None, method, 10.0).unwrap();
            assert_eq!(b.resolved_base, 200.0);
            assert!(!b.fallback_applied);
        }
    }

    #[test]
    fn test_duty_scales_linearly() {
        let selector = ValuationSelector::new();
        for base in [10.0, 99.5, 1200.0, 3333.25] {
            let single = selector
                .select_basis(base, None, ValuationMethod::ProductValue, 20.0)
                .unwrap();
            let double = selector
                .select_basis(base * 2.0, None, ValuationMethod::ProductValue, 20.0)
                .unwrap();
            assert_eq!(double.duty_amount, single.duty_amount * 2.0);
        }
    }

    #[test]
    fn test_negative_product_value_rejected() {
        let r = ValuationSelector::new().select_basis(-1.0, None, ValuationMethod::Auto, 20.0);
        assert!(matches!(r, Err(EngineError::InvalidInput { ref field, .. }) if field == "product_value"));
    }

    #[test]
    fn test_rate_out_of_range_rejected() {
        let r = ValuationSelector::new().select_basis(10.0, None, ValuationMethod::Auto, 120.0);
        assert!(r.is_err());
    }
}
