// ==========================================
// 跨境报价系统 - 报价行编排器
// ==========================================
// 流程: 校验 → 税则查询 + 商品名估算 → 体积重 → 重量判定 → 完税价格
// 红线: 每行只取一次税则快照，整行使用同一张表
// 红线: 批量行之间互不影响，结果按输入顺序返回，每行独立 Result
// ==========================================

use crate::config::{EngineConfig, EngineConfigReader};
use crate::domain::product::ProductDescriptor;
use crate::domain::tariff::TariffEntry;
use crate::domain::types::{ValuationMethod, WeightSource};
use crate::domain::valuation::ValuationBasis;
use crate::domain::weight::{WeightCandidate, WeightDecision};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::pattern_estimator::{EstimateHints, PatternEstimator};
use crate::engine::pattern_rules::PatternRuleSet;
use crate::engine::resolution::ResolutionEngine;
use crate::engine::tariff_store::TariffReferenceStore;
use crate::engine::valuation::ValuationSelector;
use crate::engine::volumetric::{chargeable_weight, VolumetricCalculator};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, info, instrument};

// ==========================================
// QuoteRequest - 报价行请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub product: ProductDescriptor,
    #[serde(default)]
    pub carrier_divisor: Option<f64>, // 缺省取配置
    #[serde(default)]
    pub valuation_method: Option<ValuationMethod>, // 缺省取配置
    #[serde(default)]
    pub manual_weight_kg: Option<f64>, // 人工录入单件重量
}

impl QuoteRequest {
    pub fn new(product: ProductDescriptor) -> Self {
        Self {
            product,
            carrier_divisor: None,
            valuation_method: None,
            manual_weight_kg: None,
        }
    }

    pub fn with_carrier_divisor(self, divisor: f64) -> Self {
        Self {
            carrier_divisor: Some(divisor),
            ..self
        }
    }

    pub fn with_valuation_method(self, method: ValuationMethod) -> Self {
        Self {
            valuation_method: Some(method),
            ..self
        }
    }

    pub fn with_manual_weight(self, weight_kg: f64) -> Self {
        Self {
            manual_weight_kg: Some(weight_kg),
            ..self
        }
    }
}

// ==========================================
// QuoteLineResolution - 报价行结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLineResolution {
    pub weight: WeightDecision,
    pub valuation: ValuationBasis,
    pub unit_weight_kg: f64,       // 判定的单件重量
    pub total_weight_kg: f64,      // 单件重量 × 数量
    pub chargeable_weight_kg: f64, // max(判定重量, 体积重) × 数量
    pub tariff: Option<TariffEntry>,
}

// ==========================================
// QuoteLineResolver - 报价行编排器
// ==========================================
pub struct QuoteLineResolver {
    store: Arc<TariffReferenceStore>,
    estimator: PatternEstimator,
    volumetric: VolumetricCalculator,
    resolution: ResolutionEngine,
    valuation: ValuationSelector,
    config: EngineConfig,
}

impl QuoteLineResolver {
    /// 创建编排器
    ///
    /// # 参数
    /// - `store`: 税则参考库（共享，可被后台刷新）
    /// - `rules`: 商品名估算规则集
    /// - `config`: 引擎配置（创建时校验）
    pub fn new(
        store: Arc<TariffReferenceStore>,
        rules: PatternRuleSet,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            estimator: PatternEstimator::new(rules),
            volumetric: VolumetricCalculator::new(config.volumetric_confidence),
            resolution: ResolutionEngine::new(config.discrepancy_threshold)?,
            valuation: ValuationSelector::new(),
            config,
        })
    }

    /// 从配置读取器装配编排器（config_kv 覆写 + 可选自定义规则集）
    pub async fn from_config_reader<C>(
        store: Arc<TariffReferenceStore>,
        reader: &C,
    ) -> Result<Self, Box<dyn Error>>
    where
        C: EngineConfigReader + ?Sized,
    {
        let config = reader.load_engine_config().await?;
        let rules = reader
            .get_pattern_rules()
            .await?
            .unwrap_or_else(PatternRuleSet::builtin);
        Ok(Self::new(store, rules, config)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TariffReferenceStore> {
        &self.store
    }

    /// 收集单件重量候选（税则 / 商品名 / 体积重）
    pub fn collect_candidates(
        &self,
        request: &QuoteRequest,
        tariff: Option<&TariffEntry>,
    ) -> EngineResult<Vec<WeightCandidate>> {
        let product = &request.product;
        let mut candidates = Vec::with_capacity(3);

        if let Some(entry) = tariff {
            candidates.push(entry.to_candidate(self.config.tariff_confidence)?);
        }

        if let Some(candidate) = self
            .estimator
            .estimate(&product.name, &EstimateHints::from_descriptor(product))
        {
            candidates.push(candidate);
        }

        if let Some(dims) = &product.dimensions {
            let divisor = request.carrier_divisor.unwrap_or(self.config.carrier_divisor);
            candidates.push(self.volumetric.compute(dims, divisor)?);
        }

        Ok(candidates)
    }

    /// 判定单个报价行
    #[instrument(skip(self, request), fields(product = %request.product.name))]
    pub fn resolve_line(&self, request: &QuoteRequest) -> EngineResult<QuoteLineResolution> {
        let product = &request.product;
        product.validate()?;

        // 1. 税则查询（整行共用一个快照）
        let snapshot = self.store.snapshot();
        let tariff: Option<TariffEntry> = product
            .tariff_code
            .as_deref()
            .and_then(|code| snapshot.lookup(code))
            .cloned();
        if product.tariff_code.is_some() && tariff.is_none() {
            debug!(
                tariff_code = ?product.tariff_code,
                table_version = %snapshot.version(),
                "税则编码未命中"
            );
        }

        // 2. 候选 + 判定
        let candidates = self.collect_candidates(request, tariff.as_ref())?;
        let decision = self.resolution.resolve(candidates, request.manual_weight_kg)?;

        let quantity = product.quantity as f64;
        let unit_weight_kg = decision.selected_value_kg();
        let volumetric_kg = decision
            .candidate(WeightSource::Volumetric)
            .map(|c| c.value_kg);
        let chargeable_unit = chargeable_weight(unit_weight_kg, volumetric_kg);

        // 3. 完税价格（最低估价按单件给出，按数量放大）
        let method = request
            .valuation_method
            .unwrap_or(self.config.default_valuation_method);
        let rate = tariff
            .as_ref()
            .map(|t| t.default_duty_rate_percent)
            .unwrap_or(self.config.fallback_duty_rate_percent);
        let minimum = product.minimum_valuation.map(|m| m * quantity);

        let mut valuation = self
            .valuation
            .select_basis(product.line_value(), minimum, method, rate)?;
        if tariff.is_none() {
            valuation.rationale = format!(
                "{}; rate=fallback_duty_rate_percent={} (no tariff match)",
                valuation.rationale, rate
            );
        }

        debug!(
            selected_source = %decision.selected_source(),
            unit_weight_kg = unit_weight_kg,
            discrepancy = decision.discrepancy_flag,
            duty = valuation.duty_amount,
            "报价行判定完成"
        );

        Ok(QuoteLineResolution {
            unit_weight_kg,
            total_weight_kg: round3(unit_weight_kg * quantity),
            chargeable_weight_kg: round3(chargeable_unit * quantity),
            weight: decision,
            valuation,
            tariff,
        })
    }

    /// 批量判定（每行一个阻塞任务并发执行）
    ///
    /// # 返回
    /// - 与输入等长、同序的结果列表；单行失败不影响其他行
    pub async fn resolve_batch(
        self: Arc<Self>,
        requests: Vec<QuoteRequest>,
    ) -> Vec<EngineResult<QuoteLineResolution>> {
        info!(count = requests.len(), "开始批量判定报价行");

        let tasks = requests.into_iter().map(|request| {
            let resolver = Arc::clone(&self);
            async move {
                tokio::task::spawn_blocking(move || resolver.resolve_line(&request))
                    .await
                    .unwrap_or_else(|e| Err(EngineError::BatchTask(e.to_string())))
            }
        });

        let results = join_all(tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            flagged = results
                .iter()
                .filter(|r| matches!(r, Ok(line) if line.weight.discrepancy_flag))
                .count(),
            "批量判定完成"
        );

        results
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::PackageDimensions;

    fn resolver() -> QuoteLineResolver {
        QuoteLineResolver::new(
            Arc::new(TariffReferenceStore::with_builtin()),
            PatternRuleSet::builtin(),
            EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_iphone_resolves_to_tariff_midpoint() {
        let product = ProductDescriptor::new("Apple iPhone 15 Pro", 999.0).with_tariff_code("8517");
        let line = resolver().resolve_line(&QuoteRequest::new(product)).unwrap();

        assert_eq!(line.weight.selected_source(), WeightSource::Tariff);
        assert!((line.unit_weight_kg - 0.2).abs() < 1e-9);
        assert!(!line.weight.discrepancy_flag);
        assert!(line.weight.candidate(WeightSource::Pattern).is_some());
        assert_eq!(line.tariff.as_ref().map(|t| t.code.as_str()), Some("8517"));
    }

    #[test]
    fn test_unknown_code_uses_fallback_rate() {
        let product = ProductDescriptor::new("Leather sneakers", 100.0).with_tariff_code("0101");
        let line = resolver().resolve_line(&QuoteRequest::new(product)).unwrap();

        assert!(line.tariff.is_none());
        assert_eq!(line.weight.selected_source(), WeightSource::Pattern);
        assert_eq!(line.valuation.duty_rate_percent, 0.0);
        assert!(line.valuation.rationale.contains("no tariff match"));
    }

    #[test]
    fn test_quantity_scales_weight_and_minimum() {
        let product = ProductDescriptor::new("Cotton t-shirt", 5.0)
            .with_tariff_code("6109")
            .with_quantity(3)
            .with_minimum_valuation(8.0)
            .with_dimensions(PackageDimensions::cm(30.0, 20.0, 10.0));
        let request = QuoteRequest::new(product).with_valuation_method(ValuationMethod::HigherOfBoth);
        let line = resolver().resolve_line(&request).unwrap();

        assert_eq!(line.valuation.product_value, 15.0);
        assert_eq!(line.valuation.resolved_base, 24.0);
        assert!((line.total_weight_kg - line.unit_weight_kg * 3.0).abs() < 1e-3);
        // 体积重 1.2kg > 判定重量 → 计费重按体积重
        assert!((line.chargeable_weight_kg - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_nothing_matches_without_manual_is_no_candidate() {
        let product = ProductDescriptor::new("Zyxw qrst", 10.0);
        let err = resolver().resolve_line(&QuoteRequest::new(product)).unwrap_err();
        assert!(err.requires_manual_entry());
    }

    #[test]
    fn test_invalid_product_rejected_before_lookup() {
        let product = ProductDescriptor::new("", 10.0);
        let err = resolver().resolve_line(&QuoteRequest::new(product)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "name"));
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        let resolver = Arc::new(resolver());
        let requests = vec![
            QuoteRequest::new(ProductDescriptor::new("Apple iPhone 15 Pro", 999.0).with_tariff_code("8517")),
            QuoteRequest::new(ProductDescriptor::new("Zyxw qrst", 10.0)),
            QuoteRequest::new(ProductDescriptor::new("Zyxw qrst", 10.0)).with_manual_weight(0.4),
        ];

        let results = resolver.resolve_batch(requests).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().weight.selected_source(), WeightSource::Tariff);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().unit_weight_kg, 0.4);
    }
}
