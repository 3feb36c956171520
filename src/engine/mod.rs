// ==========================================
// 跨境报价系统 - 引擎层
// ==========================================
// 职责: 多源重量候选生成、合并判定、完税价格基准选择
// 红线: Engine 不做 I/O，所有判定必须输出 rationale
// 红线: 未命中用 Option 表达，错误只用于非法输入与无候选
// ==========================================

pub mod error;
pub mod orchestrator;
pub mod pattern_estimator;
pub mod pattern_rules;
pub mod resolution;
pub mod tariff_store;
pub mod valuation;
pub mod volumetric;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use orchestrator::{QuoteLineResolution, QuoteLineResolver, QuoteRequest};
pub use pattern_estimator::{EstimateHints, PatternEstimator};
pub use pattern_rules::PatternRuleSet;
pub use resolution::{relative_difference, ResolutionEngine, DEFAULT_DISCREPANCY_THRESHOLD};
pub use tariff_store::{TariffReferenceStore, TariffSnapshot};
pub use valuation::{duty_amount, round_currency, ValuationSelector};
pub use volumetric::{chargeable_weight, VolumetricCalculator, DEFAULT_CARRIER_DIVISOR};
