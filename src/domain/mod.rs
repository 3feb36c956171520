// ==========================================
// 跨境报价系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// 生命周期: 全部为请求级派生对象，输入变化即整体重算
// ==========================================

pub mod product;
pub mod tariff;
pub mod types;
pub mod valuation;
pub mod weight;

// 重导出核心类型
pub use product::{PackageDimensions, ProductDescriptor};
pub use tariff::{normalize_tariff_code, TariffEntry};
pub use types::{BasisSource, DimensionUnit, ValuationMethod, WeightSource};
pub use valuation::ValuationBasis;
pub use weight::{Discrepancy, WeightCandidate, WeightDecision, WeightRange};
