// ==========================================
// 跨境报价系统 - 重量与关税判定核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 报价辅助（多源重量合并，人工输入拥有最终控制权）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 判定规则
pub mod engine;

// 导入层 - 外部税则表
pub mod importer;

// 数据仓储层 - 参考数据持久化
pub mod repository;

// 配置层 - 引擎配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BasisSource, DimensionUnit, ValuationMethod, WeightSource};

// 领域实体
pub use domain::{
    Discrepancy, PackageDimensions, ProductDescriptor, TariffEntry, ValuationBasis,
    WeightCandidate, WeightDecision, WeightRange,
};

// 引擎
pub use engine::{
    EngineError, EngineResult, PatternEstimator, QuoteLineResolution, QuoteLineResolver,
    QuoteRequest, ResolutionEngine, TariffReferenceStore, TariffSnapshot, ValuationSelector,
    VolumetricCalculator,
};

// 配置
pub use config::{ConfigManager, EngineConfig, EngineConfigReader};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "跨境报价重量与关税判定引擎";
