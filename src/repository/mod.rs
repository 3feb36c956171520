// ==========================================
// 跨境报价系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 只在报价请求之外读写参考数据，请求路径不写库
// ==========================================
// 职责: 提供税则参考数据的持久化，屏蔽数据库细节
// 约束: 所有查询使用参数化
// ==========================================

pub mod error;
pub mod tariff_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use tariff_repo::{TariffRepository, TariffTableInfo};
