// ==========================================
// 跨境报价系统 - 导入层
// ==========================================
// 职责: 外部税则表导入，生成 TariffEntry / TariffSnapshot
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod tariff_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRow, UniversalFileParser};
pub use tariff_importer::{ImportReport, RejectedRow, TariffImporter};
