// ==========================================
// 跨境报价系统 - 税则表导入器
// ==========================================
// 流程: 文件解析 → 表头检查 → 逐行映射 → 去重 → ImportReport
// 红线: 单行错误只拒绝该行，不中断整张表
// 红线: 编码重复时保留首行，后续行记为拒绝
// ==========================================

use crate::domain::tariff::TariffEntry;
use crate::engine::error::EngineResult;
use crate::engine::tariff_store::TariffSnapshot;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{RawRow, UniversalFileParser};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// 必需列（规范化后的列名或别名之一）
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("code", &["code", "hs_code", "hsn", "hsn_code", "tariff_code", "税则编码"]),
    ("weight_min_kg", &["weight_min_kg", "min_kg", "min_weight_kg", "重量下限"]),
    ("weight_max_kg", &["weight_max_kg", "max_kg", "max_weight_kg", "重量上限"]),
];

// ==========================================
// ImportReport - 导入报告
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct RejectedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub batch_id: String,
    pub total_rows: usize,
    pub entries: Vec<TariffEntry>,
    pub rejected: Vec<RejectedRow>,
    pub elapsed_ms: u64,
}

impl ImportReport {
    pub fn accepted(&self) -> usize {
        self.entries.len()
    }

    /// 构建税则快照（版本号由调用方给出，如文件名或发布日期）
    pub fn to_snapshot(&self, version: &str) -> EngineResult<TariffSnapshot> {
        TariffSnapshot::from_entries(version, self.entries.clone())
    }
}

// ==========================================
// TariffImporter - 税则表导入器
// ==========================================
#[derive(Default)]
pub struct TariffImporter {
    parser: UniversalFileParser,
    mapper: FieldMapper,
}

impl TariffImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从文件导入（CSV / XLSX）
    pub fn import_file<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<ImportReport> {
        let path = file_path.as_ref();
        info!(file = %path.display(), "开始导入税则表");

        let rows = self.parser.parse(path)?;
        let report = self.import_rows(rows)?;

        info!(
            file = %path.display(),
            batch_id = %report.batch_id,
            total = report.total_rows,
            accepted = report.accepted(),
            rejected = report.rejected.len(),
            elapsed_ms = report.elapsed_ms,
            "税则表导入完成"
        );
        Ok(report)
    }

    /// 从已解析的原始行导入
    pub fn import_rows(&self, rows: Vec<RawRow>) -> ImportResult<ImportReport> {
        let started = Instant::now();
        check_required_columns(&rows)?;

        let total_rows = rows.len();
        let mut seen: HashSet<String> = HashSet::new();
        let mut entries = Vec::with_capacity(total_rows);
        let mut rejected = Vec::new();

        for row in &rows {
            let result = self.mapper.map_to_tariff_entry(row).and_then(|entry| {
                if seen.insert(entry.code.clone()) {
                    Ok(entry)
                } else {
                    Err(ImportError::DuplicateCode {
                        row: row.line,
                        code: entry.code,
                    })
                }
            });

            match result {
                Ok(entry) => entries.push(entry),
                Err(e) if e.is_row_level() => {
                    warn!(line = row.line, error = %e, "税则行被拒绝");
                    rejected.push(RejectedRow {
                        line: row.line,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(ImportReport {
            batch_id: Uuid::new_v4().to_string(),
            total_rows,
            entries,
            rejected,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

fn check_required_columns(rows: &[RawRow]) -> ImportResult<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    for (column, aliases) in REQUIRED_COLUMNS {
        if !aliases.iter().any(|a| first.fields.contains_key(*a)) {
            return Err(ImportError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}
