// ==========================================
// 跨境报价系统 - 税则表字段映射器
// ==========================================
// 职责: 原始行 → TariffEntry（列名别名 + 类型转换 + 范围校验）
// 红线: 行级错误带行号返回，由导入器收集
// ==========================================

use crate::domain::tariff::{normalize_tariff_code, TariffEntry};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRow;

#[derive(Debug, Default)]
pub struct FieldMapper;

impl FieldMapper {
    /// 映射单行为税则条目
    pub fn map_to_tariff_entry(&self, row: &RawRow) -> ImportResult<TariffEntry> {
        let code = self
            .get_string(row, "code")
            .map(|c| normalize_tariff_code(&c))
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ImportError::FieldMappingError {
                row: row.line,
                message: "税则编码为空或不含数字".to_string(),
            })?;

        let min = self.require_f64(row, "weight_min_kg")?;
        let max = self.require_f64(row, "weight_max_kg")?;
        let rate = self.parse_f64(row, "duty_rate_percent")?.unwrap_or(0.0);
        let description = self.get_string(row, "description").unwrap_or_default();

        check_range(row.line, "weight_min_kg", min, 0.0, f64::MAX)?;
        check_range(row.line, "weight_max_kg", max, min, f64::MAX)?;
        check_range(row.line, "duty_rate_percent", rate, 0.0, 100.0)?;

        let mut entry = TariffEntry::new(&code, min, max, description, rate);
        if let Some(rep) = self.parse_f64(row, "representative_weight_kg")? {
            check_range(row.line, "representative_weight_kg", rep, min, max)?;
            entry = entry.with_representative_weight(rep);
        }

        entry.validate().map_err(|e| ImportError::FieldMappingError {
            row: row.line,
            message: e.to_string(),
        })?;
        Ok(entry)
    }

    /// 提取字符串字段，支持多个可能的列名（别名）
    fn get_string(&self, row: &RawRow, key: &str) -> Option<String> {
        let aliases: &[&str] = match key {
            "code" => &["code", "hs_code", "hsn", "hsn_code", "tariff_code", "税则编码"],
            "weight_min_kg" => &["weight_min_kg", "min_kg", "min_weight_kg", "重量下限"],
            "weight_max_kg" => &["weight_max_kg", "max_kg", "max_weight_kg", "重量上限"],
            "description" => &["description", "desc", "品目描述"],
            "duty_rate_percent" => &["duty_rate_percent", "duty_rate", "rate", "税率"],
            "representative_weight_kg" => &["representative_weight_kg", "typical_kg", "代表重量"],
            _ => &[],
        };

        aliases
            .iter()
            .chain(std::iter::once(&key))
            .filter_map(|alias| row.get(alias))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(|v| v.to_string())
    }

    /// 解析浮点字段（空值为 None）
    fn parse_f64(&self, row: &RawRow, key: &str) -> ImportResult<Option<f64>> {
        match self.get_string(row, key) {
            None => Ok(None),
            Some(raw) => raw
                .trim_end_matches('%')
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|e| ImportError::TypeConversionError {
                    row: row.line,
                    field: key.to_string(),
                    message: format!("{} ({})", e, raw),
                }),
        }
    }

    fn require_f64(&self, row: &RawRow, key: &str) -> ImportResult<f64> {
        self.parse_f64(row, key)?
            .ok_or_else(|| ImportError::FieldMappingError {
                row: row.line,
                message: format!("缺少字段 {}", key),
            })
    }
}

fn check_range(row: usize, field: &str, value: f64, min: f64, max: f64) -> ImportResult<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(ImportError::ValueRangeError {
            row,
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}
