// ==========================================
// 跨境报价系统 - 税则参考数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 整表替换（一张表 = 一个版本），读取时重建 TariffSnapshot
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::tariff::{normalize_tariff_code, TariffEntry};
use crate::engine::tariff_store::TariffSnapshot;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::info;

/// 已入库税则表的元信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TariffTableInfo {
    pub version: String,
    pub entry_count: usize,
    pub imported_at: String,
}

// ==========================================
// TariffRepository - 税则表仓储
// ==========================================
/// 税则表仓储
/// 职责: 管理 tariff_entry 表的整表写入与读取
pub struct TariffRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TariffRepository {
    /// 创建新的 TariffRepository 实例（自动建表）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            ensure_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 整表替换为给定快照
    ///
    /// # 返回
    /// - 写入的条目数
    pub fn save_snapshot(&self, snapshot: &TariffSnapshot) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let imported_at = snapshot.loaded_at().to_rfc3339();

        tx.execute("DELETE FROM tariff_entry", [])?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO tariff_entry (
                    code, weight_min_kg, weight_max_kg, description,
                    duty_rate_percent, representative_weight_kg,
                    table_version, imported_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;
            for entry in snapshot.entries() {
                count += stmt.execute(params![
                    entry.code,
                    entry.canonical_weight_min_kg,
                    entry.canonical_weight_max_kg,
                    entry.description,
                    entry.default_duty_rate_percent,
                    entry.representative_weight_kg,
                    snapshot.version(),
                    imported_at,
                ])?;
            }
        }
        tx.commit()?;

        info!(version = %snapshot.version(), entries = count, "税则表已入库");
        Ok(count)
    }

    /// 读取已入库的税则表并构建快照
    ///
    /// # 返回
    /// - Ok(None): 尚未入库任何税则表
    pub fn load_snapshot(&self) -> RepositoryResult<Option<TariffSnapshot>> {
        let info = match self.table_info()? {
            Some(info) => info,
            None => return Ok(None),
        };

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT code, weight_min_kg, weight_max_kg, description,
                   duty_rate_percent, representative_weight_kg
            FROM tariff_entry
            ORDER BY code
            "#,
        )?;
        let entries = stmt
            .query_map([], map_entry)?
            .collect::<Result<Vec<_>, _>>()?;

        let snapshot = TariffSnapshot::from_entries(info.version, entries)
            .map_err(|e| RepositoryError::ValidationError(e.to_string()))?;
        Ok(Some(snapshot))
    }

    /// 按编码精确查询
    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<TariffEntry>> {
        let conn = self.get_conn()?;
        let entry = conn
            .query_row(
                r#"
                SELECT code, weight_min_kg, weight_max_kg, description,
                       duty_rate_percent, representative_weight_kg
                FROM tariff_entry
                WHERE code = ?1
                "#,
                params![normalize_tariff_code(code)],
                map_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// 税则表元信息（版本、条目数、入库时间）
    pub fn table_info(&self) -> RepositoryResult<Option<TariffTableInfo>> {
        let conn = self.get_conn()?;
        let info = conn
            .query_row(
                r#"
                SELECT table_version, COUNT(*), MAX(imported_at)
                FROM tariff_entry
                GROUP BY table_version
                ORDER BY MAX(imported_at) DESC
                LIMIT 1
                "#,
                [],
                |row| {
                    Ok(TariffTableInfo {
                        version: row.get(0)?,
                        entry_count: row.get::<_, i64>(1)? as usize,
                        imported_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(info)
    }
}

fn map_entry(row: &Row<'_>) -> rusqlite::Result<TariffEntry> {
    let entry = TariffEntry::new(
        &row.get::<_, String>(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get::<_, String>(3)?,
        row.get(4)?,
    );
    Ok(match row.get::<_, Option<f64>>(5)? {
        Some(rep) => entry.with_representative_weight(rep),
        None => entry,
    })
}
