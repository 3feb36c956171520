// ==========================================
// 跨境报价系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 红线: 配置值格式错误时回退默认值并告警，不中断报价
// ==========================================

use crate::config::engine_config::{EngineConfig, DEFAULT_TARIFF_CONFIDENCE};
use crate::config::engine_config_reader::EngineConfigReader;
use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::domain::types::ValuationMethod;
use crate::engine::pattern_rules::PatternRuleSet;
use crate::engine::resolution::DEFAULT_DISCREPANCY_THRESHOLD;
use crate::engine::volumetric::{DEFAULT_CARRIER_DIVISOR, DEFAULT_VOLUMETRIC_CONFIDENCE};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 与建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
            ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取浮点配置；格式错误回退默认值并告警
    fn get_f64_or_default(&self, key: &str, default: f64) -> Result<f64, Box<dyn Error>> {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = default,
                    "配置值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 报价审计时记录当时的配置
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    /// 将引擎配置整体写回 config_kv
    pub fn save_engine_config(&self, config: &EngineConfig) -> Result<(), Box<dyn Error>> {
        config.validate()?;
        self.set_global_config_value(
            config_keys::DISCREPANCY_THRESHOLD,
            &config.discrepancy_threshold.to_string(),
        )?;
        self.set_global_config_value(config_keys::CARRIER_DIVISOR, &config.carrier_divisor.to_string())?;
        self.set_global_config_value(
            config_keys::DEFAULT_VALUATION_METHOD,
            config.default_valuation_method.to_db_str(),
        )?;
        self.set_global_config_value(
            config_keys::TARIFF_CONFIDENCE,
            &config.tariff_confidence.to_string(),
        )?;
        self.set_global_config_value(
            config_keys::VOLUMETRIC_CONFIDENCE,
            &config.volumetric_confidence.to_string(),
        )?;
        self.set_global_config_value(
            config_keys::FALLBACK_DUTY_RATE_PERCENT,
            &config.fallback_duty_rate_percent.to_string(),
        )?;
        Ok(())
    }
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_discrepancy_threshold(&self) -> Result<f64, Box<dyn Error>> {
        self.get_f64_or_default(config_keys::DISCREPANCY_THRESHOLD, DEFAULT_DISCREPANCY_THRESHOLD)
    }

    async fn get_tariff_confidence(&self) -> Result<f64, Box<dyn Error>> {
        self.get_f64_or_default(config_keys::TARIFF_CONFIDENCE, DEFAULT_TARIFF_CONFIDENCE)
    }

    async fn get_carrier_divisor(&self) -> Result<f64, Box<dyn Error>> {
        self.get_f64_or_default(config_keys::CARRIER_DIVISOR, DEFAULT_CARRIER_DIVISOR)
    }

    async fn get_volumetric_confidence(&self) -> Result<f64, Box<dyn Error>> {
        self.get_f64_or_default(config_keys::VOLUMETRIC_CONFIDENCE, DEFAULT_VOLUMETRIC_CONFIDENCE)
    }

    async fn get_default_valuation_method(&self) -> Result<ValuationMethod, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_VALUATION_METHOD, "AUTO")?;
        Ok(ValuationMethod::from_str(&value).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::DEFAULT_VALUATION_METHOD,
                raw_value = %value,
                "完税价格方法配置无效，使用 AUTO"
            );
            ValuationMethod::Auto
        }))
    }

    async fn get_fallback_duty_rate_percent(&self) -> Result<f64, Box<dyn Error>> {
        self.get_f64_or_default(config_keys::FALLBACK_DUTY_RATE_PERCENT, 0.0)
    }

    async fn get_pattern_rules(&self) -> Result<Option<PatternRuleSet>, Box<dyn Error>> {
        let raw = match self.get_config_value(config_keys::PATTERN_RULES)? {
            Some(v) if !v.trim().is_empty() => v,
            _ => return Ok(None),
        };

        match PatternRuleSet::from_json(&raw) {
            Ok(rules) => Ok(Some(rules)),
            Err(e) => {
                tracing::warn!(
                    config_key = config_keys::PATTERN_RULES,
                    error = %e,
                    "自定义规则集无效，使用内置规则集"
                );
                Ok(None)
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 重量判定
    pub const DISCREPANCY_THRESHOLD: &str = "discrepancy_threshold";
    pub const TARIFF_CONFIDENCE: &str = "tariff_confidence";

    // 体积重
    pub const CARRIER_DIVISOR: &str = "carrier_divisor";
    pub const VOLUMETRIC_CONFIDENCE: &str = "volumetric_confidence";

    // 完税价格
    pub const DEFAULT_VALUATION_METHOD: &str = "default_valuation_method";
    pub const FALLBACK_DUTY_RATE_PERCENT: &str = "fallback_duty_rate_percent";

    // 规则集 (JSON)
    pub const PATTERN_RULES: &str = "pattern_rules";
}
