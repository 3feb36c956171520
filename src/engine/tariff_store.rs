// ==========================================
// 跨境报价系统 - 税则参考库
// ==========================================
// 职责: 税则编码 → 规范重量区间 / 描述 / 默认税率
// 红线: 查无结果是可恢复信号（None），不是判定失败
// 并发: 快照不可变；刷新时整体替换 Arc，读者永远看不到半更新的表
// ==========================================

use crate::domain::tariff::{normalize_tariff_code, TariffEntry};
use crate::engine::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// 逐级回退的编码长度（8 位子目 → 6 位子目 → 4 位品目）
const FALLBACK_CODE_LENGTHS: [usize; 2] = [6, 4];

// ==========================================
// TariffSnapshot - 不可变税则快照
// ==========================================
#[derive(Debug, Clone)]
pub struct TariffSnapshot {
    version: String,
    loaded_at: DateTime<Utc>,
    entries: HashMap<String, TariffEntry>,
}

impl TariffSnapshot {
    /// 由条目列表构建快照
    ///
    /// 每个条目先校验；编码重复视为无效输入（导入层负责去重并报告）
    pub fn from_entries(
        version: impl Into<String>,
        entries: Vec<TariffEntry>,
    ) -> EngineResult<Self> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            entry.validate()?;
            if map.contains_key(&entry.code) {
                return Err(EngineError::invalid_input(
                    "code",
                    format!("税则编码重复: {}", entry.code),
                ));
            }
            map.insert(entry.code.clone(), entry);
        }

        Ok(Self {
            version: version.into(),
            loaded_at: Utc::now(),
            entries: map,
        })
    }

    pub fn empty() -> Self {
        Self {
            version: "empty".to_string(),
            loaded_at: Utc::now(),
            entries: HashMap::new(),
        }
    }

    /// 内置常见消费品品目（无外部税则表时的兜底快照）
    pub fn builtin() -> Self {
        let entries = BUILTIN_TARIFFS
            .iter()
            .map(|seed| {
                TariffEntry::new(
                    seed.code,
                    seed.min_kg,
                    seed.max_kg,
                    seed.description,
                    seed.duty_rate_percent,
                )
            })
            .collect();

        // 内置数据在测试中校验，这里失败只可能是编码重复
        Self::from_entries("builtin", entries).unwrap_or_else(|_| Self::empty())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 全部条目（按编码排序，用于持久化与导出）
    pub fn entries(&self) -> Vec<&TariffEntry> {
        let mut list: Vec<&TariffEntry> = self.entries.values().collect();
        list.sort_by(|a, b| a.code.cmp(&b.code));
        list
    }

    /// 查询税则条目
    ///
    /// 顺序: 完整编码 → 6 位子目 → 4 位品目，命中即返回
    pub fn lookup(&self, code: &str) -> Option<&TariffEntry> {
        let normalized = normalize_tariff_code(code);
        if normalized.is_empty() {
            return None;
        }

        if let Some(entry) = self.entries.get(&normalized) {
            return Some(entry);
        }

        FALLBACK_CODE_LENGTHS
            .iter()
            .filter(|&&len| normalized.len() > len)
            .find_map(|&len| self.entries.get(&normalized[..len]))
    }
}

// ==========================================
// TariffReferenceStore - 税则参考库（可原子刷新）
// ==========================================
pub struct TariffReferenceStore {
    current: RwLock<Arc<TariffSnapshot>>,
}

impl TariffReferenceStore {
    pub fn new(snapshot: TariffSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn with_builtin() -> Self {
        Self::new(TariffSnapshot::builtin())
    }

    /// 获取当前快照（一次请求内应持有同一快照）
    pub fn snapshot(&self) -> Arc<TariffSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    /// 原子替换快照，返回旧快照
    pub fn replace(&self, snapshot: TariffSnapshot) -> Arc<TariffSnapshot> {
        let next = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *guard, next);
        info!(
            previous_version = %previous.version(),
            version = %guard.version(),
            entries = guard.len(),
            "税则快照已替换"
        );
        previous
    }

    /// 查询税则条目（未命中返回 None，仅记录 debug 日志）
    pub fn lookup(&self, code: &str) -> Option<TariffEntry> {
        let snapshot = self.snapshot();
        let found = snapshot.lookup(code).cloned();
        if found.is_none() {
            debug!(code = %code, version = %snapshot.version(), "税则编码未命中");
        }
        found
    }
}

impl Default for TariffReferenceStore {
    fn default() -> Self {
        Self::with_builtin()
    }
}

// ==========================================
// 内置品目种子
// ==========================================
struct TariffSeed {
    code: &'static str,
    min_kg: f64,
    max_kg: f64,
    description: &'static str,
    duty_rate_percent: f64,
}

const BUILTIN_TARIFFS: &[TariffSeed] = &[
    TariffSeed { code: "8517", min_kg: 0.15, max_kg: 0.25, description: "Telephone sets, smartphones", duty_rate_percent: 20.0 },
    TariffSeed { code: "8471", min_kg: 1.0, max_kg: 2.5, description: "Portable computers, laptops", duty_rate_percent: 10.0 },
    TariffSeed { code: "8518", min_kg: 0.05, max_kg: 0.5, description: "Headphones, earphones, speakers", duty_rate_percent: 20.0 },
    TariffSeed { code: "8504", min_kg: 0.05, max_kg: 0.3, description: "Chargers, power adapters", duty_rate_percent: 20.0 },
    TariffSeed { code: "8516", min_kg: 0.4, max_kg: 1.5, description: "Hair dryers, small heating appliances", duty_rate_percent: 20.0 },
    TariffSeed { code: "8528", min_kg: 2.5, max_kg: 8.0, description: "Monitors, projectors", duty_rate_percent: 20.0 },
    TariffSeed { code: "9102", min_kg: 0.05, max_kg: 0.2, description: "Wrist-watches", duty_rate_percent: 20.0 },
    TariffSeed { code: "9004", min_kg: 0.02, max_kg: 0.08, description: "Spectacles, sunglasses", duty_rate_percent: 20.0 },
    TariffSeed { code: "6403", min_kg: 0.6, max_kg: 1.4, description: "Footwear with leather uppers", duty_rate_percent: 35.0 },
    TariffSeed { code: "6404", min_kg: 0.5, max_kg: 1.2, description: "Footwear with textile uppers", duty_rate_percent: 35.0 },
    TariffSeed { code: "6109", min_kg: 0.12, max_kg: 0.3, description: "T-shirts, singlets, knitted", duty_rate_percent: 20.0 },
    TariffSeed { code: "6203", min_kg: 0.3, max_kg: 1.0, description: "Men's suits, trousers", duty_rate_percent: 20.0 },
    TariffSeed { code: "4202", min_kg: 0.4, max_kg: 2.5, description: "Handbags, wallets, luggage", duty_rate_percent: 20.0 },
    TariffSeed { code: "3304", min_kg: 0.05, max_kg: 0.4, description: "Beauty and make-up preparations", duty_rate_percent: 20.0 },
    TariffSeed { code: "9503", min_kg: 0.1, max_kg: 1.5, description: "Toys, scale models, puzzles", duty_rate_percent: 60.0 },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_seeds_are_valid() {
        let snapshot = TariffSnapshot::builtin();
        assert_eq!(snapshot.len(), BUILTIN_TARIFFS.len());
        assert_eq!(snapshot.version(), "builtin");
    }

    #[test]
    fn test_lookup_exact_and_formatted_code() {
        let snapshot = TariffSnapshot::builtin();
        assert_eq!(snapshot.lookup("8517").map(|e| e.code.as_str()), Some("8517"));
        assert_eq!(snapshot.lookup("85.17").map(|e| e.code.as_str()), Some("8517"));
    }

    #[test]
    fn test_lookup_falls_back_to_heading() {
        let snapshot = TariffSnapshot::builtin();
        let entry = snapshot.lookup("8517.13.00").unwrap();
        assert_eq!(entry.code, "8517");
    }

    #[test]
    fn test_lookup_prefers_subheading_over_heading() {
        let snapshot = TariffSnapshot::from_entries(
            "t",
            vec![
                TariffEntry::new("8471", 1.0, 2.5, "computers", 10.0),
                TariffEntry::new("847130", 0.9, 2.0, "portable computers", 0.0),
            ],
        )
        .unwrap();
        assert_eq!(snapshot.lookup("84713010").unwrap().code, "847130");
        assert_eq!(snapshot.lookup("84715000").unwrap().code, "8471");
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let store = TariffReferenceStore::with_builtin();
        assert!(store.lookup("0101").is_none());
        assert!(store.lookup("").is_none());
        assert!(store.lookup("abc").is_none());
    }

    #[test]
    fn test_duplicate_codes_rejected() {
        let r = TariffSnapshot::from_entries(
            "dup",
            vec![
                TariffEntry::new("8517", 0.1, 0.2, "a", 20.0),
                TariffEntry::new("85.17", 0.1, 0.2, "b", 20.0),
            ],
        );
        assert!(r.is_err());
    }

    #[test]
    fn test_replace_swaps_snapshot_and_keeps_old_for_readers() {
        let store = TariffReferenceStore::with_builtin();
        let before = store.snapshot();

        let next = TariffSnapshot::from_entries(
            "v2",
            vec![TariffEntry::new("8517", 0.1, 0.3, "phones v2", 15.0)],
        )
        .unwrap();
        let previous = store.replace(next);

        assert_eq!(previous.version(), "builtin");
        // 旧读者仍持有完整旧表
        assert_eq!(before.len(), BUILTIN_TARIFFS.len());
        assert_eq!(store.snapshot().version(), "v2");
        assert_eq!(store.lookup("8517").unwrap().default_duty_rate_percent, 15.0);
        assert!(store.lookup("6403").is_none());
    }
}
