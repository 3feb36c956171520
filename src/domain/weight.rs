// ==========================================
// 跨境报价系统 - 重量候选与重量判定
// ==========================================
// 红线: 每个候选只由一个来源产生，创建后不可变
// 红线: 判定结果保留全部候选（审计轨迹），selected 必属于 candidates
// ==========================================

use crate::domain::types::WeightSource;
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 税则规范重量区间（kg）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRange {
    pub min_kg: f64,
    pub max_kg: f64,
}

impl WeightRange {
    pub fn new(min_kg: f64, max_kg: f64) -> Self {
        Self { min_kg, max_kg }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min_kg + self.max_kg) / 2.0
    }

    /// 闭区间包含判断
    pub fn contains(&self, value_kg: f64) -> bool {
        value_kg >= self.min_kg && value_kg <= self.max_kg
    }
}

// ==========================================
// WeightCandidate - 重量候选
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightCandidate {
    pub source: WeightSource,
    pub value_kg: f64,     // 单件重量（kg，> 0）
    pub confidence: f64,   // 置信度（0.0 ~ 1.0）
    pub rationale: String, // 可解释性：命中规则/来源说明
    #[serde(default)]
    pub range: Option<WeightRange>, // 仅税则来源携带
}

impl WeightCandidate {
    /// 创建候选并校验取值
    pub fn new(
        source: WeightSource,
        value_kg: f64,
        confidence: f64,
        rationale: impl Into<String>,
    ) -> EngineResult<Self> {
        let candidate = Self {
            source,
            value_kg,
            confidence,
            rationale: rationale.into(),
            range: None,
        };
        candidate.validate()?;
        Ok(candidate)
    }

    /// 人工录入候选（置信度固定 1.0）
    pub fn manual(value_kg: f64) -> EngineResult<Self> {
        Self::new(
            WeightSource::Manual,
            value_kg,
            1.0,
            format!("MANUAL_OVERRIDE: user_input={}kg", value_kg),
        )
    }

    pub fn with_range(self, range: WeightRange) -> Self {
        Self {
            range: Some(range),
            ..self
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !self.value_kg.is_finite() || self.value_kg <= 0.0 {
            return Err(EngineError::invalid_input(
                format!("candidate[{}].value_kg", self.source),
                format!("重量必须为正数: {}", self.value_kg),
            ));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(EngineError::invalid_input(
                format!("candidate[{}].confidence", self.source),
                format!("置信度必须在 [0, 1]: {}", self.confidence),
            ));
        }
        Ok(())
    }
}

/// 单条偏差记录（被判为超阈值的候选）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub source: WeightSource,
    pub value_kg: f64,
    pub relative_diff: f64,
}

// ==========================================
// WeightDecision - 重量判定结果
// ==========================================
// 不跨输入缓存：描述变化即重新判定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightDecision {
    pub decision_id: Uuid,
    pub selected: WeightCandidate,
    pub candidates: Vec<WeightCandidate>, // 全部候选（按来源优先级排序，人工在末尾）
    pub discrepancy_flag: bool,
    pub discrepancy_threshold: f64,
    #[serde(default)]
    pub discrepancies: Vec<Discrepancy>,
}

impl WeightDecision {
    pub fn selected_source(&self) -> WeightSource {
        self.selected.source
    }

    pub fn selected_value_kg(&self) -> f64 {
        self.selected.value_kg
    }

    /// 按来源查找候选
    pub fn candidate(&self, source: WeightSource) -> Option<&WeightCandidate> {
        self.candidates.iter().find(|c| c.source == source)
    }

    /// 除选中项外的其余候选（同来源的其他候选保留）
    pub fn alternatives(&self) -> impl Iterator<Item = &WeightCandidate> {
        let selected_index = self.candidates.iter().position(|c| *c == self.selected);
        self.candidates
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != selected_index)
            .map(|(_, c)| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_rejects_non_positive_value() {
        let r = WeightCandidate::new(WeightSource::Pattern, 0.0, 0.5, "x");
        assert!(r.is_err());
    }

    #[test]
    fn test_candidate_rejects_confidence_out_of_range() {
        let r = WeightCandidate::new(WeightSource::Pattern, 1.0, 1.2, "x");
        assert!(r.is_err());
    }

    #[test]
    fn test_manual_candidate_full_confidence() {
        let c = WeightCandidate::manual(0.42).unwrap();
        assert_eq!(c.source, WeightSource::Manual);
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = WeightRange::new(0.15, 0.25);
        assert!(range.contains(0.15));
        assert!(range.contains(0.25));
        assert!(!range.contains(0.26));
        assert!((range.midpoint() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_alternatives_keep_other_candidates_of_selected_source() {
        let selected = WeightCandidate::new(WeightSource::Tariff, 0.2, 0.95, "8517").unwrap();
        let candidates = vec![
            WeightCandidate::new(WeightSource::Tariff, 0.9, 0.7, "6403").unwrap(),
            selected.clone(),
            WeightCandidate::new(WeightSource::Pattern, 0.187, 0.9, "model").unwrap(),
        ];
        let decision = WeightDecision {
            decision_id: Uuid::new_v4(),
            selected,
            candidates,
            discrepancy_flag: false,
            discrepancy_threshold: 0.5,
            discrepancies: vec![],
        };

        let alternatives: Vec<f64> = decision.alternatives().map(|c| c.value_kg).collect();
        assert_eq!(alternatives, vec![0.9, 0.187]);
    }
}
