// ==========================================
// 跨境报价系统 - 重量判定引擎
// ==========================================
// 优先级: MANUAL -> TARIFF -> 最高置信度（同分按 TARIFF > PATTERN > VOLUMETRIC）
// 红线: 人工输入永远胜出，但其余候选全部保留用于审计与偏差展示
// 红线: 偏差标记只做提示，绝不阻断判定
// 红线: 唯一的硬失败 = 无候选且无人工输入（NoCandidate）
// ==========================================

use crate::domain::types::WeightSource;
use crate::domain::weight::{Discrepancy, WeightCandidate, WeightDecision};
use crate::engine::error::{EngineError, EngineResult};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// 默认偏差阈值（相对差 50%）
pub const DEFAULT_DISCREPANCY_THRESHOLD: f64 = 0.5;

/// 阈值比较容差：吸收十进制重量在二进制下的表示误差
const THRESHOLD_EPSILON: f64 = 1e-9;

/// 对称相对差：|a - b| / max(a, b)，取值 [0, 1)
///
/// 1.5kg vs 0.2kg → 0.8667
pub fn relative_difference(a: f64, b: f64) -> f64 {
    let denominator = a.abs().max(b.abs());
    if denominator == 0.0 {
        return 0.0;
    }
    (a - b).abs() / denominator
}

// ==========================================
// ResolutionEngine - 多源重量判定
// ==========================================
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    discrepancy_threshold: f64,
}

impl ResolutionEngine {
    /// 创建判定引擎
    ///
    /// # 参数
    /// - `discrepancy_threshold`: 偏差阈值（相对差，≥ 0 的有限数）
    pub fn new(discrepancy_threshold: f64) -> EngineResult<Self> {
        if !discrepancy_threshold.is_finite() || discrepancy_threshold < 0.0 {
            return Err(EngineError::invalid_input(
                "discrepancy_threshold",
                format!("偏差阈值必须为非负数: {}", discrepancy_threshold),
            ));
        }
        Ok(Self {
            discrepancy_threshold,
        })
    }

    pub fn discrepancy_threshold(&self) -> f64 {
        self.discrepancy_threshold
    }

    /// 合并候选并产出重量判定
    ///
    /// # 参数
    /// - `candidates`: 各来源候选（可为空）
    /// - `manual_override`: 人工录入重量（kg）
    ///
    /// # 说明
    /// - 传入列表中已有的 MANUAL 候选（如回放上一次判定的候选）不会重复保留：
    ///   显式 `manual_override` 优先；未提供时取列表中最后一个 MANUAL 值作为人工输入
    #[instrument(skip(self, candidates), fields(count = candidates.len(), manual = manual_override.is_some()))]
    pub fn resolve(
        &self,
        candidates: Vec<WeightCandidate>,
        manual_override: Option<f64>,
    ) -> EngineResult<WeightDecision> {
        for candidate in &candidates {
            candidate.validate()?;
        }

        // 1. 拆出历史人工候选
        let (previous_manual, mut retained): (Vec<WeightCandidate>, Vec<WeightCandidate>) =
            candidates
                .into_iter()
                .partition(|c| c.source == WeightSource::Manual);
        let manual_value = manual_override.or_else(|| previous_manual.last().map(|c| c.value_kg));
        if !previous_manual.is_empty() {
            debug!(replaced = previous_manual.len(), "替换候选列表中的历史人工输入");
        }

        // 2. 按来源优先级稳定排序（审计展示顺序）
        retained.sort_by(|a, b| b.source.priority().cmp(&a.source.priority()));

        // 3. 选择
        let selected_index = match manual_value {
            Some(value) => {
                retained.push(WeightCandidate::manual(value)?);
                retained.len() - 1
            }
            None => select_index(&retained).ok_or_else(|| {
                EngineError::NoCandidate("无税则/规则/体积重候选，需人工录入重量".to_string())
            })?,
        };

        // 4. 偏差检测
        let selected = retained[selected_index].clone();
        let discrepancies: Vec<Discrepancy> = retained
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != selected_index)
            .filter_map(|(_, c)| {
                let relative_diff = relative_difference(selected.value_kg, c.value_kg);
                let exceeds = relative_diff - self.discrepancy_threshold > THRESHOLD_EPSILON;
                exceeds.then(|| Discrepancy {
                    source: c.source,
                    value_kg: c.value_kg,
                    relative_diff,
                })
            })
            .collect();
        let discrepancy_flag = !discrepancies.is_empty();

        if discrepancy_flag {
            warn!(
                selected_source = %selected.source,
                selected_kg = selected.value_kg,
                threshold = self.discrepancy_threshold,
                deviating = discrepancies.len(),
                "重量来源偏差超阈值"
            );
        }

        Ok(WeightDecision {
            decision_id: Uuid::new_v4(),
            selected,
            candidates: retained,
            discrepancy_flag,
            discrepancy_threshold: self.discrepancy_threshold,
            discrepancies,
        })
    }
}

impl Default for ResolutionEngine {
    fn default() -> Self {
        Self {
            discrepancy_threshold: DEFAULT_DISCREPANCY_THRESHOLD,
        }
    }
}

/// 无人工输入时的选择规则
///
/// 1) 存在税则候选 → 税则（官方数据权威），多个时取置信度最高者
/// 2) 否则取置信度最高者；同分按来源优先级，再同分取靠前者
fn select_index(candidates: &[WeightCandidate]) -> Option<usize> {
    let tariffs = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.source == WeightSource::Tariff);
    best_of(tariffs).or_else(|| best_of(candidates.iter().enumerate()))
}

fn best_of<'a>(pool: impl Iterator<Item = (usize, &'a WeightCandidate)>) -> Option<usize> {
    pool.fold(None, |best: Option<(usize, &'a WeightCandidate)>, (i, c)| match best {
        Some((_, b))
            if b.confidence > c.confidence
                || (b.confidence == c.confidence && b.source.priority() >= c.source.priority()) =>
        {
            best
        }
        _ => Some((i, c)),
    })
    .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::weight::WeightRange;

    fn cand(source: WeightSource, value: f64, confidence: f64) -> WeightCandidate {
        WeightCandidate::new(source, value, confidence, format!("{}", source)).unwrap()
    }

    #[test]
    fn test_relative_difference_symmetric() {
        assert!((relative_difference(1.5, 0.2) - 0.866_666_666).abs() < 1e-6);
        assert_eq!(relative_difference(1.5, 0.2), relative_difference(0.2, 1.5));
        assert_eq!(relative_difference(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_empty_without_override_is_no_candidate() {
        let r = ResolutionEngine::default().resolve(vec![], None);
        assert!(matches!(r, Err(EngineError::NoCandidate(_))));
    }

    #[test]
    fn test_empty_with_override_selects_manual() {
        let d = ResolutionEngine::default().resolve(vec![], Some(0.8)).unwrap();
        assert_eq!(d.selected.source, WeightSource::Manual);
        assert_eq!(d.candidates.len(), 1);
        assert!(!d.discrepancy_flag);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let r = ResolutionEngine::default().resolve(vec![], Some(-1.0));
        assert!(matches!(r, Err(EngineError::InvalidInput { .. })));
    }

    #[test]
    fn test_manual_wins_and_keeps_all_candidates() {
        let d = ResolutionEngine::default()
            .resolve(
                vec![
                    cand(WeightSource::Pattern, 0.19, 0.9),
                    cand(WeightSource::Tariff, 0.2, 0.95),
                ],
                Some(0.21),
            )
            .unwrap();
        assert_eq!(d.selected.source, WeightSource::Manual);
        assert_eq!(d.selected.value_kg, 0.21);
        assert_eq!(d.candidates.len(), 3);
        assert!(d.candidates.contains(&d.selected));
    }

    #[test]
    fn test_tariff_wins_over_higher_confidence_pattern() {
        let d = ResolutionEngine::default()
            .resolve(
                vec![
                    cand(WeightSource::Pattern, 0.19, 1.0),
                    cand(WeightSource::Tariff, 0.2, 0.5),
                ],
                None,
            )
            .unwrap();
        assert_eq!(d.selected.source, WeightSource::Tariff);
    }

    #[test]
    fn test_highest_confidence_without_tariff() {
        let d = ResolutionEngine::default()
            .resolve(
                vec![
                    cand(WeightSource::Volumetric, 1.0, 0.7),
                    cand(WeightSource::Pattern, 0.9, 0.6),
                ],
                None,
            )
            .unwrap();
        assert_eq!(d.selected.source, WeightSource::Volumetric);
    }

    #[test]
    fn test_tie_broken_by_source_priority() {
        let d = ResolutionEngine::default()
            .resolve(
                vec![
                    cand(WeightSource::Volumetric, 1.0, 0.3),
                    cand(WeightSource::Pattern, 0.9, 0.3),
                ],
                None,
            )
            .unwrap();
        assert_eq!(d.selected.source, WeightSource::Pattern);
    }

    #[test]
    fn test_candidates_ordered_by_priority() {
        let d = ResolutionEngine::default()
            .resolve(
                vec![
                    cand(WeightSource::Volumetric, 1.0, 0.3),
                    cand(WeightSource::Pattern, 0.9, 0.6),
                    cand(WeightSource::Tariff, 0.95, 0.95),
                ],
                None,
            )
            .unwrap();
        let sources: Vec<WeightSource> = d.candidates.iter().map(|c| c.source).collect();
        assert_eq!(
            sources,
            vec![WeightSource::Tariff, WeightSource::Pattern, WeightSource::Volumetric]
        );
    }

    #[test]
    fn test_discrepancy_boundary_exclusive() {
        let engine = ResolutionEngine::new(0.5).unwrap();

        // 恰好 50%：不标记
        let at = engine
            .resolve(
                vec![
                    cand(WeightSource::Tariff, 1.0, 0.95),
                    cand(WeightSource::Pattern, 0.5, 0.9),
                ],
                None,
            )
            .unwrap();
        assert!(!at.discrepancy_flag);

        // 略高于 50%：标记
        let above = engine
            .resolve(
                vec![
                    cand(WeightSource::Tariff, 1.0, 0.95),
                    cand(WeightSource::Pattern, 0.49, 0.9),
                ],
                None,
            )
            .unwrap();
        assert!(above.discrepancy_flag);
        assert_eq!(above.discrepancies.len(), 1);
        assert_eq!(above.discrepancies[0].source, WeightSource::Pattern);
    }

    #[test]
    fn test_discrepancy_never_blocks() {
        let d = ResolutionEngine::default()
            .resolve(
                vec![
                    cand(WeightSource::Tariff, 1.5, 0.95)
                        .with_range(WeightRange::new(1.0, 2.0)),
                    cand(WeightSource::Pattern, 0.2, 0.9),
                ],
                None,
            )
            .unwrap();
        assert_eq!(d.selected.source, WeightSource::Tariff);
        assert_eq!(d.selected.value_kg, 1.5);
        assert!(d.discrepancy_flag);
    }

    #[test]
    fn test_previous_manual_replaced_by_new_override() {
        let engine = ResolutionEngine::default();
        let first = engine
            .resolve(vec![cand(WeightSource::Pattern, 0.3, 0.6)], Some(0.5))
            .unwrap();
        let second = engine.resolve(first.candidates.clone(), Some(0.35)).unwrap();

        let manual_count = second
            .candidates
            .iter()
            .filter(|c| c.source == WeightSource::Manual)
            .count();
        assert_eq!(manual_count, 1);
        assert_eq!(second.selected.value_kg, 0.35);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        assert!(ResolutionEngine::new(-0.1).is_err());
        assert!(ResolutionEngine::new(f64::NAN).is_err());
    }
}
