// ==========================================
// 跨境报价系统 - 商品名重量估算器
// ==========================================
// 职责: 商品名称（+ 品牌/材质提示）→ 估算单件重量 + 置信度
// 红线: 置信度单调反映具体程度：型号 > 品类 > 大类
// 红线: 未命中返回 None（常见且预期的结果），不是错误
// 红线: 不依赖逐商品持久化库，不产生任何写入
// ==========================================

use crate::domain::product::ProductDescriptor;
use crate::domain::types::WeightSource;
use crate::domain::weight::WeightCandidate;
use crate::engine::pattern_rules::{ModelRule, ModifierRule, PatternRuleSet};
use std::collections::HashSet;
use tracing::debug;

/// 型号精确命中置信度
pub const MODEL_MATCH_CONFIDENCE: f64 = 0.9;
/// 品类命中基础置信度
pub const CATEGORY_BASE_CONFIDENCE: f64 = 0.6;
/// 每个命中的修正（尺码/材质/品牌）增加的置信度
pub const CATEGORY_MODIFIER_STEP: f64 = 0.05;
/// 品类置信度上限（严格低于型号命中）
pub const CATEGORY_CONFIDENCE_CAP: f64 = 0.8;
/// 大类默认置信度
pub const DEPARTMENT_CONFIDENCE: f64 = 0.4;

/// 估算提示（来自报价行的可选字段）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimateHints {
    pub brand: Option<String>,
    pub material: Option<String>,
}

impl EstimateHints {
    pub fn from_descriptor(product: &ProductDescriptor) -> Self {
        Self {
            brand: product.brand.clone(),
            material: product.material.clone(),
        }
    }
}

/// 分词：小写，按非字母数字切分
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

// ==========================================
// PatternEstimator - 规则估算器
// ==========================================
pub struct PatternEstimator {
    rules: PatternRuleSet,
}

impl PatternEstimator {
    pub fn new(rules: PatternRuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &PatternRuleSet {
        &self.rules
    }

    /// 估算单件重量
    ///
    /// 顺序（命中即返回）:
    /// 1) 型号规则：关键词全部命中，取关键词最多者 → 置信度 0.9
    /// 2) 品类规则：基准重量 × 尺码系数 × 材质系数；品牌命中仅加置信度
    ///    → 置信度 0.6 + 0.05/修正，上限 0.8
    /// 3) 大类默认 → 置信度 0.4
    /// 4) 均未命中 → None
    pub fn estimate(&self, product_name: &str, hints: &EstimateHints) -> Option<WeightCandidate> {
        let tokens = tokenize(product_name);
        if tokens.is_empty() {
            debug!(product_name = %product_name, "商品名无有效词元");
            return None;
        }
        let name_tokens: HashSet<&str> = tokens.iter().map(|t| t.as_str()).collect();

        if let Some(candidate) = self.match_model(&name_tokens) {
            return Some(candidate);
        }

        let hint_tokens: Vec<String> = hints
            .brand
            .iter()
            .chain(hints.material.iter())
            .flat_map(|h| tokenize(h))
            .collect();
        let mut all_tokens = name_tokens.clone();
        all_tokens.extend(hint_tokens.iter().map(|t| t.as_str()));

        if let Some(candidate) = self.match_category(&name_tokens, &all_tokens) {
            return Some(candidate);
        }

        if let Some(candidate) = self.match_department(&name_tokens) {
            return Some(candidate);
        }

        debug!(product_name = %product_name, "商品名规则未命中");
        None
    }

    fn match_model(&self, tokens: &HashSet<&str>) -> Option<WeightCandidate> {
        // 关键词最多者胜出；同数量取表中靠前者
        let best = self
            .rules
            .models
            .iter()
            .filter(|rule| rule.keywords.iter().all(|k| tokens.contains(k.as_str())))
            .fold(None::<&ModelRule>, |best, rule| match best {
                Some(b) if b.keywords.len() >= rule.keywords.len() => Some(b),
                _ => Some(rule),
            })?;

        let rationale = format!(
            "PATTERN_MODEL: model={}, keywords=[{}], weight={}kg",
            best.label,
            best.keywords.join(","),
            best.weight_kg
        );
        WeightCandidate::new(
            WeightSource::Pattern,
            best.weight_kg,
            MODEL_MATCH_CONFIDENCE,
            rationale,
        )
        .ok()
    }

    fn match_category(
        &self,
        name_tokens: &HashSet<&str>,
        all_tokens: &HashSet<&str>,
    ) -> Option<WeightCandidate> {
        let rule = self
            .rules
            .categories
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| name_tokens.contains(k.as_str())))?;

        let mut weight = rule.base_weight_kg;
        let mut applied: Vec<String> = Vec::new();

        if let Some(size) = first_modifier(&self.rules.size_modifiers, name_tokens) {
            weight *= size.factor;
            applied.push(format!("{}×{}", size.label, size.factor));
        }

        if let Some(material) = first_modifier(&self.rules.material_modifiers, all_tokens) {
            weight *= material.factor;
            applied.push(format!("{}×{}", material.label, material.factor));
        }

        let brands = self.rules.brand_set();
        if let Some(brand) = all_tokens.iter().find(|t| brands.contains(**t)) {
            applied.push(format!("brand:{}", brand));
        }

        let confidence = (CATEGORY_BASE_CONFIDENCE + CATEGORY_MODIFIER_STEP * applied.len() as f64)
            .min(CATEGORY_CONFIDENCE_CAP);
        let weight = round3(weight);

        let rationale = if applied.is_empty() {
            format!(
                "PATTERN_CATEGORY: category={}, base={}kg",
                rule.category, rule.base_weight_kg
            )
        } else {
            format!(
                "PATTERN_CATEGORY: category={}, base={}kg, modifiers=[{}], weight={}kg",
                rule.category,
                rule.base_weight_kg,
                applied.join(","),
                weight
            )
        };

        WeightCandidate::new(WeightSource::Pattern, weight, confidence, rationale).ok()
    }

    fn match_department(&self, tokens: &HashSet<&str>) -> Option<WeightCandidate> {
        let rule = self
            .rules
            .departments
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| tokens.contains(k.as_str())))?;

        let rationale = format!(
            "PATTERN_DEFAULT: department={}, default={}kg",
            rule.department, rule.default_weight_kg
        );
        WeightCandidate::new(
            WeightSource::Pattern,
            rule.default_weight_kg,
            DEPARTMENT_CONFIDENCE,
            rationale,
        )
        .ok()
    }
}

impl Default for PatternEstimator {
    fn default() -> Self {
        Self::new(PatternRuleSet::builtin())
    }
}

fn first_modifier<'a>(
    modifiers: &'a [ModifierRule],
    tokens: &HashSet<&str>,
) -> Option<&'a ModifierRule> {
    modifiers
        .iter()
        .find(|m| m.keywords.iter().any(|k| tokens.contains(k.as_str())))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> PatternEstimator {
        PatternEstimator::default()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("iPhone 15 Pro"), vec!["iphone", "15", "pro"]);
        assert_eq!(tokenize("T-Shirt (XL)"), vec!["t", "shirt", "xl"]);
        assert!(tokenize("  --  ").is_empty());
    }

    #[test]
    fn test_model_match_highest_confidence() {
        let c = estimator()
            .estimate("Apple iPhone 15 Pro 256GB", &EstimateHints::default())
            .unwrap();
        assert_eq!(c.source, WeightSource::Pattern);
        assert_eq!(c.value_kg, 0.187);
        assert_eq!(c.confidence, MODEL_MATCH_CONFIDENCE);
    }

    #[test]
    fn test_model_match_prefers_most_specific() {
        let c = estimator()
            .estimate("iPhone 15 Pro Max", &EstimateHints::default())
            .unwrap();
        assert_eq!(c.value_kg, 0.221);
        assert!(c.rationale.contains("iPhone 15 Pro Max"));
    }

    #[test]
    fn test_category_with_modifiers() {
        let hints = EstimateHints {
            brand: Some("Nike".to_string()),
            material: Some("Leather".to_string()),
        };
        let c = estimator().estimate("Running sneakers", &hints).unwrap();
        // 0.9 × 1.2 (leather)
        assert!((c.value_kg - 1.08).abs() < 1e-9);
        // 0.6 + 2 × 0.05
        assert!((c.confidence - 0.7).abs() < 1e-9);
        assert!(c.rationale.contains("material:leather"));
        assert!(c.rationale.contains("brand:nike"));
    }

    #[test]
    fn test_category_confidence_capped_below_model() {
        let hints = EstimateHints {
            brand: Some("Coach".to_string()),
            material: Some("leather".to_string()),
        };
        let c = estimator().estimate("Large handbag", &hints).unwrap();
        assert!(c.confidence <= CATEGORY_CONFIDENCE_CAP);
        assert!(c.confidence < MODEL_MATCH_CONFIDENCE);
    }

    #[test]
    fn test_department_default_lowest_confidence() {
        let c = estimator()
            .estimate("Kitchen gift set", &EstimateHints::default())
            .unwrap();
        assert_eq!(c.confidence, DEPARTMENT_CONFIDENCE);
        assert_eq!(c.value_kg, 1.0);
    }

    #[test]
    fn test_specificity_is_monotonic() {
        let e = estimator();
        let hints = EstimateHints::default();
        let model = e.estimate("MacBook Air", &hints).unwrap();
        let category = e.estimate("laptop", &hints).unwrap();
        let department = e.estimate("electronics", &hints).unwrap();
        assert!(model.confidence > category.confidence);
        assert!(category.confidence > department.confidence);
    }

    #[test]
    fn test_no_match_returns_none() {
        assert!(estimator()
            .estimate("Zyxw qrst", &EstimateHints::default())
            .is_none());
        assert!(estimator().estimate("", &EstimateHints::default()).is_none());
    }

    #[test]
    fn test_configured_hyphenated_model_keyword_matches() {
        let rules = PatternRuleSet::from_json(
            r#"{"models": [{"label": "Sony WH-1000XM5", "keywords": ["WH-1000XM5"], "weight_kg": 0.25}]}"#,
        )
        .unwrap();
        let c = PatternEstimator::new(rules)
            .estimate("Sony WH-1000XM5 headphones", &EstimateHints::default())
            .unwrap();
        assert_eq!(c.value_kg, 0.25);
        assert_eq!(c.confidence, MODEL_MATCH_CONFIDENCE);
    }

    #[test]
    fn test_pro_applies_size_modifier_in_category() {
        let c = estimator()
            .estimate("Pro headphones", &EstimateHints::default())
            .unwrap();
        // 0.25 × 1.25 (size:large)
        assert!((c.value_kg - 0.313).abs() < 1e-9);
        assert!(c.rationale.contains("size:large"));
    }
}
