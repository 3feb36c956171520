// ==========================================
// 跨境报价系统 - 商品名重量规则集
// ==========================================
// 红线: 规则为静态数据，进程启动时加载一次；估算过程零写入
// 层级: 型号规则 > 品类规则(+尺码/材质/品牌修正) > 大类默认
// ==========================================

use crate::engine::pattern_estimator::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 型号规则：全部关键词命中即匹配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRule {
    pub label: String,
    pub keywords: Vec<String>,
    pub weight_kg: f64,
}

/// 品类规则：任一关键词命中即匹配，提供基准重量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
    pub base_weight_kg: f64,
}

/// 修正规则：任一关键词命中即对基准重量乘以系数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierRule {
    pub label: String,
    pub keywords: Vec<String>,
    pub factor: f64,
}

/// 大类默认规则（最低置信度）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRule {
    pub department: String,
    pub keywords: Vec<String>,
    pub default_weight_kg: f64,
}

// ==========================================
// PatternRuleSet - 规则集
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRuleSet {
    #[serde(default)]
    pub models: Vec<ModelRule>,
    #[serde(default)]
    pub categories: Vec<CategoryRule>,
    #[serde(default)]
    pub size_modifiers: Vec<ModifierRule>,
    #[serde(default)]
    pub material_modifiers: Vec<ModifierRule>,
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub departments: Vec<DepartmentRule>,
}

impl PatternRuleSet {
    /// 从 JSON 加载规则集（启动时调用一次）
    pub fn from_json(raw: &str) -> Result<Self, String> {
        let rules: PatternRuleSet =
            serde_json::from_str(raw).map_err(|e| format!("规则集 JSON 解析失败: {}", e))?;
        rules.validate()?;
        Ok(rules.normalized())
    }

    /// 校验：重量与系数必须为正，关键词可分词
    ///
    /// 任一命中类规则（品类/修正/大类/品牌）的关键词必须是单个词元，
    /// 否则与商品名分词结果永远不会相等
    pub fn validate(&self) -> Result<(), String> {
        for rule in &self.models {
            check_rule(&rule.label, &rule.keywords, rule.weight_kg)?;
        }
        for rule in &self.categories {
            check_rule(&rule.category, &rule.keywords, rule.base_weight_kg)?;
            check_single_tokens(&rule.category, &rule.keywords)?;
        }
        for rule in self.size_modifiers.iter().chain(self.material_modifiers.iter()) {
            check_rule(&rule.label, &rule.keywords, rule.factor)?;
            check_single_tokens(&rule.label, &rule.keywords)?;
        }
        for rule in &self.departments {
            check_rule(&rule.department, &rule.keywords, rule.default_weight_kg)?;
            check_single_tokens(&rule.department, &rule.keywords)?;
        }
        check_single_tokens("brands", &self.brands)?;
        Ok(())
    }

    /// 关键词按商品名同一规则分词
    /// 型号规则为全部命中，多词关键词展开为多个必需词元
    fn normalized(mut self) -> Self {
        self.models
            .iter_mut()
            .for_each(|r| r.keywords = flatten_tokens(&r.keywords));
        self.categories
            .iter_mut()
            .for_each(|r| r.keywords = flatten_tokens(&r.keywords));
        self.size_modifiers
            .iter_mut()
            .for_each(|r| r.keywords = flatten_tokens(&r.keywords));
        self.material_modifiers
            .iter_mut()
            .for_each(|r| r.keywords = flatten_tokens(&r.keywords));
        self.departments
            .iter_mut()
            .for_each(|r| r.keywords = flatten_tokens(&r.keywords));
        self.brands = flatten_tokens(&self.brands);
        self
    }

    /// 品牌集合（用于快速命中判断）
    pub fn brand_set(&self) -> HashSet<&str> {
        self.brands.iter().map(|b| b.as_str()).collect()
    }

    /// 内置规则集
    pub fn builtin() -> Self {
        fn words(ks: &[&str]) -> Vec<String> {
            ks.iter().map(|k| k.to_string()).collect()
        }

        Self {
            models: MODEL_SEEDS
                .iter()
                .map(|(label, ks, w)| ModelRule {
                    label: label.to_string(),
                    keywords: words(ks),
                    weight_kg: *w,
                })
                .collect(),
            categories: CATEGORY_SEEDS
                .iter()
                .map(|(category, ks, w)| CategoryRule {
                    category: category.to_string(),
                    keywords: words(ks),
                    base_weight_kg: *w,
                })
                .collect(),
            size_modifiers: SIZE_SEEDS
                .iter()
                .map(|(label, ks, f)| ModifierRule {
                    label: label.to_string(),
                    keywords: words(ks),
                    factor: *f,
                })
                .collect(),
            material_modifiers: MATERIAL_SEEDS
                .iter()
                .map(|(label, ks, f)| ModifierRule {
                    label: label.to_string(),
                    keywords: words(ks),
                    factor: *f,
                })
                .collect(),
            brands: words(BRAND_SEEDS),
            departments: DEPARTMENT_SEEDS
                .iter()
                .map(|(department, ks, w)| DepartmentRule {
                    department: department.to_string(),
                    keywords: words(ks),
                    default_weight_kg: *w,
                })
                .collect(),
        }
    }
}

impl Default for PatternRuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

fn check_rule(label: &str, keywords: &[String], value: f64) -> Result<(), String> {
    if keywords.iter().all(|k| tokenize(k).is_empty()) {
        return Err(format!("规则 {} 缺少关键词", label));
    }
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("规则 {} 数值必须为正数: {}", label, value));
    }
    Ok(())
}

fn check_single_tokens(label: &str, keywords: &[String]) -> Result<(), String> {
    match keywords.iter().find(|k| tokenize(k).len() > 1) {
        Some(k) => Err(format!("规则 {} 的关键词 \"{}\" 含多个词元，无法单词命中", label, k)),
        None => Ok(()),
    }
}

/// 关键词分词并去重（保持首次出现顺序）
fn flatten_tokens(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .flat_map(|k| tokenize(k))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

// ==========================================
// 内置种子数据
// ==========================================

// (型号, 关键词, 单件重量kg)
const MODEL_SEEDS: &[(&str, &[&str], f64)] = &[
    ("iPhone 15", &["iphone", "15"], 0.171),
    ("iPhone 15 Pro", &["iphone", "15", "pro"], 0.187),
    ("iPhone 15 Pro Max", &["iphone", "15", "pro", "max"], 0.221),
    ("iPhone 14", &["iphone", "14"], 0.172),
    ("Galaxy S24", &["galaxy", "s24"], 0.167),
    ("Galaxy S24 Ultra", &["galaxy", "s24", "ultra"], 0.232),
    ("Pixel 8", &["pixel", "8"], 0.187),
    ("MacBook Air", &["macbook", "air"], 1.24),
    ("MacBook Pro", &["macbook", "pro"], 1.61),
    ("iPad Air", &["ipad", "air"], 0.462),
    ("iPad Pro", &["ipad", "pro"], 0.682),
    ("AirPods Pro", &["airpods", "pro"], 0.061),
    ("Apple Watch", &["apple", "watch"], 0.039),
    ("Kindle Paperwhite", &["kindle", "paperwhite"], 0.205),
    ("Nintendo Switch OLED", &["switch", "oled"], 0.42),
    ("PlayStation 5", &["playstation", "5"], 4.5),
    ("Sony WH-1000XM5", &["wh", "1000xm5"], 0.25),
];

// (品类, 关键词, 基准重量kg)
const CATEGORY_SEEDS: &[(&str, &[&str], f64)] = &[
    ("smartphone", &["phone", "smartphone", "iphone", "mobile"], 0.2),
    ("laptop", &["laptop", "notebook", "macbook", "chromebook"], 1.8),
    ("tablet", &["tablet", "ipad"], 0.5),
    ("headphones", &["headphones", "headphone", "earbuds", "earphones", "headset"], 0.25),
    ("watch", &["watch", "smartwatch"], 0.1),
    ("camera", &["camera", "dslr", "mirrorless"], 0.7),
    ("charger", &["charger", "adapter", "powerbank"], 0.15),
    ("footwear", &["shoes", "shoe", "sneakers", "sneaker", "boots", "sandals"], 0.9),
    ("tshirt", &["tshirt", "tee", "shirt"], 0.2),
    ("jeans", &["jeans", "trousers", "pants"], 0.6),
    ("outerwear", &["jacket", "coat", "hoodie", "sweater"], 0.9),
    ("dress", &["dress", "skirt"], 0.4),
    ("bag", &["handbag", "bag", "backpack", "wallet", "purse"], 0.8),
    ("perfume", &["perfume", "fragrance", "cologne"], 0.35),
    ("cosmetics", &["lipstick", "mascara", "foundation", "serum", "cream"], 0.1),
    ("book", &["book", "paperback", "hardcover"], 0.4),
    ("mug", &["mug", "cup", "tumbler"], 0.35),
    ("toy", &["toy", "lego", "puzzle", "doll"], 0.5),
];

// (修正, 关键词, 系数)
const SIZE_SEEDS: &[(&str, &[&str], f64)] = &[
    ("size:mini", &["mini", "micro", "compact"], 0.75),
    ("size:slim", &["slim", "lite", "light"], 0.85),
    ("size:large", &["max", "pro", "plus", "large", "xl"], 1.25),
    ("size:xxl", &["xxl", "jumbo", "oversized"], 1.4),
];

const MATERIAL_SEEDS: &[(&str, &[&str], f64)] = &[
    ("material:leather", &["leather"], 1.2),
    ("material:steel", &["steel", "metal", "iron"], 1.3),
    ("material:glass", &["glass"], 1.2),
    ("material:ceramic", &["ceramic", "porcelain"], 1.1),
    ("material:wood", &["wood", "wooden", "bamboo"], 1.15),
    ("material:aluminum", &["aluminum", "aluminium", "titanium"], 0.9),
    ("material:plastic", &["plastic", "silicone"], 0.85),
    ("material:cotton", &["cotton", "linen", "silk"], 0.95),
];

const BRAND_SEEDS: &[&str] = &[
    "apple", "samsung", "google", "sony", "xiaomi", "huawei", "dell", "hp", "lenovo", "asus",
    "nike", "adidas", "puma", "zara", "uniqlo", "gucci", "coach", "canon", "nikon", "lego",
    "nintendo", "dior", "chanel",
];

// (大类, 关键词, 默认重量kg)
const DEPARTMENT_SEEDS: &[(&str, &[&str], f64)] = &[
    ("electronics", &["electronics", "electronic", "gadget", "device"], 0.5),
    ("apparel", &["clothing", "apparel", "wear", "fashion"], 0.4),
    ("accessories", &["accessory", "accessories", "jewelry", "jewellery"], 0.15),
    ("beauty", &["beauty", "cosmetic", "cosmetics", "skincare", "makeup"], 0.2),
    ("home", &["home", "kitchen", "decor", "furniture"], 1.0),
    ("sports", &["sports", "fitness", "outdoor", "yoga"], 1.0),
];
