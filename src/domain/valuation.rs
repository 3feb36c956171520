// ==========================================
// 跨境报价系统 - 完税价格基准
// ==========================================
// 红线: 选择最低估价但缺少最低估价时，回退到商品价值并记录原因，
//       绝不静默取未定义值或 0
// ==========================================

use crate::domain::types::{BasisSource, ValuationMethod};
use serde::{Deserialize, Serialize};

// ==========================================
// ValuationBasis - 完税价格基准与关税
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationBasis {
    pub method: ValuationMethod,
    pub product_value: f64,             // 商品申报价值
    pub minimum_valuation: Option<f64>, // 官方最低估价
    pub resolved_base: f64,             // 最终完税价格基准
    pub basis_source: BasisSource,      // resolved_base 取自哪个数字
    pub duty_rate_percent: f64,         // 适用税率（%）
    pub duty_amount: f64,               // 关税（2 位小数，四舍五入）
    pub fallback_applied: bool,         // 是否发生了回退
    pub rationale: String,              // 可解释性
}

impl ValuationBasis {
    /// 完税价格 + 关税
    pub fn landed_base(&self) -> f64 {
        self.resolved_base + self.duty_amount
    }
}
