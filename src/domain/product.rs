// ==========================================
// 跨境报价系统 - 商品描述领域模型
// ==========================================
// 红线: ProductDescriptor 创建后不可变，修改即生成新描述
// 用途: 报价行输入，引擎层只读
// ==========================================

use crate::domain::types::DimensionUnit;
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

// ==========================================
// PackageDimensions - 包裹尺寸
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackageDimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub unit: DimensionUnit,
}

impl PackageDimensions {
    pub fn new(length: f64, width: f64, height: f64, unit: DimensionUnit) -> Self {
        Self {
            length,
            width,
            height,
            unit,
        }
    }

    pub fn cm(length: f64, width: f64, height: f64) -> Self {
        Self::new(length, width, height, DimensionUnit::Cm)
    }

    /// 校验尺寸：任一边 ≤ 0 或非有限数即拒绝
    pub fn validate(&self) -> EngineResult<()> {
        for (field, value) in [
            ("dimensions.length", self.length),
            ("dimensions.width", self.width),
            ("dimensions.height", self.height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::invalid_input(
                    field,
                    format!("尺寸必须为正数: {}", value),
                ));
            }
        }
        Ok(())
    }

    /// 换算为厘米的 (长, 宽, 高)
    pub fn to_cm(&self) -> (f64, f64, f64) {
        let factor = self.unit.to_cm_factor();
        (self.length * factor, self.width * factor, self.height * factor)
    }

    /// 体积（cm³）
    pub fn volume_cm3(&self) -> f64 {
        let (l, w, h) = self.to_cm();
        l * w * h
    }
}

// ==========================================
// ProductDescriptor - 报价行商品描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDescriptor {
    // ===== 基础信息 =====
    pub name: String,                         // 商品名称（自由文本）
    #[serde(default)]
    pub source_url: Option<String>,           // 商品来源链接
    #[serde(default)]
    pub tariff_code: Option<String>,          // HSN/税则编码

    // ===== 价格与数量 =====
    pub declared_price: f64,                  // 单件申报价格
    #[serde(default = "default_quantity")]
    pub quantity: u32,                        // 数量（≥1）
    #[serde(default)]
    pub minimum_valuation: Option<f64>,       // 官方最低估价（单件）

    // ===== 包裹与估算提示 =====
    #[serde(default)]
    pub dimensions: Option<PackageDimensions>, // 包裹尺寸
    #[serde(default)]
    pub brand: Option<String>,                // 品牌提示
    #[serde(default)]
    pub material: Option<String>,             // 材质提示
}

fn default_quantity() -> u32 {
    1
}

impl ProductDescriptor {
    pub fn new(name: impl Into<String>, declared_price: f64) -> Self {
        Self {
            name: name.into(),
            source_url: None,
            tariff_code: None,
            declared_price,
            quantity: 1,
            minimum_valuation: None,
            dimensions: None,
            brand: None,
            material: None,
        }
    }

    pub fn with_source_url(self, url: impl Into<String>) -> Self {
        Self {
            source_url: Some(url.into()),
            ..self
        }
    }

    pub fn with_tariff_code(self, code: impl Into<String>) -> Self {
        Self {
            tariff_code: Some(code.into()),
            ..self
        }
    }

    pub fn with_quantity(self, quantity: u32) -> Self {
        Self { quantity, ..self }
    }

    pub fn with_minimum_valuation(self, minimum_valuation: f64) -> Self {
        Self {
            minimum_valuation: Some(minimum_valuation),
            ..self
        }
    }

    pub fn with_dimensions(self, dimensions: PackageDimensions) -> Self {
        Self {
            dimensions: Some(dimensions),
            ..self
        }
    }

    pub fn with_brand(self, brand: impl Into<String>) -> Self {
        Self {
            brand: Some(brand.into()),
            ..self
        }
    }

    pub fn with_material(self, material: impl Into<String>) -> Self {
        Self {
            material: Some(material.into()),
            ..self
        }
    }

    /// 报价行总价值（单价 × 数量）
    pub fn line_value(&self) -> f64 {
        self.declared_price * self.quantity as f64
    }

    /// 输入校验（判定前执行）
    ///
    /// 规则:
    /// 1) 名称非空
    /// 2) 申报价格为有限非负数
    /// 3) 数量 ≥ 1
    /// 4) 最低估价（若有）为有限非负数
    /// 5) 尺寸（若有）各边为正
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::invalid_input("name", "商品名称不能为空"));
        }

        if !self.declared_price.is_finite() || self.declared_price < 0.0 {
            return Err(EngineError::invalid_input(
                "declared_price",
                format!("申报价格必须为非负数: {}", self.declared_price),
            ));
        }

        if self.quantity == 0 {
            return Err(EngineError::invalid_input("quantity", "数量必须 ≥ 1"));
        }

        if let Some(min) = self.minimum_valuation {
            if !min.is_finite() || min < 0.0 {
                return Err(EngineError::invalid_input(
                    "minimum_valuation",
                    format!("最低估价必须为非负数: {}", min),
                ));
            }
        }

        if let Some(dims) = &self.dimensions {
            dims.validate()?;
        }

        Ok(())
    }
}
