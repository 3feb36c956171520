// ==========================================
// 跨境报价系统 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::domain::types::ValuationMethod;
use crate::engine::pattern_rules::PatternRuleSet;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    // ===== 重量判定配置 =====

    /// 获取偏差阈值
    ///
    /// # 默认值
    /// - 0.5（相对差 50%）
    async fn get_discrepancy_threshold(&self) -> Result<f64, Box<dyn Error>>;

    /// 获取税则候选置信度
    ///
    /// # 默认值
    /// - 0.95
    async fn get_tariff_confidence(&self) -> Result<f64, Box<dyn Error>>;

    // ===== 体积重配置 =====

    /// 获取承运商体积重除数
    ///
    /// # 默认值
    /// - 5000（cm³/kg）
    async fn get_carrier_divisor(&self) -> Result<f64, Box<dyn Error>>;

    /// 获取体积重候选置信度
    ///
    /// # 默认值
    /// - 0.3
    async fn get_volumetric_confidence(&self) -> Result<f64, Box<dyn Error>>;

    // ===== 完税价格配置 =====

    /// 获取默认完税价格方法
    ///
    /// # 默认值
    /// - AUTO
    async fn get_default_valuation_method(&self) -> Result<ValuationMethod, Box<dyn Error>>;

    /// 获取税则未命中时的兜底税率（%）
    ///
    /// # 默认值
    /// - 0.0
    async fn get_fallback_duty_rate_percent(&self) -> Result<f64, Box<dyn Error>>;

    // ===== 规则集 =====

    /// 获取商品名估算规则集（进程启动时读取一次）
    ///
    /// # 返回
    /// - Some(PatternRuleSet): config_kv 中存在自定义规则集
    /// - None: 使用内置规则集
    async fn get_pattern_rules(&self) -> Result<Option<PatternRuleSet>, Box<dyn Error>>;

    /// 组装完整引擎配置
    async fn load_engine_config(&self) -> Result<EngineConfig, Box<dyn Error>> {
        let discrepancy_threshold = self.get_discrepancy_threshold().await?;
        let carrier_divisor = self.get_carrier_divisor().await?;
        let default_valuation_method = self.get_default_valuation_method().await?;
        let tariff_confidence = self.get_tariff_confidence().await?;
        let volumetric_confidence = self.get_volumetric_confidence().await?;
        let fallback_duty_rate_percent = self.get_fallback_duty_rate_percent().await?;

        let config = EngineConfig {
            discrepancy_threshold,
            carrier_divisor,
            default_valuation_method,
            tariff_confidence,
            volumetric_confidence,
            fallback_duty_rate_percent,
        };
        config.validate()?;
        Ok(config)
    }
}
