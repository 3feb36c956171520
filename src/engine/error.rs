// ==========================================
// 跨境报价系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 未命中（税则查无 / 规则未匹配）用 Option 表达，不是错误
//       判定只抛 InvalidInput 与 NoCandidate；BatchTask 仅见于批量编排
// ==========================================

use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 输入校验失败（非正尺寸、负价格等），在判定前拒绝，绝不静默修正
    #[error("无效输入 (field={field}): {message}")]
    InvalidInput { field: String, message: String },

    /// 无任何重量候选且未提供人工输入，调用方需提示人工录入
    #[error("无可用重量候选: {0}")]
    NoCandidate(String),

    /// 批量任务执行失败（阻塞任务 panic 或被取消），只影响该行
    #[error("批量任务执行失败: {0}")]
    BatchTask(String),
}

impl EngineError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 是否需要调用方提示人工录入重量
    pub fn requires_manual_entry(&self) -> bool {
        matches!(self, EngineError::NoCandidate(_))
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
