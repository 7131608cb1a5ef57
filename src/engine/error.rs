// ==========================================
// MRP 订单系统 - 引擎层错误类型
// ==========================================
// 职责: 纯规则校验失败（不涉及数据库）
// ==========================================

use thiserror::Error;

/// 工作流规则错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// 状态转换不合法
    #[error("无效的状态转换: from={from} action={action}")]
    InvalidTransition { from: String, action: String },

    /// 字段级校验失败（对应具体输入字段）
    #[error("字段值错误 (field={field}): {message}")]
    Field { field: String, message: String },

    /// 非字段级校验失败
    #[error("数据验证失败: {0}")]
    Validation(String),
}

impl WorkflowError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        WorkflowError::Field {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }
}

/// Result 类型别名
pub type WorkflowResult<T> = Result<T, WorkflowError>;
