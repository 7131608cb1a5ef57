// ==========================================
// MRP 订单系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository/引擎错误为用户友好的错误消息
// 约定: 字段级错误保留字段名，便于界面定位输入项
// ==========================================

use crate::engine::error::WorkflowError;
use crate::importer::error::ImportError as ImportFailure;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    /// 字段级校验失败
    #[error("{field}: {message}")]
    FieldValueError { field: String, message: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::FieldValueError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    /// 面向用户的错误消息（不含分类前缀）
    pub fn message(&self) -> String {
        match self {
            ApiError::NotFound(m)
            | ApiError::BusinessRuleViolation(m)
            | ApiError::ValidationError(m)
            | ApiError::ImportError(m) => m.clone(),
            ApiError::FieldValueError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            // 约束冲突多由重复引用号/序列号引起, 按业务错误返回
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("记录已存在: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("关联记录无效: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
        }
    }
}

// ==========================================
// 从 WorkflowError 转换
// ==========================================
impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidTransition { from, action } => {
                ApiError::InvalidStateTransition { from, to: action }
            }
            WorkflowError::Field { field, message } => ApiError::FieldValueError { field, message },
            WorkflowError::Validation(msg) => ApiError::ValidationError(msg),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportFailure> for ApiError {
    fn from(err: ImportFailure) -> Self {
        match err {
            ImportFailure::DatabaseError(msg) => ApiError::DatabaseError(msg),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::not_found("Build", 3).into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Build"));
                assert!(msg.contains('3'));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError =
            RepositoryError::UniqueConstraintViolation("sales_order.reference".into()).into();
        assert!(matches!(api_err, ApiError::BusinessRuleViolation(_)));
    }

    #[test]
    fn test_workflow_error_conversion() {
        let api_err: ApiError = WorkflowError::InvalidTransition {
            from: "COMPLETE".into(),
            action: "CANCEL".into(),
        }
        .into();
        match api_err {
            ApiError::InvalidStateTransition { from, to } => {
                assert_eq!(from, "COMPLETE");
                assert_eq!(to, "CANCEL");
            }
            _ => panic!("Expected InvalidStateTransition"),
        }

        let api_err: ApiError = WorkflowError::field("quantity", "Quantity must be greater than zero").into();
        assert_eq!(api_err.message(), "Quantity must be greater than zero");
        assert!(matches!(api_err, ApiError::FieldValueError { ref field, .. } if field == "quantity"));
    }
}
