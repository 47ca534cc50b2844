// ==========================================
// 物流批次跟踪系统 - API层错误类型
// ==========================================
// 职责: 统一错误分类，转换下层错误为可展示的错误消息
// 分类: NotFound / InvalidState / ReferenceNotFound / Conflict /
//       ValidationError / Forbidden / Unexpected
// ==========================================

use crate::engine::{AssignmentError, MembershipError, TransitionError};
use crate::repository::error::RepositoryError;
use serde::Serialize;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 当前状态不允许该操作 (总是携带当前状态与要求状态)
    #[error("{message}")]
    InvalidState {
        current: String,
        required: Vec<String>,
        message: String,
    },

    #[error("引用的资源不存在: {0}")]
    ReferenceNotFound(String),

    #[error("操作冲突: {0}")]
    Conflict(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("无权执行该操作: {0}")]
    Forbidden(String),

    /// 下层意外错误 (完整信息只写日志)
    #[error("内部错误: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// 机器可读的错误类别
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidState { .. } => "INVALID_STATE",
            ApiError::ReferenceNotFound(_) => "REFERENCE_NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Unexpected(_) => "UNEXPECTED",
        }
    }

    /// HTTP 状态码
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidState { .. }
            | ApiError::ReferenceNotFound(_)
            | ApiError::Conflict(_)
            | ApiError::ValidationError(_) => 400,
            ApiError::Forbidden(_) => 403,
            ApiError::Unexpected(_) => 500,
        }
    }

    /// 对外展示的消息 (意外错误不暴露细节)
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Unexpected(_) => "服务器内部错误，请稍后重试".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            success: false,
            code: self.code(),
            message: self.public_message(),
        }
    }

    pub fn not_found(entity: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{}(id={})不存在", entity, id))
    }

    pub fn reference_not_found(entity: &str, id: i64) -> Self {
        ApiError::ReferenceNotFound(format!("{}(id={})不存在", entity, id))
    }
}

/// 错误响应体
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub code: &'static str,
    pub message: String,
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::OptimisticLockFailure {
                entity,
                id,
                expected,
                actual,
            } => ApiError::Conflict(format!(
                "{}(id={})已被其他请求修改（期望revision={}，实际revision={}），请重试",
                entity, id, expected, actual
            )),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ReferenceNotFound(format!("外键约束违反: {}", msg))
            }
            other => ApiError::Unexpected(other.to_string()),
        }
    }
}

// ==========================================
// 从引擎错误转换
// ==========================================
impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        let message = err.to_string();
        match err {
            TransitionError::InvalidState {
                current, required, ..
            } => ApiError::InvalidState {
                current: current.to_db_str().to_string(),
                required: required.iter().map(|s| s.to_db_str().to_string()).collect(),
                message,
            },
        }
    }
}

impl From<MembershipError> for ApiError {
    fn from(err: MembershipError) -> Self {
        let message = err.to_string();
        match err {
            MembershipError::BatchNotOpen { current } => ApiError::InvalidState {
                current: current.to_db_str().to_string(),
                required: vec!["OPEN".to_string()],
                message,
            },
            MembershipError::AlreadyInBatch { .. } | MembershipError::NotInBatch { .. } => {
                ApiError::Conflict(message)
            }
        }
    }
}

impl From<AssignmentError> for ApiError {
    fn from(err: AssignmentError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

/// 记录失败操作日志并原样返回错误
///
/// 意外错误记 error 级别 (完整信息)，业务拒绝记 warn 级别
pub fn log_failure(operation: &str, target_id: Option<i64>, err: ApiError) -> ApiError {
    match &err {
        ApiError::Unexpected(detail) => {
            tracing::error!(operation, target_id = ?target_id, detail = %detail, "操作意外失败");
        }
        other => {
            tracing::warn!(
                operation,
                target_id = ?target_id,
                code = other.code(),
                reason = %other,
                "操作被拒绝"
            );
        }
    }
    err
}
