//! 工具函数模块
//!
//! 模型可调用的工具目录。每个工具是 `&MemoryStore` 上的普通函数，
//! 返回 `ToolResult<T>`；由 [`registry::ToolRegistry`] 负责参数解析、
//! 身份注入与结果序列化。

pub mod explanations;
pub mod motivation;
pub mod performance;
pub mod profile;
pub mod progress;
pub mod quiz;
pub mod recommendations;
pub mod registry;
pub mod stats;

use serde_json::{Value, json};
use thiserror::Error;

use crate::error::AppError;

/// 工具执行错误
///
/// 不会中断对话轮次：注册表把它转换为 `{"error": ...}` 载荷交还模型。
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("User not found")]
    UserNotFound { user_id: String },

    #[error("No test results found for user {user_id}")]
    NoTestResults { user_id: String },

    #[error("Test with ID {test_id} not found for user {user_id}")]
    TestNotFound { user_id: String, test_id: String },

    #[error("No test history available")]
    NoTestHistory,

    #[error("No target score set")]
    NoTargetScore,

    #[error("No section data available")]
    NoSectionData,

    #[error("Question not found")]
    QuestionNotFound { question_id: String },

    #[error("Quiz {quiz_id} does not belong to this user")]
    QuizOwnership { quiz_id: String },

    #[error("No questions available matching criteria")]
    NoQuestions { details: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool {name} failed unexpectedly: {reason}")]
    Panicked { name: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// 交给模型的错误载荷
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({ "error": self.to_string() });
        let extra = match self {
            ToolError::UserNotFound { user_id } => json!({ "user_id": user_id }),
            ToolError::NoTestResults { user_id } => json!({
                "user_id": user_id,
                "message": "No test results found. Make sure you have taken a practice test.",
            }),
            ToolError::TestNotFound { user_id, test_id } => {
                json!({ "user_id": user_id, "test_id": test_id })
            }
            ToolError::QuestionNotFound { question_id } => json!({ "question_id": question_id }),
            ToolError::QuizOwnership { quiz_id } => json!({ "quiz_id": quiz_id }),
            ToolError::NoQuestions { details } => json!({ "details": details }),
            _ => Value::Null,
        };
        if let (Some(map), Value::Object(extra)) = (payload.as_object_mut(), extra) {
            map.extend(extra);
        }
        payload
    }
}

impl From<ToolError> for AppError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::UserNotFound { user_id } => {
                AppError::NotFound(format!("User not found: {}", user_id))
            }
            ToolError::TestNotFound { .. } | ToolError::QuestionNotFound { .. } => {
                AppError::NotFound(e.to_string())
            }
            ToolError::QuizOwnership { .. } => AppError::Authorization(e.to_string()),
            ToolError::NoQuestions { ref details } => AppError::InvalidRequest {
                message: e.to_string(),
                details: details.clone(),
            },
            ToolError::Serialization(err) => AppError::Serialization(err.to_string()),
            ToolError::Panicked { .. } => AppError::Internal(e.to_string()),
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// 工具结果类型别名
pub type ToolResult<T> = std::result::Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_carries_context() {
        let payload = ToolError::UserNotFound {
            user_id: "ghost".into(),
        }
        .to_payload();
        assert_eq!(payload["error"], "User not found");
        assert_eq!(payload["user_id"], "ghost");

        let payload = ToolError::NoTestHistory.to_payload();
        assert_eq!(payload, json!({ "error": "No test history available" }));
    }

    #[test]
    fn test_app_error_mapping() {
        let err: AppError = ToolError::UserNotFound {
            user_id: "x".into(),
        }
        .into();
        assert!(matches!(err, AppError::NotFound(_)));

        let err: AppError = ToolError::NoQuestions {
            details: "section=reading".into(),
        }
        .into();
        assert!(
            matches!(err, AppError::InvalidRequest { ref details, .. } if details == "section=reading")
        );

        let err: AppError = ToolError::NoTargetScore.into();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
