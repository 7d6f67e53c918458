//! 模型服务错误

use serde_json::{Value, json};
use thiserror::Error;

/// 模型服务调用失败的分类
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Authentication with the model service failed (status {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Model service rate limit or quota exceeded: {0}")]
    RateLimited(String),

    #[error("Model service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Model service request failed: {0}")]
    Transport(String),

    #[error("Could not decode model service response: {0}")]
    Decode(String),

    #[error("Model service returned no choices")]
    EmptyResponse,
}

impl LlmError {
    /// 由 HTTP 状态和响应体分类
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => LlmError::Authentication {
                status,
                message: body,
            },
            429 => LlmError::RateLimited(body),
            _ => LlmError::Api {
                status,
                message: body,
            },
        }
    }

    /// 机器可读错误码
    pub fn code(&self) -> Value {
        match self {
            LlmError::Authentication { status, .. } => json!(status),
            LlmError::RateLimited(_) => json!(429),
            LlmError::Api { status, .. } => json!(status),
            LlmError::Transport(_) => json!("transport_error"),
            LlmError::Decode(_) => json!("decode_error"),
            LlmError::EmptyResponse => json!("empty_response"),
        }
    }

    /// 面向用户的固定致歉文本
    pub fn apology(&self) -> String {
        match self {
            LlmError::Authentication { .. } => "I apologize, but there's an authentication issue with the API. Please check your API key configuration in the .env file.".to_string(),
            LlmError::RateLimited(_) => {
                "I encountered an API error (code 429). Please try again later.".to_string()
            }
            LlmError::Api { status, .. } => format!(
                "I encountered an API error (code {}). Please try again later.",
                status
            ),
            LlmError::Transport(_) | LlmError::Decode(_) => {
                "I encountered an error with the AI service. Please try again.".to_string()
            }
            LlmError::EmptyResponse => {
                "I apologize, but I encountered an error. Let's try that again.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LlmError::Decode(e.to_string())
        } else {
            LlmError::Transport(e.to_string())
        }
    }
}
