//! 对话 DTO

use serde::{Deserialize, Serialize};
use validator::Validate;

/// `/chat` 请求
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ChatRequest {
    /// 学员 ID
    #[validate(length(min = 1, message = "user_id is required"))]
    pub user_id: String,
    /// 用户消息
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    /// 会话 ID，缺省时新建会话
    pub session_id: Option<String>,
}

/// `GET /` 响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub status: String,
}
