use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 对话消息角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 会话中的一条消息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    /// 生成该回复时调用过的工具
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_used: Option<Vec<String>>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), None)
    }

    pub fn assistant(content: impl Into<String>, tools_used: Vec<String>) -> Self {
        Self::new(Role::Assistant, content.into(), Some(tools_used))
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content.into(), None)
    }

    fn new(role: Role, content: String, tools_used: Option<Vec<String>>) -> Self {
        Self {
            role,
            content,
            tools_used,
            timestamp: Utc::now(),
        }
    }
}
