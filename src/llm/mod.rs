//! 模型服务模块
//!
//! `ChatModel` 抽象一次 Chat Completions 调用；`OpenAiChatModel` 是
//! OpenAI 兼容服务的 HTTP 实现。

pub mod error;
pub mod openai;
pub mod types;

use async_trait::async_trait;

use crate::config::LlmConfig;

pub use error::LlmError;
pub use openai::OpenAiChatModel;
pub use types::{ChatCompletion, ChatMessage, ChatRole, ToolCall, ToolDefinition};

/// 聊天模型
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 发送完整消息列表与工具目录，返回模型的一次回复
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatCompletion, LlmError>;
}

/// 创建聊天模型
pub fn create_chat_model(config: &LlmConfig) -> Result<Box<dyn ChatModel>, LlmError> {
    Ok(Box::new(OpenAiChatModel::new(config)?))
}
