//! 服务模块
//!
//! 对话编排、工具调用循环、欢迎流程与回复后处理。

pub mod agent;
pub mod orchestrator;
pub mod postprocess;
pub mod prompt;
pub mod scenarios;
pub mod welcome;

pub use agent::{FALLBACK_REPLY, ToolCallingAgent, TurnOutcome};
pub use orchestrator::{
    ChatReply, ChatService, ChatServiceImpl, MessageCounts, ReplyMetadata, SessionSummary,
    create_chat_service,
};
pub use postprocess::ProcessedReply;
pub use welcome::{Welcome, build_welcome};
