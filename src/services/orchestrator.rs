//! 对话编排服务
//!
//! 负责会话记录与轮次调度：新会话走欢迎流程，其余消息经过工具调用循环与后处理，
//! 最终组装成移动端使用的响应信封。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::llm::LlmError;
use crate::models::{ConversationMessage, Role, UiElements};
use crate::observability::AppMetrics;
use crate::services::agent::{ToolCallingAgent, TurnOutcome};
use crate::services::postprocess::{self, ProcessedReply};
use crate::services::prompt::{requests_analysis, with_forced_tools};
use crate::services::welcome::{WELCOME_FOLLOW_UP, WELCOME_TOOLS, build_welcome};
use crate::storage::MemoryStore;

/// 编排失败时返回给用户的固定文本
pub const ORCHESTRATION_APOLOGY: &str =
    "I apologize, but I encountered an issue. Could you please rephrase your question?";

/// 响应元数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyMetadata {
    pub timestamp: DateTime<Utc>,
    pub tool_calls_made: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_welcome: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub iteration_limit_reached: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub response_overridden: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl ReplyMetadata {
    fn now(tool_calls_made: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            tool_calls_made,
            is_welcome: false,
            iteration_limit_reached: false,
            response_overridden: false,
            error: false,
        }
    }
}

/// `/chat` 响应信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub response: String,
    pub follow_ups: Vec<String>,
    pub tools_used: Vec<String>,
    pub ui_elements: UiElements,
    pub metadata: ReplyMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<Value>,
}

/// 按角色统计的消息数
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageCounts {
    pub user: usize,
    pub assistant: usize,
    pub system: usize,
}

/// 会话摘要
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    /// 用户消息条数
    pub total_turns: usize,
    pub message_counts: MessageCounts,
    pub started_at: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
}

/// 对话服务 trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// 处理一条用户消息；任何失败都转换为带致歉文本的响应，不向上传播
    async fn handle_message(
        &self,
        user_id: &str,
        message: &str,
        session_id: Option<String>,
    ) -> ChatReply;

    /// 会话摘要；会话不存在时返回 `None`
    fn session_summary(&self, session_id: &str) -> Option<SessionSummary>;
}

/// 对话服务实现
pub struct ChatServiceImpl {
    store: Arc<MemoryStore>,
    agent: Arc<ToolCallingAgent>,
    metrics: Arc<AppMetrics>,
    max_context_turns: usize,
    debug: bool,
}

impl std::fmt::Debug for ChatServiceImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatServiceImpl")
            .field("agent", &self.agent)
            .field("max_context_turns", &self.max_context_turns)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl ChatServiceImpl {
    /// 创建新的服务实例
    pub fn new(
        store: Arc<MemoryStore>,
        agent: Arc<ToolCallingAgent>,
        metrics: Arc<AppMetrics>,
        max_context_turns: usize,
        debug: bool,
    ) -> Self {
        Self {
            store,
            agent,
            metrics,
            max_context_turns,
            debug,
        }
    }

    /// 最近的用户/助手消息
    fn recent_history(&self, session_id: &str) -> Vec<ConversationMessage> {
        self.store
            .conversation_history(session_id, self.max_context_turns)
            .into_iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .collect()
    }

    fn welcome_turn(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Option<ChatReply> {
        let welcome = build_welcome(&self.store, user_id)?;
        info!("Starting session {} for {} with welcome flow", session_id, user_id);
        self.metrics.record_welcome_turn();

        let tools_used: Vec<String> = WELCOME_TOOLS.iter().map(|t| t.to_string()).collect();
        self.store
            .append_message(session_id, ConversationMessage::user(message));
        self.store.append_message(
            session_id,
            ConversationMessage::assistant(welcome.message.as_str(), tools_used.clone()),
        );

        let mut metadata = ReplyMetadata::now(tools_used.len());
        metadata.is_welcome = true;

        Some(ChatReply {
            session_id: session_id.to_string(),
            response: welcome.message,
            follow_ups: vec![WELCOME_FOLLOW_UP.to_string()],
            tools_used,
            ui_elements: welcome.ui_elements,
            metadata,
            error: None,
            error_code: None,
        })
    }

    async fn model_turn(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
        history: Vec<ConversationMessage>,
    ) -> Result<ChatReply, AppError> {
        self.store
            .append_message(session_id, ConversationMessage::user(message));

        let prompt = if requests_analysis(message) {
            info!("Analysis requested, instructing model to call analysis tools");
            with_forced_tools(message, user_id)
        } else {
            message.to_string()
        };

        let agent = Arc::clone(&self.agent);
        let caller = user_id.to_string();
        let context = history.clone();
        let outcome = tokio::spawn(async move { agent.run(&caller, &context, &prompt).await })
            .await
            .map_err(|e| AppError::Internal(format!("turn task failed: {}", e)))?;

        self.metrics.record_chat_turn();

        let (outcome, failure) = match outcome {
            Ok(outcome) => (outcome, None),
            Err(e) => {
                warn!("Model service error for session {}: {}", session_id, e);
                self.metrics.record_llm_error();
                let outcome = TurnOutcome {
                    text: e.apology(),
                    ..TurnOutcome::default()
                };
                (outcome, Some(e))
            }
        };

        let ProcessedReply {
            text,
            overridden,
            ui_elements,
            follow_ups,
        } = postprocess::process(&outcome.text, &outcome.executions, &history);
        if overridden {
            self.metrics.record_override();
        }

        let tools_used = outcome.tools_used();
        self.store.append_message(
            session_id,
            ConversationMessage::assistant(text.as_str(), tools_used.clone()),
        );

        let mut metadata = ReplyMetadata::now(outcome.executions.len());
        metadata.iteration_limit_reached = outcome.iteration_limit_reached;
        metadata.response_overridden = overridden;

        info!(
            "Session {} turn complete: {} tool call(s) over {} round(s)",
            session_id,
            outcome.executions.len(),
            outcome.rounds
        );

        Ok(ChatReply {
            session_id: session_id.to_string(),
            response: text,
            follow_ups,
            tools_used,
            ui_elements,
            metadata,
            error: failure.as_ref().map(LlmError::to_string),
            error_code: failure.as_ref().map(LlmError::code),
        })
    }

    fn failure_reply(&self, session_id: &str, e: &AppError) -> ChatReply {
        error!("Orchestration failed for session {}: {}", session_id, e);
        self.metrics.record_error();
        self.store
            .append_message(session_id, ConversationMessage::system(format!("Error: {}", e)));

        let mut metadata = ReplyMetadata::now(0);
        metadata.error = true;

        ChatReply {
            session_id: session_id.to_string(),
            response: ORCHESTRATION_APOLOGY.to_string(),
            follow_ups: Vec::new(),
            tools_used: Vec::new(),
            ui_elements: UiElements::default(),
            metadata,
            error: Some(if self.debug {
                e.to_string()
            } else {
                "An error occurred".to_string()
            }),
            error_code: None,
        }
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn handle_message(
        &self,
        user_id: &str,
        message: &str,
        session_id: Option<String>,
    ) -> ChatReply {
        let is_new_session = session_id.is_none();
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let history = self.recent_history(&session_id);
        if is_new_session && history.is_empty() {
            if let Some(reply) = self.welcome_turn(user_id, &session_id, message) {
                return reply;
            }
            info!("No profile for {}, answering first message with the model", user_id);
        }

        match self.model_turn(user_id, &session_id, message, history).await {
            Ok(reply) => reply,
            Err(e) => self.failure_reply(&session_id, &e),
        }
    }

    fn session_summary(&self, session_id: &str) -> Option<SessionSummary> {
        let messages = self.store.full_conversation(session_id)?;

        let mut counts = MessageCounts::default();
        for message in &messages {
            match message.role {
                Role::User => counts.user += 1,
                Role::Assistant => counts.assistant += 1,
                Role::System => counts.system += 1,
            }
        }

        Some(SessionSummary {
            session_id: session_id.to_string(),
            total_turns: counts.user,
            message_counts: counts,
            started_at: messages.first().map(|m| m.timestamp),
            last_activity: messages.last().map(|m| m.timestamp),
        })
    }
}

/// 创建对话服务
pub fn create_chat_service(
    store: Arc<MemoryStore>,
    agent: Arc<ToolCallingAgent>,
    metrics: Arc<AppMetrics>,
    max_context_turns: usize,
    debug: bool,
) -> Box<dyn ChatService> {
    Box::new(ChatServiceImpl::new(
        store,
        agent,
        metrics,
        max_context_turns,
        debug,
    ))
}
