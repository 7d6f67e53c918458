//! 工具调用循环
//!
//! 一轮对话内：调用模型 → 执行其请求的工具 → 把结果交还模型，直到模型
//! 不再请求工具或达到轮数上限。工具顺序执行，失败只作为载荷回传，不中断循环。

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::llm::{ChatCompletion, ChatMessage, ChatModel, LlmError, ToolDefinition};
use crate::models::{ConversationMessage, Role};
use crate::observability::AppMetrics;
use crate::services::prompt::SYSTEM_PROMPT;
use crate::tools::registry::{ToolExecution, ToolRegistry};

/// 轮数耗尽或模型未给出文本时的固定回复
pub const FALLBACK_REPLY: &str =
    "I pulled together your data but couldn't finish my answer. Could you ask me that again?";

/// 未调用工具时值得告警的消息关键词
const DATA_KEYWORDS: &[&str] = &[
    "test",
    "exam",
    "score",
    "result",
    "performance",
    "progress",
    "analyze",
    "how am i",
];

/// 一轮对话的结果
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    pub text: String,
    /// 按执行顺序记录的工具调用
    pub executions: Vec<ToolExecution>,
    /// 执行过的工具批次数
    pub rounds: usize,
    pub iteration_limit_reached: bool,
}

impl TurnOutcome {
    pub fn tools_used(&self) -> Vec<String> {
        self.executions.iter().map(|e| e.name.clone()).collect()
    }
}

/// 工具调用循环
pub struct ToolCallingAgent {
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
    definitions: Vec<ToolDefinition>,
    max_rounds: usize,
    history_window: usize,
    metrics: Arc<AppMetrics>,
}

impl std::fmt::Debug for ToolCallingAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCallingAgent")
            .field("model", &"Arc<dyn ChatModel>")
            .field("tools", &self.definitions.len())
            .field("max_rounds", &self.max_rounds)
            .field("history_window", &self.history_window)
            .finish()
    }
}

impl ToolCallingAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        registry: ToolRegistry,
        max_rounds: usize,
        history_window: usize,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        let definitions = registry.specs().iter().map(ToolDefinition::from).collect();
        Self {
            model,
            registry,
            definitions,
            max_rounds,
            history_window,
            metrics,
        }
    }

    /// 执行一轮对话
    ///
    /// 模型最多被调用 `max_rounds + 1` 次；模型错误直接返回，由调用方映射为致歉文本。
    pub async fn run(
        &self,
        user_id: &str,
        history: &[ConversationMessage],
        message: &str,
    ) -> Result<TurnOutcome, LlmError> {
        let mut messages = self.build_messages(history, message);
        let mut executions = Vec::new();
        let mut rounds = 0;

        let mut completion = self.model.complete(&messages, &self.definitions).await?;

        while completion.wants_tools() && rounds < self.max_rounds {
            rounds += 1;
            let ChatCompletion {
                content,
                tool_calls,
                ..
            } = completion;
            info!(
                "Round {}: model requested {} tool call(s)",
                rounds,
                tool_calls.len()
            );

            messages.push(ChatMessage::assistant_tool_calls(content, tool_calls.clone()));

            for call in &tool_calls {
                let arguments = parse_arguments(&call.function.arguments);
                let execution = self
                    .registry
                    .execute(&call.function.name, arguments, user_id);
                self.metrics.record_tool_call(execution.succeeded);

                let payload = serde_json::to_string_pretty(&execution.result)
                    .unwrap_or_else(|_| execution.result.to_string());
                debug!(
                    "Tool {} returned: {}",
                    call.function.name,
                    preview(&payload, 200)
                );

                messages.push(ChatMessage::tool_result(
                    call.id.as_str(),
                    call.function.name.as_str(),
                    payload,
                ));
                executions.push(execution);
            }

            completion = self.model.complete(&messages, &self.definitions).await?;
        }

        let iteration_limit_reached = completion.wants_tools();
        if iteration_limit_reached {
            warn!(
                "Tool round limit ({}) reached, model still requesting tools",
                self.max_rounds
            );
        }

        if executions.is_empty() {
            let lowered = message.to_lowercase();
            if DATA_KEYWORDS.iter().any(|k| lowered.contains(k)) {
                warn!("Data question answered without calling any tools: {}", preview(message, 80));
            }
        }

        let text = match completion.content {
            Some(text) if !iteration_limit_reached && !text.trim().is_empty() => text,
            _ => FALLBACK_REPLY.to_string(),
        };

        Ok(TurnOutcome {
            text,
            executions,
            rounds,
            iteration_limit_reached,
        })
    }

    fn build_messages(&self, history: &[ConversationMessage], message: &str) -> Vec<ChatMessage> {
        let start = history.len().saturating_sub(self.history_window);
        let mut messages = Vec::with_capacity(history.len() - start + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend(history[start..].iter().filter_map(|m| match m.role {
            Role::User => Some(ChatMessage::user(m.content.as_str())),
            Role::Assistant => Some(ChatMessage::assistant(m.content.as_str())),
            Role::System => None,
        }));
        messages.push(ChatMessage::user(message));
        messages
    }
}

/// 解析模型给出的参数；不合法的 JSON 视为空对象
fn parse_arguments(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) => {
            if !raw.trim().is_empty() {
                warn!("Malformed tool arguments, using empty object: {}", preview(raw, 80));
            }
            Value::Object(Map::new())
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRole, MockChatModel, ToolCall};
    use crate::storage::seed::{DEMO_USER_ID, seeded_store};
    use serde_json::json;

    fn agent(model: MockChatModel, max_rounds: usize) -> ToolCallingAgent {
        ToolCallingAgent::new(
            Arc::new(model),
            ToolRegistry::new(Arc::new(seeded_store())),
            max_rounds,
            10,
            Arc::new(AppMetrics::default()),
        )
    }

    #[tokio::test]
    async fn test_plain_reply_without_tools() {
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|messages, tools| {
                assert_eq!(messages[0].role, ChatRole::System);
                assert_eq!(messages.last().unwrap().content.as_deref(), Some("hi there"));
                assert_eq!(tools.len(), 19);
                Ok(ChatCompletion::text("Hello!"))
            });

        let outcome = agent(model, 5).run(DEMO_USER_ID, &[], "hi there").await.unwrap();
        assert_eq!(outcome.text, "Hello!");
        assert_eq!(outcome.rounds, 0);
        assert!(outcome.executions.is_empty());
        assert!(!outcome.iteration_limit_reached);
    }

    #[tokio::test]
    async fn test_tool_result_is_fed_back_with_caller_identity() {
        let mut model = MockChatModel::new();
        let mut call = 0;
        model.expect_complete().times(2).returning(move |messages, _| {
            call += 1;
            if call == 1 {
                return Ok(ChatCompletion::tool_calls(vec![ToolCall::new(
                    "call_1",
                    "get_latest_test_results",
                    r#"{"user_id": "new-student"}"#,
                )]));
            }
            let tool_message = messages.last().unwrap();
            assert_eq!(tool_message.role, ChatRole::Tool);
            assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
            let payload: Value =
                serde_json::from_str(tool_message.content.as_deref().unwrap()).unwrap();
            assert_eq!(payload["total_score"], 800);
            assert_eq!(messages[messages.len() - 2].tool_calls.len(), 1);
            Ok(ChatCompletion::text("You scored 800."))
        });

        let outcome = agent(model, 5)
            .run(DEMO_USER_ID, &[], "what was my score?")
            .await
            .unwrap();
        assert_eq!(outcome.text, "You scored 800.");
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.executions.len(), 1);
        assert_eq!(outcome.executions[0].arguments["user_id"], DEMO_USER_ID);
        assert!(outcome.executions[0].succeeded);
    }

    #[tokio::test]
    async fn test_round_limit_stops_the_loop() {
        let mut model = MockChatModel::new();
        model.expect_complete().times(4).returning(|_, _| {
            Ok(ChatCompletion::tool_calls(vec![ToolCall::new(
                "call_x",
                "track_study_streak",
                "{}",
            )]))
        });

        let outcome = agent(model, 3).run(DEMO_USER_ID, &[], "streak?").await.unwrap();
        assert_eq!(outcome.rounds, 3);
        assert_eq!(outcome.executions.len(), 3);
        assert!(outcome.iteration_limit_reached);
        assert_eq!(outcome.text, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_malformed_arguments_become_empty_object() {
        let mut model = MockChatModel::new();
        let mut call = 0;
        model.expect_complete().times(2).returning(move |_, _| {
            call += 1;
            if call == 1 {
                Ok(ChatCompletion::tool_calls(vec![ToolCall::new(
                    "call_1",
                    "get_progress_summary",
                    "{not json",
                )]))
            } else {
                Ok(ChatCompletion::text("Here is your progress."))
            }
        });

        let outcome = agent(model, 5).run(DEMO_USER_ID, &[], "progress").await.unwrap();
        assert_eq!(
            outcome.executions[0].arguments,
            json!({ "user_id": DEMO_USER_ID })
        );
        assert!(outcome.executions[0].succeeded);
    }

    #[tokio::test]
    async fn test_model_error_is_returned() {
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .returning(|_, _| Err(LlmError::from_status(401, "bad key".into())));

        let err = agent(model, 5).run(DEMO_USER_ID, &[], "hi").await.unwrap_err();
        assert!(matches!(err, LlmError::Authentication { status: 401, .. }));
    }

    #[test]
    fn test_history_window_and_system_messages() {
        let model = MockChatModel::new();
        let agent = ToolCallingAgent::new(
            Arc::new(model),
            ToolRegistry::new(Arc::new(seeded_store())),
            5,
            2,
            Arc::new(AppMetrics::default()),
        );
        let history = vec![
            ConversationMessage::user("first"),
            ConversationMessage::assistant("reply", vec![]),
            ConversationMessage::system("Error: boom"),
            ConversationMessage::user("second"),
        ];
        let messages = agent.build_messages(&history, "third");
        let contents: Vec<_> = messages
            .iter()
            .skip(1)
            .map(|m| m.content.clone().unwrap())
            .collect();
        assert_eq!(contents, vec!["second", "third"]);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("héllo", 2), "hé...");
        assert_eq!(preview("ok", 5), "ok");
    }
}
