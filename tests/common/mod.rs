// Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use prepcoach::api::app_state::AppState;
use prepcoach::config::AppConfig;
use prepcoach::llm::{ChatCompletion, ChatMessage, ChatModel, LlmError, ToolDefinition};
use prepcoach::storage::{MemoryStore, seed};
use std::collections::VecDeque;
use std::sync::Arc;

/// 按顺序返回预设回复的模型；脚本耗尽后重复最后一条
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<ChatCompletion, LlmError>>>,
    last: Mutex<Option<ChatCompletion>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<ChatCompletion, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(completions: Vec<ChatCompletion>) -> Arc<Self> {
        Self::new(completions.into_iter().map(Ok).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// 第 `index` 次调用收到的消息
    pub fn messages(&self, index: usize) -> Vec<ChatMessage> {
        self.calls.lock()[index].clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ChatCompletion, LlmError> {
        self.calls.lock().push(messages.to_vec());

        match self.script.lock().pop_front() {
            Some(Ok(completion)) => {
                *self.last.lock() = Some(completion.clone());
                Ok(completion)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .clone()
                .ok_or(LlmError::EmptyResponse),
        }
    }
}

pub fn store() -> Arc<MemoryStore> {
    Arc::new(seed::load().unwrap())
}

pub fn app_state(model: Arc<ScriptedModel>) -> AppState {
    app_state_with(AppConfig::default(), store(), model)
}

pub fn app_state_with(config: AppConfig, store: Arc<MemoryStore>, model: Arc<ScriptedModel>) -> AppState {
    AppState::with_model(config, store, model)
}
