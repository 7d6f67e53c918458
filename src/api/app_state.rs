use crate::config::AppConfig;
use crate::llm::ChatModel;
use crate::observability::AppMetrics;
use crate::services::agent::ToolCallingAgent;
use crate::services::orchestrator::{ChatService, create_chat_service};
use crate::storage::MemoryStore;
use crate::tools::registry::ToolRegistry;
use std::sync::Arc;

/// Application state containing all shared services
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    /// In-memory data store
    pub store: Arc<MemoryStore>,
    /// Chat service driving each conversation turn
    pub chat_service: Arc<dyn ChatService>,
    /// Process-wide counters
    pub metrics: Arc<AppMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("environment", &self.config.environment)
            .field("store", &"Arc<MemoryStore>")
            .field("chat_service", &"Arc<dyn ChatService>")
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: AppConfig,
        store: Arc<MemoryStore>,
        chat_service: Box<dyn ChatService>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            chat_service: Arc::from(chat_service),
            metrics,
        }
    }

    /// Wire the tool registry, tool-calling agent and chat service around a model
    pub fn with_model(config: AppConfig, store: Arc<MemoryStore>, model: Arc<dyn ChatModel>) -> Self {
        let metrics = Arc::new(AppMetrics::default());
        let agent = Arc::new(ToolCallingAgent::new(
            model,
            ToolRegistry::new(Arc::clone(&store)),
            config.llm.max_tool_rounds,
            config.llm.history_window,
            Arc::clone(&metrics),
        ));
        let chat_service = create_chat_service(
            Arc::clone(&store),
            agent,
            Arc::clone(&metrics),
            config.conversation.max_context_turns,
            config.debug,
        );
        Self::new(config, store, chat_service, metrics)
    }
}
