//! Chat Routes
//!
//! 定义对话与会话相关的 API 路由。

use crate::api::handlers::chat_handler::*;
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;

/// 创建对话路由器
pub fn create_chat_router() -> Router<AppState> {
    Router::new()
        .route("/", get(service_info))
        .route("/chat", post(chat))
        .route("/sessions/:session_id/summary", get(session_summary))
}
