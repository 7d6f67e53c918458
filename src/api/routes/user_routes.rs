//! User Routes
//!
//! 定义学员档案与测验相关的 API 路由。

use crate::api::handlers::user_handler::*;
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;

/// 创建学员路由器
pub fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/user/:user_id/profile", get(get_profile))
        .route("/user/:user_id/quiz/generate", post(generate_quiz))
        .route("/user/:user_id/quiz/submit", post(submit_quiz))
}
