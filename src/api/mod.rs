//! API 模块
//!
//! 提供 REST API 支持。

#[cfg(test)]
mod api_tests;
pub mod app_state;
pub mod dto;
pub mod extract;
pub mod handlers;
pub mod routes;

use crate::api::app_state::AppState;
use crate::observability::{ObservabilityState, create_observability_router, metrics_middleware};
use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .merge(routes::chat_routes::create_chat_router())
        .merge(routes::user_routes::create_user_router())
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&app_state.metrics),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        // 移动端客户端来自任意来源
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// API 路由与 `/health`、`/metrics` 合并后的完整应用
pub fn create_app(app_state: AppState) -> Router {
    let observability_state = Arc::new(ObservabilityState::new(
        Arc::clone(&app_state.metrics),
        env!("CARGO_PKG_VERSION").to_string(),
        app_state.config.environment.clone(),
    ));
    create_observability_router(observability_state).merge(create_router(app_state))
}
