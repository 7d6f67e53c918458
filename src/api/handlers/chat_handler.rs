use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::chat_dto::*, extract::ValidatedJson},
    error::AppError,
};

pub async fn service_info() -> impl IntoResponse {
    Json(ServiceInfo {
        name: "PrepCoach AI Service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

pub async fn chat(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "Chat request from {} (session: {:?})",
        request.user_id, request.session_id
    );

    let reply = state
        .chat_service
        .handle_message(&request.user_id, &request.message, request.session_id)
        .await;

    Ok(Json(reply))
}

pub async fn session_summary(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Getting summary for session: {}", session_id);

    let summary = state
        .chat_service
        .session_summary(&session_id)
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", session_id)))?;

    Ok(Json(summary))
}
