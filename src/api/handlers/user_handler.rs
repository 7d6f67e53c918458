use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::quiz_dto::*, extract::ValidatedJson},
    error::AppError,
    tools::{
        profile::{UserArgs, get_user_profile},
        quiz::{GenerateQuizArgs, SubmitQuizArgs, generate_adaptive_quiz, submit_quiz_response},
    },
};

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Getting profile for user: {}", user_id);

    let profile = get_user_profile(&state.store, UserArgs { user_id })?;
    Ok(Json(profile))
}

pub async fn generate_quiz(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ValidatedJson(request): ValidatedJson<GenerateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Generating {}-question quiz for user: {}", request.size, user_id);

    let quiz = generate_adaptive_quiz(
        &state.store,
        GenerateQuizArgs {
            user_id,
            config: request.into(),
        },
    )?;
    Ok(Json(quiz))
}

pub async fn submit_quiz(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ValidatedJson(request): ValidatedJson<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "Submitting {} answer(s) for quiz {} from user {}",
        request.responses.len(),
        request.quiz_id,
        user_id
    );

    let feedback = submit_quiz_response(
        &state.store,
        SubmitQuizArgs {
            user_id,
            quiz_id: request.quiz_id,
            responses: request.responses,
        },
    )?;
    Ok(Json(feedback))
}
