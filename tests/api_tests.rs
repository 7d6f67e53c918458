// HTTP endpoint tests against the full router with a scripted model

mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use common::{ScriptedModel, app_state};
use prepcoach::api::create_app;
use prepcoach::llm::{ChatCompletion, ToolCall};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(model: std::sync::Arc<ScriptedModel>) -> Router {
    create_app(app_state(model))
}

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_conversation_welcome_then_analysis() {
    let model = ScriptedModel::replying(vec![
        ChatCompletion::tool_calls(vec![
            ToolCall::new("c1", "get_latest_test_results", "{}"),
            ToolCall::new("c2", "generate_bar_chart_data", "{}"),
            ToolCall::new("c3", "analyze_performance_by_topic", r#"{"section": "math"}"#),
        ]),
        ChatCompletion::text(
            "You scored **800**. Your weak areas are in algebra, so let's focus on that.",
        ),
    ]);
    let app = app(model.clone());

    let response = app
        .clone()
        .oneshot(chat_request(json!({ "user_id": "mock-user", "message": "hi" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let welcome = body_json(response).await;
    assert_eq!(welcome["metadata"]["is_welcome"], true);
    assert_eq!(
        welcome["follow_ups"],
        json!(["What would you like to work on today?"])
    );
    let session_id = welcome["session_id"].as_str().unwrap().to_string();
    assert_eq!(model.call_count(), 0);

    let response = app
        .clone()
        .oneshot(chat_request(json!({
            "user_id": "mock-user",
            "message": "Can you analyze my last exam?",
            "session_id": session_id,
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reply = body_json(response).await;

    let first_call = model.messages(0);
    let prompt = first_call.last().unwrap().content.clone().unwrap();
    assert!(prompt.contains("[SYSTEM: User explicitly requested analysis"));
    // 历史中包含欢迎轮的两条消息
    assert_eq!(first_call.len(), 4);

    assert_eq!(reply["session_id"], session_id.as_str());
    assert_eq!(
        reply["tools_used"],
        json!([
            "get_latest_test_results",
            "generate_bar_chart_data",
            "analyze_performance_by_topic"
        ])
    );
    assert_eq!(reply["metadata"]["tool_calls_made"], 3);

    let charts = reply["ui_elements"]["charts"].as_array().unwrap();
    assert_eq!(charts[0]["type"], "bar_chart");
    assert_eq!(charts[0]["title"], "Score Breakdown by Subject");
    let cards = reply["ui_elements"]["cards"].as_array().unwrap();
    assert_eq!(cards[0]["type"], "performance");
    assert_eq!(cards[0]["title"], "Math Analysis");
    assert_eq!(
        reply["ui_elements"]["quick_replies"][0]["action"],
        "create_quiz"
    );
    assert_eq!(reply["follow_ups"].as_array().unwrap().len(), 2);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/sessions/{}/summary", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let summary = body_json(response).await;
    assert_eq!(summary["total_turns"], 2);
    assert_eq!(summary["message_counts"]["assistant"], 2);
    assert_eq!(summary["message_counts"]["system"], 0);
}

#[tokio::test]
async fn test_chat_validation_errors() {
    let app = app(ScriptedModel::replying(vec![]));

    let response = app
        .clone()
        .oneshot(chat_request(json!({ "user_id": "mock-user", "message": "" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("message is required"));
}

#[tokio::test]
async fn test_quiz_generate_and_profile_endpoints() {
    let app = app(ScriptedModel::replying(vec![]));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/user/new-student/quiz/generate")
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "size": 3, "section": "math" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let quiz = body_json(response).await;
    assert_eq!(quiz["total_questions"], 3);
    assert_eq!(quiz["section"], "math");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/user/new-student/profile")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile = body_json(response).await;
    assert_eq!(profile["name"], "Marco Diaz");
    assert_eq!(profile["target_score"], 1400);
}
