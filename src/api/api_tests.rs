#[cfg(test)]
mod chat_handler_tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::api::{app_state::AppState, create_app};
    use crate::config::AppConfig;
    use crate::llm::{ChatCompletion, MockChatModel};
    use crate::storage::seed::seeded_store;

    fn app(model: MockChatModel) -> Router {
        let mut config = AppConfig::default();
        config.environment = "test".to_string();
        create_app(AppState::with_model(
            config,
            Arc::new(seeded_store()),
            Arc::new(model),
        ))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_reports_running() {
        let response = app(MockChatModel::new()).oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["name"], "PrepCoach AI Service");
    }

    #[tokio::test]
    async fn test_health_reports_environment() {
        let response = app(MockChatModel::new())
            .oneshot(get("/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["environment"], "test");
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_fields() {
        let app = app(MockChatModel::new());

        let response = app
            .clone()
            .oneshot(post_json("/chat", json!({ "user_id": "", "message": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");

        let response = app
            .clone()
            .oneshot(post_json("/chat", json!({ "user_id": "mock-user" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_json("/chat", json!({ "user_id": 7, "message": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["details"].as_str().unwrap().contains("user_id"));
    }

    #[tokio::test]
    async fn test_chat_new_session_welcomes_without_model() {
        let mut model = MockChatModel::new();
        model.expect_complete().never();
        let app = app(model);

        let response = app
            .clone()
            .oneshot(post_json("/chat", json!({ "user_id": "mock-user", "message": "hello" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["metadata"]["is_welcome"], true);
        assert_eq!(body["metadata"]["tool_calls_made"], 2);
        assert_eq!(body["ui_elements"]["cards"][0]["type"], "profile_overview");
        assert_eq!(body["ui_elements"]["quick_replies"].as_array().unwrap().len(), 4);

        let session_id = body["session_id"].as_str().unwrap();
        let response = app
            .oneshot(get(&format!("/sessions/{}/summary", session_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let summary = body_json(response).await;
        assert_eq!(summary["total_turns"], 1);
        assert_eq!(summary["message_counts"]["assistant"], 1);
    }

    #[tokio::test]
    async fn test_chat_existing_session_uses_model() {
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .times(1)
            .returning(|_, _| Ok(ChatCompletion::text("Would you like a practice quiz?")));

        let response = app(model)
            .oneshot(post_json(
                "/chat",
                json!({ "user_id": "mock-user", "message": "hey", "session_id": "s-42" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["session_id"], "s-42");
        assert_eq!(body["response"], "Would you like a practice quiz?");
        assert_eq!(body["ui_elements"]["quick_replies"][0]["action"], "start_quiz");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_unknown_session_summary_is_404() {
        let response = app(MockChatModel::new())
            .oneshot(get("/sessions/missing/summary"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_count_requests() {
        let app = app(MockChatModel::new());
        app.clone().oneshot(get("/")).await.unwrap();

        let response = app.oneshot(get("/metrics")).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("http_requests_total 1"));
    }
}

#[cfg(test)]
mod user_handler_tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::api::{app_state::AppState, create_router};
    use crate::config::AppConfig;
    use crate::llm::MockChatModel;
    use crate::storage::seed::seeded_store;
    use rstest::rstest;

    fn app() -> Router {
        create_router(AppState::with_model(
            AppConfig::default(),
            Arc::new(seeded_store()),
            Arc::new(MockChatModel::new()),
        ))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_profile_found_and_missing() {
        let app = app();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/user/mock-user/profile")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "Suzy");
        assert_eq!(body["days_until_test"], 90);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/user/ghost/profile")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    }

    #[rstest]
    #[case(json!({ "size": 0 }))]
    #[case(json!({ "size": 101 }))]
    #[case(json!({ "size": -1 }))]
    #[case(json!({ "size": "ten" }))]
    #[tokio::test]
    async fn test_generate_quiz_rejects_bad_size(#[case] body: Value) {
        let response = app()
            .oneshot(post_json("/user/mock-user/quiz/generate", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_submit_quiz_rounds_fractional_time() {
        let response = app()
            .oneshot(post_json(
                "/user/mock-user/quiz/submit",
                json!({
                    "quiz_id": "adhoc",
                    "responses": [
                        { "question_id": "q-001", "answer": "B", "time_spent": 12.4 },
                        { "question_id": "q-002", "answer": "C", "time_spent": 17.5 }
                    ]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let feedback = body_json(response).await;
        assert_eq!(feedback["total_time_seconds"], 30);
        assert_eq!(feedback["average_time_per_question"], 15.0);
    }

    #[tokio::test]
    async fn test_submit_quiz_malformed_body_is_400() {
        let response = app()
            .oneshot(post_json(
                "/user/mock-user/quiz/submit",
                json!({ "quiz_id": "adhoc", "responses": "none" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["details"].is_string());
    }

    #[tokio::test]
    async fn test_generate_quiz_for_unknown_user_is_404() {
        let response = app()
            .oneshot(post_json("/user/ghost/quiz/generate", json!({ "size": 5 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generate_then_submit_quiz() {
        let app = app();

        let response = app
            .clone()
            .oneshot(post_json("/user/mock-user/quiz/generate", json!({ "size": 5 })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let quiz = body_json(response).await;
        assert_eq!(quiz["total_questions"], 5);
        assert!(quiz["questions"][0].get("correct_answer").is_none());
        let quiz_id = quiz["quiz_id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(post_json(
                "/user/new-student/quiz/submit",
                json!({ "quiz_id": quiz_id, "responses": [] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(post_json(
                "/user/mock-user/quiz/submit",
                json!({
                    "quiz_id": quiz_id,
                    "responses": [
                        { "question_id": "q-001", "answer": "B", "time_spent": 40 },
                        { "question_id": "q-002", "answer": "A", "time_spent": 80 }
                    ]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let feedback = body_json(response).await;
        assert_eq!(feedback["correct_answers"], 1);
        assert_eq!(feedback["accuracy"], 50.0);
        assert_eq!(feedback["average_time_per_question"], 60.0);
        assert_eq!(feedback["results"][1]["correct_answer"], "C");
    }
}
