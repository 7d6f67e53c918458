//! 工具注册表
//!
//! 维护模型可见的工具目录（名称、描述、JSON Schema 参数），并按名称分发调用。
//! 调用方身份在这里强制写入参数，模型给出的 `user_id` 从不被信任。

use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::storage::MemoryStore;
use crate::tools::explanations::{self, QuestionExplanationArgs, TopicConceptArgs};
use crate::tools::motivation::{self, AchievementArgs, EncouragementArgs};
use crate::tools::performance::{
    self, CompareProgressArgs, ErrorPatternArgs, TestLookupArgs, TopicAnalysisArgs,
};
use crate::tools::profile::{self, LearningHistoryArgs, UpdateProfileArgs, UserArgs};
use crate::tools::progress;
use crate::tools::quiz::{self, GenerateQuizArgs, SearchQuestionsArgs, SubmitQuizArgs};
use crate::tools::recommendations::{self, PracticeTopicsArgs};
use crate::tools::{ToolError, ToolResult};

/// 单个工具的描述
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

impl ToolSpec {
    /// 参数 schema 是否声明了 `user_id`
    pub fn accepts_user_id(&self) -> bool {
        self.parameters
            .get("properties")
            .and_then(Value::as_object)
            .is_some_and(|props| props.contains_key("user_id"))
    }
}

/// 一次工具调用的记录
#[derive(Debug, Clone, Serialize)]
pub struct ToolExecution {
    pub name: String,
    /// 实际传给工具的参数（已注入身份）
    pub arguments: Value,
    pub result: Value,
    pub succeeded: bool,
}

/// 由参数结构体推导 JSON Schema
fn parameters_for<A: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator();
    let schema = generator.into_root_schema_for::<A>();

    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" }));
    if let Some(map) = value.as_object_mut() {
        map.remove("title");
        map.remove("description");
    }
    value
}

fn spec<A: JsonSchema>(name: &'static str, description: &'static str) -> ToolSpec {
    ToolSpec {
        name,
        description,
        parameters: parameters_for::<A>(),
    }
}

fn catalog() -> Vec<ToolSpec> {
    vec![
        spec::<UserArgs>(
            "get_user_profile",
            "Retrieve user's complete profile including test type, target score, study preferences, and timeline",
        ),
        spec::<UpdateProfileArgs>(
            "update_user_profile",
            "Update editable profile fields such as target score, test date, study hours or preferences",
        ),
        spec::<LearningHistoryArgs>(
            "get_learning_history",
            "Get user's practice history, study sessions, and activity statistics over a time period",
        ),
        spec::<TestLookupArgs>(
            "get_latest_test_results",
            "Get most recent practice test results with detailed breakdown by section",
        ),
        spec::<TopicAnalysisArgs>(
            "analyze_performance_by_topic",
            "Get detailed breakdown of performance across topics and subtopics for a specific section",
        ),
        spec::<ErrorPatternArgs>(
            "identify_error_patterns",
            "Analyze mistakes to identify patterns like topic weaknesses, difficulty struggles, or time management issues",
        ),
        spec::<CompareProgressArgs>(
            "compare_progress",
            "Compare current performance vs past performance or target score to show improvement",
        ),
        spec::<TestLookupArgs>(
            "generate_bar_chart_data",
            "Generate bar chart data visualization from test results showing scores by section/topic. Use this when user asks to analyze their test scores or wants to see a visual breakdown.",
        ),
        spec::<SearchQuestionsArgs>(
            "search_questions",
            "Search the question bank by test type, section, topic and difficulty",
        ),
        spec::<GenerateQuizArgs>(
            "generate_adaptive_quiz",
            "Create a personalized quiz based on user's weak areas, preferences, and performance history",
        ),
        spec::<SubmitQuizArgs>(
            "submit_quiz_response",
            "Grade submitted quiz answers, record them and return per-question feedback",
        ),
        spec::<UserArgs>(
            "generate_study_recommendations",
            "Generate personalized study recommendations based on performance analysis and time until test",
        ),
        spec::<PracticeTopicsArgs>(
            "suggest_practice_topics",
            "Suggest the topics within a section that most need practice",
        ),
        spec::<UserArgs>(
            "get_progress_summary",
            "Get comprehensive progress summary with trends, milestones, and achievements",
        ),
        spec::<UserArgs>(
            "track_study_streak",
            "Track consecutive days of study activity and provide motivation",
        ),
        spec::<QuestionExplanationArgs>(
            "get_question_explanation",
            "Get detailed explanation for a specific question with step-by-step breakdown",
        ),
        spec::<TopicConceptArgs>(
            "explain_topic_concept",
            "Explain a topic or subtopic conceptually with learning tips",
        ),
        spec::<EncouragementArgs>(
            "generate_encouragement",
            "Generate personalized encouragement based on user's progress and current context",
        ),
        spec::<AchievementArgs>(
            "celebrate_achievement",
            "Celebrate a user achievement or milestone",
        ),
    ]
}

/// 解析参数、执行工具并序列化结果
fn call<A, O, F>(arguments: Value, f: F) -> ToolResult<Value>
where
    A: DeserializeOwned,
    O: Serialize,
    F: FnOnce(A) -> ToolResult<O>,
{
    let args: A = serde_json::from_value(arguments)
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
    let output = f(args)?;
    Ok(serde_json::to_value(output)?)
}

/// 工具内部 panic 只影响本次调用，转换为 `ToolError::Panicked`
fn guarded<F>(name: &str, f: F) -> ToolResult<Value>
where
    F: FnOnce() -> ToolResult<Value>,
{
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|cause| {
        let reason = cause
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| cause.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(ToolError::Panicked {
            name: name.to_string(),
            reason,
        })
    })
}

/// 工具注册表
#[derive(Clone)]
pub struct ToolRegistry {
    store: Arc<MemoryStore>,
    specs: Arc<Vec<ToolSpec>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.specs.len())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            specs: Arc::new(catalog()),
        }
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// 执行一次工具调用
    ///
    /// 非对象参数视为空对象；工具 schema 声明了 `user_id` 时用调用方身份覆盖。
    /// 工具错误转换为 `{"error": ...}` 载荷，不向上传播。
    pub fn execute(&self, name: &str, arguments: Value, caller_user_id: &str) -> ToolExecution {
        let mut arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let Some(spec) = self.spec(name) else {
            warn!("Unknown function requested by model: {}", name);
            return ToolExecution {
                name: name.to_string(),
                arguments: Value::Object(arguments),
                result: json!({ "error": format!("Unknown function: {}", name) }),
                succeeded: false,
            };
        };

        if spec.accepts_user_id() {
            match arguments.get("user_id").and_then(Value::as_str) {
                Some(given) if given == caller_user_id => {}
                Some(given) => {
                    warn!(
                        "Model supplied user_id '{}' for {}, correcting to '{}'",
                        given, name, caller_user_id
                    );
                }
                None => debug!("Injecting user_id {} into {}", caller_user_id, name),
            }
            arguments.insert("user_id".to_string(), json!(caller_user_id));
        }

        let arguments = Value::Object(arguments);
        info!("Executing tool {} with args {}", name, arguments);

        let (result, succeeded) = match guarded(name, || self.dispatch(name, arguments.clone())) {
            Ok(value) => (value, true),
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                (e.to_payload(), false)
            }
        };

        ToolExecution {
            name: name.to_string(),
            arguments,
            result,
            succeeded,
        }
    }

    fn dispatch(&self, name: &str, args: Value) -> ToolResult<Value> {
        let store = self.store.as_ref();
        match name {
            "get_user_profile" => call(args, |a| profile::get_user_profile(store, a)),
            "update_user_profile" => call(args, |a| profile::update_user_profile(store, a)),
            "get_learning_history" => call(args, |a| profile::get_learning_history(store, a)),
            "get_latest_test_results" => {
                call(args, |a| performance::get_latest_test_results(store, a))
            }
            "analyze_performance_by_topic" => {
                call(args, |a| performance::analyze_performance_by_topic(store, a))
            }
            "identify_error_patterns" => {
                call(args, |a| performance::identify_error_patterns(store, a))
            }
            "compare_progress" => call(args, |a| performance::compare_progress(store, a)),
            "generate_bar_chart_data" => {
                call(args, |a| performance::generate_bar_chart_data(store, a))
            }
            "search_questions" => call(args, |a| quiz::search_questions(store, a)),
            "generate_adaptive_quiz" => call(args, |a| quiz::generate_adaptive_quiz(store, a)),
            "submit_quiz_response" => call(args, |a| quiz::submit_quiz_response(store, a)),
            "generate_study_recommendations" => call(args, |a| {
                recommendations::generate_study_recommendations(store, a)
            }),
            "suggest_practice_topics" => {
                call(args, |a| recommendations::suggest_practice_topics(store, a))
            }
            "get_progress_summary" => call(args, |a| progress::get_progress_summary(store, a)),
            "track_study_streak" => call(args, |a| progress::track_study_streak(store, a)),
            "get_question_explanation" => {
                call(args, |a| explanations::get_question_explanation(store, a))
            }
            "explain_topic_concept" => call(args, explanations::explain_topic_concept),
            "generate_encouragement" => {
                call(args, |a| motivation::generate_encouragement(store, a))
            }
            "celebrate_achievement" => call(args, motivation::celebrate_achievement),
            other => Err(ToolError::InvalidArguments(format!(
                "Unknown function: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::seed::{DEMO_USER_ID, seeded_store};

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(seeded_store()))
    }

    #[test]
    fn test_catalog_is_dispatchable() {
        let registry = registry();
        assert_eq!(registry.specs().len(), 19);

        for spec in registry.specs() {
            let execution = registry.execute(spec.name, json!({}), DEMO_USER_ID);
            let unknown = format!("Unknown function: {}", spec.name);
            assert_ne!(execution.result["error"], json!(unknown), "{}", spec.name);
        }
    }

    #[test]
    fn test_schema_shape() {
        let registry = registry();
        let quiz = registry.spec("generate_adaptive_quiz").unwrap();
        assert_eq!(quiz.parameters["type"], "object");
        assert_eq!(quiz.parameters["properties"]["user_id"]["type"], "string");
        assert!(quiz.parameters["properties"]["config"]["properties"]["size"].is_object());
        assert!(quiz.parameters.get("title").is_none());

        assert!(quiz.accepts_user_id());
        assert!(!registry.spec("search_questions").unwrap().accepts_user_id());
        assert!(!registry.spec("explain_topic_concept").unwrap().accepts_user_id());
    }

    #[test]
    fn test_user_id_is_overridden() {
        let registry = registry();
        let execution = registry.execute(
            "get_user_profile",
            json!({ "user_id": "new-student" }),
            DEMO_USER_ID,
        );
        assert!(execution.succeeded);
        assert_eq!(execution.arguments["user_id"], DEMO_USER_ID);
        assert_eq!(execution.result["name"], "Suzy");
    }

    #[test]
    fn test_user_id_injected_when_missing() {
        let registry = registry();
        let execution = registry.execute("get_latest_test_results", Value::Null, DEMO_USER_ID);
        assert!(execution.succeeded);
        assert_eq!(execution.arguments, json!({ "user_id": DEMO_USER_ID }));
        assert_eq!(execution.result["total_score"], 800);
    }

    #[test]
    fn test_unknown_and_failing_tools() {
        let registry = registry();
        let unknown = registry.execute("launch_rocket", json!({}), DEMO_USER_ID);
        assert!(!unknown.succeeded);
        assert_eq!(unknown.result, json!({ "error": "Unknown function: launch_rocket" }));

        let missing = registry.execute(
            "get_question_explanation",
            json!({ "question_id": "q-999" }),
            DEMO_USER_ID,
        );
        assert!(!missing.succeeded);
        assert_eq!(missing.result["error"], "Question not found");

        let no_tests = registry.execute("get_latest_test_results", json!({}), "new-student");
        assert!(!no_tests.succeeded);
        assert_eq!(no_tests.arguments["user_id"], "new-student");
    }

    #[test]
    fn test_panicking_tool_becomes_error_result() {
        let err = guarded("explode", || panic!("index out of range")).unwrap_err();
        assert!(matches!(
            err,
            ToolError::Panicked { ref reason, .. } if reason == "index out of range"
        ));
        assert_eq!(
            err.to_payload()["error"],
            "Tool explode failed unexpectedly: index out of range"
        );

        let ok = guarded("fine", || Ok(json!({ "ok": true }))).unwrap();
        assert_eq!(ok["ok"], true);
    }
}
