//! 测验 DTO

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Difficulty;
use crate::tools::quiz::{AnswerSubmission, QuizConfig};

fn default_size() -> usize {
    QuizConfig::default().size
}

/// 生成测验请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateQuizRequest {
    /// 题量
    #[serde(default = "default_size")]
    #[validate(range(min = 1, max = 100, message = "size must be between 1 and 100"))]
    pub size: usize,
    #[serde(default)]
    pub test_type: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl From<GenerateQuizRequest> for QuizConfig {
    fn from(request: GenerateQuizRequest) -> Self {
        QuizConfig {
            size: request.size,
            test_type: request.test_type,
            section: request.section,
            topics: request.topics,
            difficulty: request.difficulty,
        }
    }
}

/// 提交测验请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    #[validate(length(min = 1, message = "quiz_id is required"))]
    pub quiz_id: String,
    #[serde(default)]
    pub responses: Vec<AnswerSubmission>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{}"#, true)]
    #[case(r#"{"size": 100, "difficulty": "hard"}"#, true)]
    #[case(r#"{"size": 0}"#, false)]
    #[case(r#"{"size": 101}"#, false)]
    fn test_generate_size_bounds(#[case] body: &str, #[case] valid: bool) {
        let request: GenerateQuizRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.validate().is_ok(), valid);
    }

    #[test]
    fn test_request_maps_to_quiz_config() {
        let request: GenerateQuizRequest =
            serde_json::from_str(r#"{"size": 5, "section": "math", "topics": ["algebra"]}"#)
                .unwrap();
        let config = QuizConfig::from(request);
        assert_eq!(config.size, 5);
        assert_eq!(config.section.as_deref(), Some("math"));
        assert_eq!(config.topics, vec!["algebra"]);
    }
}
