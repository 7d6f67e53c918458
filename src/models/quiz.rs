use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::question::Question;

/// 已生成的测验
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quiz {
    pub quiz_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub section: Option<String>,
    pub focus_areas: Vec<String>,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(
        user_id: &str,
        section: Option<String>,
        focus_areas: Vec<String>,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            quiz_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            section,
            focus_areas,
            questions,
        }
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.questions.iter().any(|q| q.question_id == question_id)
    }
}
