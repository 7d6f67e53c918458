use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::question::{Difficulty, Question};

/// 单个分项成绩
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionScore {
    pub score: u32,
    pub percentile: u32,
}

/// 一次模考/正式考试成绩
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    pub test_id: String,
    pub test_type: String,
    pub total_score: u32,
    pub sections: BTreeMap<String, SectionScore>,
    pub date_taken: DateTime<Utc>,
    pub completion_status: String,
}

/// 单题作答记录
///
/// `topic` 与 `difficulty` 冗余自题目，便于统计。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizResponse {
    pub response_id: String,
    pub quiz_id: String,
    pub question_id: String,
    pub user_answer: String,
    pub is_correct: bool,
    /// 作答耗时（秒）
    pub time_spent: u32,
    pub timestamp: DateTime<Utc>,
    pub topic: String,
    pub difficulty: Difficulty,
}

impl QuizResponse {
    /// 针对某道题创建作答记录，自动判分
    pub fn record(quiz_id: &str, question: &Question, answer: &str, time_spent: u32) -> Self {
        Self {
            response_id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            question_id: question.question_id.clone(),
            user_answer: answer.to_string(),
            is_correct: answer.trim().eq_ignore_ascii_case(&question.correct_answer),
            time_spent,
            timestamp: Utc::now(),
            topic: question.topic.clone(),
            difficulty: question.difficulty,
        }
    }
}
