//! 种子数据
//!
//! 用户与题库以 JSON 形式编译进二进制；演示用户额外获得一次考试成绩
//! 和十条练习记录。

use chrono::{Duration, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::{Question, QuizResponse, SectionScore, TestResult, User};
use crate::storage::memory::MemoryStore;

const SEED_USERS: &str = include_str!("../../data/seed_users.json");
const SEED_QUESTIONS: &str = include_str!("../../data/seed_questions.json");

/// 演示用户 ID
pub const DEMO_USER_ID: &str = "mock-user";

/// 种子用户：考试日期以相对天数给出
#[derive(Deserialize)]
struct SeedUser {
    #[serde(flatten)]
    user: User,
    #[serde(default)]
    test_in_days: Option<i64>,
}

fn load_users() -> Result<Vec<User>, serde_json::Error> {
    let seeds: Vec<SeedUser> = serde_json::from_str(SEED_USERS)?;
    let today = Utc::now().date_naive();
    Ok(seeds
        .into_iter()
        .map(|seed| {
            let mut user = seed.user;
            if let Some(days) = seed.test_in_days {
                user.test_date = Some(today + Duration::days(days));
            }
            user
        })
        .collect())
}

fn load_questions() -> Result<Vec<Question>, serde_json::Error> {
    serde_json::from_str(SEED_QUESTIONS)
}

/// 构建已填充种子数据的存储
pub fn load() -> Result<MemoryStore, serde_json::Error> {
    let store = MemoryStore::new(load_users()?, load_questions()?);
    seed_demo_history(&store);
    Ok(store)
}

fn seed_demo_history(store: &MemoryStore) {
    let now = Utc::now();

    let sections: BTreeMap<String, SectionScore> = [
        ("reading", 240, 85),
        ("writing", 220, 74),
        ("reasoning", 140, 75),
        ("algebra", 100, 25),
        ("geometry", 100, 25),
    ]
    .into_iter()
    .map(|(name, score, percentile)| (name.to_string(), SectionScore { score, percentile }))
    .collect();

    store.add_test_result(
        DEMO_USER_ID,
        TestResult {
            test_id: Uuid::new_v4().to_string(),
            test_type: "SAT".to_string(),
            total_score: 800,
            sections,
            date_taken: now - Duration::days(14),
            completion_status: "completed".to_string(),
        },
    );

    // 每第三题答错，约 66% 正确率
    let responses = store
        .questions()
        .iter()
        .take(10)
        .enumerate()
        .map(|(i, question)| {
            let is_correct = i % 3 != 0;
            QuizResponse {
                response_id: Uuid::new_v4().to_string(),
                quiz_id: "sample-quiz-1".to_string(),
                question_id: question.question_id.clone(),
                user_answer: if is_correct {
                    question.correct_answer.clone()
                } else {
                    "A".to_string()
                },
                is_correct,
                time_spent: question.average_time + (i as u32) * 10,
                timestamp: now - Duration::days(i as i64),
                topic: question.topic.clone(),
                difficulty: question.difficulty,
            }
        })
        .collect();
    store.add_quiz_responses(DEMO_USER_ID, responses);
}

#[cfg(test)]
pub(crate) fn seeded_store() -> MemoryStore {
    load().expect("embedded seed data must parse")
}
