//! 测验生成与提交工具

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

use crate::models::{Difficulty, Question, QuestionFilter, Quiz, QuizResponse};
use crate::storage::MemoryStore;
use crate::tools::stats::{TopicTally, percentage, round_to};
use crate::tools::{ToolError, ToolResult};

/// 单次测验题量上限
pub const MAX_QUIZ_SIZE: usize = 100;

fn default_search_limit() -> usize {
    20
}

fn default_quiz_size() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchQuestionsArgs {
    /// Filter criteria
    #[serde(default)]
    pub filters: QuestionFilter,
    /// Maximum number of questions to return
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

/// 测验生成配置
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuizConfig {
    /// Number of questions (1-100)
    #[serde(default = "default_quiz_size")]
    pub size: usize,
    /// Exam type; defaults to the user's exam
    #[serde(default)]
    pub test_type: Option<String>,
    /// Restrict to one section, e.g. "math"
    #[serde(default)]
    pub section: Option<String>,
    /// Topics to focus on; weak topics are used when empty
    #[serde(default)]
    pub topics: Vec<String>,
    /// Preferred difficulty
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            size: default_quiz_size(),
            test_type: None,
            section: None,
            topics: Vec::new(),
            difficulty: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateQuizArgs {
    /// The user's unique identifier
    pub user_id: String,
    /// Quiz configuration
    #[serde(default)]
    pub config: QuizConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnswerSubmission {
    /// Question identifier
    pub question_id: String,
    /// Chosen option letter, e.g. "B"
    pub answer: String,
    /// Seconds spent on the question
    #[serde(default, deserialize_with = "whole_seconds")]
    #[schemars(with = "f64")]
    pub time_spent: u32,
}

/// 客户端可能上报小数秒或负数，四舍五入并截断到 0
fn whole_seconds<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let seconds = f64::deserialize(deserializer)?;
    Ok(seconds.max(0.0).round() as u32)
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SubmitQuizArgs {
    /// The user's unique identifier
    pub user_id: String,
    /// Quiz identifier
    pub quiz_id: String,
    /// Answers to record
    pub responses: Vec<AnswerSubmission>,
}

/// 面向学员的题目视图（不含答案）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestionView {
    pub question_number: usize,
    pub question_id: String,
    pub content: String,
    pub options: BTreeMap<String, String>,
    pub difficulty: Difficulty,
    pub topic: String,
    pub estimated_time: u32,
}

impl QuizQuestionView {
    fn new(number: usize, question: &Question) -> Self {
        Self {
            question_number: number,
            question_id: question.question_id.clone(),
            content: question.content.clone(),
            options: question.options.clone(),
            difficulty: question.difficulty,
            topic: question.topic.clone(),
            estimated_time: question.average_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionSearch {
    pub total: usize,
    pub questions: Vec<QuizQuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizCreated {
    pub success: bool,
    pub message: String,
    pub quiz_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub total_questions: usize,
    pub section: String,
    pub focus_areas: Vec<String>,
    pub questions: Vec<QuizQuestionView>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl PerformanceLevel {
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 85.0 {
            PerformanceLevel::Excellent
        } else if accuracy >= 70.0 {
            PerformanceLevel::Good
        } else if accuracy >= 60.0 {
            PerformanceLevel::Fair
        } else {
            PerformanceLevel::NeedsImprovement
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResult {
    pub question_id: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub topic: String,
    pub difficulty: Difficulty,
    /// 仅答错时给出
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizFeedback {
    pub quiz_id: String,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub accuracy: f64,
    pub total_time_seconds: u64,
    pub average_time_per_question: f64,
    pub performance_level: PerformanceLevel,
    pub results: Vec<AnswerResult>,
}

pub fn search_questions(store: &MemoryStore, args: SearchQuestionsArgs) -> ToolResult<QuestionSearch> {
    let questions: Vec<QuizQuestionView> = store
        .query_questions(&args.filters, args.limit.min(MAX_QUIZ_SIZE))
        .iter()
        .enumerate()
        .map(|(i, q)| QuizQuestionView::new(i + 1, q))
        .collect();

    Ok(QuestionSearch {
        total: questions.len(),
        questions,
    })
}

/// 最近 50 条作答中，至少 3 次且正确率低于 70% 的主题
fn weak_topics(store: &MemoryStore, recent: &[QuizResponse]) -> Vec<String> {
    let mut tallies: BTreeMap<String, TopicTally> = BTreeMap::new();
    for response in recent {
        if let Some(question) = store.find_question(&response.question_id) {
            tallies
                .entry(question.topic.clone())
                .or_default()
                .record(response.is_correct);
        }
    }
    tallies
        .into_iter()
        .filter(|(_, t)| t.attempted >= 3 && t.ratio() < 0.7)
        .map(|(topic, _)| topic)
        .collect()
}

pub fn generate_adaptive_quiz(store: &MemoryStore, args: GenerateQuizArgs) -> ToolResult<QuizCreated> {
    generate_adaptive_quiz_with(store, args, &mut rand::thread_rng())
}

pub fn generate_adaptive_quiz_with<R: Rng + ?Sized>(
    store: &MemoryStore,
    args: GenerateQuizArgs,
    rng: &mut R,
) -> ToolResult<QuizCreated> {
    let config = args.config;
    let user = store
        .get_user(&args.user_id)
        .ok_or_else(|| ToolError::UserNotFound {
            user_id: args.user_id.clone(),
        })?;

    if config.size == 0 || config.size > MAX_QUIZ_SIZE {
        return Err(ToolError::InvalidArguments(format!(
            "quiz size must be between 1 and {}, got {}",
            MAX_QUIZ_SIZE, config.size
        )));
    }
    let size = config.size;

    let responses = store.quiz_responses(&args.user_id);
    let recent = &responses[responses.len().saturating_sub(50)..];
    let weak = weak_topics(store, recent);

    let test_type = config.test_type.clone().unwrap_or(user.test_type.clone());
    let mut filter = QuestionFilter {
        test_type: Some(test_type.clone()),
        section: config.section.clone(),
        ..Default::default()
    };
    let mut candidates = store.query_questions(&filter, usize::MAX);
    if candidates.is_empty() {
        warn!(
            "No questions for test_type='{}', retrying without the test type filter",
            test_type
        );
        filter.test_type = None;
        candidates = store.query_questions(&filter, usize::MAX);
    }

    let seen: HashSet<&str> = recent[recent.len().saturating_sub(20)..]
        .iter()
        .map(|r| r.question_id.as_str())
        .collect();
    let mut pool: Vec<&Question> = candidates
        .iter()
        .filter(|q| !seen.contains(q.question_id.as_str()))
        .collect();
    if pool.len() < size && candidates.len() >= size {
        info!(
            "Only {} unseen questions, reusing recent ones from {} candidates",
            pool.len(),
            candidates.len()
        );
        pool = candidates.iter().collect();
    }

    if pool.is_empty() {
        return Err(ToolError::NoQuestions {
            details: format!(
                "Tried test_type='{}', section='{}', found {} total questions",
                test_type,
                config.section.as_deref().unwrap_or("any"),
                candidates.len()
            ),
        });
    }

    let target_topics = if config.topics.is_empty() {
        weak
    } else {
        config.topics.clone()
    };
    narrow(&mut pool, |q| target_topics.contains(&q.topic));
    if let Some(level) = config.difficulty {
        narrow(&mut pool, |q| q.difficulty == level);
    }

    let selected = select_by_difficulty(&pool, size, rng);
    let section = config.section.clone();
    let focus_areas = if target_topics.is_empty() {
        vec!["general".to_string()]
    } else {
        target_topics.iter().take(3).cloned().collect()
    };

    let quiz = Quiz::new(
        &args.user_id,
        section.clone(),
        focus_areas.clone(),
        selected.into_iter().cloned().collect(),
    );
    let created = QuizCreated {
        success: true,
        message: format!(
            "Successfully created a personalized quiz with {} questions",
            quiz.questions.len()
        ),
        quiz_id: quiz.quiz_id.clone(),
        user_id: quiz.user_id.clone(),
        created_at: quiz.created_at,
        total_questions: quiz.questions.len(),
        section: section.unwrap_or_else(|| "mixed".to_string()),
        focus_areas,
        questions: quiz
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| QuizQuestionView::new(i + 1, q))
            .collect(),
    };

    info!(
        "Created quiz {} for {} with {} questions",
        created.quiz_id, created.user_id, created.total_questions
    );
    store.save_quiz(quiz);
    Ok(created)
}

/// 有匹配项时才收窄题池
fn narrow<F>(pool: &mut Vec<&Question>, keep: F)
where
    F: Fn(&Question) -> bool,
{
    if pool.iter().any(|q| keep(q)) {
        pool.retain(|q| keep(q));
    }
}

/// 30% 简单、50% 中等、其余困难，不足部分从剩余题目补齐，最后打乱
fn select_by_difficulty<'a, R: Rng + ?Sized>(
    pool: &[&'a Question],
    size: usize,
    rng: &mut R,
) -> Vec<&'a Question> {
    let num_easy = size * 3 / 10;
    let num_medium = size / 2;
    let quotas = [
        (Difficulty::Easy, num_easy),
        (Difficulty::Medium, num_medium),
        (Difficulty::Hard, size - num_easy - num_medium),
    ];

    let mut selected: Vec<&Question> = Vec::with_capacity(size);
    for (level, quota) in quotas {
        let bucket: Vec<&Question> = pool
            .iter()
            .copied()
            .filter(|q| q.difficulty == level)
            .collect();
        selected.extend(bucket.choose_multiple(rng, quota).copied());
    }

    if selected.len() < size {
        let taken: HashSet<&str> = selected.iter().map(|q| q.question_id.as_str()).collect();
        let remaining: Vec<&Question> = pool
            .iter()
            .copied()
            .filter(|q| !taken.contains(q.question_id.as_str()))
            .collect();
        let needed = size - selected.len();
        selected.extend(remaining.choose_multiple(rng, needed).copied());
    }

    selected.shuffle(rng);
    selected
}

pub fn submit_quiz_response(store: &MemoryStore, args: SubmitQuizArgs) -> ToolResult<QuizFeedback> {
    if let Some(quiz) = store.get_quiz(&args.quiz_id) {
        if quiz.user_id != args.user_id {
            return Err(ToolError::QuizOwnership {
                quiz_id: args.quiz_id,
            });
        }
    }

    let submitted = args.responses.len();
    let mut records = Vec::with_capacity(submitted);
    let mut results = Vec::with_capacity(submitted);
    let mut total_time: u64 = 0;

    for answer in &args.responses {
        let Some(question) = store.find_question(&answer.question_id) else {
            warn!("Skipping unknown question {} in quiz {}", answer.question_id, args.quiz_id);
            continue;
        };

        let record = QuizResponse::record(&args.quiz_id, question, &answer.answer, answer.time_spent);
        total_time += u64::from(answer.time_spent);
        results.push(AnswerResult {
            question_id: question.question_id.clone(),
            user_answer: answer.answer.clone(),
            correct_answer: question.correct_answer.clone(),
            is_correct: record.is_correct,
            topic: question.topic.clone(),
            difficulty: question.difficulty,
            explanation: (!record.is_correct).then(|| question.explanation.clone()),
        });
        records.push(record);
    }

    let correct = results.iter().filter(|r| r.is_correct).count();
    let accuracy = round_to(percentage(correct, submitted), 2);
    store.add_quiz_responses(&args.user_id, records);

    info!(
        "Quiz {} submitted by {}: {}/{} correct",
        args.quiz_id, args.user_id, correct, submitted
    );

    Ok(QuizFeedback {
        quiz_id: args.quiz_id,
        total_questions: submitted,
        correct_answers: correct,
        accuracy,
        total_time_seconds: total_time,
        average_time_per_question: if submitted == 0 {
            0.0
        } else {
            round_to(total_time as f64 / submitted as f64, 2)
        },
        performance_level: PerformanceLevel::from_accuracy(accuracy),
        results,
    })
}
