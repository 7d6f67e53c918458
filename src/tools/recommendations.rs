//! 学习建议工具

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::QuestionFilter;
use crate::storage::MemoryStore;
use crate::tools::performance::Section;
use crate::tools::profile::UserArgs;
use crate::tools::stats::TopicTally;
use crate::tools::{ToolError, ToolResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub priority: Priority,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub action: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_impact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyPlan {
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PracticeTopicsArgs {
    /// The user's unique identifier
    pub user_id: String,
    /// Section to get topic suggestions for
    pub section: Section,
}

#[derive(Debug, Clone, Serialize)]
pub struct PracticeSuggestions {
    pub section: Section,
    pub topics: Vec<String>,
    pub based_on_history: bool,
}

pub fn generate_study_recommendations(
    store: &MemoryStore,
    args: UserArgs,
) -> ToolResult<StudyPlan> {
    let user = store
        .get_user(&args.user_id)
        .ok_or_else(|| ToolError::UserNotFound {
            user_id: args.user_id.clone(),
        })?;
    let responses = store.quiz_responses(&args.user_id);
    let now = Utc::now();

    if responses.is_empty() {
        return Ok(StudyPlan {
            user_id: args.user_id,
            generated_at: now,
            message: Some("Start practicing to get personalized recommendations!".to_string()),
            recommendations: vec![Recommendation {
                priority: Priority::High,
                kind: "get_started".to_string(),
                topic: None,
                action: "Take a diagnostic quiz to assess your current level".to_string(),
                reason: "We need baseline data to create a personalized study plan".to_string(),
                estimated_impact: None,
            }],
        });
    }

    let mut tallies: BTreeMap<String, TopicTally> = BTreeMap::new();
    for response in &responses {
        if let Some(question) = store.find_question(&response.question_id) {
            tallies
                .entry(question.topic.clone())
                .or_default()
                .record(response.is_correct);
        }
    }

    let mut weak: Vec<(String, TopicTally)> = tallies
        .into_iter()
        .filter(|(_, t)| t.attempted >= 5 && t.ratio() < 0.6)
        .collect();
    weak.sort_by(|a, b| a.1.ratio().total_cmp(&b.1.ratio()));

    let mut recommendations: Vec<Recommendation> = weak
        .into_iter()
        .take(3)
        .enumerate()
        .map(|(i, (topic, tally))| Recommendation {
            priority: if i == 0 { Priority::High } else { Priority::Medium },
            kind: "improve_weak_topic".to_string(),
            action: format!("Focus on {} - practice 10-15 questions daily", topic),
            reason: format!(
                "Current accuracy: {:.1}%. This is below target.",
                tally.accuracy_pct()
            ),
            topic: Some(topic),
            estimated_impact: Some("high".to_string()),
        })
        .collect();

    if let Some(last_active) = responses.iter().map(|r| r.timestamp).max() {
        let idle_days = (now - last_active).num_days();
        if idle_days > 3 {
            recommendations.push(Recommendation {
                priority: Priority::High,
                kind: "consistency".to_string(),
                topic: None,
                action: "Resume daily practice - aim for at least 20 minutes per day".to_string(),
                reason: format!(
                    "You haven't practiced in {} days. Consistency is key!",
                    idle_days
                ),
                estimated_impact: Some("high".to_string()),
            });
        }
    }

    if let Some(days) = user.days_until_test().filter(|d| (1..=30).contains(d)) {
        recommendations.insert(
            0,
            Recommendation {
                priority: Priority::Critical,
                kind: "test_prep".to_string(),
                topic: None,
                action: "Take full-length practice tests weekly".to_string(),
                reason: format!(
                    "Only {} days until your test. Focus on test-taking strategies.",
                    days
                ),
                estimated_impact: Some("critical".to_string()),
            },
        );
    }

    // 稳定排序，同级保持插入顺序
    recommendations.sort_by_key(|r| r.priority);
    recommendations.truncate(5);

    let message = recommendations
        .is_empty()
        .then(|| "You're on track! Keep up your current study routine.".to_string());

    Ok(StudyPlan {
        user_id: args.user_id,
        generated_at: now,
        message,
        recommendations,
    })
}

pub fn suggest_practice_topics(
    store: &MemoryStore,
    args: PracticeTopicsArgs,
) -> ToolResult<PracticeSuggestions> {
    let section = args.section.as_str();
    let responses = store.quiz_responses(&args.user_id);

    if responses.is_empty() {
        let filter = QuestionFilter {
            section: Some(section.to_string()),
            ..Default::default()
        };
        let topics: BTreeSet<String> = store
            .query_questions(&filter, usize::MAX)
            .into_iter()
            .map(|q| q.topic)
            .collect();
        return Ok(PracticeSuggestions {
            section: args.section,
            topics: topics.into_iter().take(5).collect(),
            based_on_history: false,
        });
    }

    let mut tallies: BTreeMap<String, TopicTally> = BTreeMap::new();
    for response in &responses {
        if let Some(question) = store.find_question(&response.question_id) {
            if question.section == section {
                tallies
                    .entry(question.topic.clone())
                    .or_default()
                    .record(response.is_correct);
            }
        }
    }

    let mut gaps: Vec<(String, f64)> = tallies
        .into_iter()
        .filter(|(_, t)| t.attempted >= 3 && t.ratio() < 0.75)
        .map(|(topic, t)| (topic, t.ratio()))
        .collect();
    gaps.sort_by(|a, b| a.1.total_cmp(&b.1));

    Ok(PracticeSuggestions {
        section: args.section,
        topics: gaps.into_iter().take(5).map(|(topic, _)| topic).collect(),
        based_on_history: true,
    })
}
