//! 学员档案工具

use chrono::{Duration, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::user::UPDATABLE_FIELDS;
use crate::models::User;
use crate::storage::MemoryStore;
use crate::tools::stats::{percentage, round_to, study_streak, tally_by_topic};
use crate::tools::{ToolError, ToolResult};

/// 只需要用户标识的工具参数
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UserArgs {
    /// The user's unique identifier
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateProfileArgs {
    /// The user's unique identifier
    pub user_id: String,
    /// Fields to update, e.g. {"target_score": 1500, "study_hours_per_week": 12}
    pub updates: Map<String, Value>,
}

fn default_history_days() -> i64 {
    30
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LearningHistoryArgs {
    /// The user's unique identifier
    pub user_id: String,
    /// Number of days to look back
    #[serde(default = "default_history_days")]
    pub days: i64,
}

/// 档案视图
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub test_type: String,
    pub target_score: u32,
    pub test_date: Option<NaiveDate>,
    pub baseline_score: Option<u32>,
    pub current_level: String,
    pub study_hours_per_week: u32,
    pub preferences: Map<String, Value>,
    pub days_until_test: Option<i64>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let days_until_test = user.days_until_test();
        Self {
            user_id: user.user_id,
            name: user.name,
            email: user.email,
            test_type: user.test_type,
            target_score: user.target_score,
            test_date: user.test_date,
            baseline_score: user.baseline_score,
            current_level: user.current_level,
            study_hours_per_week: user.study_hours_per_week,
            preferences: user.preferences,
            days_until_test,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub success: bool,
    pub message: String,
    pub updated_fields: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicActivity {
    pub attempted: usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningHistory {
    pub period_days: i64,
    pub total_questions_attempted: usize,
    pub accuracy_rate: f64,
    pub current_streak_days: u32,
    pub topics_practiced: usize,
    pub topic_breakdown: BTreeMap<String, TopicActivity>,
}

pub fn get_user_profile(store: &MemoryStore, args: UserArgs) -> ToolResult<UserProfile> {
    store
        .get_user(&args.user_id)
        .map(UserProfile::from)
        .ok_or(ToolError::UserNotFound {
            user_id: args.user_id,
        })
}

/// 只接受可更新字段；类型不匹配时整体拒绝
pub fn update_user_profile(
    store: &MemoryStore,
    args: UpdateProfileArgs,
) -> ToolResult<ProfileUpdate> {
    let (accepted, ignored): (Vec<_>, Vec<_>) = args
        .updates
        .into_iter()
        .partition(|(key, _)| UPDATABLE_FIELDS.contains(&key.as_str()));
    let ignored_fields: Vec<String> = ignored.into_iter().map(|(key, _)| key).collect();
    let updated_fields: Vec<String> = accepted.iter().map(|(key, _)| key.clone()).collect();

    let mut outcome: ToolResult<()> = Ok(());
    store
        .update_user(&args.user_id, |user| match merge_fields(user, &accepted) {
            Ok(merged) => *user = merged,
            Err(e) => outcome = Err(e),
        })
        .ok_or_else(|| ToolError::UserNotFound {
            user_id: args.user_id.clone(),
        })?;
    outcome?;

    debug!(
        "Profile updated for {}: {:?} (ignored {:?})",
        args.user_id, updated_fields, ignored_fields
    );

    Ok(ProfileUpdate {
        success: true,
        message: "Profile updated successfully".to_string(),
        updated_fields,
        ignored_fields,
    })
}

fn merge_fields(user: &User, fields: &[(String, Value)]) -> ToolResult<User> {
    let mut value = serde_json::to_value(user)?;
    if let Value::Object(map) = &mut value {
        for (key, field) in fields {
            map.insert(key.clone(), field.clone());
        }
    }
    serde_json::from_value(value).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

pub fn get_learning_history(
    store: &MemoryStore,
    args: LearningHistoryArgs,
) -> ToolResult<LearningHistory> {
    if store.get_user(&args.user_id).is_none() {
        return Err(ToolError::UserNotFound {
            user_id: args.user_id,
        });
    }

    let cutoff = Utc::now() - Duration::days(args.days.max(0));
    let recent: Vec<_> = store
        .quiz_responses(&args.user_id)
        .into_iter()
        .filter(|r| r.timestamp >= cutoff)
        .collect();

    let correct = recent.iter().filter(|r| r.is_correct).count();
    let tallies = tally_by_topic(&recent);

    Ok(LearningHistory {
        period_days: args.days,
        total_questions_attempted: recent.len(),
        accuracy_rate: round_to(percentage(correct, recent.len()), 2),
        current_streak_days: study_streak(&recent, Utc::now().date_naive()),
        topics_practiced: tallies.len(),
        topic_breakdown: tallies
            .into_iter()
            .map(|(topic, tally)| {
                (
                    topic,
                    TopicActivity {
                        attempted: tally.attempted,
                        accuracy: round_to(tally.accuracy_pct(), 2),
                    },
                )
            })
            .collect(),
    })
}
