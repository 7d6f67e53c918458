//! 进度追踪工具

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::MemoryStore;
use crate::tools::profile::UserArgs;
use crate::tools::stats::{distinct_study_days, percentage, round_to, study_streak, tally_by_topic};
use crate::tools::{ToolError, ToolResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScorePoint {
    pub date: DateTime<Utc>,
    pub score: u32,
    pub test_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Improvement {
    pub points: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicAccuracy {
    pub topic: String,
    pub accuracy: f64,
    pub questions: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressSummary {
    pub user_id: String,
    pub test_type: String,
    pub target_score: u32,
    pub baseline_score: Option<u32>,
    pub current_score: Option<u32>,
    pub days_until_test: Option<i64>,
    pub total_questions_attempted: usize,
    pub overall_accuracy: f64,
    pub recent_accuracy: f64,
    pub accuracy_trend: AccuracyTrend,
    pub score_progression: Vec<ScorePoint>,
    pub improvement: Option<Improvement>,
    pub milestones: Vec<Milestone>,
    pub practice_streak: u32,
    pub weak_areas: Vec<TopicAccuracy>,
    pub strong_areas: Vec<TopicAccuracy>,
}

/// 无任何练习数据时只返回提示
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ProgressReport {
    Summary(Box<ProgressSummary>),
    Empty {
        message: String,
        total_questions: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakReport {
    pub current_streak: u32,
    pub streak_status: String,
    pub total_study_days: usize,
    pub message: String,
}

fn milestone(kind: &str, title: &str, description: &str) -> Milestone {
    Milestone {
        kind: kind.to_string(),
        title: title.to_string(),
        description: description.to_string(),
    }
}

pub fn get_progress_summary(store: &MemoryStore, args: UserArgs) -> ToolResult<ProgressReport> {
    let user = store
        .get_user(&args.user_id)
        .ok_or_else(|| ToolError::UserNotFound {
            user_id: args.user_id.clone(),
        })?;
    let responses = store.quiz_responses(&args.user_id);
    let tests = store.test_results(&args.user_id);

    if responses.is_empty() && tests.is_empty() {
        return Ok(ProgressReport::Empty {
            message: "No practice data yet. Start practicing to track your progress!".to_string(),
            total_questions: 0,
        });
    }

    let now = Utc::now();
    let total = responses.len();
    let correct = responses.iter().filter(|r| r.is_correct).count();
    let overall = percentage(correct, total);

    let week_ago = now - Duration::days(7);
    let recent: Vec<_> = responses.iter().filter(|r| r.timestamp >= week_ago).collect();
    let recent_accuracy = if recent.is_empty() {
        overall
    } else {
        percentage(recent.iter().filter(|r| r.is_correct).count(), recent.len())
    };

    let accuracy_trend = if recent_accuracy > overall {
        AccuracyTrend::Improving
    } else if recent_accuracy == overall {
        AccuracyTrend::Stable
    } else {
        AccuracyTrend::Declining
    };

    let improvement = match (tests.first(), tests.last()) {
        (Some(first), Some(last)) if tests.len() >= 2 => {
            let points = last.total_score as i64 - first.total_score as i64;
            Some(Improvement {
                points,
                percentage: if first.total_score > 0 {
                    round_to(points as f64 / first.total_score as f64 * 100.0, 2)
                } else {
                    0.0
                },
            })
        }
        _ => None,
    };

    let mut milestones = Vec::new();
    if total >= 100 {
        milestones.push(milestone(
            "practice_volume",
            "Century Club",
            "Completed 100+ practice questions",
        ));
    }
    if overall >= 80.0 {
        milestones.push(milestone(
            "accuracy",
            "High Achiever",
            "Maintaining 80%+ overall accuracy",
        ));
    }
    if tests.len() >= 5 {
        milestones.push(milestone(
            "dedication",
            "Test Pro",
            "Completed 5+ full practice tests",
        ));
    }

    let mut topics: Vec<TopicAccuracy> = tally_by_topic(&responses)
        .into_iter()
        .map(|(topic, tally)| TopicAccuracy {
            topic,
            accuracy: round_to(tally.accuracy_pct(), 1),
            questions: tally.attempted,
        })
        .collect();
    topics.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));
    let weak_areas: Vec<TopicAccuracy> = topics.iter().take(3).cloned().collect();
    let strong_areas: Vec<TopicAccuracy> = topics.iter().rev().take(3).cloned().collect();

    let current_score = tests
        .last()
        .map(|t| t.total_score)
        .or(user.baseline_score);

    Ok(ProgressReport::Summary(Box::new(ProgressSummary {
        user_id: args.user_id,
        test_type: user.test_type.clone(),
        target_score: user.target_score,
        baseline_score: user.baseline_score,
        current_score,
        days_until_test: user.days_until_test(),
        total_questions_attempted: total,
        overall_accuracy: round_to(overall, 2),
        recent_accuracy: round_to(recent_accuracy, 2),
        accuracy_trend,
        score_progression: tests
            .iter()
            .map(|t| ScorePoint {
                date: t.date_taken,
                score: t.total_score,
                test_type: t.test_type.clone(),
            })
            .collect(),
        improvement,
        milestones,
        practice_streak: study_streak(&responses, now.date_naive()),
        weak_areas,
        strong_areas,
    })))
}

fn streak_status(days: u32) -> &'static str {
    match days {
        7.. => "🔥 On fire!",
        3..=6 => "⭐ Great start!",
        1..=2 => "💪 Keep going!",
        0 => "Start your streak today!",
    }
}

fn streak_message(days: u32) -> String {
    match days {
        0 => "Start your study streak today! Even 10 minutes counts.".to_string(),
        1 => "Great start! Come back tomorrow to build your streak.".to_string(),
        2..=6 => format!("{} days strong! Keep the momentum going.", days),
        7..=29 => format!(
            "Amazing {}-day streak! You're building a solid habit.",
            days
        ),
        _ => format!(
            "Incredible {}-day streak! Your dedication is inspiring.",
            days
        ),
    }
}

pub fn track_study_streak(store: &MemoryStore, args: UserArgs) -> ToolResult<StreakReport> {
    let responses = store.quiz_responses(&args.user_id);
    let streak = study_streak(&responses, Utc::now().date_naive());

    Ok(StreakReport {
        current_streak: streak,
        streak_status: streak_status(streak).to_string(),
        total_study_days: distinct_study_days(&responses),
        message: streak_message(streak),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::seed::{DEMO_USER_ID, seeded_store};
    use rstest::rstest;

    fn args(user: &str) -> UserArgs {
        UserArgs {
            user_id: user.into(),
        }
    }

    #[test]
    fn test_progress_summary_for_demo_user() {
        let store = seeded_store();
        let ProgressReport::Summary(summary) =
            get_progress_summary(&store, args(DEMO_USER_ID)).unwrap()
        else {
            panic!("expected a summary");
        };

        assert_eq!(summary.current_score, Some(800));
        assert_eq!(summary.total_questions_attempted, 10);
        assert_eq!(summary.overall_accuracy, 60.0);
        assert_eq!(summary.weak_areas[0].topic, "algebra");
        assert_eq!(summary.weak_areas[0].accuracy, 25.0);
        assert_eq!(summary.strong_areas.len(), 3);
        assert_eq!(summary.strong_areas[0].accuracy, 100.0);
        assert!(summary.improvement.is_none());
        assert!(summary.milestones.is_empty());
        assert_eq!(summary.practice_streak, 10);
    }

    #[test]
    fn test_progress_summary_without_data() {
        let store = seeded_store();
        let report = get_progress_summary(&store, args("new-student")).unwrap();
        assert!(matches!(report, ProgressReport::Empty { .. }));

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["total_questions"], 0);
    }

    #[rstest]
    #[case(0, "Start your streak today!")]
    #[case(2, "💪 Keep going!")]
    #[case(5, "⭐ Great start!")]
    #[case(12, "🔥 On fire!")]
    fn test_streak_status(#[case] days: u32, #[case] expected: &str) {
        assert_eq!(streak_status(days), expected);
    }

    #[test]
    fn test_track_study_streak() {
        let store = seeded_store();
        let report = track_study_streak(&store, args(DEMO_USER_ID)).unwrap();
        assert_eq!(report.current_streak, 10);
        assert_eq!(report.total_study_days, 10);
        assert!(report.message.starts_with("Amazing 10-day"));
    }
}
