//! 激励工具

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::storage::MemoryStore;
use crate::tools::ToolResult;
use crate::tools::stats::round_to;

const RECENT_WINDOW: usize = 20;

fn default_context() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EncouragementArgs {
    /// The user's unique identifier
    pub user_id: String,
    /// Context for encouragement: general, after_quiz, struggling or milestone
    #[serde(default = "default_context")]
    pub context: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AchievementArgs {
    /// The user's unique identifier
    pub user_id: String,
    /// Achievement kind, e.g. first_quiz, perfect_score, streak_week, 100_questions
    pub achievement_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Encouragement {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Celebration {
    pub achievement_type: String,
    pub message: String,
    pub earned_at: DateTime<Utc>,
}

fn after_quiz_message(accuracy: f64) -> &'static str {
    if accuracy >= 0.85 {
        "Outstanding work! You're really mastering this material. Keep up this excellent momentum!"
    } else if accuracy >= 0.70 {
        "Great progress! You're on the right track. With continued practice, you'll reach your target score."
    } else if accuracy >= 0.50 {
        "Good effort! Remember, every mistake is a learning opportunity. Review the explanations and try again."
    } else {
        "Don't get discouraged! This material takes time to master. Focus on understanding one topic at a time."
    }
}

pub fn generate_encouragement(
    store: &MemoryStore,
    args: EncouragementArgs,
) -> ToolResult<Encouragement> {
    let responses = store.quiz_responses(&args.user_id);
    if responses.is_empty() {
        return Ok(Encouragement {
            message: "Welcome! Every expert was once a beginner. Let's start your test prep journey together!"
                .to_string(),
            kind: "welcome".to_string(),
            recent_accuracy: None,
        });
    }

    let recent = &responses[responses.len().saturating_sub(RECENT_WINDOW)..];
    let accuracy = recent.iter().filter(|r| r.is_correct).count() as f64 / recent.len() as f64;

    let message = match args.context.as_str() {
        "after_quiz" => after_quiz_message(accuracy),
        "struggling" => {
            "Challenges are what make you stronger. Take a break if needed, then come back fresh. You've got this!"
        }
        "milestone" => {
            "🎉 Congratulations on this achievement! Your dedication is paying off. Celebrate this win!"
        }
        _ => "Keep pushing forward! Consistent effort leads to remarkable results.",
    };

    Ok(Encouragement {
        message: message.to_string(),
        kind: args.context,
        recent_accuracy: Some(round_to(accuracy * 100.0, 1)),
    })
}

pub fn celebrate_achievement(args: AchievementArgs) -> ToolResult<Celebration> {
    let message = match args.achievement_type.as_str() {
        "first_quiz" => "🎯 First quiz complete! Great start to your learning journey!",
        "perfect_score" => "💯 Perfect score! You absolutely crushed it!",
        "streak_week" => "🔥 7-day streak! Your consistency is impressive!",
        "100_questions" => "💪 100 questions completed! You're building serious momentum!",
        "score_improvement" => "📈 Score improved! Your hard work is paying off!",
        "reached_target" => "🎉 You reached your target score! Amazing achievement!",
        "10_day_streak" => "⭐ 10-day streak! You're unstoppable!",
        "50_questions" => "🌟 50 questions down! You're making great progress!",
        _ => "🌟 Great achievement! Keep up the excellent work!",
    };

    Ok(Celebration {
        achievement_type: args.achievement_type,
        message: message.to_string(),
        earned_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::seed::{DEMO_USER_ID, seeded_store};
    use rstest::rstest;

    #[rstest]
    #[case(0.9, "Outstanding")]
    #[case(0.7, "Great progress")]
    #[case(0.6, "Good effort")]
    #[case(0.2, "Don't get discouraged")]
    fn test_after_quiz_thresholds(#[case] accuracy: f64, #[case] prefix: &str) {
        assert!(after_quiz_message(accuracy).starts_with(prefix));
    }

    #[test]
    fn test_encouragement_uses_recent_accuracy() {
        let store = seeded_store();
        let result = generate_encouragement(
            &store,
            EncouragementArgs {
                user_id: DEMO_USER_ID.into(),
                context: "after_quiz".into(),
            },
        )
        .unwrap();
        assert_eq!(result.kind, "after_quiz");
        assert_eq!(result.recent_accuracy, Some(60.0));
        assert!(result.message.starts_with("Good effort"));
    }

    #[test]
    fn test_encouragement_welcomes_new_user() {
        let store = seeded_store();
        let result = generate_encouragement(
            &store,
            EncouragementArgs {
                user_id: "new-student".into(),
                context: default_context(),
            },
        )
        .unwrap();
        assert_eq!(result.kind, "welcome");
        assert!(result.recent_accuracy.is_none());
    }

    #[test]
    fn test_celebration_default_message() {
        let known = celebrate_achievement(AchievementArgs {
            user_id: DEMO_USER_ID.into(),
            achievement_type: "perfect_score".into(),
        })
        .unwrap();
        assert!(known.message.starts_with("💯"));

        let unknown = celebrate_achievement(AchievementArgs {
            user_id: DEMO_USER_ID.into(),
            achievement_type: "first_marathon".into(),
        })
        .unwrap();
        assert_eq!(
            unknown.message,
            "🌟 Great achievement! Keep up the excellent work!"
        );
    }
}
