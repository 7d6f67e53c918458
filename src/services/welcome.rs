//! 新会话欢迎流程
//!
//! 不调用模型：直接读取档案、进度与最近一次考试，生成个性化问候和欢迎页 UI。

use serde_json::json;

use crate::models::{Card, Chart, ProfileOverview, UiElements, User};
use crate::services::scenarios::default_replies;
use crate::storage::MemoryStore;
use crate::tools::performance::{TestLookupArgs, get_latest_test_results};
use crate::tools::profile::UserArgs;
use crate::tools::progress::{ProgressReport, ProgressSummary, get_progress_summary};

/// 欢迎流程中读取的工具，写入响应的 `tools_used`
pub const WELCOME_TOOLS: [&str; 2] = ["get_user_profile", "get_progress_summary"];

pub const WELCOME_FOLLOW_UP: &str = "What would you like to work on today?";

const WELCOME_AREAS: usize = 3;

/// 欢迎回复
#[derive(Debug, Clone)]
pub struct Welcome {
    pub message: String,
    pub ui_elements: UiElements,
}

/// 为已存在的用户生成欢迎回复；用户不存在时返回 `None`
pub fn build_welcome(store: &MemoryStore, user_id: &str) -> Option<Welcome> {
    let user = store.get_user(user_id)?;

    let latest_score = get_latest_test_results(
        store,
        TestLookupArgs {
            user_id: user_id.to_string(),
            test_id: None,
        },
    )
    .ok()
    .map(|t| t.total_score)
    .filter(|score| *score > 0);

    let progress = match get_progress_summary(
        store,
        UserArgs {
            user_id: user_id.to_string(),
        },
    ) {
        Ok(ProgressReport::Summary(summary)) => Some(summary),
        _ => None,
    };

    let current_score = latest_score
        .or_else(|| progress.as_ref().and_then(|p| p.current_score))
        .or(user.baseline_score);

    Some(Welcome {
        message: greeting(&user, latest_score),
        ui_elements: welcome_ui(&user, current_score, progress.as_deref()),
    })
}

fn greeting(user: &User, latest_score: Option<u32>) -> String {
    let name = user.first_name();

    if let Some(score) = latest_score {
        return format!(
            "Hey {name}!\nWell done on that last exam!\nYou scored a {score} which is a marked improvement but I think there's still room to grow.\nYou got this! 😉"
        );
    }

    let test_type = &user.test_type;
    match user.days_until_test() {
        Some(days) if days <= 0 => format!(
            "Hey {name}!\n\nYay! It's test day! 🎉\n\nAre you excited? I hope you're feeling confident and ready to show what you know! 💪"
        ),
        Some(days) if days <= 7 => format!(
            "Hey {name}! 👋\n\nYour {test_type} is coming up soon!\n\nOnly {days} days to go! Let's make sure you're fully prepared."
        ),
        Some(days) if days <= 30 => format!(
            "Hey {name}! 👋\n\nGreat to see you preparing for your {test_type}!\n\nYou have {days} days to prepare. We've got this! 🎯"
        ),
        Some(_) => format!("Hey {name}! 👋\n\nWelcome back to your {test_type} prep!"),
        None => format!("Hey {name}! 👋\n\nReady to ace your {test_type}?"),
    }
}

fn welcome_ui(
    user: &User,
    current_score: Option<u32>,
    progress: Option<&ProgressSummary>,
) -> UiElements {
    let mut ui = UiElements {
        quick_replies: default_replies(),
        ..UiElements::default()
    };

    ui.cards.push(Card::ProfileOverview {
        data: ProfileOverview {
            test_type: user.test_type.clone(),
            target_score: user.target_score,
            baseline_score: user.baseline_score,
            current_score,
            days_until_test: user.days_until_test().filter(|d| *d > 0),
            study_hours_per_week: user.study_hours_per_week,
        },
    });

    let Some(progress) = progress.filter(|p| p.total_questions_attempted > 0) else {
        return ui;
    };

    ui.charts.push(Chart::CircularProgress {
        title: "Overall Accuracy".to_string(),
        value: progress.overall_accuracy,
        target: None,
        label: format!("{} questions attempted", progress.total_questions_attempted),
    });

    if !progress.weak_areas.is_empty() || !progress.strong_areas.is_empty() {
        let weak: Vec<_> = progress.weak_areas.iter().take(WELCOME_AREAS).collect();
        let strong: Vec<_> = progress.strong_areas.iter().take(WELCOME_AREAS).collect();
        ui.cards.push(Card::ProgressCard {
            title: None,
            data: json!({
                "overall_accuracy": progress.overall_accuracy,
                "total_questions": progress.total_questions_attempted,
                "weak_areas": weak,
                "strong_areas": strong,
            }),
        });
    }

    ui
}
