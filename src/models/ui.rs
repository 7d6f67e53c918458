//! 移动端 UI 载荷：快捷回复、卡片与图表

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 快捷回复按钮
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuickReply {
    pub text: String,
    pub action: String,
}

impl QuickReply {
    pub fn new(text: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: action.into(),
        }
    }
}

/// 欢迎页档案概览
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileOverview {
    pub test_type: String,
    pub target_score: u32,
    pub baseline_score: Option<u32>,
    pub current_score: Option<u32>,
    /// 仅在考试尚未到来时给出
    pub days_until_test: Option<i64>,
    pub study_hours_per_week: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Card {
    ProfileOverview {
        data: ProfileOverview,
    },
    ProgressCard {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        data: Value,
    },
    QuizReady {
        title: String,
        message: String,
        action: String,
        quiz_id: String,
        total_questions: usize,
    },
    Performance {
        title: String,
        data: Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Chart {
    CircularProgress {
        title: String,
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<u32>,
        label: String,
    },
    BarChart {
        title: String,
        data: Value,
    },
}

/// 一次回复附带的全部 UI 元素
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UiElements {
    pub cards: Vec<Card>,
    pub quick_replies: Vec<QuickReply>,
    pub charts: Vec<Chart>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_wire_format() {
        let chart = Chart::CircularProgress {
            title: "Overall Accuracy".into(),
            value: 60.0,
            target: None,
            label: "10 questions attempted".into(),
        };
        assert_eq!(
            serde_json::to_value(&chart).unwrap(),
            json!({
                "type": "circular_progress",
                "title": "Overall Accuracy",
                "value": 60.0,
                "label": "10 questions attempted",
            })
        );

        let card = Card::ProgressCard {
            title: Some("Your Progress".into()),
            data: json!({}),
        };
        assert_eq!(serde_json::to_value(&card).unwrap()["type"], "progress_card");
    }
}
