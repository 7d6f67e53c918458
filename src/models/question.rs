use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 题目难度
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_average_time() -> u32 {
    90
}

/// 题库中的一道题
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub question_id: String,
    pub test_type: String,
    pub section: String,
    pub topic: String,
    #[serde(default)]
    pub subtopic: Option<String>,
    pub difficulty: Difficulty,
    pub content: String,
    /// 选项字母 -> 选项内容
    pub options: BTreeMap<String, String>,
    pub correct_answer: String,
    pub explanation: String,
    /// 平均作答时间（秒）
    #[serde(default = "default_average_time")]
    pub average_time: u32,
}

/// 题库查询条件
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct QuestionFilter {
    /// Exam type, e.g. "SAT"
    pub test_type: Option<String>,
    /// Exam section, e.g. "math" or "reading"
    pub section: Option<String>,
    /// Topic slug, e.g. "algebra"
    pub topic: Option<String>,
    /// Allowed difficulty levels
    pub difficulty: Option<Vec<Difficulty>>,
}

impl QuestionFilter {
    pub fn matches(&self, question: &Question) -> bool {
        if let Some(test_type) = &self.test_type {
            if &question.test_type != test_type {
                return false;
            }
        }
        if let Some(section) = &self.section {
            if &question.section != section {
                return false;
            }
        }
        if let Some(topic) = &self.topic {
            if &question.topic != topic {
                return false;
            }
        }
        if let Some(levels) = &self.difficulty {
            if !levels.contains(&question.difficulty) {
                return false;
            }
        }
        true
    }
}
