//! 快捷回复按钮集合与选择级联
//!
//! 级联按优先级逐级匹配，首个命中即返回：
//! 1. 本轮最近调用、且有对应按钮集的工具
//! 2. 最近三条历史消息（测验刚结束 / 正在讨论如何提高）
//! 3. 回复文本（数据获取问题 / 确认提问 / 分析建议 / 进度连续天数）
//! 4. 默认按钮

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{ConversationMessage, QuickReply};

type ReplySet = &'static [(&'static str, &'static str)];

pub const DEFAULT_REPLIES: ReplySet = &[
    ("📊 Analyze my last exam", "analyze_exam"),
    ("💰 How can I improve my scores?", "improve_scores"),
    ("🤔 How am I doing now?", "check_progress"),
    ("📝 Come up with similar questions", "create_quiz"),
];

const TEST_RESULTS_REPLIES: ReplySet = &[
    ("📊 Analyze my last exam", "analyze_exam"),
    ("💰 How can I improve my scores?", "improve_scores"),
    ("📈 Compare with my target", "compare_progress"),
    ("🎯 Generate practice questions", "create_quiz"),
];

const TOPIC_ANALYSIS_REPLIES: ReplySet = &[
    ("🎯 Create practice on weak areas", "create_quiz"),
    ("📊 Show detailed breakdown", "detailed_analysis"),
    ("💡 What should I study next?", "get_recommendations"),
    ("📈 How am I doing overall?", "check_progress"),
];

const QUIZ_CREATED_REPLIES: ReplySet = &[
    ("▶️ Start this quiz", "start_quiz"),
    ("⚙️ Customize quiz settings", "customize_quiz"),
    ("📚 Review concepts first", "review_concepts"),
    ("❌ Skip for now", "cancel"),
];

const STUDY_PLAN_REPLIES: ReplySet = &[
    ("🎯 Create practice quiz", "create_quiz"),
    ("📊 Analyze more details", "analyze_exam"),
    ("💡 Show study plan", "get_recommendations"),
    ("📈 Track my progress", "check_progress"),
];

const PROGRESS_REPLIES: ReplySet = &[
    ("🎯 Create practice questions", "create_quiz"),
    ("📊 Analyze my last test", "analyze_exam"),
    ("💡 Get recommendations", "get_recommendations"),
    ("🔥 Check my streak", "check_progress"),
];

const ERROR_PATTERN_REPLIES: ReplySet = &[
    ("🎯 Practice my weak topics", "create_quiz"),
    ("📊 Show detailed analysis", "detailed_analysis"),
    ("💡 How to fix these mistakes?", "get_recommendations"),
    ("📚 Review explanations", "review_concepts"),
];

const EXPLANATION_REPLIES: ReplySet = &[
    ("🎯 Try similar questions", "create_quiz"),
    ("📊 Analyze my test", "analyze_exam"),
    ("💡 Explain another topic", "explain_concepts"),
    ("📈 Check my progress", "check_progress"),
];

const POST_QUIZ_REPLIES: ReplySet = &[
    ("📊 Review my results", "analyze_exam"),
    ("🎯 Try another quiz", "create_quiz"),
    ("💡 Get study tips", "get_recommendations"),
    ("📈 Check overall progress", "check_progress"),
];

const QUIZ_EXCELLENT_REPLIES: ReplySet = &[
    ("📊 Show detailed breakdown", "quiz_breakdown"),
    ("🎯 Try harder questions", "harder_quiz"),
    ("📈 Check my progress", "check_progress"),
    ("✨ Practice more", "practice"),
];

const QUIZ_GOOD_REPLIES: ReplySet = &[
    ("📖 Review wrong answers", "review_answers"),
    ("🎯 Practice weak topics", "weak_topics"),
    ("💡 Get study tips", "study_tips"),
    ("🔄 Try similar quiz", "similar_quiz"),
];

const QUIZ_RETRY_REPLIES: ReplySet = &[
    ("📖 Review all answers", "review_all"),
    ("📚 Explain concepts", "explain_concepts"),
    ("🎯 Easier practice", "easier_quiz"),
    ("💪 Get encouragement", "encouragement"),
];

const IMPROVEMENT_TALK_REPLIES: ReplySet = &[
    ("🎯 Create practice on weak areas", "create_quiz"),
    ("📊 Show detailed breakdown", "analyze_exam"),
    ("💡 Get personalized recommendations", "get_recommendations"),
    ("📚 Review explanations", "review_concepts"),
];

const DATA_PROBLEM_REPLIES: ReplySet = &[
    ("✅ I did take a test!", "confirm_test_taken"),
    ("🎯 Let's do a practice quiz", "create_quiz"),
    ("📊 Check my profile", "check_profile"),
    ("💬 I need help", "support"),
];

const CONFIRM_QUIZ_REPLIES: ReplySet = &[
    ("✅ Yes! Let's do it", "start_quiz"),
    ("⚙️ Let me customize it", "customize_quiz"),
    ("📚 Review first", "review_concepts"),
    ("❌ Maybe later", "cancel"),
];

const CONFIRM_TEST_REPLIES: ReplySet = &[
    ("✅ Yep, I took one!", "confirm_test_taken"),
    ("❌ Not yet", "no_test_yet"),
    ("🎯 Let's practice", "create_quiz"),
];

const CONFIRM_SCHEDULE_REPLIES: ReplySet = &[
    ("📅 Set a new date", "schedule_test"),
    ("📊 Just study for now", "focus_study"),
    ("💬 Tell me more", "more_info"),
];

const CONFIRM_GENERIC_REPLIES: ReplySet = &[
    ("✅ Yes, sounds good!", "confirm_yes"),
    ("❌ Nope, I'm good", "confirm_no"),
    ("💬 Tell me more", "more_info"),
];

const WEAK_TOPIC_REPLIES: ReplySet = &[
    ("✅ Give me practice questions", "practice"),
    ("📚 Explain the concepts", "explain_concepts"),
    ("🎯 Create a study plan", "create_plan"),
    ("📊 Show me my mistakes", "show_mistakes"),
];

const ANALYSIS_REPLIES: ReplySet = &[
    ("🎯 Help me practice", "create_quiz"),
    ("📊 Show me more details", "analyze_exam"),
    ("💡 What should I study?", "get_recommendations"),
    ("📈 How am I doing now?", "check_progress"),
];

const PROGRESS_TALK_REPLIES: ReplySet = &[
    ("📈 Overall progress", "check_progress"),
    ("🎯 Create practice quiz", "create_quiz"),
    ("📊 Analyze my test", "analyze_exam"),
    ("💡 Get recommendations", "get_recommendations"),
];

const QUIZ_CONTEXT: &[&str] = &["quiz", "practice", "question"];
const QUIZ_DONE: &[&str] = &["complete", "finished", "done", "result", "score", "correct"];
const IMPROVEMENT_CONTEXT: &[&str] = &["improve", "better", "weak", "struggl", "help"];
const DATA_PROBLEM: &[&str] = &[
    "issue retrieving",
    "error",
    "could not",
    "unable to",
    "no recent test results",
    "no test results",
    "haven't taken",
];
const CONFIRMATION: &[&str] = &[
    "would you like",
    "do you want",
    "shall we",
    "ready to",
    "can you confirm",
    "please confirm",
    "let me know",
];
const ANALYSIS: &[&str] = &[
    "based on",
    "you scored",
    "your performance",
    "recommend",
    "suggest",
    "weak areas",
    "strengths",
    "improve",
    "focus on",
    "analysis",
    "breakdown",
];
const TOPIC_KEYWORDS: &[&str] = &[
    "algebra",
    "geometry",
    "reading",
    "writing",
    "math",
    "verbal",
    "quantitative",
];
const WEAKNESS: &[&str] = &["weak", "struggle", "difficulty"];
const PROGRESS_TALK: &[&str] = &["streak", "progress", "improvement", "better", "days", "practice"];

/// 历史窗口内参与匹配的消息条数
const HISTORY_CONTEXT_MESSAGES: usize = 3;

static QUIZ_SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)%|(\d+)/(\d+)").expect("valid regex")
});

pub fn replies(set: ReplySet) -> Vec<QuickReply> {
    set.iter()
        .map(|(text, action)| QuickReply::new(*text, *action))
        .collect()
}

pub fn default_replies() -> Vec<QuickReply> {
    replies(DEFAULT_REPLIES)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn for_tool(name: &str) -> Option<ReplySet> {
    match name {
        "get_latest_test_results" => Some(TEST_RESULTS_REPLIES),
        "analyze_performance_by_topic" => Some(TOPIC_ANALYSIS_REPLIES),
        "generate_adaptive_quiz" => Some(QUIZ_CREATED_REPLIES),
        "generate_bar_chart_data" | "generate_study_recommendations" => Some(STUDY_PLAN_REPLIES),
        "get_progress_summary" => Some(PROGRESS_REPLIES),
        "identify_error_patterns" => Some(ERROR_PATTERN_REPLIES),
        "get_question_explanation" => Some(EXPLANATION_REPLIES),
        _ => None,
    }
}

/// 从回复中读出测验正确率：优先百分比，其次 `k/N`
pub fn quiz_accuracy(text: &str) -> Option<f64> {
    let caps = QUIZ_SCORE_RE.captures(text)?;
    if let Some(pct) = caps.get(1) {
        return pct.as_str().parse().ok();
    }
    let correct: f64 = caps.get(2)?.as_str().parse().ok()?;
    let total: f64 = caps.get(3)?.as_str().parse().ok()?;
    (total > 0.0).then(|| correct / total * 100.0)
}

/// 测验完成后按正确率分档
pub fn quiz_complete_replies(accuracy: f64) -> Vec<QuickReply> {
    if accuracy >= 80.0 {
        replies(QUIZ_EXCELLENT_REPLIES)
    } else if accuracy >= 60.0 {
        replies(QUIZ_GOOD_REPLIES)
    } else {
        replies(QUIZ_RETRY_REPLIES)
    }
}

/// 回复中被描述为薄弱的科目关键词
pub fn weak_topics_mentioned(response_lower: &str) -> Vec<&'static str> {
    if !contains_any(response_lower, WEAKNESS) {
        return Vec::new();
    }
    TOPIC_KEYWORDS
        .iter()
        .copied()
        .filter(|topic| response_lower.contains(topic))
        .collect()
}

/// 选择快捷回复
///
/// `history` 为本轮用户消息之前的会话记录。
pub fn select_quick_replies(
    response: &str,
    tools_used: &[String],
    history: &[ConversationMessage],
) -> Vec<QuickReply> {
    if let Some(set) = tools_used.iter().rev().find_map(|name| for_tool(name)) {
        return replies(set);
    }

    let response_lower = response.to_lowercase();

    let start = history.len().saturating_sub(HISTORY_CONTEXT_MESSAGES);
    let context = history[start..]
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if !context.is_empty() {
        if contains_any(&context, QUIZ_CONTEXT) && contains_any(&response_lower, QUIZ_DONE) {
            return match quiz_accuracy(response) {
                Some(accuracy) => quiz_complete_replies(accuracy),
                None => replies(POST_QUIZ_REPLIES),
            };
        }
        if contains_any(&context, IMPROVEMENT_CONTEXT) {
            return replies(IMPROVEMENT_TALK_REPLIES);
        }
    }

    if contains_any(&response_lower, DATA_PROBLEM) {
        return replies(DATA_PROBLEM_REPLIES);
    }

    if contains_any(&response_lower, CONFIRMATION) {
        let set = if response_lower.contains("quiz") || response_lower.contains("practice") {
            CONFIRM_QUIZ_REPLIES
        } else if response_lower.contains("test") || response_lower.contains("exam") {
            CONFIRM_TEST_REPLIES
        } else if response_lower.contains("schedule") {
            CONFIRM_SCHEDULE_REPLIES
        } else {
            CONFIRM_GENERIC_REPLIES
        };
        return replies(set);
    }

    if contains_any(&response_lower, ANALYSIS) {
        return if weak_topics_mentioned(&response_lower).is_empty() {
            replies(ANALYSIS_REPLIES)
        } else {
            replies(WEAK_TOPIC_REPLIES)
        };
    }

    if tools_used.is_empty() && contains_any(&response_lower, PROGRESS_TALK) {
        return replies(PROGRESS_TALK_REPLIES);
    }

    default_replies()
}
