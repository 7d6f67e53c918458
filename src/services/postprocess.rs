//! 回复后处理
//!
//! 基于本轮的工具调用记录修正回复、生成卡片与图表，并挑选快捷回复。

use serde_json::Value;
use tracing::{info, warn};

use crate::models::{Card, Chart, ConversationMessage, UiElements};
use crate::services::scenarios::select_quick_replies;
use crate::tools::performance::{TestResultsReport, title_case};
use crate::tools::quiz::QuizCreated;
use crate::tools::registry::ToolExecution;

/// 模型声称“没有数据”时常用的措辞
const NO_DATA_PHRASES: &[&str] = &[
    "haven't taken",
    "no test",
    "no results",
    "couldn't find",
    "could not find",
    "didn't find",
    "unable to find",
    "issue finding",
    "don't have any results",
    "hiccup",
    "issue with",
    "not being recognized",
    "verify your user",
];

const MAX_FOLLOW_UPS: usize = 2;

const PROGRESS_TARGET: u32 = 85;

/// 后处理结果
#[derive(Debug, Clone)]
pub struct ProcessedReply {
    pub text: String,
    /// 回复是否被工具数据覆盖
    pub overridden: bool,
    pub ui_elements: UiElements,
    pub follow_ups: Vec<String>,
}

/// 对一轮回复执行完整后处理
///
/// `history` 为本轮用户消息之前的会话记录，只用于快捷回复级联。
pub fn process(
    text: &str,
    executions: &[ToolExecution],
    history: &[ConversationMessage],
) -> ProcessedReply {
    let tools_used: Vec<String> = executions.iter().map(|e| e.name.clone()).collect();

    let (text, overridden) = match override_reply(text, executions) {
        Some(corrected) => (corrected, true),
        None => (text.to_string(), false),
    };

    let mut ui_elements = build_ui_elements(executions);
    ui_elements.quick_replies = select_quick_replies(&text, &tools_used, history);

    ProcessedReply {
        follow_ups: follow_ups(&tools_used),
        text,
        overridden,
        ui_elements,
    }
}

fn last_success<'a>(executions: &'a [ToolExecution], name: &str) -> Option<&'a ToolExecution> {
    executions
        .iter()
        .rev()
        .find(|e| e.name == name && e.succeeded)
}

/// 回复声称没有数据、而本轮工具实际返回了数据时，用工具数据重写回复
pub fn override_reply(text: &str, executions: &[ToolExecution]) -> Option<String> {
    let lowered = text.to_lowercase();
    if !NO_DATA_PHRASES.iter().any(|p| lowered.contains(p)) {
        return None;
    }

    let quiz = last_success(executions, "generate_adaptive_quiz")
        .and_then(|e| serde_json::from_value::<QuizCreated>(e.result.clone()).ok())
        .filter(|q| q.success && !q.quiz_id.is_empty());
    if let Some(quiz) = quiz {
        warn!(
            "Reply claimed a problem but quiz {} was created; overriding",
            quiz.quiz_id
        );
        return Some(quiz_confirmation(&quiz));
    }

    let test = last_success(executions, "get_latest_test_results")
        .and_then(|e| serde_json::from_value::<TestResultsReport>(e.result.clone()).ok())
        .filter(|t| t.success && t.total_score > 0);
    if let Some(test) = test {
        warn!(
            "Reply claimed no data but test {} scored {}; overriding",
            test.test_id, test.total_score
        );
        return Some(score_breakdown(&test));
    }

    None
}

fn quiz_confirmation(quiz: &QuizCreated) -> String {
    let mut text = format!(
        "I've created a personalized quiz for you with {} questions! ",
        quiz.total_questions
    );
    if quiz.section != "mixed" {
        text.push_str(&format!("It focuses on {}. ", quiz.section));
    }
    if !quiz.focus_areas.is_empty() && quiz.focus_areas != ["general"] {
        text.push_str(&format!("The quiz covers: {}. ", quiz.focus_areas.join(", ")));
    }
    text.push_str("Ready to start when you are!");
    text
}

fn score_breakdown(test: &TestResultsReport) -> String {
    let mut text = format!(
        "I found your latest test results! You scored {} total. ",
        test.total_score
    );
    if test.sections.is_empty() {
        return text;
    }

    text.push_str("Here's your breakdown:\n\n");
    for (name, section) in &test.sections {
        text.push_str(&format!(
            "{}: {} points ({}th percentile)\n",
            title_case(name),
            section.score,
            section.percentile
        ));
    }

    let strongest = test.sections.iter().max_by_key(|(_, s)| s.score);
    let weakest = test.sections.iter().min_by_key(|(_, s)| s.score);
    if let (Some((best, _)), Some((worst, _))) = (strongest, weakest) {
        if best != worst {
            text.push_str(&format!(
                "\nYour strongest section is {}. Let's focus on {} to boost your overall score!",
                title_case(best),
                title_case(worst)
            ));
        }
    }
    text
}

/// 由本轮工具结果生成卡片与图表
pub fn build_ui_elements(executions: &[ToolExecution]) -> UiElements {
    let mut ui = UiElements::default();

    if let Some(progress) = last_success(executions, "get_progress_summary") {
        let result = &progress.result;
        if let Some(total) = result.get("total_questions_attempted").and_then(Value::as_u64) {
            ui.charts.push(Chart::CircularProgress {
                title: "Overall Progress".to_string(),
                value: result["overall_accuracy"].as_f64().unwrap_or(0.0),
                target: Some(PROGRESS_TARGET),
                label: format!("{} questions", total),
            });
            ui.cards.push(Card::ProgressCard {
                title: Some("Your Progress".to_string()),
                data: result.clone(),
            });
        }
    }

    let quiz = last_success(executions, "generate_adaptive_quiz")
        .and_then(|e| serde_json::from_value::<QuizCreated>(e.result.clone()).ok());
    if let Some(quiz) = quiz {
        ui.cards.push(Card::QuizReady {
            title: "Quiz Ready!".to_string(),
            message: "Your personalized quiz has been created and is ready to start.".to_string(),
            action: "start_quiz".to_string(),
            quiz_id: quiz.quiz_id,
            total_questions: quiz.total_questions,
        });
    }

    if let Some(chart) = last_success(executions, "generate_bar_chart_data") {
        let has_bars = chart.result["bars"]
            .as_array()
            .is_some_and(|bars| !bars.is_empty());
        if has_bars {
            ui.charts.push(Chart::BarChart {
                title: "Score Breakdown by Subject".to_string(),
                data: chart.result.clone(),
            });
        }
    }

    if let Some(analysis) = last_success(executions, "analyze_performance_by_topic") {
        let has_topics = analysis.result["topics"]
            .as_array()
            .is_some_and(|topics| !topics.is_empty());
        if has_topics {
            let section = analysis.result["section"].as_str().unwrap_or("performance");
            ui.cards.push(Card::Performance {
                title: format!("{} Analysis", title_case(section)),
                data: analysis.result.clone(),
            });
        }
    }

    if !ui.cards.is_empty() || !ui.charts.is_empty() {
        info!(
            "Generated {} card(s) and {} chart(s)",
            ui.cards.len(),
            ui.charts.len()
        );
    }
    ui
}

/// 根据本轮使用的工具给出至多两条后续建议
pub fn follow_ups(tools_used: &[String]) -> Vec<String> {
    let used = |name: &str| tools_used.iter().any(|t| t == name);
    [
        (
            "analyze_performance_by_topic",
            "Would you like me to create a practice quiz focused on your weak areas?",
        ),
        (
            "generate_adaptive_quiz",
            "Ready to start the quiz whenever you are!",
        ),
        (
            "get_latest_test_results",
            "Want to see how this compares to your previous attempts?",
        ),
        (
            "get_progress_summary",
            "Would you like specific recommendations to improve further?",
        ),
    ]
    .into_iter()
    .filter(|(tool, _)| used(tool))
    .map(|(_, suggestion)| suggestion.to_string())
    .take(MAX_FOLLOW_UPS)
    .collect()
}
