//! 成绩分析工具

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::models::{Difficulty, SectionScore, TestResult};
use crate::storage::MemoryStore;
use crate::tools::stats::{TopicTally, percentage, round_to};
use crate::tools::{ToolError, ToolResult};

/// 考试分项
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Math,
    Reading,
    Writing,
    Verbal,
    Quantitative,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Math => "math",
            Section::Reading => "reading",
            Section::Writing => "writing",
            Section::Verbal => "verbal",
            Section::Quantitative => "quantitative",
        }
    }
}

/// 统计时间范围
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Week,
    Month,
    #[default]
    All,
}

impl Timeframe {
    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Timeframe::Week => Some(now - Duration::days(7)),
            Timeframe::Month => Some(now - Duration::days(30)),
            Timeframe::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonType {
    #[default]
    Historical,
    Target,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TestLookupArgs {
    /// The user's unique identifier
    pub user_id: String,
    /// Specific test ID; the most recent test is used when omitted
    #[serde(default)]
    pub test_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TopicAnalysisArgs {
    /// The user's unique identifier
    pub user_id: String,
    /// Section to analyze
    pub section: Section,
    /// Time period to analyze
    #[serde(default)]
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ErrorPatternArgs {
    /// The user's unique identifier
    pub user_id: String,
    /// Restrict the analysis to these question IDs
    #[serde(default)]
    pub question_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CompareProgressArgs {
    /// The user's unique identifier
    pub user_id: String,
    /// Compare against earlier tests or against the target score
    #[serde(default)]
    pub comparison_type: ComparisonType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResultsReport {
    pub success: bool,
    pub test_id: String,
    pub test_type: String,
    pub total_score: u32,
    pub date_taken: DateTime<Utc>,
    pub sections: BTreeMap<String, SectionScore>,
    pub completion_status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubtopicBreakdown {
    pub name: String,
    pub attempted: usize,
    pub correct: usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicBreakdown {
    pub topic: String,
    pub attempted: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub subtopics: Vec<SubtopicBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicAnalysis {
    pub section: Section,
    pub timeframe: Timeframe,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total_questions: usize,
    pub overall_accuracy: f64,
    pub topics: Vec<TopicBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPattern {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub details: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPatterns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total_errors_analyzed: usize,
    pub patterns: Vec<ErrorPattern>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartBar {
    pub label: String,
    pub value: u32,
    pub percentage: u32,
    pub color: String,
    pub section_key: String,
    pub max_value: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BarChartData {
    pub test_id: String,
    pub test_type: String,
    pub total_score: u32,
    pub date_taken: DateTime<Utc>,
    pub bars: Vec<ChartBar>,
    pub max_value: u32,
    pub y_axis_label: String,
    pub x_axis_label: String,
}

fn find_test(store: &MemoryStore, user_id: &str, test_id: Option<&str>) -> ToolResult<TestResult> {
    let mut results = store.test_results(user_id);
    if results.is_empty() {
        return Err(ToolError::NoTestResults {
            user_id: user_id.to_string(),
        });
    }

    match test_id {
        Some(id) => results
            .into_iter()
            .find(|t| t.test_id == id)
            .ok_or_else(|| ToolError::TestNotFound {
                user_id: user_id.to_string(),
                test_id: id.to_string(),
            }),
        None => results.pop().ok_or_else(|| ToolError::NoTestResults {
            user_id: user_id.to_string(),
        }),
    }
}

pub fn get_latest_test_results(
    store: &MemoryStore,
    args: TestLookupArgs,
) -> ToolResult<TestResultsReport> {
    let test = find_test(store, &args.user_id, args.test_id.as_deref())?;
    info!(
        "Returning test {} for {}: total_score={}",
        test.test_id, args.user_id, test.total_score
    );

    Ok(TestResultsReport {
        success: true,
        test_id: test.test_id,
        test_type: test.test_type,
        total_score: test.total_score,
        date_taken: test.date_taken,
        sections: test.sections,
        completion_status: test.completion_status,
        message: "Test results found successfully".to_string(),
    })
}

pub fn analyze_performance_by_topic(
    store: &MemoryStore,
    args: TopicAnalysisArgs,
) -> ToolResult<TopicAnalysis> {
    let cutoff = args.timeframe.cutoff(Utc::now());
    let section = args.section.as_str();

    let mut topics: BTreeMap<String, (TopicTally, BTreeMap<String, TopicTally>)> = BTreeMap::new();
    for response in store.quiz_responses(&args.user_id) {
        if cutoff.is_some_and(|c| response.timestamp < c) {
            continue;
        }
        let Some(question) = store.find_question(&response.question_id) else {
            continue;
        };
        if question.section != section {
            continue;
        }

        let subtopic = question
            .subtopic
            .clone()
            .unwrap_or_else(|| "general".to_string());
        let entry = topics.entry(question.topic.clone()).or_default();
        entry.0.record(response.is_correct);
        entry.1.entry(subtopic).or_default().record(response.is_correct);
    }

    if topics.is_empty() {
        return Ok(TopicAnalysis {
            section: args.section,
            timeframe: args.timeframe,
            message: Some("No practice data found for this section".to_string()),
            total_questions: 0,
            overall_accuracy: 0.0,
            topics: Vec::new(),
        });
    }

    let mut breakdown: Vec<TopicBreakdown> = topics
        .into_iter()
        .map(|(topic, (tally, subtopics))| {
            let mut subtopics: Vec<SubtopicBreakdown> = subtopics
                .into_iter()
                .map(|(name, sub)| SubtopicBreakdown {
                    name,
                    attempted: sub.attempted,
                    correct: sub.correct,
                    accuracy: round_to(sub.accuracy_pct(), 2),
                })
                .collect();
            subtopics.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));

            TopicBreakdown {
                topic,
                attempted: tally.attempted,
                correct: tally.correct,
                accuracy: round_to(tally.accuracy_pct(), 2),
                subtopics,
            }
        })
        .collect();
    breakdown.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));

    let attempted: usize = breakdown.iter().map(|t| t.attempted).sum();
    let correct: usize = breakdown.iter().map(|t| t.correct).sum();

    Ok(TopicAnalysis {
        section: args.section,
        timeframe: args.timeframe,
        message: None,
        total_questions: attempted,
        overall_accuracy: round_to(percentage(correct, attempted), 2),
        topics: breakdown,
    })
}

pub fn identify_error_patterns(
    store: &MemoryStore,
    args: ErrorPatternArgs,
) -> ToolResult<ErrorPatterns> {
    let errors: Vec<_> = store
        .quiz_responses(&args.user_id)
        .into_iter()
        .filter(|r| !r.is_correct)
        .filter(|r| {
            args.question_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&r.question_id))
        })
        .collect();

    if errors.is_empty() {
        return Ok(ErrorPatterns {
            message: Some("No errors found - excellent work!".to_string()),
            total_errors_analyzed: 0,
            patterns: Vec::new(),
        });
    }

    let mut by_topic: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_difficulty: BTreeMap<Difficulty, usize> = BTreeMap::new();
    let mut rushed = Vec::new();

    for response in &errors {
        let Some(question) = store.find_question(&response.question_id) else {
            continue;
        };
        *by_topic.entry(question.topic.clone()).or_default() += 1;
        *by_difficulty.entry(question.difficulty).or_default() += 1;

        if (response.time_spent as f64) < question.average_time as f64 * 0.5 {
            rushed.push(json!({
                "question_id": question.question_id,
                "topic": question.topic,
                "time_spent": response.time_spent,
                "average_time": question.average_time,
            }));
        }
    }

    let mut patterns = Vec::new();

    let mut top_topics: Vec<_> = by_topic.into_iter().collect();
    top_topics.sort_by(|a, b| b.1.cmp(&a.1));
    top_topics.truncate(5);
    if !top_topics.is_empty() {
        patterns.push(ErrorPattern {
            kind: "topic_weakness".to_string(),
            description: "Topics with most errors".to_string(),
            details: Value::Array(
                top_topics
                    .into_iter()
                    .map(|(topic, errors)| json!({ "topic": topic, "errors": errors }))
                    .collect(),
            ),
        });
    }

    if !by_difficulty.is_empty() {
        let details: serde_json::Map<String, Value> = by_difficulty
            .into_iter()
            .map(|(level, count)| (level.as_str().to_string(), json!(count)))
            .collect();
        patterns.push(ErrorPattern {
            kind: "difficulty_distribution".to_string(),
            description: "Errors by difficulty level".to_string(),
            details: Value::Object(details),
        });
    }

    if rushed.len() > 3 {
        patterns.push(ErrorPattern {
            kind: "time_pressure".to_string(),
            description: "Possible rushing on questions".to_string(),
            details: json!({
                "count": rushed.len(),
                "questions": rushed,
                "message": "You're answering quickly but getting them wrong. Consider slowing down.",
            }),
        });
    }

    debug!(
        "Identified {} error patterns for {}",
        patterns.len(),
        args.user_id
    );

    Ok(ErrorPatterns {
        message: None,
        total_errors_analyzed: errors.len(),
        patterns,
    })
}

/// 返回的结构随比较方式与历史记录数量变化
pub fn compare_progress(store: &MemoryStore, args: CompareProgressArgs) -> ToolResult<Value> {
    let user = store
        .get_user(&args.user_id)
        .ok_or_else(|| ToolError::UserNotFound {
            user_id: args.user_id.clone(),
        })?;
    let results = store.test_results(&args.user_id);

    let Some(latest) = results.last() else {
        return match user.baseline_score {
            Some(baseline) => Ok(json!({
                "message": "No test results yet, but your baseline score is recorded",
                "baseline_score": baseline,
                "target_score": user.target_score,
            })),
            None => Err(ToolError::NoTestHistory),
        };
    };
    let current = latest.total_score as i64;

    match args.comparison_type {
        ComparisonType::Historical if results.len() < 2 => {
            let baseline = user.baseline_score.map(i64::from).unwrap_or(current);
            Ok(json!({
                "comparison_type": "historical",
                "message": "Great start! Take another practice test to track improvement",
                "current_score": current,
                "baseline_score": baseline,
                "score_change": current - baseline,
                "tests_taken": results.len(),
            }))
        }
        ComparisonType::Historical => {
            let previous = &results[results.len() - 2];
            let section_changes: serde_json::Map<String, Value> = latest
                .sections
                .iter()
                .filter_map(|(name, now)| {
                    previous.sections.get(name).map(|before| {
                        (
                            name.clone(),
                            json!({
                                "current": now.score,
                                "previous": before.score,
                                "change": now.score as i64 - before.score as i64,
                            }),
                        )
                    })
                })
                .collect();
            let change = current - previous.total_score as i64;

            Ok(json!({
                "comparison_type": "historical",
                "current_score": current,
                "previous_score": previous.total_score,
                "score_change": change,
                "improvement": change > 0,
                "section_changes": section_changes,
                "tests_taken": results.len(),
            }))
        }
        ComparisonType::Target => {
            if user.target_score == 0 {
                return Err(ToolError::NoTargetScore);
            }
            let gap = user.target_score as i64 - current;
            let message = if gap <= 0 {
                "You've reached your target!".to_string()
            } else {
                format!("You need {} more points to reach your target", gap)
            };
            Ok(json!({
                "comparison_type": "target",
                "current_score": current,
                "target_score": user.target_score,
                "score_gap": gap,
                "on_track": gap <= 0,
                "message": message,
            }))
        }
    }
}

fn section_style(key: &str) -> (String, &'static str) {
    let (label, color) = match key {
        "reading" => ("Reading", "#1C1C1E"),
        "writing" => ("Writing", "#3A3A3C"),
        "math" => ("Math", "#6D6D70"),
        "verbal" => ("Verbal", "#8E8E93"),
        "quantitative" => ("Quantitative", "#AEAEB2"),
        "reasoning" => ("Reasoning", "#5A5A5D"),
        "algebra" => ("Algebra", "#AEAEB2"),
        "geometry" => ("Geometry", "#C7C7CC"),
        other => return (title_case(other), "#8E8E93"),
    };
    (label.to_string(), color)
}

/// "data_analysis" -> "Data Analysis"
pub fn title_case(key: &str) -> String {
    key.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn generate_bar_chart_data(
    store: &MemoryStore,
    args: TestLookupArgs,
) -> ToolResult<BarChartData> {
    let test = find_test(store, &args.user_id, args.test_id.as_deref())?;
    if test.sections.is_empty() {
        return Err(ToolError::NoSectionData);
    }

    let max_value = test.sections.values().map(|s| s.score).max().unwrap_or(0);
    let mut bars: Vec<ChartBar> = test
        .sections
        .iter()
        .map(|(key, section)| {
            let (label, color) = section_style(key);
            ChartBar {
                label,
                value: section.score,
                percentage: percentage(section.score as usize, test.total_score as usize).round()
                    as u32,
                color: color.to_string(),
                section_key: key.clone(),
                max_value,
            }
        })
        .collect();
    bars.sort_by(|a, b| b.value.cmp(&a.value));

    Ok(BarChartData {
        test_id: test.test_id,
        test_type: test.test_type,
        total_score: test.total_score,
        date_taken: test.date_taken,
        bars,
        max_value,
        y_axis_label: "Score".to_string(),
        x_axis_label: "Subject".to_string(),
    })
}
