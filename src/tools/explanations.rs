//! 讲解工具

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::storage::MemoryStore;
use crate::tools::{ToolError, ToolResult};

fn default_detailed() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QuestionExplanationArgs {
    /// Question identifier
    pub question_id: String,
    /// Include topic learning tips
    #[serde(default = "default_detailed")]
    pub detailed: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TopicConceptArgs {
    /// Main topic, e.g. "algebra"
    pub topic: String,
    /// Optional subtopic
    #[serde(default)]
    pub subtopic: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionExplanation {
    pub question_id: String,
    pub topic: String,
    pub subtopic: Option<String>,
    pub correct_answer: String,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_tips: Option<Vec<&'static str>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicConcept {
    pub topic: String,
    pub subtopic: Option<String>,
    pub explanation_type: &'static str,
    pub message: String,
    pub learning_tips: Vec<&'static str>,
}

const GENERAL_TIPS: &[&str] = &[
    "Practice regularly to build familiarity",
    "Review incorrect answers carefully",
    "Time yourself to improve speed",
    "Identify patterns in question types",
];

pub fn learning_tips(topic: &str) -> Vec<&'static str> {
    let tips: &[&str] = match topic.to_lowercase().as_str() {
        "algebra" => &[
            "Master FOIL and factoring techniques",
            "Draw diagrams for word problems",
            "Check your work by substituting answers back",
        ],
        "geometry" => &[
            "Memorize key formulas for area and volume",
            "Draw and label diagrams",
            "Look for similar triangles and parallel lines",
        ],
        "reading_comprehension" => &[
            "Read the questions before the passage",
            "Underline key phrases",
            "Eliminate obviously wrong answers first",
        ],
        "vocabulary" => &[
            "Learn word roots and prefixes",
            "Use flashcards for daily practice",
            "Read widely to see words in context",
        ],
        "probability" => &[
            "Draw tree diagrams for complex problems",
            "Remember: P(A and B) = P(A) × P(B) for independent events",
            "Count carefully and check your work",
        ],
        _ => GENERAL_TIPS,
    };
    tips.to_vec()
}

pub fn get_question_explanation(
    store: &MemoryStore,
    args: QuestionExplanationArgs,
) -> ToolResult<QuestionExplanation> {
    let question = store
        .find_question(&args.question_id)
        .ok_or_else(|| ToolError::QuestionNotFound {
            question_id: args.question_id.clone(),
        })?;

    Ok(QuestionExplanation {
        question_id: question.question_id.clone(),
        topic: question.topic.clone(),
        subtopic: question.subtopic.clone(),
        correct_answer: question.correct_answer.clone(),
        explanation: question.explanation.clone(),
        learning_tips: args.detailed.then(|| learning_tips(&question.topic)),
    })
}

pub fn explain_topic_concept(args: TopicConceptArgs) -> ToolResult<TopicConcept> {
    let message = match &args.subtopic {
        Some(sub) => format!("Explaining {} - {}", args.topic, sub),
        None => format!("Explaining {}", args.topic),
    };

    Ok(TopicConcept {
        learning_tips: learning_tips(&args.topic),
        topic: args.topic,
        subtopic: args.subtopic,
        explanation_type: "conceptual_overview",
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::seed::seeded_store;

    #[test]
    fn test_question_explanation() {
        let store = seeded_store();
        let detailed = get_question_explanation(
            &store,
            QuestionExplanationArgs {
                question_id: "q-001".into(),
                detailed: true,
            },
        )
        .unwrap();
        assert_eq!(detailed.correct_answer, "B");
        assert_eq!(detailed.learning_tips.unwrap().len(), 3);

        let brief = get_question_explanation(
            &store,
            QuestionExplanationArgs {
                question_id: "q-001".into(),
                detailed: false,
            },
        )
        .unwrap();
        assert!(brief.learning_tips.is_none());

        assert!(matches!(
            get_question_explanation(
                &store,
                QuestionExplanationArgs {
                    question_id: "missing".into(),
                    detailed: true,
                },
            ),
            Err(ToolError::QuestionNotFound { .. })
        ));
    }

    #[test]
    fn test_topic_concept_falls_back_to_general_tips() {
        let concept = explain_topic_concept(TopicConceptArgs {
            topic: "Punctuation".into(),
            subtopic: Some("commas".into()),
        })
        .unwrap();
        assert_eq!(concept.message, "Explaining Punctuation - commas");
        assert_eq!(concept.learning_tips, GENERAL_TIPS.to_vec());
        assert_eq!(learning_tips("ALGEBRA")[0], "Master FOIL and factoring techniques");
    }
}
