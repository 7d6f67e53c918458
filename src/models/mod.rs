//! 数据模型模块
//!
//! 定义学员、题库、成绩、测验与对话消息等核心实体。

pub mod conversation;
pub mod performance;
pub mod question;
pub mod quiz;
pub mod ui;
pub mod user;

pub use conversation::{ConversationMessage, Role};
pub use performance::{QuizResponse, SectionScore, TestResult};
pub use question::{Difficulty, Question, QuestionFilter};
pub use quiz::Quiz;
pub use ui::{Card, Chart, ProfileOverview, QuickReply, UiElements};
pub use user::User;
