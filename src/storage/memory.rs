//! 内存数据存储
//!
//! 每个可变集合独立加锁：用户、成绩、作答记录使用 `RwLock`，
//! 会话与测验使用分片的 `DashMap`。锁从不跨越 `.await`，读取方拿到的是克隆。

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::models::{
    ConversationMessage, Question, QuestionFilter, Quiz, QuizResponse, TestResult, User,
};

/// 进程内存储，启动时构建并通过 `Arc` 共享
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    questions: Vec<Question>,
    test_results: RwLock<HashMap<String, Vec<TestResult>>>,
    quiz_responses: RwLock<HashMap<String, Vec<QuizResponse>>>,
    conversations: DashMap<String, Vec<ConversationMessage>>,
    quizzes: DashMap<String, Quiz>,
}

impl MemoryStore {
    /// 使用给定的用户与题库创建空存储
    pub fn new(users: Vec<User>, questions: Vec<Question>) -> Self {
        Self {
            users: RwLock::new(
                users
                    .into_iter()
                    .map(|user| (user.user_id.clone(), user))
                    .collect(),
            ),
            questions,
            test_results: RwLock::new(HashMap::new()),
            quiz_responses: RwLock::new(HashMap::new()),
            conversations: DashMap::new(),
            quizzes: DashMap::new(),
        }
    }

    // ===== Users =====

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.read().get(user_id).cloned()
    }

    /// 原地修改用户，返回修改后的副本；用户不存在时返回 `None`
    pub fn update_user<F>(&self, user_id: &str, update: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.write();
        let user = users.get_mut(user_id)?;
        update(user);
        Some(user.clone())
    }

    pub fn list_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        users
    }

    // ===== Test results =====

    pub fn add_test_result(&self, user_id: &str, result: TestResult) {
        self.test_results
            .write()
            .entry(user_id.to_string())
            .or_default()
            .push(result);
    }

    /// 按写入顺序返回，最后一条为最近一次考试
    pub fn test_results(&self, user_id: &str) -> Vec<TestResult> {
        self.test_results
            .read()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    // ===== Quiz responses =====

    pub fn add_quiz_response(&self, user_id: &str, response: QuizResponse) {
        self.quiz_responses
            .write()
            .entry(user_id.to_string())
            .or_default()
            .push(response);
    }

    pub fn add_quiz_responses(&self, user_id: &str, responses: Vec<QuizResponse>) {
        if responses.is_empty() {
            return;
        }
        self.quiz_responses
            .write()
            .entry(user_id.to_string())
            .or_default()
            .extend(responses);
    }

    pub fn quiz_responses(&self, user_id: &str) -> Vec<QuizResponse> {
        self.quiz_responses
            .read()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    // ===== Conversations =====

    pub fn append_message(&self, session_id: &str, message: ConversationMessage) {
        self.conversations
            .entry(session_id.to_string())
            .or_default()
            .push(message);
    }

    /// 返回会话最后 `limit` 条消息
    pub fn conversation_history(&self, session_id: &str, limit: usize) -> Vec<ConversationMessage> {
        match self.conversations.get(session_id) {
            Some(messages) => {
                let start = messages.len().saturating_sub(limit);
                messages[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    pub fn full_conversation(&self, session_id: &str) -> Option<Vec<ConversationMessage>> {
        self.conversations.get(session_id).map(|m| m.clone())
    }

    // ===== Quizzes =====

    pub fn save_quiz(&self, quiz: Quiz) {
        self.quizzes.insert(quiz.quiz_id.clone(), quiz);
    }

    pub fn get_quiz(&self, quiz_id: &str) -> Option<Quiz> {
        self.quizzes.get(quiz_id).map(|q| q.clone())
    }

    // ===== Question catalog =====

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn find_question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }

    /// 按条件过滤题库，最多返回 `limit` 道
    pub fn query_questions(&self, filter: &QuestionFilter, limit: usize) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|q| filter.matches(q))
            .take(limit)
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("users", &self.users.read().len())
            .field("questions", &self.questions.len())
            .field("conversations", &self.conversations.len())
            .field("quizzes", &self.quizzes.len())
            .finish()
    }
}
