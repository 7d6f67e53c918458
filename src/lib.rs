//! PrepCoach - 对话式备考辅导服务
//!
//! 通过 HTTP 接收学员消息，交给支持工具调用的大语言模型，模型借助一组
//! 查询学员档案、成绩与题库的工具作答，回复再经后处理生成快捷回复、卡片和图表。

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;
pub mod tools;
