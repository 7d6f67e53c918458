//! Handlers 模块
//!
//! HTTP 请求处理程序。

pub mod chat_handler;
pub mod user_handler;

pub use chat_handler::*;
pub use user_handler::*;
