use serde::{Deserialize, Serialize};
use std::fmt;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

/// 模型服务配置
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API 密钥（OPENAI_API_KEY）
    pub api_key: String,
    /// OpenAI 兼容服务地址
    pub base_url: String,
    /// 模型标识
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// 单轮对话内工具调用轮数上限
    pub max_tool_rounds: usize,
    /// 发给模型的历史消息条数
    pub history_window: usize,
    /// 请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4-turbo-preview".into(),
            temperature: 0.7,
            max_tokens: 500,
            max_tool_rounds: 5,
            history_window: 10,
            request_timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// 日志用的脱敏密钥
    pub fn masked_api_key(&self) -> String {
        let key = self.api_key.as_str();
        if key.len() <= 14 {
            return "***".to_string();
        }
        match (key.get(..10), key.get(key.len() - 4..)) {
            (Some(head), Some(tail)) => format!("{}...{}", head, tail),
            _ => "***".to_string(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.masked_api_key())
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("history_window", &self.history_window)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// 对话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// 从会话中读取的最近消息条数
    pub max_context_turns: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_context_turns: 10,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 模型服务配置
    pub llm: LlmConfig,
    /// 对话配置
    pub conversation: ConversationConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 环境
    pub environment: String,
    /// 调试模式：错误响应携带详情
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            conversation: ConversationConfig::default(),
            logging: LoggingConfig::default(),
            environment: "development".into(),
            debug: true,
        }
    }
}

impl AppConfig {
    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::default();
        config.environment = "production".into();
        config.debug = false;
        config.logging.structured = true;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_api_key() {
        let mut llm = LlmConfig::default();
        llm.api_key = "sk-abcdefghijklmnopqrstuvwxyz".into();
        assert_eq!(llm.masked_api_key(), "sk-abcdefg...wxyz");
        assert!(!format!("{:?}", llm).contains("klmnop"));

        llm.api_key = "short".into();
        assert_eq!(llm.masked_api_key(), "***");
    }

    #[test]
    fn test_production_profile() {
        let config = AppConfig::production();
        assert!(!config.debug);
        assert!(config.logging.structured);
        assert_eq!(config.llm.max_tool_rounds, 5);
    }
}
