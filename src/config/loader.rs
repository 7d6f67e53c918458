use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use tracing::warn;

/// 环境变量前缀，嵌套键以 `__` 分隔，如 `PREPCOACH_LLM__MODEL`
pub const ENV_PREFIX: &str = "PREPCOACH_";

/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "prepcoach.toml";

const MIN_API_KEY_LEN: usize = 20;

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序（后者覆盖前者）：
    /// 1. 内置默认值
    /// 2. ./prepcoach.toml
    /// 3. PREPCOACH_* 环境变量
    /// 4. OPENAI_API_KEY
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        let mut config: AppConfig = Self::figment(path.as_ref()).extract()?;
        config.llm.api_key = config.llm.api_key.trim().to_string();
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&["OPENAI_API_KEY"])
                    .map(|_| "llm.api_key".into()),
            )
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        let key = config.llm.api_key.trim();
        if key.is_empty() {
            return Err(ConfigValidationError::MissingApiKey);
        }
        if key.len() < MIN_API_KEY_LEN {
            return Err(ConfigValidationError::ApiKeyTooShort(key.len()));
        }
        if !key.starts_with("sk-") {
            warn!(
                "OPENAI_API_KEY doesn't start with 'sk-' (preview: {})",
                config.llm.masked_api_key()
            );
        }

        if config.llm.max_tool_rounds == 0 {
            return Err(ConfigValidationError::InvalidToolRounds);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("server port must be greater than 0")]
    InvalidPort,

    #[error("OPENAI_API_KEY is missing or empty")]
    MissingApiKey,

    #[error("OPENAI_API_KEY seems too short (length: {0}). Please check your .env file.")]
    ApiKeyTooShort(usize),

    #[error("llm.max_tool_rounds must be at least 1")]
    InvalidToolRounds,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const KEY: &str = "sk-test-0123456789abcdefghij";

    #[test]
    fn test_defaults_and_env_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("OPENAI_API_KEY", format!("  {}  ", KEY));
            jail.set_env("PREPCOACH_LLM__MODEL", "gpt-4o-mini");
            jail.set_env("PREPCOACH_SERVER__PORT", "9100");
            jail.set_env("PREPCOACH_DEBUG", "false");

            let config = ConfigLoader::load().expect("config loads");
            assert_eq!(config.llm.api_key, KEY);
            assert_eq!(config.llm.model, "gpt-4o-mini");
            assert_eq!(config.llm.max_tool_rounds, 5);
            assert_eq!(config.server.port, 9100);
            assert!(!config.debug);
            assert!(ConfigLoader::validate(&config).is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_is_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                environment = "staging"

                [conversation]
                max_context_turns = 6

                [llm]
                history_window = 4
                "#,
            )?;
            let config = ConfigLoader::load().expect("config loads");
            assert_eq!(config.environment, "staging");
            assert_eq!(config.conversation.max_context_turns, 6);
            assert_eq!(config.llm.history_window, 4);
            assert_eq!(config.llm.temperature, 0.7);
            Ok(())
        });
    }

    #[test]
    fn test_validation_errors() {
        let mut config = AppConfig::default();
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::MissingApiKey)
        );

        config.llm.api_key = "sk-short".into();
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::ApiKeyTooShort(8))
        );

        config.llm.api_key = KEY.into();
        config.llm.max_tool_rounds = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidToolRounds)
        );

        config.llm.max_tool_rounds = 5;
        config.server.port = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidPort)
        );

        // 非 sk- 前缀只告警
        config.server.port = 8000;
        config.llm.api_key = "proj-0123456789abcdefghijkl".into();
        assert!(ConfigLoader::validate(&config).is_ok());
    }
}
