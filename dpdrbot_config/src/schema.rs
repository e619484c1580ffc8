use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const CONFIG_DIR: &str = "dpdrbot";
const CONFIG_FILE: &str = "config.json";

const PLACEHOLDER_SUFFIX: &str = "-here";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting(s): {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Several(Vec<ConfigError>),
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssistantConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub assistant_id: String,
    #[serde(default = "AssistantConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "AssistantConfig::default_model")]
    pub model: String,
    #[serde(default = "AssistantConfig::default_temperature")]
    pub temperature: f32,
    /// Seconds between run status checks.
    #[serde(default = "AssistantConfig::default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Overall budget for one run, in seconds.
    #[serde(default = "AssistantConfig::default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            assistant_id: String::new(),
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            temperature: Self::default_temperature(),
            poll_interval_secs: Self::default_poll_interval_secs(),
            run_timeout_secs: Self::default_run_timeout_secs(),
        }
    }
}

impl AssistantConfig {
    fn default_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }

    fn default_model() -> String {
        "gpt-4-turbo-preview".to_string()
    }

    const fn default_temperature() -> f32 {
        0.7
    }

    const fn default_poll_interval_secs() -> u64 {
        2
    }

    const fn default_run_timeout_secs() -> u64 {
        300
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QuotaConfig {
    #[serde(default = "QuotaConfig::default_enabled")]
    pub enabled: bool,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
        }
    }
}

impl QuotaConfig {
    const fn default_enabled() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "DatabaseConfig::default_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: Self::default_url(),
        }
    }
}

impl DatabaseConfig {
    fn default_url() -> String {
        "sqlite://dpdrbot.db?mode=rwc".to_string()
    }
}

fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.ends_with(PLACEHOLDER_SUFFIX)
}

impl Config {
    /// Load `~/dpdrbot/config.json` (if present), then apply environment
    /// overrides. A `.env` file in the working directory is honoured.
    /// Callers validate what they need.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }

        let path = Self::config_path()?;
        let file = path.exists().then_some(path.as_path());
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Build a config from an optional JSON file and an environment lookup.
    pub fn from_sources<F>(file: Option<&Path>, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = match file {
            Some(path) => {
                info!("Reading config from {}", path.display());
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str(&content)?
            }
            None => Self::default(),
        };

        if let Some(token) = env("BOT_TOKEN") {
            config.telegram.token = token;
        }
        if let Some(key) = env("OPENAI_API_KEY") {
            config.assistant.api_key = key;
        }
        if let Some(id) = env("ASSISTANT_ID") {
            config.assistant.assistant_id = id;
        }
        if let Some(url) = env("DATABASE_URL") {
            config.database.url = url;
            config.database.enabled = true;
        }

        Ok(config)
    }

    /// Credentials required to talk to the assistant backend.
    pub fn validate_assistant(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if is_unset(&self.assistant.api_key) {
            missing.push("OPENAI_API_KEY");
        }
        if is_unset(&self.assistant.assistant_id) {
            missing.push("ASSISTANT_ID");
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        if self.assistant.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "assistant.poll_interval_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.assistant.run_timeout_secs < self.assistant.poll_interval_secs {
            return Err(ConfigError::Invalid {
                name: "assistant.run_timeout_secs",
                reason: "must not be shorter than the poll interval".to_string(),
            });
        }
        Ok(())
    }

    /// All startup requirements: bot token, backend key, assistant id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_unset(&self.telegram.token) {
            return self.validate_assistant();
        }
        let mut missing = vec!["BOT_TOKEN"];
        match self.validate_assistant() {
            Ok(()) => Err(ConfigError::Missing(missing)),
            Err(ConfigError::Missing(rest)) => {
                missing.extend(rest);
                Err(ConfigError::Missing(missing))
            }
            Err(other) => Err(ConfigError::Several(vec![
                ConfigError::Missing(missing),
                other,
            ])),
        }
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR)
            .join(CONFIG_FILE))
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR);

        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_path = Self::ensure_config_dir()?.join(CONFIG_FILE);
        Self::write_template(&config_path)?;
        Ok(config_path)
    }

    pub fn write_template(config_path: &Path) -> anyhow::Result<()> {
        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let config_template = r#"{
  "telegram": {
    "token": "your-telegram-bot-token-here"
  },
  "assistant": {
    "api_key": "your-openai-api-key-here",
    "assistant_id": "your-assistant-id-here",
    "base_url": "https://api.openai.com/v1",
    "model": "gpt-4-turbo-preview",
    "temperature": 0.7,
    "poll_interval_secs": 2,
    "run_timeout_secs": 300
  },
  "quota": {
    "enabled": true
  },
  "database": {
    "enabled": false,
    "url": "sqlite://dpdrbot.db?mode=rwc"
  }
}"#;

        std::fs::write(config_path, config_template)?;
        info!("Created config file at {}", config_path.display());
        Ok(())
    }
}
