use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://acmen.ru/api/v1/telegram/";
const DEFAULT_THRESHOLD_PERCENT: f64 = 80.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_token: String,
    pub chat_id: String,
    pub message_thread_id: Option<String>,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub disk_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_percent: DEFAULT_THRESHOLD_PERCENT,
            ram_percent: DEFAULT_THRESHOLD_PERCENT,
            disk_percent: DEFAULT_THRESHOLD_PERCENT,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("переменная окружения {0} обязательна")]
    Missing(&'static str),
    #[error("некорректный API_URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Values are trimmed and
    /// empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = get("API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_token = get("API_TOKEN").ok_or(ConfigError::Missing("API_TOKEN"))?;
        let chat_id = get("CHAT_ID").ok_or(ConfigError::Missing("CHAT_ID"))?;
        let message_thread_id = get("MESSAGE_THREAD_ID");

        let defaults = Thresholds::default();
        let threshold = |key: &str, default: f64| {
            get(key)
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(default)
        };
        let thresholds = Thresholds {
            cpu_percent: threshold("CPU_THRESHOLD", defaults.cpu_percent),
            ram_percent: threshold("RAM_THRESHOLD", defaults.ram_percent),
            disk_percent: threshold("DISK_THRESHOLD", defaults.disk_percent),
        };

        let cfg = Config {
            api_url,
            api_token,
            chat_id,
            message_thread_id,
            thresholds,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.api_url).map_err(|err| ConfigError::InvalidUrl {
            url: self.api_url.clone(),
            reason: err.to_string(),
        })?;
        Ok(())
    }
}
