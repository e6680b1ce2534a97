use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_LANGUAGE: &str = "Swedish";
pub const DEFAULT_DEBOUNCE_MS: u64 = 800;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}: cannot parse {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ExplanationConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub language: String,
    pub debounce: Duration,
    pub timeout: Duration,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        ExplanationConfig {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub explanation: ExplanationConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests need not
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .filter(|k| !k.trim().is_empty());

        let explanation = ExplanationConfig {
            api_key,
            endpoint: lookup("GEMINI_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            language: lookup("EXPLANATION_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            debounce: Duration::from_millis(parse_or(&lookup, "EXPLANATION_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)?),
            timeout: Duration::from_millis(parse_or(&lookup, "EXPLANATION_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?),
        };

        let addr = match lookup("WATER_ANOMALY_ADDR") {
            Some(raw) => parse_value("WATER_ANOMALY_ADDR", &raw)?,
            None => parse_value("WATER_ANOMALY_ADDR", DEFAULT_ADDR)?,
        };

        Ok(Config { addr, explanation })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}
