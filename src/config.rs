//! Configuration types, read from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Read an env var and parse it, falling back to `default` when unset or invalid.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var("DERMAID_BIND") {
            Ok(raw) => {
                let bind = raw.parse().map_err(|e| ConfigError::InvalidValue {
                    key: "DERMAID_BIND".into(),
                    message: format!("{e}"),
                })?;
                Ok(Self { bind })
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

/// Agent loop configuration: collaborator timeouts and the question budget.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Upper bound on a single planner call.
    pub planner_timeout: Duration,
    /// Upper bound on a single phraser call.
    pub phraser_timeout: Duration,
    /// Upper bound on a single weather lookup.
    pub weather_timeout: Duration,
    /// Maximum agent-initiated questions per session.
    pub question_budget: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            planner_timeout: Duration::from_millis(8_000),
            phraser_timeout: Duration::from_millis(8_000),
            weather_timeout: Duration::from_millis(5_000),
            question_budget: 2,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            planner_timeout: Duration::from_millis(env_or(
                "DERMAID_PLANNER_TIMEOUT_MS",
                defaults.planner_timeout.as_millis() as u64,
            )),
            phraser_timeout: Duration::from_millis(env_or(
                "DERMAID_PHRASER_TIMEOUT_MS",
                defaults.phraser_timeout.as_millis() as u64,
            )),
            weather_timeout: Duration::from_millis(env_or(
                "DERMAID_WEATHER_TIMEOUT_MS",
                defaults.weather_timeout.as_millis() as u64,
            )),
            // The budget is a safety bound, not a tunable.
            question_budget: defaults.question_budget,
        }
    }
}

/// Product catalog source.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("product_info.csv"),
        }
    }
}

impl CatalogConfig {
    pub fn from_env() -> Self {
        std::env::var("DERMAID_CATALOG_PATH")
            .map(|p| Self {
                path: PathBuf::from(p),
            })
            .unwrap_or_default()
    }
}

/// Weather collaborator endpoint.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com/v1/forecast".to_string(),
        }
    }
}

impl WeatherConfig {
    pub fn from_env() -> Self {
        std::env::var("DERMAID_WEATHER_URL")
            .map(|base_url| Self { base_url })
            .unwrap_or_default()
    }
}

/// Persistence location.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/dermaid.db"),
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        std::env::var("DERMAID_DB_PATH")
            .map(|p| Self {
                path: PathBuf::from(p),
            })
            .unwrap_or_default()
    }
}

/// Language model settings. `None` when no API key is configured, in which
/// case the deterministic planner and phraser are used.
pub fn llm_config_from_env() -> Option<LlmConfig> {
    let api_key = std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())?;
    let model =
        std::env::var("DERMAID_MODEL").unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string());
    Some(LlmConfig {
        backend: LlmBackend::Anthropic,
        api_key: secrecy::SecretString::from(api_key),
        model,
    })
}
