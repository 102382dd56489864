use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::external::{newsapi, polygon};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String, max_connections: u32 },
    Memory,
}

/// Knobs for the portfolio valuation fan-out.
#[derive(Debug, Clone)]
pub struct ValuationConfig {
    pub price_timeout: Duration,
    pub max_concurrency: usize,
    pub dashboard_top_positions: usize,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            price_timeout: Duration::from_secs(5),
            max_concurrency: 4,
            dashboard_top_positions: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
    pub polygon_api_key: String,
    pub polygon_base_url: String,
    pub news_api_key: String,
    pub news_base_url: String,
    pub jwt_secret: String,
    pub valuation: ValuationConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let store = match lookup("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StoreBackend::Postgres {
                database_url: required("DATABASE_URL")?,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let defaults = ValuationConfig::default();
        let valuation = ValuationConfig {
            price_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PRICE_TIMEOUT_SECS",
                defaults.price_timeout.as_secs(),
            )?),
            max_concurrency: parse_or(&lookup, "PRICE_MAX_CONCURRENCY", defaults.max_concurrency)?.max(1),
            dashboard_top_positions: parse_or(&lookup, "DASHBOARD_TOP_POSITIONS", defaults.dashboard_top_positions)?,
        };

        Ok(Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            store,
            polygon_api_key: required("POLYGON_API_KEY")?,
            polygon_base_url: lookup("POLYGON_BASE_URL").unwrap_or_else(|| polygon::DEFAULT_BASE_URL.to_string()),
            news_api_key: required("NEWS_API_KEY")?,
            news_base_url: lookup("NEWS_BASE_URL").unwrap_or_else(|| newsapi::DEFAULT_BASE_URL.to_string()),
            jwt_secret: required("JWT_SECRET")?,
            valuation,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
