use std::{collections::HashMap, env, str::FromStr, time::Duration};

use derive_more::Display;
use log::warn;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:8080";

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[display(fmt = "environment variable '{}' must be set", _0)]
    Missing(&'static str),

    #[display(fmt = "environment variable '{}' has invalid value '{}'", _0, _1)]
    Invalid(&'static str, String),
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub host: String,
    pub port: u16,
    pub sweep_interval: Duration,
    /// Browser origins allowed to call the API.
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwt_secret = vars
            .get("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .cloned()
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let sweep_secs: u64 = parse_or(&vars, "SWEEP_INTERVAL_SECS", 60)?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid("SWEEP_INTERVAL_SECS", "0".into()));
        }

        Ok(Config {
            database_url: vars.get("DATABASE_URL").filter(|s| !s.is_empty()).cloned(),
            database_max_connections: parse_or(&vars, "DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            token_ttl: Duration::from_secs(parse_or(&vars, "TOKEN_TTL_SECS", 3600)?),
            host: vars
                .get("HOST")
                .cloned()
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&vars, "PORT", 5000)?,
            sweep_interval: Duration::from_secs(sweep_secs),
            cors_allowed_origins: cors_origins(vars.get("CORS_ALLOWED_ORIGINS").map(String::as_str)),
        })
    }
}

/// Comma-separated origin list; blank entries are skipped and an empty
/// list falls back to the local development origin.
fn cors_origins(raw: Option<&str>) -> Vec<String> {
    let origins: Vec<String> = raw
        .unwrap_or(DEFAULT_CORS_ORIGINS)
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();
    if origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS is empty, allowing {}", DEFAULT_CORS_ORIGINS);
        return vec![DEFAULT_CORS_ORIGINS.to_string()];
    }
    origins
}

fn parse_or<T: FromStr>(
    vars: &HashMap<String, String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw.clone())),
        None => Ok(default),
    }
}
