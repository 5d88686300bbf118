use std::{env, time::Duration as StdDuration};

use argon2::Params;
use chrono::Duration;
use derive_more::Display;

pub const MEMORY_DATABASE: &str = "memory";

#[derive(Debug, Display)]
pub enum ConfigError {
    #[display("invalid value {_1:?} for {_0}")]
    InvalidValue(&'static str, String),
    #[display("invalid argon2 parameters: {_0}")]
    Argon2(argon2::Error),
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `memory` or a SurrealDB websocket address.
    pub url: String,
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub name: String,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub database: DatabaseConfig,
    pub session_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub purge_interval: StdDuration,
    pub argon2: Params,
    pub resend_api_key: Option<String>,
    pub email_domain: String,
    pub frontend_url: String,
    /// Development only: echo reset tokens in the API response.
    pub expose_reset_tokens: bool,
    pub secure_cookies: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0:8080"),
            database: DatabaseConfig {
                url: String::from("127.0.0.1:8000"),
                username: String::from("root"),
                password: String::from("root"),
                namespace: String::from("classroom"),
                name: String::from("main"),
            },
            session_ttl: Duration::hours(24),
            reset_token_ttl: Duration::hours(1),
            purge_interval: StdDuration::from_secs(300),
            argon2: Params::default(),
            resend_api_key: None,
            email_domain: String::from("localhost"),
            frontend_url: String::from("http://localhost:3000"),
            expose_reset_tokens: false,
            secure_cookies: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, falling back to the defaults for
    /// keys that are missing or blank.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let argon2 = Params::new(
            parse(&get, "ARGON2_MEMORY_KIB", defaults.argon2.m_cost())?,
            parse(&get, "ARGON2_ITERATIONS", defaults.argon2.t_cost())?,
            parse(&get, "ARGON2_PARALLELISM", defaults.argon2.p_cost())?,
            None,
        )
        .map_err(ConfigError::Argon2)?;

        let session_ttl_hours: i64 = parse(&get, "SESSION_TTL_HOURS", 24)?;
        let reset_token_ttl_hours: i64 = parse(&get, "RESET_TOKEN_TTL_HOURS", 1)?;
        if session_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_HOURS",
                session_ttl_hours.to_string(),
            ));
        }
        if reset_token_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "RESET_TOKEN_TTL_HOURS",
                reset_token_ttl_hours.to_string(),
            ));
        }

        Ok(Self {
            bind_address: get("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            database: DatabaseConfig {
                url: get("DATABASE_URL").unwrap_or(defaults.database.url),
                username: get("DATABASE_USERNAME").unwrap_or(defaults.database.username),
                password: get("DATABASE_PASSWORD").unwrap_or(defaults.database.password),
                namespace: get("DATABASE_NAMESPACE").unwrap_or(defaults.database.namespace),
                name: get("DATABASE_NAME").unwrap_or(defaults.database.name),
            },
            session_ttl: Duration::hours(session_ttl_hours),
            reset_token_ttl: Duration::hours(reset_token_ttl_hours),
            purge_interval: StdDuration::from_secs(parse(&get, "PURGE_INTERVAL_SECS", 300)?),
            argon2,
            resend_api_key: get("RESEND_API_KEY"),
            email_domain: get("EMAIL_DOMAIN").unwrap_or(defaults.email_domain),
            frontend_url: get("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            expose_reset_tokens: parse(&get, "EXPOSE_RESET_TOKENS", false)?,
            secure_cookies: parse(&get, "SECURE_COOKIES", true)?,
        })
    }
}

fn parse<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        AppConfig::from_lookup(|key| values.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.database.namespace, "classroom");
        assert_eq!(config.session_ttl, Duration::hours(24));
        assert_eq!(config.reset_token_ttl, Duration::hours(1));
        assert_eq!(config.purge_interval, StdDuration::from_secs(300));
        assert!(config.secure_cookies);
        assert!(!config.expose_reset_tokens);
        assert!(config.resend_api_key.is_none());
        assert!(!config.database.is_memory());
    }

    #[test]
    fn values_are_read_and_parsed() {
        let config = config_from(&[
            ("DATABASE_URL", "memory"),
            ("SESSION_TTL_HOURS", "48"),
            ("ARGON2_MEMORY_KIB", "1024"),
            ("ARGON2_ITERATIONS", "1"),
            ("ARGON2_PARALLELISM", "1"),
            ("EXPOSE_RESET_TOKENS", "true"),
            ("RESEND_API_KEY", "   "),
        ])
        .unwrap();

        assert!(config.database.is_memory());
        assert_eq!(config.session_ttl, Duration::hours(48));
        assert_eq!(config.argon2.m_cost(), 1024);
        assert!(config.expose_reset_tokens);
        assert!(config.resend_api_key.is_none());
    }

    #[test]
    fn malformed_values_are_reported() {
        assert!(matches!(
            config_from(&[("SESSION_TTL_HOURS", "a day")]),
            Err(ConfigError::InvalidValue("SESSION_TTL_HOURS", _))
        ));
        assert!(matches!(
            config_from(&[("RESET_TOKEN_TTL_HOURS", "0")]),
            Err(ConfigError::InvalidValue("RESET_TOKEN_TTL_HOURS", _))
        ));
        assert!(matches!(
            config_from(&[("ARGON2_MEMORY_KIB", "1")]),
            Err(ConfigError::Argon2(_))
        ));
    }
}
