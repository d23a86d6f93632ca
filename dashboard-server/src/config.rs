use std::env;

use dashboard_persistence::connection::DEFAULT_DATABASE_URL;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth_dev_mode: bool,
    pub firebase_project_id: String,
    pub problems_file: Option<String>,
    pub signin_path: String,
    pub connection_timeout_seconds: u64,
    pub auth_grace_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", "8080")?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            auth_dev_mode: parse_var("AUTH_DEV_MODE", "false")?,
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .unwrap_or_else(|_| "learn-buddy".to_string()),
            problems_file: env::var("PROBLEMS_FILE").ok(),
            signin_path: env::var("SIGNIN_PATH").unwrap_or_else(|_| "/signin".to_string()),
            connection_timeout_seconds: parse_var("CONNECTION_TIMEOUT_SECONDS", "300")?,
            auth_grace_seconds: parse_var("AUTH_GRACE_SECONDS", "5")?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_uses_default() {
        let port: u16 = parse_var("LEARN_BUDDY_TEST_UNSET_PORT", "8080").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_var_rejects_garbage_default() {
        let result: Result<u16, _> = parse_var("LEARN_BUDDY_TEST_UNSET_PORT", "eighty");
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Invalid LEARN_BUDDY_TEST_UNSET_PORT: eighty");
    }
}
