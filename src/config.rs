use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use dotenv::dotenv;
use thiserror::Error;

use crate::models::user::ChatUser;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Which `ChatStore` implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub store: StoreBackend,
    /// Required when `store` is `Postgres`.
    pub database_url: Option<String>,
    /// Accounts loaded into the in-memory store, from `CHAT_SEED_USERS` (JSON array).
    pub seed_users: Vec<ChatUser>,
}

impl AppConfig {
    /// Reads the configuration from the process environment, after loading
    /// a `.env` file if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET_KEY")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::EnvVarNotFound("JWT_SECRET_KEY".to_string()))?;

        let bind_addr = match lookup("BIND_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "BIND_ADDR".to_string(),
                value,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let store = match lookup("CHAT_STORE") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CHAT_STORE".to_string(),
                value,
            })?,
            None => StoreBackend::Postgres,
        };

        let database_url = lookup("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::EnvVarNotFound("DATABASE_URL".to_string()));
        }

        let seed_users = match lookup("CHAT_SEED_USERS") {
            Some(value) => serde_json::from_str(&value).map_err(|_| ConfigError::InvalidValue {
                key: "CHAT_SEED_USERS".to_string(),
                value,
            })?,
            None => Vec::new(),
        };

        Ok(AppConfig {
            bind_addr,
            jwt_secret,
            store,
            database_url,
            seed_users,
        })
    }
}
