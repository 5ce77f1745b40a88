//! Runtime configuration read from the environment (and `.env`, if present).

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use partybook_infra::seed::DEFAULT_MEMBERS_FILE;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid socket address: {value}")]
    InvalidAddr { name: &'static str, value: String },

    #[error("{name} must be true or false, got {value}")]
    InvalidBool { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub seed: bool,
    pub members_file: PathBuf,
}

impl ApiConfig {
    /// Defaults with the given signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            database_url: None,
            seed: true,
            members_file: PathBuf::from(DEFAULT_MEMBERS_FILE),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });
        let mut config = Self::new(jwt_secret);

        if let Some(value) = lookup("PARTYBOOK_BIND_ADDR") {
            config.bind_addr = value.parse().map_err(|_| ConfigError::InvalidAddr {
                name: "PARTYBOOK_BIND_ADDR",
                value,
            })?;
        }

        config.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        if let Some(value) = lookup("PARTYBOOK_SEED") {
            config.seed = match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidBool {
                        name: "PARTYBOOK_SEED",
                        value,
                    });
                }
            };
        }

        if let Some(value) = lookup("PARTYBOOK_SEED_MEMBERS_FILE") {
            config.members_file = PathBuf::from(value);
        }

        Ok(config)
    }
}
