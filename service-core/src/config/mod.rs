use crate::error::AppError;
use config::{Config as Cfg, File};
use secrecy::Secret;
use serde::Deserialize;
use std::env;

/// Settings shared by every service in the platform.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Connection pool settings for a service-owned database.
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseSettings {
    /// Read settings from `<PREFIX>_DATABASE_URL`,
    /// `<PREFIX>_DB_MAX_CONNECTIONS`, and `<PREFIX>_DB_MIN_CONNECTIONS`.
    /// The URL is required; pool sizes default to 10/1.
    pub fn from_env(prefix: &str) -> Result<Self, AppError> {
        let url = env::var(format!("{}_DATABASE_URL", prefix)).map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("{}_DATABASE_URL must be set", prefix))
        })?;

        let max_connections = env::var(format!("{}_DB_MAX_CONNECTIONS", prefix))
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let min_connections = env::var(format!("{}_DB_MIN_CONNECTIONS", prefix))
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        Ok(Self {
            url: Secret::new(url),
            max_connections,
            min_connections,
        })
    }
}
