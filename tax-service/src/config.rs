//! Configuration for tax-service.

use service_core::config::{Config, DatabaseSettings};
use service_core::error::AppError;

#[derive(Debug, Clone)]
pub struct TaxConfig {
    pub common: Config,
    pub service_name: String,
    pub database: DatabaseSettings,
}

impl TaxConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = Config::load()?;
        let database = DatabaseSettings::from_env("TAX")?;

        Ok(Self {
            common,
            service_name: "tax-service".to_string(),
            database,
        })
    }
}
