//! Service layer for tax-service.

pub mod actions;
pub mod conditions;
pub mod database;
pub mod engine;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use engine::TaxEngine;
pub use metrics::{get_metrics, init_metrics};
pub use store::TaxStore;
