//! Jurisdiction model for tax-service.

use crate::models::rule::TaxRule;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tax authority scope: a default flat rate plus the conditional rules
/// it owns. Rules have no lifecycle of their own; the store assembles the
/// full aggregate on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub jurisdiction_id: Uuid,
    pub name: String,
    /// Default percentage rate in [0, 100], applied when no rule matches.
    pub rate: Decimal,
    /// Owned rules in storage order: ascending (priority, rule_id).
    pub rules: Vec<TaxRule>,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a jurisdiction.
#[derive(Debug, Clone)]
pub struct CreateJurisdiction {
    pub name: String,
    pub rate: Decimal,
}
