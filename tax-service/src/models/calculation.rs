//! Calculation request, result, and audit record models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Caller input for one tax calculation.
#[derive(Debug, Clone)]
pub struct CalculateTax {
    /// Taxable base. Negative and zero amounts are permitted; bounds
    /// checking of business sense is the caller's concern.
    pub amount: Decimal,
    pub jurisdiction_id: Uuid,
    /// Classification of the financial reference, e.g. "invoice".
    pub reference_type: String,
}

/// Ephemeral evaluation context, consumed entirely within one calculation.
#[derive(Debug, Clone)]
pub struct CalculationContext {
    pub amount: Decimal,
    pub reference_type: String,
    pub jurisdiction_id: Uuid,
}

/// Snapshot of the jurisdiction a result was computed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionSummary {
    pub jurisdiction_id: Uuid,
    pub name: String,
    pub rate: Decimal,
}

/// Outcome of one rule evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxCalculation {
    pub tax_amount: Decimal,
    /// Every active rule whose conditions matched, in evaluation order.
    /// Empty means the jurisdiction's default rate was applied.
    pub applied_rules: Vec<Uuid>,
    pub jurisdiction: JurisdictionSummary,
}

impl TaxCalculation {
    /// Whether the default-rate fallback produced this result.
    pub fn used_default_rate(&self) -> bool {
        self.applied_rules.is_empty()
    }
}

/// A calculation together with the outcome of its audit write. The write is
/// best-effort: a persistence failure never invalidates the computed amount.
#[derive(Debug, Clone)]
pub struct RecordedCalculation {
    pub calculation: TaxCalculation,
    pub record: Option<CalculationRecord>,
    /// Set when the audit write failed after a successful calculation.
    pub audit_warning: Option<String>,
}

/// Immutable audit entry for one calculation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalculationRecord {
    pub calculation_id: Uuid,
    pub reference_id: Uuid,
    pub reference_type: String,
    pub jurisdiction_id: Uuid,
    /// Last applied rule; None when the default rate path was used or the
    /// entry was recorded manually without a rule.
    pub rule_id: Option<Uuid>,
    pub tax_type: String,
    pub taxable_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    /// Free-form trace: method, applied rules, timestamp.
    pub calculation_data: serde_json::Value,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a calculation record.
#[derive(Debug, Clone)]
pub struct CreateCalculationRecord {
    pub reference_id: Uuid,
    pub reference_type: String,
    pub jurisdiction_id: Uuid,
    pub rule_id: Option<Uuid>,
    pub tax_type: String,
    pub taxable_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub calculation_data: serde_json::Value,
}

/// Filter parameters for listing calculation records.
#[derive(Debug, Clone)]
pub struct ListCalculationsFilter {
    pub jurisdiction_id: Option<Uuid>,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListCalculationsFilter {
    fn default() -> Self {
        Self {
            jurisdiction_id: None,
            reference_id: None,
            reference_type: None,
            limit: 50,
            offset: 0,
        }
    }
}
