//! Rule evaluation engine: orchestrates one tax calculation.

use crate::models::{
    CalculateTax, CalculationContext, CalculationRecord, CreateCalculationRecord,
    JurisdictionSummary, ListCalculationsFilter, RecordedCalculation, TaxCalculation, TaxRule,
};
use crate::services::metrics::{CALCULATION_RECORDS_TOTAL, ERRORS_TOTAL, TAX_CALCULATIONS_TOTAL};
use crate::services::store::TaxStore;
use crate::services::{actions, conditions};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use service_core::error::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Method identifiers written to the audit trace and metrics.
const METHOD_RULE_CHAIN: &str = "rule_chain";
const METHOD_DEFAULT_RATE: &str = "default_rate";

/// The evaluation engine. Stateless per invocation: every call operates on
/// a freshly loaded jurisdiction snapshot, so concurrent calculations need
/// no coordination.
pub struct TaxEngine<S> {
    store: S,
}

impl<S: TaxStore> TaxEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Compute the tax amount for one request without persisting anything.
    ///
    /// Active rules are evaluated in ascending priority order. Every rule
    /// whose conditions match lands in `applied_rules`; the running amount
    /// is overwritten only when the rule's action produces a value, so a
    /// later matching no-op never reverts an earlier result. When no rule
    /// matched at all, the jurisdiction's default rate applies.
    #[instrument(skip(self, request), fields(jurisdiction_id = %request.jurisdiction_id))]
    pub async fn calculate(&self, request: &CalculateTax) -> Result<TaxCalculation, AppError> {
        validate(request)?;

        let jurisdiction = self
            .store
            .load_jurisdiction(request.jurisdiction_id)
            .await?
            .ok_or_else(|| {
                ERRORS_TOTAL
                    .with_label_values(&["jurisdiction_not_found"])
                    .inc();
                AppError::NotFound(anyhow::anyhow!(
                    "Jurisdiction {} not found",
                    request.jurisdiction_id
                ))
            })?;

        let context = CalculationContext {
            amount: request.amount,
            reference_type: request.reference_type.clone(),
            jurisdiction_id: request.jurisdiction_id,
        };

        let mut active_rules: Vec<&TaxRule> =
            jurisdiction.rules.iter().filter(|rule| rule.active).collect();
        // Stable sort: rules come from the store ordered by (priority,
        // rule_id), so equal priorities keep that deterministic order.
        active_rules.sort_by_key(|rule| rule.priority);

        let mut tax_amount = Decimal::ZERO;
        let mut applied_rules: Vec<Uuid> = Vec::new();

        for rule in active_rules {
            if !conditions::matches(&rule.conditions, &context) {
                continue;
            }
            if let Some(candidate) = actions::apply(&rule.action, context.amount) {
                tax_amount = candidate;
            }
            applied_rules.push(rule.rule_id);
        }

        let method = if applied_rules.is_empty() {
            tax_amount = context.amount * jurisdiction.rate / Decimal::from(100);
            METHOD_DEFAULT_RATE
        } else {
            METHOD_RULE_CHAIN
        };

        TAX_CALCULATIONS_TOTAL.with_label_values(&[method]).inc();

        info!(
            method = method,
            tax_amount = %tax_amount,
            rules_applied = applied_rules.len(),
            "Tax calculated"
        );

        Ok(TaxCalculation {
            tax_amount,
            applied_rules,
            jurisdiction: JurisdictionSummary {
                jurisdiction_id: jurisdiction.jurisdiction_id,
                name: jurisdiction.name,
                rate: jurisdiction.rate,
            },
        })
    }

    /// Compute the tax amount and append an audit record for it.
    ///
    /// The audit write is best-effort: if it fails after a successful
    /// calculation, the computed result is still returned and the failure
    /// is surfaced through `audit_warning` rather than as an error.
    #[instrument(skip(self, request), fields(jurisdiction_id = %request.jurisdiction_id, reference_id = %reference_id))]
    pub async fn calculate_and_record(
        &self,
        request: &CalculateTax,
        reference_id: Uuid,
        tax_type: &str,
    ) -> Result<RecordedCalculation, AppError> {
        let calculation = self.calculate(request).await?;
        let input = build_record_input(request, &calculation, reference_id, tax_type);

        match self.store.create_calculation_record(&input).await {
            Ok(record) => {
                CALCULATION_RECORDS_TOTAL
                    .with_label_values(&["engine"])
                    .inc();
                Ok(RecordedCalculation {
                    calculation,
                    record: Some(record),
                    audit_warning: None,
                })
            }
            Err(err) => {
                ERRORS_TOTAL.with_label_values(&["audit_write"]).inc();
                warn!(error = %err, "Calculation record write failed; returning computed result");
                Ok(RecordedCalculation {
                    calculation,
                    record: None,
                    audit_warning: Some(err.to_string()),
                })
            }
        }
    }

    /// Create an audit entry directly, bypassing rule evaluation. Used for
    /// manual and override entries.
    #[instrument(skip(self, input), fields(jurisdiction_id = %input.jurisdiction_id))]
    pub async fn record_manual_calculation(
        &self,
        input: &CreateCalculationRecord,
    ) -> Result<CalculationRecord, AppError> {
        if input.reference_type.trim().is_empty() {
            return Err(AppError::ValidationError(
                "referenceType is required".to_string(),
            ));
        }
        if input.tax_type.trim().is_empty() {
            return Err(AppError::ValidationError("taxType is required".to_string()));
        }

        let record = self.store.create_calculation_record(input).await?;
        CALCULATION_RECORDS_TOTAL
            .with_label_values(&["manual"])
            .inc();
        info!(calculation_id = %record.calculation_id, "Manual calculation recorded");
        Ok(record)
    }

    /// Read-side listing of calculation records; not used by calculation.
    pub async fn list_calculations(
        &self,
        filter: &ListCalculationsFilter,
    ) -> Result<(Vec<CalculationRecord>, i64), AppError> {
        self.store.list_calculation_records(filter).await
    }
}

fn validate(request: &CalculateTax) -> Result<(), AppError> {
    if request.reference_type.trim().is_empty() {
        return Err(AppError::ValidationError(
            "referenceType is required".to_string(),
        ));
    }
    Ok(())
}

fn build_record_input(
    request: &CalculateTax,
    calculation: &TaxCalculation,
    reference_id: Uuid,
    tax_type: &str,
) -> CreateCalculationRecord {
    let method = if calculation.used_default_rate() {
        METHOD_DEFAULT_RATE
    } else {
        METHOD_RULE_CHAIN
    };

    // Default path stores the jurisdiction rate; the rule path stores the
    // effective rate the chain produced.
    let tax_rate = if calculation.used_default_rate() {
        calculation.jurisdiction.rate
    } else if request.amount.is_zero() {
        Decimal::ZERO
    } else {
        calculation.tax_amount / request.amount * Decimal::from(100)
    };

    CreateCalculationRecord {
        reference_id,
        reference_type: request.reference_type.clone(),
        jurisdiction_id: request.jurisdiction_id,
        rule_id: calculation.applied_rules.last().copied(),
        tax_type: tax_type.to_string(),
        taxable_amount: request.amount,
        tax_rate,
        tax_amount: calculation.tax_amount,
        calculation_data: json!({
            "method": method,
            "appliedRules": calculation.applied_rules,
            "calculatedAt": Utc::now(),
        }),
    }
}
