//! Domain models for tax-service.

pub mod calculation;
pub mod jurisdiction;
pub mod rule;

pub use calculation::{
    CalculateTax, CalculationContext, CalculationRecord, CreateCalculationRecord,
    JurisdictionSummary, ListCalculationsFilter, RecordedCalculation, TaxCalculation,
};
pub use jurisdiction::{CreateJurisdiction, Jurisdiction};
pub use rule::{CreateTaxRule, RuleAction, RuleConditions, TaxRule, TaxTier};
