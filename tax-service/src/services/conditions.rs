//! Condition evaluation: does a rule apply to a calculation context?

use crate::models::{CalculationContext, RuleConditions};

/// Test a rule's conditions against the context.
///
/// Pure and total. Absent condition fields are vacuously true; bounds are
/// inclusive on both ends.
pub fn matches(conditions: &RuleConditions, context: &CalculationContext) -> bool {
    if let Some(min_amount) = conditions.min_amount {
        if context.amount < min_amount {
            return false;
        }
    }

    if let Some(max_amount) = conditions.max_amount {
        if context.amount > max_amount {
            return false;
        }
    }

    if let Some(ref reference_type) = conditions.reference_type {
        if context.reference_type != *reference_type {
            return false;
        }
    }

    true
}
