//! Action application: compute a candidate tax amount from a matched rule.

use crate::models::RuleAction;
use rust_decimal::Decimal;

/// Apply an action to the taxable base.
///
/// Returns `Some(amount)` when the action produces a value, `None` when it
/// leaves the running amount unchanged (unknown action, or a tiered action
/// with no applicable bracket). Fail-open: never an error.
pub fn apply(action: &RuleAction, amount: Decimal) -> Option<Decimal> {
    match action {
        RuleAction::Percentage { rate } => Some(amount * *rate / Decimal::from(100)),
        RuleAction::Fixed { amount: fixed } => Some(*fixed),
        RuleAction::Tiered { tiers } => tiers
            .iter()
            .find(|tier| amount <= tier.max)
            .map(|tier| amount * tier.rate / Decimal::from(100)),
        RuleAction::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaxTier;

    fn tiered(tiers: &[(i64, i64)]) -> RuleAction {
        RuleAction::Tiered {
            tiers: tiers
                .iter()
                .map(|(max, rate)| TaxTier {
                    max: Decimal::from(*max),
                    rate: Decimal::from(*rate),
                })
                .collect(),
        }
    }

    #[test]
    fn percentage_applies_rate_to_base() {
        let action = RuleAction::Percentage {
            rate: Decimal::from(12),
        };
        assert_eq!(
            apply(&action, Decimal::from(2000)),
            Some(Decimal::from(240))
        );
    }

    #[test]
    fn percentage_zero_rate_is_a_recorded_zero_contribution() {
        let action = RuleAction::Percentage {
            rate: Decimal::ZERO,
        };
        assert_eq!(apply(&action, Decimal::from(500)), Some(Decimal::ZERO));
    }

    #[test]
    fn fixed_overrides_with_constant() {
        let action = RuleAction::Fixed {
            amount: Decimal::from(75),
        };
        assert_eq!(apply(&action, Decimal::from(9999)), Some(Decimal::from(75)));
    }

    #[test]
    fn tiered_first_covering_bracket_wins() {
        let action = tiered(&[(100, 5), (500, 10)]);
        // 50 fits the first bracket.
        assert_eq!(
            apply(&action, Decimal::from(50)),
            Some(Decimal::from_str_exact("2.50").unwrap())
        );
        // 300 skips past the first bracket to the second.
        assert_eq!(apply(&action, Decimal::from(300)), Some(Decimal::from(30)));
        // Boundary is inclusive.
        assert_eq!(apply(&action, Decimal::from(100)), Some(Decimal::from(5)));
    }

    #[test]
    fn tiered_exhausted_list_yields_no_change() {
        let action = tiered(&[(100, 5), (500, 10)]);
        assert_eq!(apply(&action, Decimal::from(1000)), None);
    }

    #[test]
    fn tiered_empty_list_yields_no_change() {
        let action = tiered(&[]);
        assert_eq!(apply(&action, Decimal::from(10)), None);
    }

    #[test]
    fn unknown_action_is_a_no_op() {
        assert_eq!(apply(&RuleAction::Unknown, Decimal::from(1000)), None);
    }

    #[test]
    fn negative_amounts_flow_through_unchanged_semantics() {
        let action = RuleAction::Percentage {
            rate: Decimal::from(10),
        };
        assert_eq!(
            apply(&action, Decimal::from(-200)),
            Some(Decimal::from(-20))
        );
    }
}
