//! Tax rule model: conditions, actions, and their lenient decoding.
//!
//! Rule payloads are stored as JSON and decoded once at load time. Decoding
//! is fail-open per rule: a malformed condition field degrades to "no
//! constraint" and a malformed or unrecognized action degrades to
//! [`RuleAction::Unknown`] (a no-op), so one misconfigured rule can never
//! abort calculation for its whole jurisdiction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// A conditional, prioritized tax directive owned by a jurisdiction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxRule {
    pub rule_id: Uuid,
    pub jurisdiction_id: Uuid,
    /// Lower values are evaluated first.
    pub priority: i32,
    /// Inactive rules are never evaluated.
    pub active: bool,
    pub conditions: RuleConditions,
    pub action: RuleAction,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a tax rule.
#[derive(Debug, Clone)]
pub struct CreateTaxRule {
    pub jurisdiction_id: Uuid,
    pub priority: i32,
    pub conditions: RuleConditions,
    pub action: RuleAction,
}

/// Predicate over the calculation context. Absent fields are vacuously true.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConditions {
    /// Inclusive lower bound on the taxable amount.
    #[serde(
        default,
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_amount: Option<Decimal>,
    /// Inclusive upper bound on the taxable amount.
    #[serde(
        default,
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_amount: Option<Decimal>,
    /// Exact match against the caller-supplied reference type.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_type: Option<String>,
}

impl RuleConditions {
    /// Decode a stored conditions payload. A payload that is not a
    /// conditions object at all degrades to the empty (always-true) set.
    pub fn decode(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

/// Calculation strategy performed by a matching rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleAction {
    /// `amount * rate / 100`. A missing rate is treated as zero.
    Percentage {
        #[serde(default)]
        rate: Decimal,
    },
    /// A constant amount, overriding (not adding to) the running tax.
    Fixed {
        #[serde(default)]
        amount: Decimal,
    },
    /// Bracket list evaluated in order; the first tier whose `max` covers
    /// the amount wins. An exhausted list yields no change.
    Tiered {
        #[serde(default)]
        tiers: Vec<TaxTier>,
    },
    /// Unrecognized or malformed action payload. Evaluates to a no-op.
    #[serde(other)]
    Unknown,
}

impl RuleAction {
    /// Decode a stored action payload, falling back to [`Self::Unknown`].
    pub fn decode(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(Self::Unknown)
    }
}

/// One bracket of a tiered action: upper bound plus the rate it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxTier {
    pub max: Decimal,
    pub rate: Decimal,
}

/// Accept numbers or numeric strings; anything else becomes "no constraint".
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(decimal_from_value(&value))
}

fn decimal_from_value(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Accept strings; anything else becomes "no constraint".
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}
