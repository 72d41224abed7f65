//! Shared test harness: an in-memory store plus fixture builders.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tax_service::models::{
    CalculationRecord, CreateCalculationRecord, Jurisdiction, ListCalculationsFilter, RuleAction,
    RuleConditions, TaxRule,
};
use tax_service::services::TaxStore;
use uuid::Uuid;

/// In-memory `TaxStore`. Rules are returned in insertion order, which
/// stands in for the database's deterministic (priority, rule_id) ordering.
pub struct InMemoryStore {
    jurisdictions: Mutex<HashMap<Uuid, Jurisdiction>>,
    records: Mutex<Vec<CalculationRecord>>,
    fail_record_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            jurisdictions: Mutex::new(HashMap::new()),
            records: Mutex::new(Vec::new()),
            fail_record_writes: AtomicBool::new(false),
        }
    }

    pub fn insert_jurisdiction(&self, jurisdiction: Jurisdiction) {
        self.jurisdictions
            .lock()
            .unwrap()
            .insert(jurisdiction.jurisdiction_id, jurisdiction);
    }

    /// Make every subsequent record write fail, to exercise the
    /// best-effort audit path.
    pub fn fail_record_writes(&self) {
        self.fail_record_writes.store(true, Ordering::SeqCst);
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl TaxStore for InMemoryStore {
    async fn load_jurisdiction(
        &self,
        jurisdiction_id: Uuid,
    ) -> Result<Option<Jurisdiction>, AppError> {
        Ok(self
            .jurisdictions
            .lock()
            .unwrap()
            .get(&jurisdiction_id)
            .cloned())
    }

    async fn create_calculation_record(
        &self,
        input: &CreateCalculationRecord,
    ) -> Result<CalculationRecord, AppError> {
        if self.fail_record_writes.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "record store unavailable"
            )));
        }

        let record = CalculationRecord {
            calculation_id: Uuid::new_v4(),
            reference_id: input.reference_id,
            reference_type: input.reference_type.clone(),
            jurisdiction_id: input.jurisdiction_id,
            rule_id: input.rule_id,
            tax_type: input.tax_type.clone(),
            taxable_amount: input.taxable_amount,
            tax_rate: input.tax_rate,
            tax_amount: input.tax_amount,
            calculation_data: input.calculation_data.clone(),
            created_utc: Utc::now(),
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list_calculation_records(
        &self,
        filter: &ListCalculationsFilter,
    ) -> Result<(Vec<CalculationRecord>, i64), AppError> {
        let records = self.records.lock().unwrap();
        let matching: Vec<CalculationRecord> = records
            .iter()
            .filter(|r| {
                filter
                    .jurisdiction_id
                    .map_or(true, |id| r.jurisdiction_id == id)
                    && filter.reference_id.map_or(true, |id| r.reference_id == id)
                    && filter
                        .reference_type
                        .as_deref()
                        .map_or(true, |t| r.reference_type == t)
            })
            .cloned()
            .collect();

        let total = matching.len() as i64;
        let offset = filter.offset.max(0) as usize;
        let limit = filter.limit.clamp(1, 100) as usize;
        let page = matching.into_iter().skip(offset).take(limit).collect();

        Ok((page, total))
    }
}

/// A jurisdiction with the given default rate and no rules.
pub fn jurisdiction(name: &str, rate: i64) -> Jurisdiction {
    Jurisdiction {
        jurisdiction_id: Uuid::new_v4(),
        name: name.to_string(),
        rate: Decimal::from(rate),
        rules: Vec::new(),
        created_utc: Utc::now(),
    }
}

/// An active rule for the given jurisdiction.
pub fn rule(
    jurisdiction_id: Uuid,
    priority: i32,
    conditions: RuleConditions,
    action: RuleAction,
) -> TaxRule {
    TaxRule {
        rule_id: Uuid::new_v4(),
        jurisdiction_id,
        priority,
        active: true,
        conditions,
        action,
        created_utc: Utc::now(),
    }
}

pub fn percentage(rate: i64) -> RuleAction {
    RuleAction::Percentage {
        rate: Decimal::from(rate),
    }
}

pub fn min_amount(value: i64) -> RuleConditions {
    RuleConditions {
        min_amount: Some(Decimal::from(value)),
        ..Default::default()
    }
}
