//! Store contract consumed by the evaluation engine.

use crate::models::{
    CalculationRecord, CreateCalculationRecord, Jurisdiction, ListCalculationsFilter,
};
use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

/// Persistence collaborator for the engine.
///
/// Reads are single-shot, non-retrying: the engine operates on the snapshot
/// a load returns and never mutates jurisdiction or rule data. The only
/// write is the append-only calculation record.
#[async_trait]
pub trait TaxStore: Send + Sync {
    /// Load a jurisdiction with its rules, ordered by (priority, rule_id).
    async fn load_jurisdiction(&self, jurisdiction_id: Uuid)
        -> Result<Option<Jurisdiction>, AppError>;

    /// Append one immutable calculation record.
    async fn create_calculation_record(
        &self,
        input: &CreateCalculationRecord,
    ) -> Result<CalculationRecord, AppError>;

    /// List calculation records with a total count for pagination.
    async fn list_calculation_records(
        &self,
        filter: &ListCalculationsFilter,
    ) -> Result<(Vec<CalculationRecord>, i64), AppError>;
}
