//! Database service for tax-service.

use crate::models::{
    CalculationRecord, CreateCalculationRecord, CreateJurisdiction, CreateTaxRule, Jurisdiction,
    ListCalculationsFilter, RuleAction, RuleConditions, TaxRule,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::TaxStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Raw jurisdiction row; rules are loaded separately.
#[derive(Debug, FromRow)]
struct JurisdictionRow {
    jurisdiction_id: Uuid,
    name: String,
    rate: Decimal,
    created_utc: DateTime<Utc>,
}

/// Raw rule row: conditions and action still in their stored JSON form.
#[derive(Debug, FromRow)]
struct TaxRuleRow {
    rule_id: Uuid,
    jurisdiction_id: Uuid,
    priority: i32,
    active: bool,
    conditions: serde_json::Value,
    action: serde_json::Value,
    created_utc: DateTime<Utc>,
}

impl From<TaxRuleRow> for TaxRule {
    fn from(row: TaxRuleRow) -> Self {
        // Decode-once, fail-open: malformed payloads become "no constraint"
        // conditions and an Unknown (no-op) action.
        TaxRule {
            rule_id: row.rule_id,
            jurisdiction_id: row.jurisdiction_id,
            priority: row.priority,
            active: row.active,
            conditions: RuleConditions::decode(&row.conditions),
            action: RuleAction::decode(&row.action),
            created_utc: row.created_utc,
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "tax-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Jurisdiction / Rule Seeding
    // -------------------------------------------------------------------------

    /// Create a new jurisdiction.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_jurisdiction(
        &self,
        input: &CreateJurisdiction,
    ) -> Result<Jurisdiction, AppError> {
        if input.rate < Decimal::ZERO || input.rate > Decimal::from(100) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Jurisdiction rate must be between 0 and 100, got {}",
                input.rate
            )));
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_jurisdiction"])
            .start_timer();

        let jurisdiction_id = Uuid::new_v4();
        let row = sqlx::query_as::<_, JurisdictionRow>(
            r#"
            INSERT INTO jurisdictions (jurisdiction_id, name, rate)
            VALUES ($1, $2, $3)
            RETURNING jurisdiction_id, name, rate, created_utc
            "#,
        )
        .bind(jurisdiction_id)
        .bind(&input.name)
        .bind(input.rate)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Jurisdiction '{}' already exists",
                    input.name
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create jurisdiction: {}", e)),
        })?;

        timer.observe_duration();

        info!(jurisdiction_id = %row.jurisdiction_id, "Jurisdiction created");

        Ok(Jurisdiction {
            jurisdiction_id: row.jurisdiction_id,
            name: row.name,
            rate: row.rate,
            rules: Vec::new(),
            created_utc: row.created_utc,
        })
    }

    /// Create a new tax rule under a jurisdiction.
    #[instrument(skip(self, input), fields(jurisdiction_id = %input.jurisdiction_id))]
    pub async fn create_tax_rule(&self, input: &CreateTaxRule) -> Result<TaxRule, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_tax_rule"])
            .start_timer();

        let conditions = serde_json::to_value(&input.conditions)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Encode conditions: {}", e)))?;
        let action = serde_json::to_value(&input.action)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Encode action: {}", e)))?;

        let rule_id = Uuid::new_v4();
        let row = sqlx::query_as::<_, TaxRuleRow>(
            r#"
            INSERT INTO tax_rules (rule_id, jurisdiction_id, priority, active, conditions, action)
            VALUES ($1, $2, $3, TRUE, $4, $5)
            RETURNING rule_id, jurisdiction_id, priority, active, conditions, action, created_utc
            "#,
        )
        .bind(rule_id)
        .bind(input.jurisdiction_id)
        .bind(input.priority)
        .bind(conditions)
        .bind(action)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!(
                    "Jurisdiction {} not found",
                    input.jurisdiction_id
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create tax rule: {}", e)),
        })?;

        timer.observe_duration();

        info!(rule_id = %row.rule_id, "Tax rule created");

        Ok(row.into())
    }
}

#[async_trait]
impl TaxStore for Database {
    /// Load a jurisdiction with its rules in deterministic storage order.
    #[instrument(skip(self), fields(jurisdiction_id = %jurisdiction_id))]
    async fn load_jurisdiction(
        &self,
        jurisdiction_id: Uuid,
    ) -> Result<Option<Jurisdiction>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["load_jurisdiction"])
            .start_timer();

        let jurisdiction = sqlx::query_as::<_, JurisdictionRow>(
            r#"
            SELECT jurisdiction_id, name, rate, created_utc
            FROM jurisdictions
            WHERE jurisdiction_id = $1
            "#,
        )
        .bind(jurisdiction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load jurisdiction: {}", e))
        })?;

        let Some(row) = jurisdiction else {
            timer.observe_duration();
            return Ok(None);
        };

        let rules = sqlx::query_as::<_, TaxRuleRow>(
            r#"
            SELECT rule_id, jurisdiction_id, priority, active, conditions, action, created_utc
            FROM tax_rules
            WHERE jurisdiction_id = $1
            ORDER BY priority ASC, rule_id ASC
            "#,
        )
        .bind(jurisdiction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load rules: {}", e)))?;

        timer.observe_duration();

        Ok(Some(Jurisdiction {
            jurisdiction_id: row.jurisdiction_id,
            name: row.name,
            rate: row.rate,
            rules: rules.into_iter().map(TaxRule::from).collect(),
            created_utc: row.created_utc,
        }))
    }

    /// Append one calculation record.
    #[instrument(skip(self, input), fields(jurisdiction_id = %input.jurisdiction_id))]
    async fn create_calculation_record(
        &self,
        input: &CreateCalculationRecord,
    ) -> Result<CalculationRecord, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_calculation_record"])
            .start_timer();

        let calculation_id = Uuid::new_v4();
        let record = sqlx::query_as::<_, CalculationRecord>(
            r#"
            INSERT INTO tax_calculations
                (calculation_id, reference_id, reference_type, jurisdiction_id, rule_id,
                 tax_type, taxable_amount, tax_rate, tax_amount, calculation_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING calculation_id, reference_id, reference_type, jurisdiction_id, rule_id,
                      tax_type, taxable_amount, tax_rate, tax_amount, calculation_data, created_utc
            "#,
        )
        .bind(calculation_id)
        .bind(input.reference_id)
        .bind(&input.reference_type)
        .bind(input.jurisdiction_id)
        .bind(input.rule_id)
        .bind(&input.tax_type)
        .bind(input.taxable_amount)
        .bind(input.tax_rate)
        .bind(input.tax_amount)
        .bind(&input.calculation_data)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create calculation record: {}", e))
        })?;

        timer.observe_duration();

        info!(calculation_id = %record.calculation_id, "Calculation record created");

        Ok(record)
    }

    /// List calculation records with a total count.
    #[instrument(skip(self, filter))]
    async fn list_calculation_records(
        &self,
        filter: &ListCalculationsFilter,
    ) -> Result<(Vec<CalculationRecord>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_calculation_records"])
            .start_timer();

        let limit = filter.limit.clamp(1, 100);
        let offset = filter.offset.max(0);

        let records = sqlx::query_as::<_, CalculationRecord>(
            r#"
            SELECT calculation_id, reference_id, reference_type, jurisdiction_id, rule_id,
                   tax_type, taxable_amount, tax_rate, tax_amount, calculation_data, created_utc
            FROM tax_calculations
            WHERE ($1::uuid IS NULL OR jurisdiction_id = $1)
              AND ($2::uuid IS NULL OR reference_id = $2)
              AND ($3::text IS NULL OR reference_type = $3)
            ORDER BY created_utc DESC, calculation_id DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.jurisdiction_id)
        .bind(filter.reference_id)
        .bind(filter.reference_type.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list calculation records: {}", e))
        })?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tax_calculations
            WHERE ($1::uuid IS NULL OR jurisdiction_id = $1)
              AND ($2::uuid IS NULL OR reference_id = $2)
              AND ($3::text IS NULL OR reference_type = $3)
            "#,
        )
        .bind(filter.jurisdiction_id)
        .bind(filter.reference_id)
        .bind(filter.reference_type.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to count calculation records: {}", e))
        })?;

        timer.observe_duration();

        Ok((records, total))
    }
}
