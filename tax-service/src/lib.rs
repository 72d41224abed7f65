//! tax-service: jurisdiction-aware tax rule evaluation.
//!
//! The engine derives a tax amount for a financial reference (invoice,
//! order, ...) by applying the owning jurisdiction's active rules in
//! priority order, falling back to the jurisdiction's default rate when
//! no rule matches. Every evaluation can be captured as an immutable
//! calculation record for audit.
pub mod config;
pub mod models;
pub mod services;
pub mod startup;
