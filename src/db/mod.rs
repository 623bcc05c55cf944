//! Database module for SQLite operations.
//!
//! This module provides:
//! - Pooled connection with liveness check and SQLite pragmas
//! - Idempotent schema migrations
//! - Repository layer for database operations
//! - Classification of constraint violations

pub mod migrations;
pub mod repo;

pub use migrations::{connect, init_db, ping, run_migrations};
pub use repo::Repository;

use sqlx::error::ErrorKind;

/// Which storage constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    Unique,
    ForeignKey,
    NotNull,
    Check,
}

/// Classify a storage error as a constraint violation, if it is one.
pub fn constraint_violation(err: &sqlx::Error) -> Option<ConstraintViolation> {
    let db_err = err.as_database_error()?;
    match db_err.kind() {
        ErrorKind::UniqueViolation => Some(ConstraintViolation::Unique),
        ErrorKind::ForeignKeyViolation => Some(ConstraintViolation::ForeignKey),
        ErrorKind::NotNullViolation => Some(ConstraintViolation::NotNull),
        ErrorKind::CheckViolation => Some(ConstraintViolation::Check),
        _ => None,
    }
}
