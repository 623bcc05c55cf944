use crate::config::ConfigError;
use crate::domain::CredentialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("Failed to run migrations: {0}")]
    Migration(#[source] sqlx::Error),
    #[error("Seeding failed while inserting {step}: {source}")]
    Seed {
        step: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

