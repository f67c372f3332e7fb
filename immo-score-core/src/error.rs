// immo-score-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImmoScoreError {
    // --- ERREURS DU DOMAINE (périodes, communes, traitements) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- ERREURS D'INFRASTRUCTURE (entrepôt, IO, parsing) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- ERREURS GÉNÉRIQUES / APPLICATIVES ---
    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for ImmoScoreError {
    fn from(err: std::io::Error) -> Self {
        ImmoScoreError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for ImmoScoreError {
    fn from(err: duckdb::Error) -> Self {
        ImmoScoreError::Infrastructure(InfrastructureError::Database(DatabaseError::DuckDB(err)))
    }
}

impl From<serde_json::Error> for ImmoScoreError {
    fn from(err: serde_json::Error) -> Self {
        ImmoScoreError::Infrastructure(InfrastructureError::JsonError(err))
    }
}
