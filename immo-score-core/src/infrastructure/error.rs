// immo-score-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(immo_score::infra::database::duckdb),
        help("An error occurred inside the warehouse engine.")
    )]
    DuckDB(#[from] duckdb::Error),

    #[error("Warehouse connection poisoned")]
    #[diagnostic(
        code(immo_score::infra::database::poisoned),
        help("A previous query panicked while holding the connection.")
    )]
    Poisoned,
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(immo_score::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(immo_score::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    // --- REPORTS / JSON ---
    #[error("JSON Error: {0}")]
    #[diagnostic(code(immo_score::infra::json))]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(immo_score::infra::config))]
    ConfigError(String),
}

impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}

impl From<validator::ValidationErrors> for InfrastructureError {
    fn from(err: validator::ValidationErrors) -> Self {
        InfrastructureError::ConfigError(err.to_string())
    }
}
