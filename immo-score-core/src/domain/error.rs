// immo-score-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Unrecognised period format: '{0}'")]
    #[diagnostic(
        code(immo_score::domain::period),
        help("Use a 4-digit year (2023) or a year-quarter (2024-Q4).")
    )]
    InvalidPeriod(String),

    #[error("Municipality '{0}' not found in the warehouse")]
    #[diagnostic(
        code(immo_score::domain::municipality_not_found),
        help("Check the id against dw.dim_geography (cd_level = 4, fl_current = true).")
    )]
    MunicipalityNotFound(String),

    #[error("Processing of the '{domain}' section failed: {message}")]
    #[diagnostic(code(immo_score::domain::processing))]
    Processing { domain: String, message: String },

    #[error("Invalid report structure: {0}")]
    #[diagnostic(
        code(immo_score::domain::report_structure),
        help("A report needs metadata, real_estate_market, demographics and economic_indicators.")
    )]
    ReportStructure(String),
}
