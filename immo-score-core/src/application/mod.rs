// immo-score-core/src/application/mod.rs

pub mod extractors;
pub mod processors;

pub mod generator;
pub mod reporting;

#[cfg(test)]
pub(crate) mod testing;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Cela permet au CLI de faire :
// `use immo_score_core::application::{MunicipalityGenerator, merge_reports};`
// sans avoir à connaître la structure interne des fichiers.

pub use generator::{GenerationSummary, MunicipalityGenerator, province_folder};
pub use reporting::{
    CANONICAL_METRICS, ExtremeValues, files_by_province, find_extreme_values, merge_reports,
    write_stats,
};
