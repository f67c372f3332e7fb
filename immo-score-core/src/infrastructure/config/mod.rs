// immo-score-core/src/infrastructure/config/mod.rs

pub mod settings;

pub use crate::domain::settings::ReportSettings;
pub use settings::load_settings;
