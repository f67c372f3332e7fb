// immo-score-core/src/infrastructure/config/settings.rs

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::settings::ReportSettings;
use crate::infrastructure::error::InfrastructureError;

const CANDIDATES: [&str; 2] = ["immo_score.yaml", "immo_score.yml"];

pub const ENV_OUTPUT_DIR: &str = "IMMO_SCORE_OUTPUT_DIR";
pub const ENV_DATABASE: &str = "IMMO_SCORE_DATABASE";

/// Loads `immo_score.yaml` from `config_dir`, falling back to defaults when absent.
///
/// Layering: defaults < YAML file < environment variables. The result is validated.
#[instrument(skip(config_dir))]
pub fn load_settings(config_dir: &Path) -> Result<ReportSettings, InfrastructureError> {
    let mut settings = match find_settings_file(config_dir) {
        Some(path) => read_settings(&path)?,
        None => {
            info!(dir = ?config_dir, "No settings file found, using built-in defaults");
            ReportSettings::default()
        }
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

fn find_settings_file(root: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.exists())
}

fn read_settings(path: &Path) -> Result<ReportSettings, InfrastructureError> {
    info!(path = ?path, "Loading report settings");
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(ReportSettings::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

fn apply_env_overrides(settings: &mut ReportSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup(ENV_OUTPUT_DIR) {
        info!(old = ?settings.output_dir, new = ?val, "Overriding output dir via ENV");
        settings.output_dir = PathBuf::from(val);
    }
    if let Some(val) = lookup(ENV_DATABASE) {
        info!(old = ?settings.database_path, new = ?val, "Overriding database path via ENV");
        settings.database_path = val;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let settings = load_settings(dir.path())?;
        assert_eq!(settings.periods.tax_data, "2022");
        Ok(())
    }

    #[test]
    fn test_yaml_file_is_loaded() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("immo_score.yml"),
            "output_dir: reports\nthresholds:\n  high_unemployment: 15.0\n",
        )?;
        let settings = load_settings(dir.path())?;
        assert_eq!(settings.output_dir, PathBuf::from("reports"));
        assert_eq!(settings.thresholds.high_unemployment, 15.0);
        assert_eq!(settings.thresholds.high_yield, 5.0);
        Ok(())
    }

    #[test]
    fn test_invalid_period_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("immo_score.yaml"),
            "periods:\n  real_estate_data: \"Q4-2024\"\n",
        )?;
        let err = load_settings(dir.path()).unwrap_err();
        assert!(matches!(err, InfrastructureError::ConfigError(_)));
        Ok(())
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = ReportSettings::default();
        apply_env_overrides(&mut settings, |key| match key {
            ENV_DATABASE => Some("/tmp/dw.duckdb".to_string()),
            _ => None,
        });
        assert_eq!(settings.database_path, "/tmp/dw.duckdb");
        assert_eq!(settings.output_dir, PathBuf::from("data/output"));
    }
}
