// immo-score-core/src/application/reporting.rs

// Batch utilities over already-written reports. Pure file scans: a file that cannot
// be read or parsed is skipped with a warning, never fatal to the batch.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::domain::settings::JsonFormat;
use crate::domain::value::at_path;
use crate::error::ImmoScoreError;
use crate::infrastructure::json::{read_json, write_json};

/// Metrics compared across a province by the `stats` command.
pub const CANONICAL_METRICS: [&str; 6] = [
    "real_estate_market.municipality_overview.last_period.price_trends.median_price",
    "real_estate_market.municipality_overview.historical_trends.year_over_year.price_change_pct",
    "demographics.population_overview.population_density",
    "economic_indicators.unemployment.overall_rate",
    "investment_analysis.affordability_metrics.price_to_income_ratio",
    "investment_analysis.rental_market_potential.estimated_rental_yield",
];

const UNKNOWN_COMMUNE: &str = "Inconnu";
const MERGE_DESCRIPTION: &str = "Fusion de plusieurs rapports communaux";

/// JSON files of each province subdirectory, keyed by folder name. Sorted for stable output.
pub fn files_by_province(output_dir: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut provinces: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let walker = WalkDir::new(output_dir).min_depth(1).max_depth(2).sort_by_file_name();

    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if entry.depth() == 1 && entry.file_type().is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            provinces.entry(name).or_default();
        } else if entry.depth() == 2
            && entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == "json")
            && let Some(province) = path.parent().and_then(Path::file_name)
        {
            provinces
                .entry(province.to_string_lossy().into_owned())
                .or_default()
                .push(path.to_path_buf());
        }
    }
    provinces
}

fn load_report(path: &Path) -> Option<Value> {
    match read_json(path) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            warn!(file = %path.display(), "Report is not a JSON object, skipped");
            None
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "Unreadable report, skipped");
            None
        }
    }
}

/// One side of an extremum; `value` stays `None` when no file had a number there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extreme {
    pub value: Option<f64>,
    pub commune: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricExtremes {
    pub min: Extreme,
    pub max: Extreme,
}

impl MetricExtremes {
    fn unset() -> Self {
        Self {
            min: Extreme {
                value: None,
                commune: String::new(),
            },
            max: Extreme {
                value: None,
                commune: String::new(),
            },
        }
    }

    fn observe(&mut self, value: f64, commune: &str) {
        if self.min.value.is_none_or(|min| value < min) {
            self.min = Extreme {
                value: Some(value),
                commune: commune.to_string(),
            };
        }
        if self.max.value.is_none_or(|max| value > max) {
            self.max = Extreme {
                value: Some(value),
                commune: commune.to_string(),
            };
        }
    }
}

/// Running min/max per dotted metric path, in the order the metrics were asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtremeValues {
    pub metrics: Vec<(String, MetricExtremes)>,
}

impl ExtremeValues {
    pub fn get(&self, metric: &str) -> Option<&MetricExtremes> {
        self.metrics.iter().find(|(name, _)| name == metric).map(|(_, e)| e)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.metrics
                .iter()
                .map(|(name, extremes)| (name.clone(), json!(extremes)))
                .collect(),
        )
    }
}

/// Walks every file for every metric. Missing paths and non-numeric leaves are ignored.
pub fn find_extreme_values(files: &[PathBuf], metrics: &[&str]) -> ExtremeValues {
    let mut result = ExtremeValues {
        metrics: metrics
            .iter()
            .map(|m| (m.to_string(), MetricExtremes::unset()))
            .collect(),
    };

    for report in files.iter().filter_map(|f| load_report(f)) {
        let commune = report
            .get("metadata")
            .and_then(|m| m.get("commune_name"))
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_COMMUNE);

        for (metric, extremes) in &mut result.metrics {
            if let Some(value) = at_path(&report, metric).and_then(Value::as_f64) {
                extremes.observe(value, commune);
            }
        }
    }
    result
}

/// Writes `{province}_stats.json` next to the province folders and returns its path.
pub fn write_stats(
    output_dir: &Path,
    province: &str,
    extremes: &ExtremeValues,
    today: NaiveDate,
    format: &JsonFormat,
) -> Result<PathBuf, ImmoScoreError> {
    let path = output_dir.join(format!("{province}_stats.json"));
    let document = json!({
        "province": province,
        "metrics": extremes.to_json(),
        "generated_date": today.format("%Y-%m-%d").to_string(),
    });
    write_json(&path, &document, format)?;
    info!(province, file = %path.display(), "Statistics written");
    Ok(path)
}

/// Concatenates readable reports into one wrapper document.
///
/// Returns `Ok(false)` without writing anything when no file could be loaded.
pub fn merge_reports(files: &[PathBuf], output: &Path, today: NaiveDate, format: &JsonFormat) -> Result<bool, ImmoScoreError> {
    let communes: Vec<Value> = files.iter().filter_map(|f| load_report(f)).collect();
    if communes.is_empty() {
        warn!(output = %output.display(), "Nothing to merge");
        return Ok(false);
    }

    let merged = json!({
        "metadata": {
            "description": MERGE_DESCRIPTION,
            "generated_date": today.format("%Y-%m-%d").to_string(),
            "source_files": communes.len(),
        },
        "communes": communes,
    });
    write_json(output, &merged, format)?;
    info!(file = %output.display(), count = communes.len(), "Reports merged");
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn report(name: &str, median_price: Value, rate: Value) -> Value {
        json!({
            "metadata": {"commune_id": 1, "commune_name": name, "generated_date": "2025-03-01"},
            "real_estate_market": {"municipality_overview": {"last_period": {"price_trends": {"median_price": median_price}}}},
            "demographics": {},
            "economic_indicators": {"unemployment": {"overall_rate": rate}},
        })
    }

    fn province_with_reports(reports: &[(&str, Value)]) -> Result<(TempDir, Vec<PathBuf>)> {
        let dir = tempdir()?;
        let province = dir.path().join("namur");
        fs::create_dir_all(&province)?;
        let mut files = Vec::new();
        for (file, content) in reports {
            let path = province.join(file);
            fs::write(&path, content.to_string())?;
            files.push(path);
        }
        Ok((dir, files))
    }

    #[test]
    fn test_files_by_province_lists_json_only() -> Result<()> {
        let (dir, _) = province_with_reports(&[
            ("immo_score_2.json", json!({})),
            ("immo_score_1.json", json!({})),
        ])?;
        fs::write(dir.path().join("namur").join("notes.txt"), "x")?;
        fs::create_dir_all(dir.path().join("hainaut"))?;
        fs::write(dir.path().join("namur_stats.json"), "{}")?;

        let provinces = files_by_province(dir.path());
        assert_eq!(provinces.keys().collect::<Vec<_>>(), vec!["hainaut", "namur"]);
        assert!(provinces["hainaut"].is_empty());
        let names: Vec<_> = provinces["namur"]
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["immo_score_1.json", "immo_score_2.json"]);
        Ok(())
    }

    #[test]
    fn test_extremes_skip_missing_and_non_numeric() -> Result<()> {
        let (dir, mut files) = province_with_reports(&[
            ("a.json", report("Namur", json!(250000), json!(10.5))),
            ("b.json", report("Gembloux", json!(280000), json!("N/A"))),
            ("c.json", report("Andenne", json!(190000), json!(12.0))),
        ])?;
        let broken = dir.path().join("namur").join("broken.json");
        fs::write(&broken, "{ not json")?;
        files.push(broken);

        let extremes = find_extreme_values(&files, &CANONICAL_METRICS);
        let price = extremes.get(CANONICAL_METRICS[0]).unwrap();
        assert_eq!(price.min.value, Some(190000.0));
        assert_eq!(price.min.commune, "Andenne");
        assert_eq!(price.max.commune, "Gembloux");

        let rate = extremes.get("economic_indicators.unemployment.overall_rate").unwrap();
        assert_eq!(rate.min.commune, "Namur");
        assert_eq!(rate.max.value, Some(12.0));

        let density = extremes.get("demographics.population_overview.population_density").unwrap();
        assert_eq!(density.min.value, None);
        assert_eq!(density.max.commune, "");
        Ok(())
    }

    #[test]
    fn test_stats_document_shape() -> Result<()> {
        let (dir, files) = province_with_reports(&[("a.json", report("Namur", json!(250000), json!(10.5)))])?;
        let extremes = find_extreme_values(&files, &CANONICAL_METRICS);
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let path = write_stats(dir.path(), "namur", &extremes, today, &JsonFormat::default())?;

        let stats = read_json(&path)?;
        assert_eq!(stats["province"], json!("namur"));
        assert_eq!(stats["generated_date"], json!("2025-03-01"));
        assert_eq!(stats["metrics"].as_object().unwrap().len(), 6);
        assert_eq!(
            stats["metrics"][CANONICAL_METRICS[0]]["max"],
            json!({"value": 250000.0, "commune": "Namur"})
        );
        Ok(())
    }

    #[test]
    fn test_merge_wraps_readable_reports() -> Result<()> {
        let (dir, mut files) = province_with_reports(&[
            ("a.json", report("Namur", json!(1), json!(1))),
            ("b.json", report("Gembloux", json!(2), json!(2))),
        ])?;
        files.push(dir.path().join("namur").join("missing.json"));
        let output = dir.path().join("namur_all.json");
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        assert!(merge_reports(&files, &output, today, &JsonFormat::default())?);
        let merged = read_json(&output)?;
        assert_eq!(merged["metadata"]["source_files"], json!(2));
        assert_eq!(merged["metadata"]["description"], json!(MERGE_DESCRIPTION));
        assert_eq!(merged["communes"][1]["metadata"]["commune_name"], json!("Gembloux"));
        Ok(())
    }

    #[test]
    fn test_merge_of_nothing_writes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let output = dir.path().join("empty_all.json");
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(!merge_reports(&[dir.path().join("ghost.json")], &output, today, &JsonFormat::default())?);
        assert!(!output.exists());
        Ok(())
    }
}
