// immo-score-core/src/domain/metadata.rs

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::DomainError;
use crate::domain::period::{Granularity, Period};
use crate::domain::settings::{DataDomain, DataPeriods};

pub const REPORT_VERSION: &str = "1.0";
pub const HISTORICAL_START: i32 = 2000;

/// Top-level sections every report must carry.
pub const REQUIRED_SECTIONS: [&str; 4] = [
    "metadata",
    "real_estate_market",
    "demographics",
    "economic_indicators",
];
pub const REQUIRED_METADATA: [&str; 3] = ["commune_id", "commune_name", "generated_date"];

/// Identity block resolved from the geography dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommuneIdentity {
    pub commune_id: i64,
    pub commune_name: String,
    pub postal_code: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalCoverage {
    pub current_year: i32,
    pub historical_start: i32,
    pub range_years: i32,
}

/// Annotation only: these back-dated periods are not all queried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedPeriod {
    pub current: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub five_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ten_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifteen_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since_2000: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_range: Option<String>,
}

impl EnrichedPeriod {
    pub fn from_raw(raw: &str) -> Self {
        let Ok(period) = Period::parse(raw) else {
            return Self {
                current: raw.to_string(),
                previous_year: None,
                five_year: None,
                ten_year: None,
                fifteen_year: None,
                since_2000: None,
                historical_range: None,
            };
        };

        let back = |years: u32| Some(period.years_back(years).to_string());
        let start = match period.granularity() {
            Granularity::Year => HISTORICAL_START.to_string(),
            Granularity::Quarter => format!("{HISTORICAL_START}-Q1"),
        };
        let range = format!("{start} à {period}");
        let since_2000 = match period.granularity() {
            Granularity::Year => start,
            Granularity::Quarter => range.clone(),
        };

        Self {
            current: period.to_string(),
            previous_year: back(1),
            five_year: back(5),
            ten_year: back(10),
            fifteen_year: back(15),
            since_2000: Some(since_2000),
            historical_range: Some(range),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPeriodCoverage {
    pub real_estate_data: EnrichedPeriod,
    pub economic_data: EnrichedPeriod,
    pub demographic_data: EnrichedPeriod,
    pub tax_data: EnrichedPeriod,
    pub construction_data: EnrichedPeriod,
}

impl DataPeriodCoverage {
    pub fn from_periods(periods: &DataPeriods) -> Self {
        let enrich = |domain: DataDomain| EnrichedPeriod::from_raw(periods.get(domain));
        Self {
            real_estate_data: enrich(DataDomain::RealEstateData),
            economic_data: enrich(DataDomain::EconomicData),
            demographic_data: enrich(DataDomain::DemographicData),
            tax_data: enrich(DataDomain::TaxData),
            construction_data: enrich(DataDomain::ConstructionData),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    #[serde(flatten)]
    pub commune: CommuneIdentity,
    pub version: String,
    pub generated_date: String,
    pub temporal_coverage: TemporalCoverage,
    pub data_period: DataPeriodCoverage,
    /// Sections whose sample falls under the configured minimums.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub low_sample_sections: Vec<String>,
}

impl ReportMetadata {
    pub fn new(commune: CommuneIdentity, periods: &DataPeriods, today: NaiveDate) -> Self {
        let current_year = today.year();
        Self {
            commune,
            version: REPORT_VERSION.to_string(),
            generated_date: today.format("%Y-%m-%d").to_string(),
            temporal_coverage: TemporalCoverage {
                current_year,
                historical_start: HISTORICAL_START,
                range_years: current_year - HISTORICAL_START,
            },
            data_period: DataPeriodCoverage::from_periods(periods),
            low_sample_sections: Vec::new(),
        }
    }
}

/// Checks the minimal shape consumers rely on: required sections are objects and
/// the metadata block names the commune and its generation date.
pub fn validate_report_structure(report: &Value) -> Result<(), DomainError> {
    let Some(root) = report.as_object() else {
        return Err(DomainError::ReportStructure("report is not an object".into()));
    };

    for section in REQUIRED_SECTIONS {
        match root.get(section) {
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(DomainError::ReportStructure(format!(
                    "section '{section}' is not an object"
                )));
            }
            None => {
                return Err(DomainError::ReportStructure(format!(
                    "missing section '{section}'"
                )));
            }
        }
    }

    let metadata = &root["metadata"];
    for key in REQUIRED_METADATA {
        if metadata.get(key).is_none_or(Value::is_null) {
            return Err(DomainError::ReportStructure(format!(
                "metadata.{key} is missing"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    fn identity() -> CommuneIdentity {
        CommuneIdentity {
            commune_id: 92094,
            commune_name: "Namur".into(),
            postal_code: Some("5000".into()),
            district: Some("Arrondissement de Namur".into()),
            province: Some("Province de Namur".into()),
            region: Some("Région wallonne".into()),
        }
    }

    #[test]
    fn test_quarterly_enrichment() {
        let p = EnrichedPeriod::from_raw("2024-Q4");
        assert_eq!(p.previous_year.as_deref(), Some("2023-Q4"));
        assert_eq!(p.five_year.as_deref(), Some("2019-Q4"));
        assert_eq!(p.fifteen_year.as_deref(), Some("2009-Q4"));
        assert_eq!(p.since_2000.as_deref(), Some("2000-Q1 à 2024-Q4"));
    }

    #[test]
    fn test_annual_enrichment() {
        let p = EnrichedPeriod::from_raw("2023");
        assert_eq!(p.ten_year.as_deref(), Some("2013"));
        assert_eq!(p.since_2000.as_deref(), Some("2000"));
        assert_eq!(p.historical_range.as_deref(), Some("2000 à 2023"));
    }

    #[test]
    fn test_malformed_period_is_kept_verbatim() {
        let p = EnrichedPeriod::from_raw("Q4-2024");
        assert_eq!(p.current, "Q4-2024");
        assert!(p.previous_year.is_none());
    }

    #[test]
    fn test_metadata_serialization() -> Result<()> {
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let meta = ReportMetadata::new(identity(), &DataPeriods::default(), today);
        let value = serde_json::to_value(&meta)?;

        assert_eq!(value["commune_id"], json!(92094));
        assert_eq!(value["generated_date"], json!("2025-03-14"));
        assert_eq!(value["temporal_coverage"]["range_years"], json!(25));
        assert_eq!(value["data_period"]["tax_data"]["five_year"], json!("2017"));
        assert!(value.get("low_sample_sections").is_none());
        Ok(())
    }

    #[test]
    fn test_validate_report_structure() {
        let ok = json!({
            "metadata": {"commune_id": 1, "commune_name": "A", "generated_date": "2025-01-01"},
            "real_estate_market": {},
            "demographics": {},
            "economic_indicators": {}
        });
        assert!(validate_report_structure(&ok).is_ok());

        let missing = json!({"metadata": {"commune_id": 1}, "real_estate_market": {}});
        assert!(matches!(
            validate_report_structure(&missing),
            Err(DomainError::ReportStructure(_))
        ));

        let mut no_name = ok.clone();
        no_name["metadata"]["commune_name"] = Value::Null;
        assert!(validate_report_structure(&no_name).is_err());
    }
}
