// immo-score-core/src/domain/settings.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::{Validate, ValidationError};

use crate::domain::period::Period;

/// The warehouse subject areas that carry their own reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDomain {
    RealEstateData,
    EconomicData,
    DemographicData,
    TaxData,
    ConstructionData,
    CadastralData,
}

impl DataDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RealEstateData => "real_estate_data",
            Self::EconomicData => "economic_data",
            Self::DemographicData => "demographic_data",
            Self::TaxData => "tax_data",
            Self::ConstructionData => "construction_data",
            Self::CadastralData => "cadastral_data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DataPeriods {
    #[validate(custom(function = "validate_period"))]
    pub real_estate_data: String,
    #[validate(custom(function = "validate_period"))]
    pub economic_data: String,
    #[validate(custom(function = "validate_period"))]
    pub demographic_data: String,
    #[validate(custom(function = "validate_period"))]
    pub tax_data: String,
    #[validate(custom(function = "validate_period"))]
    pub construction_data: String,
    #[validate(custom(function = "validate_period"))]
    pub cadastral_data: String,
}

impl Default for DataPeriods {
    fn default() -> Self {
        Self {
            real_estate_data: "2024-Q4".to_string(),
            economic_data: "2023".to_string(),
            demographic_data: "2023".to_string(),
            tax_data: "2022".to_string(),
            construction_data: "2024-Q1".to_string(),
            cadastral_data: "2023".to_string(),
        }
    }
}

impl DataPeriods {
    pub fn get(&self, domain: DataDomain) -> &str {
        match domain {
            DataDomain::RealEstateData => &self.real_estate_data,
            DataDomain::EconomicData => &self.economic_data,
            DataDomain::DemographicData => &self.demographic_data,
            DataDomain::TaxData => &self.tax_data,
            DataDomain::ConstructionData => &self.construction_data,
            DataDomain::CadastralData => &self.cadastral_data,
        }
    }

    pub fn set(&mut self, domain: DataDomain, period: impl Into<String>) {
        let slot = match domain {
            DataDomain::RealEstateData => &mut self.real_estate_data,
            DataDomain::EconomicData => &mut self.economic_data,
            DataDomain::DemographicData => &mut self.demographic_data,
            DataDomain::TaxData => &mut self.tax_data,
            DataDomain::ConstructionData => &mut self.construction_data,
            DataDomain::CadastralData => &mut self.cadastral_data,
        };
        *slot = period.into();
    }
}

fn validate_period(value: &str) -> Result<(), ValidationError> {
    Period::parse(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("period_format"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NumberFormat {
    pub decimal_separator: String,
    pub thousands_separator: String,
    #[validate(range(max = 10))]
    pub decimal_places: usize,
    #[validate(range(max = 10))]
    pub price_decimal_places: usize,
    #[validate(range(max = 10))]
    pub percentage_decimal_places: usize,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimal_separator: ",".to_string(),
            thousands_separator: ".".to_string(),
            decimal_places: 2,
            price_decimal_places: 0,
            percentage_decimal_places: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct JsonFormat {
    /// `None` writes compact JSON.
    #[validate(range(max = 16))]
    pub indent: Option<usize>,
    pub ensure_ascii: bool,
    pub sort_keys: bool,
}

impl Default for JsonFormat {
    fn default() -> Self {
        Self {
            indent: Some(2),
            ensure_ascii: false,
            sort_keys: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub high_price_growth: f64,
    pub low_price_growth: f64,
    pub high_unemployment: f64,
    pub high_density: f64,
    pub high_yield: f64,
    pub high_price_income_ratio: f64,
    pub trend_positive: f64,
    pub trend_negative: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high_price_growth: 10.0,
            low_price_growth: -5.0,
            high_unemployment: 12.0,
            high_density: 1000.0,
            high_yield: 5.0,
            high_price_income_ratio: 6.0,
            trend_positive: 5.0,
            trend_negative: -5.0,
        }
    }
}

/// Minimum sample sizes under which a section is flagged as low-sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataValidity {
    pub min_transactions: u64,
    pub min_population: u64,
    pub min_enterprises: u64,
}

impl Default for DataValidity {
    fn default() -> Self {
        Self {
            min_transactions: 5,
            min_population: 100,
            min_enterprises: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ReportSettings {
    #[validate(nested)]
    pub periods: DataPeriods,
    #[validate(nested)]
    pub number_format: NumberFormat,
    #[validate(nested)]
    pub json_format: JsonFormat,
    pub thresholds: Thresholds,
    pub data_validity: DataValidity,
    pub output_dir: PathBuf,
    pub database_path: String,
    pub log_dir: PathBuf,
    pub provinces: Vec<String>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            periods: DataPeriods::default(),
            number_format: NumberFormat::default(),
            json_format: JsonFormat::default(),
            thresholds: Thresholds::default(),
            data_validity: DataValidity::default(),
            output_dir: PathBuf::from("data/output"),
            database_path: "immo_score.duckdb".to_string(),
            log_dir: PathBuf::from("logs"),
            provinces: ["Brabant wallon", "Liège", "Hainaut", "Namur", "Luxembourg"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Output subdirectory for a province: lowercase, spaces as underscores.
pub fn province_dir_name(province: &str) -> String {
    province.to_lowercase().replace(' ', "_")
}
