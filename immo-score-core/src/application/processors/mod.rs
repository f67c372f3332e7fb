// immo-score-core/src/application/processors/mod.rs

// Processors turn one extractor's raw record into a report section.
// They are pure: no warehouse access, no I/O. An absent or empty `current_data`
// bucket yields an empty section; a record of the wrong JSON type is an error.

pub mod building;
pub mod demographics;
pub mod economics;
pub mod investment;
pub mod real_estate;

use serde_json::{Map, Value};

use crate::domain::error::DomainError;
use crate::domain::format::NumberFormatter;
use crate::domain::settings::{ReportSettings, Thresholds};
use crate::domain::trend::{Trend, TrendClassifier};
use crate::domain::value::as_f64;

pub use building::BuildingProcessor;
pub use demographics::{DemographicSections, DemographicsProcessor};
pub use economics::EconomicsProcessor;
pub use investment::InvestmentProcessor;
pub use real_estate::RealEstateProcessor;

/// Formatting and classification shared by every processor.
#[derive(Debug, Clone, Default)]
pub struct ProcessingContext {
    formatter: NumberFormatter,
    classifier: TrendClassifier,
}

impl ProcessingContext {
    pub fn new(formatter: NumberFormatter, classifier: TrendClassifier) -> Self {
        Self {
            formatter,
            classifier,
        }
    }

    pub fn from_settings(settings: &ReportSettings) -> Self {
        Self::new(
            NumberFormatter::new(settings.number_format.clone()),
            TrendClassifier::new(settings.thresholds.clone()),
        )
    }

    pub fn formatter(&self) -> &NumberFormatter {
        &self.formatter
    }

    pub fn classifier(&self) -> &TrendClassifier {
        &self.classifier
    }

    pub fn thresholds(&self) -> &Thresholds {
        self.classifier.thresholds()
    }
}

/// Helpers composed into each processor through its [`ProcessingContext`].
pub trait Processor {
    /// Report section this processor fills, used in error messages.
    fn section(&self) -> &'static str;

    fn context(&self) -> &ProcessingContext;

    fn change(&self, current: Option<f64>, previous: Option<f64>) -> (Option<f64>, String) {
        self.context().formatter().calculate_change(current, previous)
    }

    fn classify(&self, change: Option<f64>) -> Trend {
        self.context().classifier().classify_trend(change)
    }

    fn invalid(&self, message: impl Into<String>) -> DomainError {
        DomainError::Processing {
            domain: self.section().to_string(),
            message: message.into(),
        }
    }

    /// A sub-topic of the raw record: `None` when absent or empty.
    fn topic<'a>(&self, raw: &'a Value, name: &str) -> Result<Option<&'a Map<String, Value>>, DomainError> {
        match raw.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) if map.is_empty() => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(self.invalid(format!("'{name}' should be an object, got {}", json_kind(other)))),
        }
    }

    /// Splits a periodic record into its buckets; `None` when there is no current data.
    fn periodic<'a>(&self, record: Option<&'a Map<String, Value>>) -> Result<Option<Periodic<'a>>, DomainError> {
        let Some(record) = record else {
            return Ok(None);
        };
        for (name, bucket) in record {
            if name.ends_with("_data") && !matches!(bucket, Value::Object(_) | Value::Null) {
                return Err(self.invalid(format!("bucket '{name}' should be an object, got {}", json_kind(bucket))));
            }
        }
        match record.get("current_data").and_then(Value::as_object) {
            Some(current) if !current.is_empty() => Ok(Some(Periodic { record, current })),
            _ => Ok(None),
        }
    }
}

/// `{current_data, previous_year_data, ...}` with a non-empty current bucket.
#[derive(Debug, Clone, Copy)]
pub struct Periodic<'a> {
    record: &'a Map<String, Value>,
    current: &'a Map<String, Value>,
}

impl<'a> Periodic<'a> {
    pub fn current(&self) -> &'a Map<String, Value> {
        self.current
    }

    /// A comparison bucket; `None` when missing or empty.
    pub fn bucket(&self, name: &str) -> Option<&'a Map<String, Value>> {
        self.record
            .get(name)
            .and_then(Value::as_object)
            .filter(|b| !b.is_empty())
    }

    pub fn previous_year(&self) -> Option<&'a Map<String, Value>> {
        self.bucket("previous_year_data")
    }

    pub fn five_year(&self) -> Option<&'a Map<String, Value>> {
        self.bucket("five_year_data")
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub(crate) fn empty_section() -> Value {
    Value::Object(Map::new())
}

pub(crate) fn field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(as_f64)
}

/// Sum of one numeric field over every entry of a keyed map.
pub(crate) fn sum_field(map: &Map<String, Value>, key: &str) -> f64 {
    map.values().filter_map(|entry| entry.get(key).and_then(as_f64)).sum()
}
