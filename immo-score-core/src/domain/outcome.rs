// immo-score-core/src/domain/outcome.rs

use serde_json::{Map, Value};
use std::fmt;

/// Result of one extraction step at the extractor boundary.
///
/// Distinguishes "the warehouse has nothing for this slice" from "the query failed",
/// while both still degrade to an empty bucket downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome<T> {
    Data(T),
    Empty,
    Failed(String),
}

impl<T> ExtractionOutcome<T> {
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn data(self) -> Option<T> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&T> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(cause) => Some(cause),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractionOutcome<U> {
        match self {
            Self::Data(d) => ExtractionOutcome::Data(f(d)),
            Self::Empty => ExtractionOutcome::Empty,
            Self::Failed(cause) => ExtractionOutcome::Failed(cause),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> ExtractionOutcome<U>) -> ExtractionOutcome<U> {
        match self {
            Self::Data(d) => f(d),
            Self::Empty => ExtractionOutcome::Empty,
            Self::Failed(cause) => ExtractionOutcome::Failed(cause),
        }
    }

    /// Splits off the payload; any other outcome comes back re-typed so callers can return it.
    pub fn into_data<U>(self) -> Result<T, ExtractionOutcome<U>> {
        match self {
            Self::Data(d) => Ok(d),
            Self::Empty => Err(ExtractionOutcome::Empty),
            Self::Failed(cause) => Err(ExtractionOutcome::Failed(cause)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::Empty => "empty",
            Self::Failed(_) => "failed",
        }
    }
}

impl ExtractionOutcome<Map<String, Value>> {
    /// Empty maps count as "no data".
    pub fn from_map(map: Map<String, Value>) -> Self {
        if map.is_empty() { Self::Empty } else { Self::Data(map) }
    }

    /// Legacy shape: data, or `{}` for both empty and failed.
    pub fn into_value(self) -> Value {
        Value::Object(self.data().unwrap_or_default())
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for ExtractionOutcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(d) => Self::Data(d),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_map_is_empty_outcome() {
        assert!(ExtractionOutcome::from_map(Map::new()).is_empty());
        let mut m = Map::new();
        m.insert("a".into(), json!(1));
        assert!(ExtractionOutcome::from_map(m).is_data());
    }

    #[test]
    fn test_failed_collapses_to_empty_object() {
        let failed: ExtractionOutcome<Map<String, Value>> = ExtractionOutcome::Failed("boom".into());
        assert_eq!(failed.failure(), Some("boom"));
        assert_eq!(failed.into_value(), json!({}));
    }

    #[test]
    fn test_from_result() {
        let err: Result<u8, String> = Err("down".into());
        let outcome: ExtractionOutcome<u8> = err.into();
        assert_eq!(outcome.label(), "failed");
        let ok: ExtractionOutcome<u8> = Ok::<u8, String>(3).into();
        assert_eq!(ok.map(|v| v * 2), ExtractionOutcome::Data(6));
    }

    #[test]
    fn test_into_data_retypes_non_data() {
        let failed: ExtractionOutcome<i64> = ExtractionOutcome::Failed("gone".into());
        let err: Result<i64, ExtractionOutcome<String>> = failed.into_data();
        assert_eq!(err, Err(ExtractionOutcome::Failed("gone".into())));
        assert_eq!(ExtractionOutcome::Data(7).into_data::<()>(), Ok(7));
    }
}
