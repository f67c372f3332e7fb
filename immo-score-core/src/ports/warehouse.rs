// immo-score-core/src/ports/warehouse.rs

// What the extractors need from the data warehouse, without knowing which engine answers.
// The dimensional schema lives under `dw.*`; adapters only have to run parameterized SQL.

use crate::error::ImmoScoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One result row: column name -> value, in SELECT order.
pub type Row = Map<String, Value>;

/// Positional query parameter bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(i64::from(v))
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Float(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs one logical query inside its own scoped transaction.
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, ImmoScoreError>;

    fn engine_name(&self) -> &str;
}
