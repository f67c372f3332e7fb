// immo-score-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use duckdb::types::{ToSqlOutput, Value as DuckValue};
use duckdb::{Config, Connection, ToSql};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// Imports Hexagonaux
use crate::error::ImmoScoreError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::warehouse::{Row, SqlParam, Warehouse};

/// Days between 0001-01-01 (CE) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct DuckDbWarehouse {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbWarehouse {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs a multi-statement script (DDL, seed data). No result rows.
    pub fn execute_batch(&self, sql: &str) -> Result<(), ImmoScoreError> {
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(into_error)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ImmoScoreError> {
        self.conn.lock().map_err(|_| {
            ImmoScoreError::Infrastructure(InfrastructureError::Database(DatabaseError::Poisoned))
        })
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, ImmoScoreError> {
        let mut conn = self.lock()?;
        let rows = run_scoped(&mut conn, sql, params).map_err(into_error)?;
        debug!(rows = rows.len(), "warehouse query returned");
        Ok(rows)
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}

/// Acquire, execute, commit. Dropping the transaction on error rolls it back.
fn run_scoped(conn: &mut Connection, sql: &str, params: &[SqlParam]) -> duckdb::Result<Vec<Row>> {
    let tx = conn.transaction()?;
    let records = {
        let mut stmt = tx.prepare(sql)?;
        let mut rows = stmt.query(duckdb::params_from_iter(params.iter()))?;
        let names: Vec<String> = rows.as_ref().map(|s| s.column_names()).unwrap_or_default();

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (idx, name) in names.iter().enumerate() {
                let value: DuckValue = row.get(idx)?;
                record.insert(name.clone(), to_json(value));
            }
            records.push(record);
        }
        records
    };
    tx.commit()?;
    Ok(records)
}

fn into_error(e: duckdb::Error) -> ImmoScoreError {
    ImmoScoreError::Infrastructure(InfrastructureError::Database(DatabaseError::DuckDB(e)))
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            SqlParam::Int(v) => DuckValue::BigInt(*v),
            SqlParam::Float(v) => DuckValue::Double(*v),
            SqlParam::Text(v) => DuckValue::Text(v.clone()),
            SqlParam::Bool(v) => DuckValue::Boolean(*v),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

/// Decimals and 128-bit integers come out as plain JSON numbers.
fn to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(v) => Value::from(v),
        DuckValue::SmallInt(v) => Value::from(v),
        DuckValue::Int(v) => Value::from(v),
        DuckValue::BigInt(v) => Value::from(v),
        DuckValue::UTinyInt(v) => Value::from(v),
        DuckValue::USmallInt(v) => Value::from(v),
        DuckValue::UInt(v) => Value::from(v),
        DuckValue::UBigInt(v) => Value::from(v),
        DuckValue::HugeInt(v) => match i64::try_from(v) {
            Ok(small) => Value::from(small),
            Err(_) => Value::from(v as f64),
        },
        DuckValue::Float(v) => Value::from(f64::from(v)),
        DuckValue::Double(v) => Value::from(v),
        DuckValue::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        DuckValue::Text(s) | DuckValue::Enum(s) => Value::String(s),
        DuckValue::Date32(days) => days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(chrono::NaiveDate::from_num_days_from_ce_opt)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.into_iter().map(to_json).collect())
        }
        other => Value::String(format!("{other:?}")),
    }
}
