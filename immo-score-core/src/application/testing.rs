// immo-score-core/src/application/testing.rs

// Warehouse doubles shared by the application tests.
#![allow(clippy::expect_used)]

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ImmoScoreError;
use crate::infrastructure::adapters::DuckDbWarehouse;
use crate::ports::warehouse::{Row, SqlParam, Warehouse};

pub(crate) const MINI_DW: &str = include_str!("../../tests/fixtures/mini_dw.sql");

/// In-memory DuckDB loaded with the miniature `dw` schema.
pub(crate) fn seeded_warehouse() -> Arc<dyn Warehouse> {
    let warehouse = DuckDbWarehouse::new(":memory:").expect("in-memory duckdb");
    warehouse.execute_batch(MINI_DW).expect("fixture loads");
    Arc::new(warehouse)
}

/// Every query errors.
pub(crate) struct OfflineWarehouse;

#[async_trait]
impl Warehouse for OfflineWarehouse {
    async fn query(&self, _sql: &str, _params: &[SqlParam]) -> Result<Vec<Row>, ImmoScoreError> {
        Err(ImmoScoreError::InternalError("warehouse offline".into()))
    }

    fn engine_name(&self) -> &str {
        "offline"
    }
}

pub(crate) fn failing_warehouse() -> Arc<dyn Warehouse> {
    Arc::new(OfflineWarehouse)
}

/// Delegates to `inner` but fails any query bound to one municipality id.
pub(crate) struct SelectiveFailureWarehouse {
    inner: Arc<dyn Warehouse>,
    failing_id: i64,
}

#[async_trait]
impl Warehouse for SelectiveFailureWarehouse {
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, ImmoScoreError> {
        if params.contains(&SqlParam::Int(self.failing_id)) {
            return Err(ImmoScoreError::InternalError(format!(
                "connection reset while reading {}",
                self.failing_id
            )));
        }
        self.inner.query(sql, params).await
    }

    fn engine_name(&self) -> &str {
        "selective-failure"
    }
}

pub(crate) fn failing_for(failing_id: i64) -> Arc<dyn Warehouse> {
    Arc::new(SelectiveFailureWarehouse {
        inner: seeded_warehouse(),
        failing_id,
    })
}
