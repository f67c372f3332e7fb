// immo-score-core/src/application/extractors/mod.rs

// Extractors query one warehouse topic each and return nested raw records.
// Shared plumbing (date-key resolution, municipality enumeration, failure policy)
// lives in `ExtractorBase`, composed into every concrete extractor.

pub mod building;
pub mod demographics;
pub mod economics;
pub mod geography;
pub mod real_estate;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::outcome::ExtractionOutcome;
use crate::domain::period::{Granularity, Period};
use crate::domain::settings::{DataDomain, DataPeriods};
use crate::domain::value::key_string;
use crate::ports::warehouse::{Row, SqlParam, Warehouse};

pub use building::BuildingExtractor;
pub use demographics::DemographicsExtractor;
pub use economics::EconomicsExtractor;
pub use geography::{AdminHierarchy, GeographyExtractor};
pub use real_estate::RealEstateExtractor;

/// What an extractor is asked to cover.
#[derive(Debug, Clone, Default)]
pub struct ExtractorScope {
    pub municipality_id: Option<i64>,
    pub province: Option<String>,
    pub periods: DataPeriods,
}

impl ExtractorScope {
    pub fn new(municipality_id: Option<i64>, province: Option<String>, periods: DataPeriods) -> Self {
        Self {
            municipality_id,
            province,
            periods,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityRef {
    pub id: i64,
    pub name: String,
    pub postal_code: Option<String>,
}

pub const CURRENT: (&str, u32) = ("current_data", 0);
pub const PREVIOUS_YEAR: (&str, u32) = ("previous_year_data", 1);
pub const THREE_YEAR: (&str, u32) = ("three_year_data", 3);
pub const FIVE_YEAR: (&str, u32) = ("five_year_data", 5);

const DATE_ID_ANNUAL: &str = "
    SELECT id_date
    FROM dw.dim_date
    WHERE cd_year = ?
      AND cd_quarter IS NULL
      AND cd_month IS NULL";

const DATE_ID_QUARTERLY: &str = "
    SELECT id_date
    FROM dw.dim_date
    WHERE cd_year = ?
      AND cd_quarter = ?
      AND cd_month IS NULL";

#[derive(Clone)]
pub struct ExtractorBase {
    warehouse: Arc<dyn Warehouse>,
    scope: ExtractorScope,
}

impl ExtractorBase {
    pub fn new(warehouse: Arc<dyn Warehouse>, scope: ExtractorScope) -> Self {
        Self { warehouse, scope }
    }

    pub fn scope(&self) -> &ExtractorScope {
        &self.scope
    }

    pub fn period(&self, domain: DataDomain) -> &str {
        self.scope.periods.get(domain)
    }

    /// Runs one query under the extractor failure policy: zero rows is `Empty`
    /// (warning), a warehouse error is `Failed` (error), never a propagated `Err`.
    pub async fn fetch(&self, what: &str, sql: &str, params: &[SqlParam]) -> ExtractionOutcome<Vec<Row>> {
        match self.warehouse.query(sql, params).await {
            Ok(rows) if rows.is_empty() => {
                warn!(what, "No warehouse rows");
                ExtractionOutcome::Empty
            }
            Ok(rows) => ExtractionOutcome::Data(rows),
            Err(e) => {
                error!(what, engine = self.warehouse.engine_name(), error = %e, "❌ Warehouse query failed");
                ExtractionOutcome::Failed(format!("{what}: {e}"))
            }
        }
    }

    pub async fn fetch_one(&self, what: &str, sql: &str, params: &[SqlParam]) -> ExtractionOutcome<Row> {
        self.fetch(what, sql, params)
            .await
            .and_then(|rows| match rows.into_iter().next() {
                Some(row) => ExtractionOutcome::Data(row),
                None => ExtractionOutcome::Empty,
            })
    }

    /// Resolves a period string to the warehouse time key.
    ///
    /// A malformed period, a granularity mismatch or a missing `dim_date` row is
    /// `Empty` ("no matching period"); only a failing query is `Failed`.
    pub async fn date_id(&self, period: &str, expected: Granularity) -> ExtractionOutcome<i64> {
        let parsed = match Period::parse(period) {
            Ok(p) => p,
            Err(e) => {
                warn!(period, error = %e, "Unresolvable period");
                return ExtractionOutcome::Empty;
            }
        };
        self.resolve_period(parsed, expected).await
    }

    /// Time key of `period` moved back `years` years, same granularity.
    pub async fn date_id_back(&self, period: &str, years: u32, expected: Granularity) -> ExtractionOutcome<i64> {
        match Period::parse(period) {
            Ok(p) => self.resolve_period(p.years_back(years), expected).await,
            Err(e) => {
                warn!(period, error = %e, "Unresolvable period");
                ExtractionOutcome::Empty
            }
        }
    }

    async fn resolve_period(&self, period: Period, expected: Granularity) -> ExtractionOutcome<i64> {
        if period.granularity() != expected {
            warn!(%period, ?expected, "Period granularity does not match the topic");
            return ExtractionOutcome::Empty;
        }

        let outcome = match period {
            Period::Annual { year } => {
                self.fetch_one("date key", DATE_ID_ANNUAL, &[year.into()]).await
            }
            Period::Quarterly { year, quarter } => {
                self.fetch_one("date key", DATE_ID_QUARTERLY, &[year.into(), i64::from(quarter).into()])
                    .await
            }
        };

        outcome.and_then(|row| match row.get("id_date").and_then(Value::as_i64) {
            Some(id) => ExtractionOutcome::Data(id),
            None => {
                warn!(%period, "No date key for period");
                ExtractionOutcome::Empty
            }
        })
    }

    /// `{current_data, <comparison>...}` over back-dated periods of the same granularity.
    ///
    /// The first bucket decides the outcome; comparison buckets degrade to `{}`.
    pub async fn periodic<F, Fut>(
        &self,
        period: &str,
        granularity: Granularity,
        buckets: &[(&str, u32)],
        fetch: F,
    ) -> ExtractionOutcome<Map<String, Value>>
    where
        F: Fn(i64) -> Fut,
        Fut: Future<Output = ExtractionOutcome<Map<String, Value>>>,
    {
        let mut collected = Vec::with_capacity(buckets.len());
        for (index, (name, years)) in buckets.iter().enumerate() {
            let bucket = match self.date_id_back(period, *years, granularity).await.into_data() {
                Ok(date_id) => fetch(date_id).await,
                Err(other) => other,
            };
            if index == 0 {
                match bucket.into_data() {
                    Ok(current) => collected.push((*name, current)),
                    Err(other) => return other,
                }
            } else {
                collected.push((*name, bucket.data().unwrap_or_default()));
            }
        }
        period_record(collected)
    }

    /// Current level-4 municipalities, optionally restricted to the scope's province.
    pub async fn list_municipalities(&self) -> ExtractionOutcome<Vec<MunicipalityRef>> {
        let mut sql = String::from(
            "
            SELECT c.id_geography AS commune_id,
                   c.tx_name_fr AS commune_name,
                   c.cd_lau AS postal_code
            FROM dw.dim_geography c",
        );
        let mut params = Vec::new();

        if let Some(province) = &self.scope.province {
            sql.push_str(
                "
            LEFT JOIN dw.dim_geography d
                   ON d.cd_lau = c.cd_parent AND d.cd_level = 3 AND d.fl_current = TRUE
            LEFT JOIN dw.dim_geography p
                   ON p.cd_lau = d.cd_parent AND p.cd_level = 2 AND p.fl_current = TRUE",
            );
            params.push(SqlParam::from(province.as_str()));
        }

        sql.push_str(
            "
            WHERE c.cd_level = 4
              AND c.fl_current = TRUE",
        );
        if self.scope.province.is_some() {
            sql.push_str("\n              AND lower(p.tx_name_fr) LIKE '%' || lower(?) || '%'");
        }
        sql.push_str("\n            ORDER BY c.id_geography");

        self.fetch("municipalities", &sql, &params).await.map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let id = row.get("commune_id").and_then(Value::as_i64)?;
                    Some(MunicipalityRef {
                        id,
                        name: text(row, "commune_name"),
                        postal_code: row.get("postal_code").filter(|v| !v.is_null()).map(key_string),
                    })
                })
                .collect()
        })
    }

    pub fn log_start(&self, what: &str, municipality_id: i64) {
        info!(
            what,
            commune = municipality_id,
            province = self.scope.province.as_deref().unwrap_or("-"),
            "Extraction started"
        );
    }

    pub fn log_end(&self, what: &str, municipality_id: i64, count: usize) {
        info!(what, commune = municipality_id, count, "Extraction finished");
    }
}

/// One warehouse topic (real estate, demographics, ...).
#[async_trait]
pub trait Extractor: Send + Sync {
    fn base(&self) -> &ExtractorBase;

    /// Stable name used in logs and failure messages.
    fn topic(&self) -> &'static str;

    /// All sub-topics for one municipality.
    async fn extract_for(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>>;

    /// With an id (argument or scope): that municipality's record. Without: a mapping
    /// municipality id -> record over every municipality in scope.
    async fn extract_data(&self, municipality_id: Option<i64>) -> ExtractionOutcome<Value> {
        if let Some(id) = municipality_id.or(self.base().scope().municipality_id) {
            return self.extract_for(id).await.map(Value::Object);
        }

        let municipalities = match self.base().list_municipalities().await.into_data() {
            Ok(list) => list,
            Err(other) => return other,
        };

        let mut all = Map::new();
        for municipality in municipalities {
            let record = self.extract_for(municipality.id).await.into_value();
            all.insert(municipality.id.to_string(), record);
        }
        ExtractionOutcome::from_map(all).map(Value::Object)
    }
}

/// Folds sub-topic outcomes into one domain record.
///
/// Any data wins and every topic key is kept (`{}` where nothing came back);
/// otherwise a failure is reported with all causes; otherwise the domain is empty.
pub fn combine_topics(topics: Vec<(&str, ExtractionOutcome<Map<String, Value>>)>) -> ExtractionOutcome<Map<String, Value>> {
    let any_data = topics.iter().any(|(_, o)| o.is_data());
    if any_data {
        let record = topics
            .into_iter()
            .map(|(name, outcome)| (name.to_string(), outcome.into_value()))
            .collect();
        return ExtractionOutcome::Data(record);
    }

    let causes: Vec<String> = topics
        .iter()
        .filter_map(|(_, o)| o.failure().map(str::to_string))
        .collect();
    if causes.is_empty() {
        ExtractionOutcome::Empty
    } else {
        ExtractionOutcome::Failed(causes.join("; "))
    }
}

/// `{current_data, previous_year_data, ...}` record; empty when the current bucket is.
pub fn period_record(buckets: Vec<(&str, Map<String, Value>)>) -> ExtractionOutcome<Map<String, Value>> {
    let current_empty = buckets.first().is_none_or(|(_, b)| b.is_empty());
    if current_empty {
        return ExtractionOutcome::Empty;
    }
    ExtractionOutcome::Data(
        buckets
            .into_iter()
            .map(|(name, bucket)| (name.to_string(), Value::Object(bucket)))
            .collect(),
    )
}

/// Rows keyed by one of their columns, each row kept whole.
pub(crate) fn keyed_rows(rows: Vec<Row>, key: &str) -> Map<String, Value> {
    rows.into_iter()
        .map(|row| {
            let id = row.get(key).map(key_string).unwrap_or_default();
            (id, Value::Object(row))
        })
        .collect()
}

/// Label carried by a warehouse row, `""` when absent.
pub(crate) fn text(row: &Row, key: &str) -> String {
    row.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}
