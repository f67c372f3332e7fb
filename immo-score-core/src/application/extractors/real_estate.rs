// immo-score-core/src/application/extractors/real_estate.rs

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{CURRENT, ExtractorBase, ExtractorScope, Extractor, FIVE_YEAR, PREVIOUS_YEAR, combine_topics, keyed_rows, text};
use crate::domain::outcome::ExtractionOutcome;
use crate::domain::period::{Granularity, Period};
use crate::domain::settings::DataDomain;
use crate::domain::value::key_string;
use crate::ports::warehouse::Warehouse;

const MUNICIPALITY_TRANSACTIONS: &str = "
    SELECT rem.cd_building_type,
           bt.ds_building_type AS building_type_description,
           rem.ms_total_transactions,
           rem.ms_total_price,
           rem.ms_total_surface,
           rem.ms_mean_price,
           rem.ms_price_p10,
           rem.ms_price_p25,
           rem.ms_price_p50,
           rem.ms_price_p75,
           rem.ms_price_p90,
           rem.fl_confidential
    FROM dw.fact_real_estate_municipality rem
    JOIN dw.dim_building_type bt ON rem.cd_building_type = bt.cd_building_type
    WHERE rem.id_geography = ?
      AND rem.id_date = ?
      AND rem.fl_confidential = FALSE
    ORDER BY bt.ds_building_type";

const SECTOR_TRANSACTIONS: &str = "
    SELECT res.id_sector_sk,
           ss.tx_sector_fr AS sector_name,
           res.cd_residential_type,
           rt.ds_residential_type AS residential_type_description,
           res.nb_transactions,
           res.ms_price_p10,
           res.ms_price_p25,
           res.ms_price_p50,
           res.ms_price_p75,
           res.ms_price_p90,
           res.fl_confidential,
           res.fl_aggregated_sectors,
           res.nb_aggregated_sectors
    FROM dw.fact_real_estate_sector res
    JOIN dw.dim_statistical_sectors ss ON res.id_sector_sk = ss.id_sector_sk
    JOIN dw.dim_residential_building rt ON res.cd_residential_type = rt.cd_residential_type
    WHERE res.id_geography = ?
      AND res.id_date = ?
      AND res.fl_confidential = FALSE
    ORDER BY ss.tx_sector_fr, rt.ds_residential_type";

const BUILDING_STOCK: &str = "
    SELECT bs.cd_building_type,
           bt.ds_building_type AS building_type_description,
           bs.cd_statistic_type,
           bst.ds_statistic_type AS statistic_type_description,
           bs.ms_building_count
    FROM dw.fact_building_stock bs
    JOIN dw.dim_building_type bt ON bs.cd_building_type = bt.cd_building_type
    JOIN dw.dim_building_statistics bst ON bs.cd_statistic_type = bst.cd_statistic_type
    WHERE bs.id_geography = ?
      AND bs.id_date = ?
    ORDER BY bt.ds_building_type, bst.ds_statistic_type";

/// Transactions (quarterly), sector prices and the building stock (annual).
pub struct RealEstateExtractor {
    base: ExtractorBase,
}

impl RealEstateExtractor {
    pub fn new(warehouse: Arc<dyn Warehouse>, scope: ExtractorScope) -> Self {
        Self {
            base: ExtractorBase::new(warehouse, scope),
        }
    }

    pub fn from_base(base: ExtractorBase) -> Self {
        Self { base }
    }

    fn period(&self) -> &str {
        self.base.period(DataDomain::RealEstateData)
    }

    /// Per building type, for the current quarter, the same quarter a year back and five years back.
    pub async fn municipality_data(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.base.log_start("municipal real estate", municipality_id);
        let outcome = self
            .base
            .periodic(
                self.period(),
                Granularity::Quarter,
                &[CURRENT, PREVIOUS_YEAR, FIVE_YEAR],
                |date_id| self.transactions_for(municipality_id, date_id),
            )
            .await;
        self.base.log_end("municipal real estate", municipality_id, bucket_sizes(&outcome));
        outcome
    }

    async fn transactions_for(&self, municipality_id: i64, date_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.base
            .fetch(
                "municipal transactions",
                MUNICIPALITY_TRANSACTIONS,
                &[municipality_id.into(), date_id.into()],
            )
            .await
            .map(|rows| keyed_rows(rows, "cd_building_type"))
    }

    /// `{sector id: {sector_name, residential_types: {code: row}}}` for the current quarter.
    pub async fn sector_data(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.base.log_start("sector real estate", municipality_id);

        let date_id = match self.base.date_id(self.period(), Granularity::Quarter).await.into_data() {
            Ok(id) => id,
            Err(other) => return other,
        };
        let rows = match self
            .base
            .fetch(
                "sector transactions",
                SECTOR_TRANSACTIONS,
                &[municipality_id.into(), date_id.into()],
            )
            .await
            .into_data()
        {
            Ok(rows) => rows,
            Err(other) => return other,
        };
        let count = rows.len();

        let mut sectors = Map::new();
        for row in rows {
            let sector_id = row.get("id_sector_sk").map(key_string).unwrap_or_default();
            let residential_type = row.get("cd_residential_type").map(key_string).unwrap_or_default();
            let entry = sectors.entry(sector_id).or_insert_with(|| {
                let mut sector = Map::new();
                sector.insert("sector_name".into(), Value::String(text(&row, "sector_name")));
                sector.insert("residential_types".into(), Value::Object(Map::new()));
                Value::Object(sector)
            });
            if let Some(types) = entry.get_mut("residential_types").and_then(Value::as_object_mut) {
                types.insert(residential_type, Value::Object(row));
            }
        }

        self.base.log_end("sector real estate", municipality_id, count);
        ExtractionOutcome::from_map(sectors)
    }

    /// Building counts per type and statistic for the year of the period and five years before.
    pub async fn building_stock(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.base.log_start("building stock", municipality_id);

        let year = match Period::parse(self.period()) {
            Ok(p) => p.annual().to_string(),
            Err(_) => return ExtractionOutcome::Empty,
        };
        let outcome = self
            .base
            .periodic(&year, Granularity::Year, &[CURRENT, FIVE_YEAR], |date_id| {
                self.stock_for(municipality_id, date_id)
            })
            .await;

        self.base.log_end("building stock", municipality_id, bucket_sizes(&outcome));
        outcome
    }

    async fn stock_for(&self, municipality_id: i64, date_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.base
            .fetch(
                "building stock",
                BUILDING_STOCK,
                &[municipality_id.into(), date_id.into()],
            )
            .await
            .map(|rows| {
                let mut stock = Map::new();
                for row in &rows {
                    let building_type = row.get("cd_building_type").map(key_string).unwrap_or_default();
                    let statistic = row.get("cd_statistic_type").map(key_string).unwrap_or_default();
                    let entry = stock.entry(building_type).or_insert_with(|| {
                        let mut t = Map::new();
                        t.insert(
                            "description".into(),
                            Value::String(text(row, "building_type_description")),
                        );
                        t.insert("statistics".into(), Value::Object(Map::new()));
                        Value::Object(t)
                    });
                    if let Some(stats) = entry.get_mut("statistics").and_then(Value::as_object_mut) {
                        let mut s = Map::new();
                        s.insert(
                            "description".into(),
                            Value::String(text(row, "statistic_type_description")),
                        );
                        s.insert(
                            "count".into(),
                            row.get("ms_building_count").cloned().unwrap_or(Value::Null),
                        );
                        stats.insert(statistic, Value::Object(s));
                    }
                }
                stock
            })
    }
}

/// Entries across all buckets, for the end-of-extraction log line.
fn bucket_sizes(outcome: &ExtractionOutcome<Map<String, Value>>) -> usize {
    outcome
        .as_data()
        .map(|record| {
            record
                .values()
                .filter_map(Value::as_object)
                .map(Map::len)
                .sum()
        })
        .unwrap_or(0)
}

#[async_trait]
impl Extractor for RealEstateExtractor {
    fn base(&self) -> &ExtractorBase {
        &self.base
    }

    fn topic(&self) -> &'static str {
        "real_estate"
    }

    async fn extract_for(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        combine_topics(vec![
            ("municipality_data", self.municipality_data(municipality_id).await),
            ("sector_data", self.sector_data(municipality_id).await),
            ("building_stock", self.building_stock(municipality_id).await),
        ])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::testing::{failing_warehouse, seeded_warehouse};
    use crate::domain::settings::DataPeriods;
    use anyhow::Result;
    use serde_json::json;

    fn extractor() -> RealEstateExtractor {
        RealEstateExtractor::new(seeded_warehouse(), ExtractorScope::default())
    }

    #[tokio::test]
    async fn test_municipality_buckets_skip_confidential_rows() -> Result<()> {
        let data = extractor().municipality_data(92094).await.data().unwrap();
        let current = data["current_data"].as_object().unwrap();
        assert_eq!(current.len(), 2);
        assert!(current.get("534").is_none());
        assert_eq!(current["200"]["ms_total_transactions"], json!(120));
        assert_eq!(data["previous_year_data"]["537"]["ms_mean_price"], json!(240000.0));
        assert_eq!(data["five_year_data"]["200"]["ms_total_transactions"], json!(110));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_comparison_periods_are_empty_buckets() -> Result<()> {
        let data = extractor().municipality_data(92142).await.data().unwrap();
        assert_eq!(data["previous_year_data"], json!({}));
        assert_eq!(data["five_year_data"], json!({}));
        Ok(())
    }

    #[tokio::test]
    async fn test_sector_grouping() -> Result<()> {
        let sectors = extractor().sector_data(92094).await.data().unwrap();
        assert_eq!(sectors.len(), 2);
        assert_eq!(sectors["1"]["sector_name"], json!("Namur Centre"));
        assert_eq!(sectors["1"]["residential_types"].as_object().unwrap().len(), 2);
        assert_eq!(sectors["2"]["residential_types"]["B001"]["nb_aggregated_sectors"], json!(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_building_stock_uses_the_year_of_the_quarter() -> Result<()> {
        let stock = extractor().building_stock(92094).await.data().unwrap();
        let houses = &stock["current_data"]["200"];
        assert_eq!(houses["statistics"]["TOTAL"]["count"], json!(20000));
        assert_eq!(houses["statistics"]["AGE_1"]["description"], json!("Construits avant 1945"));
        assert_eq!(stock["five_year_data"]["401"]["statistics"]["TOTAL"]["count"], json!(2800));
        Ok(())
    }

    #[tokio::test]
    async fn test_municipality_without_transactions() {
        let outcome = extractor().extract_for(62096).await;
        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn test_annual_period_has_no_quarterly_key() {
        let mut periods = DataPeriods::default();
        periods.set(DataDomain::RealEstateData, "2024");
        let extractor = RealEstateExtractor::new(seeded_warehouse(), ExtractorScope::new(None, None, periods));
        assert!(extractor.municipality_data(92094).await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let extractor = RealEstateExtractor::new(failing_warehouse(), ExtractorScope::default());
        let outcome = extractor.extract_for(92094).await;
        assert!(outcome.failure().unwrap().contains("date key"));
    }

    #[tokio::test]
    async fn test_province_mapping() -> Result<()> {
        let scope = ExtractorScope::new(None, Some("Namur".into()), DataPeriods::default());
        let extractor = RealEstateExtractor::new(seeded_warehouse(), scope);
        let all = extractor.extract_data(None).await.data().unwrap();
        let keys: Vec<&String> = all.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["92094", "92142"]);
        Ok(())
    }
}
