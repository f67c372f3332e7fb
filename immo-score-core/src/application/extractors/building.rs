// immo-score-core/src/application/extractors/building.rs

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use super::{CURRENT, Extractor, ExtractorBase, ExtractorScope, PREVIOUS_YEAR, combine_topics};
use crate::domain::outcome::ExtractionOutcome;
use crate::domain::period::Granularity;
use crate::domain::settings::DataDomain;
use crate::domain::value::{as_f64, num};
use crate::ports::warehouse::{Row, Warehouse};

const PERMIT_COUNTS: &str = "
    SELECT bp.fl_residential,
           bp.fl_new_construction,
           SUM(bp.nb_buildings) AS buildings,
           SUM(bp.nb_dwellings) AS dwellings,
           SUM(bp.nb_apartments) AS apartments,
           SUM(bp.nb_houses) AS houses,
           d.cd_year,
           d.cd_quarter
    FROM dw.fact_building_permits_counts bp
    JOIN dw.dim_date d ON bp.id_date = d.id_date
    WHERE bp.id_geography = ?
      AND bp.id_date = ?
    GROUP BY bp.fl_residential, bp.fl_new_construction, d.cd_year, d.cd_quarter";

// Dwelling floor area is only reported for new residential construction.
const PERMIT_SURFACE: &str = "
    SELECT SUM(s.nb_surface_m2) AS total_surface,
           d.cd_year,
           d.cd_quarter
    FROM dw.fact_building_permits_surface s
    JOIN dw.dim_date d ON s.id_date = d.id_date
    WHERE s.id_geography = ?
      AND s.id_date = ?
      AND s.fl_residential = TRUE
      AND s.fl_new_construction = TRUE
    GROUP BY d.cd_year, d.cd_quarter";

// Volume is only reported for new non-residential construction.
const PERMIT_VOLUME: &str = "
    SELECT SUM(v.nb_volume_m3) AS total_volume,
           d.cd_year,
           d.cd_quarter
    FROM dw.fact_building_permits_volume v
    JOIN dw.dim_date d ON v.id_date = d.id_date
    WHERE v.id_geography = ?
      AND v.id_date = ?
      AND v.fl_residential = FALSE
      AND v.fl_new_construction = TRUE
    GROUP BY d.cd_year, d.cd_quarter";

fn flag(row: &Row, key: &str) -> bool {
    row.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn count(row: &Row, key: &str) -> Option<f64> {
    row.get(key).and_then(as_f64)
}

fn permit_entry(row: &Row, residential: bool) -> Value {
    if residential {
        json!({
            "buildings": num(count(row, "buildings")),
            "dwellings": num(count(row, "dwellings")),
            "apartments": num(count(row, "apartments")),
            "houses": num(count(row, "houses")),
        })
    } else {
        json!({
            "buildings": num(count(row, "buildings")),
            "dwellings": null,
            "apartments": null,
            "houses": null,
        })
    }
}

/// Building permits: counts by category, dwelling surface and non-residential volume.
pub struct BuildingExtractor {
    base: ExtractorBase,
}

impl BuildingExtractor {
    pub fn new(warehouse: Arc<dyn Warehouse>, scope: ExtractorScope) -> Self {
        Self {
            base: ExtractorBase::new(warehouse, scope),
        }
    }

    pub fn from_base(base: ExtractorBase) -> Self {
        Self { base }
    }

    async fn quarterly<F, Fut>(&self, what: &str, municipality_id: i64, fetch: F) -> ExtractionOutcome<Map<String, Value>>
    where
        F: Fn(i64) -> Fut,
        Fut: std::future::Future<Output = ExtractionOutcome<Map<String, Value>>>,
    {
        self.base.log_start(what, municipality_id);
        let outcome = self
            .base
            .periodic(
                self.base.period(DataDomain::ConstructionData),
                Granularity::Quarter,
                &[CURRENT, PREVIOUS_YEAR],
                fetch,
            )
            .await;
        self.base.log_end(what, municipality_id, usize::from(outcome.is_data()));
        outcome
    }

    pub async fn permits_counts(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.quarterly("permit counts", municipality_id, |date_id| async move {
            self.base
                .fetch("permit counts", PERMIT_COUNTS, &[municipality_id.into(), date_id.into()])
                .await
                .map(|rows| permit_counts_record(&rows))
        })
        .await
    }

    pub async fn permits_surface(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.quarterly("permit surface", municipality_id, |date_id| async move {
            let row = match self
                .base
                .fetch_one("permit surface", PERMIT_SURFACE, &[municipality_id.into(), date_id.into()])
                .await
                .into_data()
            {
                Ok(row) => row,
                Err(other) => return other,
            };
            let dwellings = self.residential_new_dwellings(municipality_id, date_id).await;
            let surface = count(&row, "total_surface");
            let average = match (surface, dwellings) {
                (Some(s), Some(d)) if d > 0.0 => Some(s / d),
                _ => None,
            };
            ExtractionOutcome::Data(object(json!({
                "year": row.get("cd_year").cloned().unwrap_or(Value::Null),
                "quarter": row.get("cd_quarter").cloned().unwrap_or(Value::Null),
                "total_surface_m2": num(surface),
                "avg_surface_per_dwelling_m2": num(average),
                "dwellings_count": num(dwellings),
            })))
        })
        .await
    }

    pub async fn permits_volume(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.quarterly("permit volume", municipality_id, |date_id| async move {
            let row = match self
                .base
                .fetch_one("permit volume", PERMIT_VOLUME, &[municipality_id.into(), date_id.into()])
                .await
                .into_data()
            {
                Ok(row) => row,
                Err(other) => return other,
            };
            let buildings = self.non_residential_new_buildings(municipality_id, date_id).await;
            let volume = count(&row, "total_volume");
            let average = match (volume, buildings) {
                (Some(v), Some(b)) if b > 0.0 => Some(v / b),
                _ => None,
            };
            ExtractionOutcome::Data(object(json!({
                "year": row.get("cd_year").cloned().unwrap_or(Value::Null),
                "quarter": row.get("cd_quarter").cloned().unwrap_or(Value::Null),
                "total_volume_m3": num(volume),
                "avg_volume_per_building_m3": num(average),
                "buildings_count": num(buildings),
            })))
        })
        .await
    }

    async fn category_rows(&self, municipality_id: i64, date_id: i64) -> Vec<Row> {
        self.base
            .fetch("permit counts", PERMIT_COUNTS, &[municipality_id.into(), date_id.into()])
            .await
            .data()
            .unwrap_or_default()
    }

    async fn residential_new_dwellings(&self, municipality_id: i64, date_id: i64) -> Option<f64> {
        self.category_rows(municipality_id, date_id)
            .await
            .iter()
            .find(|r| flag(r, "fl_residential") && flag(r, "fl_new_construction"))
            .and_then(|r| count(r, "dwellings"))
    }

    async fn non_residential_new_buildings(&self, municipality_id: i64, date_id: i64) -> Option<f64> {
        self.category_rows(municipality_id, date_id)
            .await
            .iter()
            .find(|r| !flag(r, "fl_residential") && flag(r, "fl_new_construction"))
            .and_then(|r| count(r, "buildings"))
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// `{year, quarter, residential, non_residential, total}` from the per-category sums.
fn permit_counts_record(rows: &[Row]) -> Map<String, Value> {
    let mut residential = Map::new();
    let mut non_residential = Map::new();
    let mut totals = [0.0_f64; 4];
    let (mut year, mut quarter) = (Value::Null, Value::Null);

    for row in rows {
        let is_residential = flag(row, "fl_residential");
        let kind = if flag(row, "fl_new_construction") {
            "new_construction"
        } else {
            "renovation"
        };
        let target = if is_residential {
            &mut residential
        } else {
            &mut non_residential
        };
        target.insert(kind.into(), permit_entry(row, is_residential));

        totals[0] += count(row, "buildings").unwrap_or(0.0);
        if is_residential {
            totals[1] += count(row, "dwellings").unwrap_or(0.0);
            totals[2] += count(row, "apartments").unwrap_or(0.0);
            totals[3] += count(row, "houses").unwrap_or(0.0);
        }
        year = row.get("cd_year").cloned().unwrap_or(Value::Null);
        quarter = row.get("cd_quarter").cloned().unwrap_or(Value::Null);
    }

    object(json!({
        "year": year,
        "quarter": quarter,
        "residential": residential,
        "non_residential": non_residential,
        "total": {
            "buildings": totals[0],
            "dwellings": totals[1],
            "apartments": totals[2],
            "houses": totals[3],
        },
    }))
}

#[async_trait]
impl Extractor for BuildingExtractor {
    fn base(&self) -> &ExtractorBase {
        &self.base
    }

    fn topic(&self) -> &'static str {
        "building"
    }

    async fn extract_for(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        combine_topics(vec![
            ("permits_counts", self.permits_counts(municipality_id).await),
            ("permits_surface", self.permits_surface(municipality_id).await),
            ("permits_volume", self.permits_volume(municipality_id).await),
        ])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::testing::{failing_warehouse, seeded_warehouse};
    use anyhow::Result;

    fn extractor() -> BuildingExtractor {
        BuildingExtractor::new(seeded_warehouse(), ExtractorScope::default())
    }

    #[tokio::test]
    async fn test_permit_counts_by_category() -> Result<()> {
        let counts = extractor().permits_counts(92094).await.data().unwrap();
        let current = &counts["current_data"];
        assert_eq!(current["year"], json!(2024));
        assert_eq!(current["quarter"], json!(1));
        assert_eq!(current["residential"]["new_construction"]["dwellings"], json!(120.0));
        assert_eq!(current["residential"]["renovation"]["houses"], json!(10.0));
        assert!(current["non_residential"]["new_construction"]["dwellings"].is_null());
        assert_eq!(current["total"]["buildings"], json!(63.0));
        assert_eq!(current["total"]["dwellings"], json!(130.0));
        assert_eq!(counts["previous_year_data"]["total"]["buildings"], json!(55.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_surface_per_dwelling() -> Result<()> {
        let surface = extractor().permits_surface(92094).await.data().unwrap();
        assert_eq!(surface["current_data"]["avg_surface_per_dwelling_m2"], json!(90.0));
        assert_eq!(surface["previous_year_data"]["avg_surface_per_dwelling_m2"], json!(95.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_volume_per_building() -> Result<()> {
        let volume = extractor().permits_volume(92094).await.data().unwrap();
        assert_eq!(volume["current_data"]["total_volume_m3"], json!(25000.0));
        assert_eq!(volume["current_data"]["avg_volume_per_building_m3"], json!(5000.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_commune_without_permits_is_empty() {
        assert!(extractor().extract_for(62063).await.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let outcome = BuildingExtractor::new(failing_warehouse(), ExtractorScope::default())
            .extract_for(92094)
            .await;
        assert!(outcome.is_failed());
    }
}
