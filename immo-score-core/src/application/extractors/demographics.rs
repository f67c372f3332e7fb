// immo-score-core/src/application/extractors/demographics.rs

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::geography::resolve_hierarchy;
use super::{CURRENT, ExtractorBase, ExtractorScope, Extractor, FIVE_YEAR, PREVIOUS_YEAR, combine_topics, text};
use crate::domain::outcome::ExtractionOutcome;
use crate::domain::period::Granularity;
use crate::domain::settings::DataDomain;
use crate::domain::value::{as_f64, key_string};
use crate::ports::warehouse::{Row, Warehouse};

const POPULATION_BY_AGE_AND_SEX: &str = "
    SELECT ps.id_age,
           age.cd_age_group AS age_group,
           ag.nb_min_age AS min_age,
           ag.nb_max_age AS max_age,
           ps.cd_sex,
           sex.tx_sex_fr AS sex_description,
           SUM(ps.ms_population) AS total_population
    FROM dw.fact_population_structure ps
    JOIN dw.dim_age age ON ps.id_age = age.cd_age AND age.fl_current = TRUE
    JOIN dw.dim_age_group ag ON age.cd_age_group = ag.cd_age_group
    JOIN dw.dim_sex sex ON ps.cd_sex = sex.cd_sex
    WHERE ps.id_geography = ?
      AND ps.id_date = ?
      AND ps.fl_current = TRUE
    GROUP BY ps.id_age, age.cd_age_group, ag.nb_min_age, ag.nb_max_age, ps.cd_sex, sex.tx_sex_fr
    ORDER BY ps.id_age, ps.cd_sex";

const POPULATION_TOTAL: &str = "
    SELECT SUM(ps.ms_population) AS total_population
    FROM dw.fact_population_structure ps
    WHERE ps.id_geography = ?
      AND ps.id_date = ?
      AND ps.fl_current = TRUE";

const POPULATION_BY_NATIONALITY: &str = "
    SELECT ps.cd_nationality,
           nat.tx_nationality_fr AS nationality_description,
           CASE
               WHEN ps.cd_nationality = 'BE' THEN 'BE'
               WHEN nat.fl_eu THEN 'EU'
               ELSE 'OTHER'
           END AS nationality_group,
           SUM(ps.ms_population) AS total_population
    FROM dw.fact_population_structure ps
    JOIN dw.dim_nationality nat ON ps.cd_nationality = nat.cd_nationality
    WHERE ps.id_geography = ?
      AND ps.id_date = ?
      AND ps.fl_current = TRUE
    GROUP BY ps.cd_nationality, nat.tx_nationality_fr, nat.fl_eu
    ORDER BY SUM(ps.ms_population) DESC";

const HOUSEHOLDS: &str = "
    SELECT hc.cd_cohabitation,
           cs.tx_cohabitation_fr AS cohabitation_description,
           hc.cd_age_group,
           hc.cd_sex,
           sex.tx_sex_fr AS sex_description,
           hc.cd_nationality,
           nat.tx_nationality_fr AS nationality_description,
           SUM(hc.ms_count) AS total_count
    FROM dw.fact_household_cohabitation hc
    JOIN dw.dim_cohabitation_status cs ON hc.cd_cohabitation = cs.cd_cohabitation
    JOIN dw.dim_sex sex ON hc.cd_sex = sex.cd_sex
    JOIN dw.dim_nationality nat ON hc.cd_nationality = nat.cd_nationality
    WHERE hc.id_geography = ?
      AND hc.id_date = ?
    GROUP BY hc.cd_cohabitation, cs.tx_cohabitation_fr, hc.cd_age_group, hc.cd_sex,
             sex.tx_sex_fr, hc.cd_nationality, nat.tx_nationality_fr
    ORDER BY hc.cd_cohabitation, hc.cd_age_group, hc.cd_sex";

const HOUSEHOLD_TOTALS: &str = "
    SELECT COUNT(DISTINCT hc.cd_cohabitation) AS total_household_types,
           SUM(hc.ms_count) AS total_individuals
    FROM dw.fact_household_cohabitation hc
    WHERE hc.id_geography = ?
      AND hc.id_date = ?";

const VEHICLES_LATEST_DATE: &str = "
    SELECT hv.id_date, d.cd_year
    FROM dw.fact_household_vehicles hv
    JOIN dw.dim_date d ON hv.id_date = d.id_date
    WHERE hv.id_geography = ?
      AND hv.fl_current = TRUE
    ORDER BY d.cd_year DESC
    LIMIT 1";

const VEHICLES_BY_SECTOR: &str = "
    SELECT hv.id_sector_sk,
           ss.tx_sector_fr AS sector_name,
           hv.ms_households,
           hv.ms_vehicles,
           hv.rt_vehicles_per_household
    FROM dw.fact_household_vehicles hv
    JOIN dw.dim_statistical_sectors ss ON hv.id_sector_sk = ss.id_sector_sk
    WHERE hv.id_geography = ?
      AND hv.id_date = ?
      AND hv.fl_current = TRUE
    ORDER BY ss.tx_sector_fr";

const VEHICLES_TOTALS: &str = "
    SELECT SUM(hv.ms_households) AS total_households,
           SUM(hv.ms_vehicles) AS total_vehicles,
           SUM(hv.ms_vehicles)::DOUBLE / NULLIF(SUM(hv.ms_households), 0) AS avg_vehicles_per_household
    FROM dw.fact_household_vehicles hv
    WHERE hv.id_geography = ?
      AND hv.id_date = ?
      AND hv.fl_current = TRUE";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelledCount {
    pub description: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CohabitationType {
    pub description: String,
    pub total_count: i64,
    pub age_groups: BTreeMap<String, i64>,
    pub sexes: BTreeMap<String, LabelledCount>,
    pub nationalities: BTreeMap<String, LabelledCount>,
}

/// Individuals per cohabitation status, broken down by age group, sex and nationality.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HouseholdComposition {
    pub total_household_types: i64,
    pub total_individuals: i64,
    /// Scaled down from the region rather than measured for the municipality.
    pub is_estimated: bool,
    pub cohabitation_types: BTreeMap<String, CohabitationType>,
}

impl HouseholdComposition {
    fn from_rows(rows: &[Row], totals: &Row) -> Self {
        let mut types: BTreeMap<String, CohabitationType> = BTreeMap::new();
        for row in rows {
            let count = count_of(row, "total_count");
            let entry = types
                .entry(row.get("cd_cohabitation").map(key_string).unwrap_or_default())
                .or_insert_with(|| CohabitationType {
                    description: text(row, "cohabitation_description"),
                    ..CohabitationType::default()
                });
            entry.total_count += count;
            *entry
                .age_groups
                .entry(row.get("cd_age_group").map(key_string).unwrap_or_default())
                .or_default() += count;
            entry
                .sexes
                .entry(row.get("cd_sex").map(key_string).unwrap_or_default())
                .or_insert_with(|| LabelledCount {
                    description: text(row, "sex_description"),
                    count: 0,
                })
                .count += count;
            entry
                .nationalities
                .entry(row.get("cd_nationality").map(key_string).unwrap_or_default())
                .or_insert_with(|| LabelledCount {
                    description: text(row, "nationality_description"),
                    count: 0,
                })
                .count += count;
        }

        Self {
            total_household_types: count_of(totals, "total_household_types"),
            total_individuals: count_of(totals, "total_individuals"),
            is_estimated: false,
            cohabitation_types: types,
        }
    }

    /// Regional proportions applied to a municipality's population; counts are truncated.
    /// `None` when the region has no individuals to scale from.
    pub fn scaled_to(&self, population: i64) -> Option<Self> {
        if self.total_individuals <= 0 {
            return None;
        }
        let regional = i128::from(self.total_individuals);
        let scale = |count: i64| (i128::from(count) * i128::from(population) / regional) as i64;
        let scale_labelled = |m: &BTreeMap<String, LabelledCount>| {
            m.iter()
                .map(|(k, v)| {
                    (
                        k.clone(),
                        LabelledCount {
                            description: v.description.clone(),
                            count: scale(v.count),
                        },
                    )
                })
                .collect()
        };

        let cohabitation_types = self
            .cohabitation_types
            .iter()
            .map(|(code, t)| {
                let scaled = CohabitationType {
                    description: t.description.clone(),
                    total_count: scale(t.total_count),
                    age_groups: t.age_groups.iter().map(|(k, v)| (k.clone(), scale(*v))).collect(),
                    sexes: scale_labelled(&t.sexes),
                    nationalities: scale_labelled(&t.nationalities),
                };
                (code.clone(), scaled)
            })
            .collect();

        Some(Self {
            total_household_types: self.total_household_types,
            total_individuals: population,
            is_estimated: true,
            cohabitation_types,
        })
    }
}

fn count_of(row: &Row, key: &str) -> i64 {
    row.get(key).and_then(as_f64).map(|v| v as i64).unwrap_or(0)
}

/// Population structure, household composition and vehicle ownership.
pub struct DemographicsExtractor {
    base: ExtractorBase,
}

impl DemographicsExtractor {
    pub fn new(warehouse: Arc<dyn Warehouse>, scope: ExtractorScope) -> Self {
        Self {
            base: ExtractorBase::new(warehouse, scope),
        }
    }

    pub fn from_base(base: ExtractorBase) -> Self {
        Self { base }
    }

    fn period(&self) -> &str {
        self.base.period(DataDomain::DemographicData)
    }

    pub async fn population_structure(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.base.log_start("population structure", municipality_id);
        let outcome = self
            .base
            .periodic(
                self.period(),
                Granularity::Year,
                &[CURRENT, PREVIOUS_YEAR, FIVE_YEAR],
                |date_id| self.population_for(municipality_id, date_id),
            )
            .await;
        self.base.log_end("population structure", municipality_id, usize::from(outcome.is_data()));
        outcome
    }

    /// `{total_population, age_groups: {exact age: {.., sexes}}, nationalities}`.
    async fn population_for(&self, municipality_id: i64, date_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        let params = [municipality_id.into(), date_id.into()];

        let rows = match self
            .base
            .fetch("population by age", POPULATION_BY_AGE_AND_SEX, &params)
            .await
            .into_data()
        {
            Ok(rows) => rows,
            Err(other) => return other,
        };

        let total = self
            .base
            .fetch_one("population total", POPULATION_TOTAL, &params)
            .await
            .data()
            .and_then(|row| row.get("total_population").cloned())
            .unwrap_or(Value::from(0));

        let mut ages = Map::new();
        for row in &rows {
            let age = row.get("id_age").map(key_string).unwrap_or_default();
            let entry = ages.entry(age).or_insert_with(|| {
                let mut a = Map::new();
                a.insert("description".into(), Value::String(text(row, "age_group")));
                a.insert("min_age".into(), row.get("min_age").cloned().unwrap_or(Value::Null));
                a.insert("max_age".into(), row.get("max_age").cloned().unwrap_or(Value::Null));
                a.insert("sexes".into(), Value::Object(Map::new()));
                Value::Object(a)
            });
            if let Some(sexes) = entry.get_mut("sexes").and_then(Value::as_object_mut) {
                let mut s = Map::new();
                s.insert("description".into(), Value::String(text(row, "sex_description")));
                s.insert(
                    "population".into(),
                    row.get("total_population").cloned().unwrap_or(Value::Null),
                );
                sexes.insert(row.get("cd_sex").map(key_string).unwrap_or_default(), Value::Object(s));
            }
        }

        let mut nationalities = Map::new();
        let nationality_rows = self
            .base
            .fetch("population by nationality", POPULATION_BY_NATIONALITY, &params)
            .await
            .data()
            .unwrap_or_default();
        for row in &nationality_rows {
            let mut n = Map::new();
            n.insert("description".into(), Value::String(text(row, "nationality_description")));
            n.insert("group".into(), Value::String(text(row, "nationality_group")));
            n.insert(
                "population".into(),
                row.get("total_population").cloned().unwrap_or(Value::Null),
            );
            nationalities.insert(
                row.get("cd_nationality").map(key_string).unwrap_or_default(),
                Value::Object(n),
            );
        }

        let mut bucket = Map::new();
        bucket.insert("total_population".into(), total);
        bucket.insert("age_groups".into(), Value::Object(ages));
        bucket.insert("nationalities".into(), Value::Object(nationalities));
        ExtractionOutcome::Data(bucket)
    }

    async fn household_data(&self, geography_id: i64, date_id: i64) -> ExtractionOutcome<HouseholdComposition> {
        let params = [geography_id.into(), date_id.into()];
        let rows = match self.base.fetch("households", HOUSEHOLDS, &params).await.into_data() {
            Ok(rows) => rows,
            Err(other) => return other,
        };
        let totals = self
            .base
            .fetch_one("household totals", HOUSEHOLD_TOTALS, &params)
            .await
            .data()
            .unwrap_or_default();
        ExtractionOutcome::Data(HouseholdComposition::from_rows(&rows, &totals))
    }

    /// Measured composition when the municipality has one, otherwise the region's
    /// composition scaled to the municipality's population (flagged estimated).
    pub async fn household_composition(&self, municipality_id: i64) -> ExtractionOutcome<HouseholdComposition> {
        self.base.log_start("household composition", municipality_id);

        let date_id = match self.base.date_id(self.period(), Granularity::Year).await.into_data() {
            Ok(id) => id,
            Err(other) => return other,
        };

        match self.household_data(municipality_id, date_id).await {
            ExtractionOutcome::Data(measured) => {
                self.base.log_end("household composition", municipality_id, measured.cohabitation_types.len());
                return ExtractionOutcome::Data(measured);
            }
            ExtractionOutcome::Failed(cause) => return ExtractionOutcome::Failed(cause),
            ExtractionOutcome::Empty => {}
        }

        let population = match self
            .base
            .fetch_one(
                "population total",
                POPULATION_TOTAL,
                &[municipality_id.into(), date_id.into()],
            )
            .await
            .into_data()
        {
            Ok(row) => count_of(&row, "total_population"),
            Err(other) => return other,
        };
        if population == 0 {
            warn!(commune = municipality_id, "No population to scale household composition to");
            return ExtractionOutcome::Empty;
        }

        let region_id = match resolve_hierarchy(&self.base, municipality_id).await.into_data() {
            Ok(h) => match h.region_id {
                Some(id) => id,
                None => {
                    warn!(commune = municipality_id, "No region for household composition");
                    return ExtractionOutcome::Empty;
                }
            },
            Err(other) => return other,
        };

        let regional = match self.household_data(region_id, date_id).await.into_data() {
            Ok(r) => r,
            Err(other) => return other,
        };
        match regional.scaled_to(population) {
            Some(estimate) => {
                info!(commune = municipality_id, region = region_id, "Household composition estimated from region");
                self.base.log_end("household composition", municipality_id, estimate.cohabitation_types.len());
                ExtractionOutcome::Data(estimate)
            }
            None => ExtractionOutcome::Empty,
        }
    }

    /// Vehicles per household for the latest year on record, by statistical sector.
    pub async fn household_vehicles(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.base.log_start("household vehicles", municipality_id);

        let latest = match self
            .base
            .fetch_one("vehicles period", VEHICLES_LATEST_DATE, &[municipality_id.into()])
            .await
            .into_data()
        {
            Ok(row) => row,
            Err(other) => return other,
        };
        let Some(date_id) = latest.get("id_date").and_then(Value::as_i64) else {
            return ExtractionOutcome::Empty;
        };
        let year = latest.get("cd_year").cloned().unwrap_or(Value::Null);
        info!(commune = municipality_id, year = %year, "Using vehicle data");

        let params = [municipality_id.into(), date_id.into()];
        let rows = match self
            .base
            .fetch("vehicles by sector", VEHICLES_BY_SECTOR, &params)
            .await
            .into_data()
        {
            Ok(rows) => rows,
            Err(other) => return other,
        };

        let mut sectors = Map::new();
        for row in &rows {
            let mut s = Map::new();
            s.insert("sector_name".into(), Value::String(text(row, "sector_name")));
            for (to, from) in [
                ("households", "ms_households"),
                ("vehicles", "ms_vehicles"),
                ("vehicles_per_household", "rt_vehicles_per_household"),
            ] {
                s.insert(to.into(), row.get(from).cloned().unwrap_or(Value::Null));
            }
            sectors.insert(row.get("id_sector_sk").map(key_string).unwrap_or_default(), Value::Object(s));
        }

        let totals = self
            .base
            .fetch_one("vehicle totals", VEHICLES_TOTALS, &params)
            .await
            .data()
            .unwrap_or_default();

        let mut record = Map::new();
        record.insert("commune_totals".into(), Value::Object(totals));
        record.insert("sectors".into(), Value::Object(sectors));
        record.insert("year".into(), year);

        self.base.log_end("household vehicles", municipality_id, rows.len());
        ExtractionOutcome::Data(record)
    }
}

#[async_trait]
impl Extractor for DemographicsExtractor {
    fn base(&self) -> &ExtractorBase {
        &self.base
    }

    fn topic(&self) -> &'static str {
        "demographics"
    }

    async fn extract_for(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        let households = self.household_composition(municipality_id).await.and_then(|h| {
            match serde_json::to_value(h) {
                Ok(Value::Object(map)) => ExtractionOutcome::Data(map),
                Ok(_) => ExtractionOutcome::Empty,
                Err(e) => ExtractionOutcome::Failed(e.to_string()),
            }
        });
        combine_topics(vec![
            ("population_structure", self.population_structure(municipality_id).await),
            ("household_composition", households),
            ("household_vehicles", self.household_vehicles(municipality_id).await),
        ])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::testing::{failing_for, seeded_warehouse};
    use anyhow::Result;
    use serde_json::json;

    fn extractor() -> DemographicsExtractor {
        DemographicsExtractor::new(seeded_warehouse(), ExtractorScope::default())
    }

    #[tokio::test]
    async fn test_population_buckets() -> Result<()> {
        let data = extractor().population_structure(92094).await.data().unwrap();
        let current = &data["current_data"];
        assert_eq!(current["total_population"], json!(90000));
        assert_eq!(current["age_groups"]["10"]["sexes"]["M"]["population"], json!(9000));
        assert_eq!(current["age_groups"]["70"]["min_age"], json!(65));
        assert_eq!(current["nationalities"]["FR"]["group"], json!("EU"));
        assert_eq!(current["nationalities"]["MA"]["group"], json!("OTHER"));
        assert_eq!(data["previous_year_data"]["total_population"], json!(89000));
        assert_eq!(data["five_year_data"]["total_population"], json!(87000));
        Ok(())
    }

    #[tokio::test]
    async fn test_households_scaled_from_region() -> Result<()> {
        let h = extractor().household_composition(92094).await.data().unwrap();
        assert!(h.is_estimated);
        assert_eq!(h.total_individuals, 90000);
        assert_eq!(h.total_household_types, 4);
        // 90 000 / 1 600 000 of the regional counts, truncated.
        assert_eq!(h.cohabitation_types["ISO"].total_count, 28125);
        assert_eq!(h.cohabitation_types["ISO"].age_groups["65_79"], 11250);
        assert_eq!(h.cohabitation_types["MONO"].nationalities["FR"].count, 5625);
        assert_eq!(h.cohabitation_types["CSE"].description, "Couple marié sans enfant");
        Ok(())
    }

    #[tokio::test]
    async fn test_measured_households_are_not_estimated() -> Result<()> {
        let h = extractor().household_composition(92142).await.data().unwrap();
        assert!(!h.is_estimated);
        assert_eq!(h.total_individuals, 26000);
        assert_eq!(h.cohabitation_types.len(), 2);
        Ok(())
    }

    #[test]
    fn test_scaling_without_regional_population() {
        let empty = HouseholdComposition::default();
        assert!(empty.scaled_to(1000).is_none());
    }

    #[tokio::test]
    async fn test_vehicles_use_latest_year() -> Result<()> {
        let v = extractor().household_vehicles(92094).await.data().unwrap();
        assert_eq!(v["year"], json!(2022));
        assert_eq!(v["sectors"].as_object().unwrap().len(), 2);
        assert_eq!(v["commune_totals"]["total_households"], json!(45000));
        let avg = v["commune_totals"]["avg_vehicles_per_household"].as_f64().unwrap();
        assert!((avg - 48000.0 / 45000.0).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_sparse_municipality() -> Result<()> {
        let record = extractor().extract_for(62063).await.data().unwrap();
        assert_eq!(record["population_structure"]["previous_year_data"], json!({}));
        assert_eq!(record["household_vehicles"], json!({}));
        // Liège falls back on the Walloon regional composition.
        assert_eq!(record["household_composition"]["is_estimated"], json!(true));
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_for_one_municipality_only() {
        let extractor = DemographicsExtractor::new(failing_for(92094), ExtractorScope::default());
        assert!(extractor.extract_for(92094).await.is_failed());
        assert!(extractor.extract_for(92142).await.is_data());
    }
}
