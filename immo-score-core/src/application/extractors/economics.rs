// immo-score-core/src/application/extractors/economics.rs

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use super::geography::{AdminHierarchy, resolve_hierarchy};
use super::{
    CURRENT, ExtractorBase, ExtractorScope, Extractor, FIVE_YEAR, PREVIOUS_YEAR, THREE_YEAR, combine_topics,
    text,
};
use crate::domain::outcome::ExtractionOutcome;
use crate::domain::period::Granularity;
use crate::domain::settings::DataDomain;
use crate::domain::value::{as_f64, key_string, num};
use crate::ports::warehouse::{Row, SqlParam, Warehouse};

const TAX_INCOME: &str = "
    SELECT ti.ms_nbr_non_zero_inc,
           ti.ms_nbr_zero_inc,
           ti.ms_tot_net_taxable_inc,
           ti.ms_tot_net_inc,
           ti.ms_nbr_tot_net_inc,
           ti.ms_real_estate_net_inc,
           ti.ms_nbr_real_estate_net_inc,
           ti.ms_tot_net_mov_ass_inc,
           ti.ms_nbr_net_mov_ass_inc,
           ti.ms_tot_net_various_inc,
           ti.ms_nbr_net_various_inc,
           ti.ms_tot_net_prof_inc,
           ti.ms_nbr_net_prof_inc,
           ti.ms_tot_state_taxes,
           ti.ms_nbr_state_taxes,
           ti.ms_tot_municip_taxes,
           ti.ms_nbr_municip_taxes,
           ti.ms_tot_suburbs_taxes,
           ti.ms_nbr_suburbs_taxes,
           ti.ms_tot_taxes,
           ti.ms_nbr_tot_taxes,
           ti.ms_tot_residents,
           d.cd_year
    FROM dw.fact_tax_income ti
    JOIN dw.dim_date d ON ti.id_date = d.id_date
    WHERE ti.id_geography = ?
      AND ti.id_date = ?
      AND ti.fl_current = TRUE";

// NORMAL unemployment first, then long-term, then anything else.
const UNEMPLOYMENT_OVERALL: &str = "
    SELECT u.ms_unemployment_rate, d.cd_year, u.cd_unemp_type
    FROM dw.fact_unemployment u
    JOIN dw.dim_date d ON u.id_date = d.id_date
    WHERE u.id_geography = ?
      AND u.id_date = ?
      AND u.fl_total_sex = TRUE
      AND u.fl_total_age = TRUE
      AND u.fl_total_education = TRUE
      AND u.fl_valid = TRUE
    ORDER BY CASE WHEN u.cd_unemp_type = 'NORMAL' THEN 1
                  WHEN u.cd_unemp_type = 'LONG_TERM' THEN 2
                  ELSE 3 END
    LIMIT 1";

const UNEMPLOYMENT_BY_AGE: &str = "
    SELECT u.cd_age_group,
           ag.tx_age_group_fr AS age_group_description,
           ag.nb_min_age,
           u.ms_unemployment_rate
    FROM dw.fact_unemployment u
    JOIN dw.dim_age_group ag ON u.cd_age_group = ag.cd_age_group
    WHERE u.id_geography = ?
      AND u.id_date = ?
      AND u.fl_total_sex = TRUE
      AND u.fl_total_education = TRUE
      AND u.fl_valid = TRUE
      AND u.cd_unemp_type = ?
      AND u.fl_total_age = FALSE
    ORDER BY ag.nb_min_age";

const BUSINESS_TOTALS: &str = "
    SELECT SUM(nace.ms_num_entreprises) AS total_enterprises,
           SUM(nace.ms_num_starts) AS total_starts,
           SUM(nace.ms_num_stops) AS total_stops,
           SUM(nace.ms_net_creation) AS total_net_creation,
           COUNT(DISTINCT nace.cd_economic_activity) AS unique_nace_codes,
           d.cd_year
    FROM dw.fact_vat_nace_employment nace
    JOIN dw.dim_date d ON nace.id_date = d.id_date
    WHERE nace.id_geography = ?
      AND nace.id_date = ?
      AND nace.cd_nace_level = 1
    GROUP BY d.cd_year";

const BUSINESS_SECTORS: &str = "
    SELECT nace.cd_economic_activity,
           ea.tx_economic_activity_fr AS activity_description,
           SUM(nace.ms_num_entreprises) AS sector_enterprises,
           SUM(nace.ms_num_starts) AS sector_starts,
           SUM(nace.ms_num_stops) AS sector_stops,
           SUM(nace.ms_net_creation) AS sector_net_creation,
           nace.cd_year
    FROM dw.fact_vat_nace_employment nace
    JOIN dw.dim_economic_activity ea ON nace.cd_economic_activity = ea.cd_economic_activity
    WHERE nace.id_geography = ?
      AND nace.id_date = ?
      AND nace.cd_nace_level = 1
    GROUP BY nace.cd_economic_activity, ea.tx_economic_activity_fr, nace.cd_year
    ORDER BY SUM(nace.ms_num_entreprises) DESC";

const BUSINESS_SIZES: &str = "
    SELECT nace.cd_size_class,
           es.tx_size_class_fr AS size_description,
           SUM(nace.ms_num_entreprises) AS size_enterprises,
           es.nb_min_employees,
           es.nb_max_employees
    FROM dw.fact_vat_nace_employment nace
    JOIN dw.dim_entreprise_size_employees es ON nace.cd_size_class = es.cd_size_class
    WHERE nace.id_geography = ?
      AND nace.id_date = ?
      AND nace.cd_nace_level = 1
    GROUP BY nace.cd_size_class, es.tx_size_class_fr, es.nb_min_employees, es.nb_max_employees
    ORDER BY es.nb_min_employees";

const BUSINESS_FOREIGN: &str = "
    SELECT SUM(nace.ms_num_entreprises) AS foreign_enterprises,
           SUM(nace.ms_num_starts) AS foreign_starts,
           SUM(nace.ms_num_stops) AS foreign_stops
    FROM dw.fact_vat_nace_employment nace
    WHERE nace.id_geography = ?
      AND nace.id_date = ?
      AND nace.cd_nace_level = 1
      AND nace.fl_foreign = TRUE";

fn measure(row: &Row, key: &str) -> Option<f64> {
    row.get(key).and_then(as_f64)
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> f64 {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => n / d,
        _ => 0.0,
    }
}

/// Amount, share of `total` and declaration count for one income or tax line.
/// Lines with a zero or missing amount are left out.
fn share_line(row: &Row, amount_key: &str, count_key: &str, total: f64) -> Option<Value> {
    let amount = measure(row, amount_key).filter(|a| *a != 0.0)?;
    Some(json!({
        "amount": amount,
        "percentage": amount / total * 100.0,
        "declarations_count": row.get(count_key).cloned().unwrap_or(Value::Null),
    }))
}

/// Derived tax-income record for one fiscal year.
fn tax_record(row: &Row) -> Map<String, Value> {
    let net = measure(row, "ms_tot_net_inc");
    let taxable = measure(row, "ms_tot_net_taxable_inc");
    let taxes = measure(row, "ms_tot_taxes");

    let total_income = net.filter(|v| *v != 0.0).unwrap_or(1.0);
    let mut income_sources = Map::new();
    for (name, amount, count) in [
        ("professional", "ms_tot_net_prof_inc", "ms_nbr_net_prof_inc"),
        ("real_estate", "ms_real_estate_net_inc", "ms_nbr_real_estate_net_inc"),
        ("movable_assets", "ms_tot_net_mov_ass_inc", "ms_nbr_net_mov_ass_inc"),
        ("various", "ms_tot_net_various_inc", "ms_nbr_net_various_inc"),
    ] {
        if let Some(line) = share_line(row, amount, count, total_income) {
            income_sources.insert(name.into(), line);
        }
    }

    let total_taxes = taxes.filter(|v| *v != 0.0).unwrap_or(1.0);
    let mut tax_types = Map::new();
    for (name, amount, count) in [
        ("state", "ms_tot_state_taxes", "ms_nbr_state_taxes"),
        ("municipal", "ms_tot_municip_taxes", "ms_nbr_municip_taxes"),
        ("suburbs", "ms_tot_suburbs_taxes", "ms_nbr_suburbs_taxes"),
    ] {
        if let Some(line) = share_line(row, amount, count, total_taxes) {
            tax_types.insert(name.into(), line);
        }
    }

    let field = |key: &str| row.get(key).cloned().unwrap_or(Value::Null);
    let record = json!({
        "year": field("cd_year"),
        "total_declarations": field("ms_nbr_tot_taxes"),
        "declarations_with_income": field("ms_nbr_non_zero_inc"),
        "declarations_without_income": field("ms_nbr_zero_inc"),
        "total_population": field("ms_tot_residents"),
        "total_net_income": num(net),
        "total_taxable_income": num(taxable),
        "total_taxes": num(taxes),
        "average_net_income": ratio(net, measure(row, "ms_nbr_tot_net_inc")),
        "average_taxable_income": ratio(taxable, measure(row, "ms_nbr_non_zero_inc")),
        "average_income_per_resident": ratio(net, measure(row, "ms_tot_residents")),
        "average_tax_burden_percentage": ratio(taxes, taxable) * 100.0,
        "income_sources": income_sources,
        "tax_types": tax_types,
    });
    match record {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Tax income, unemployment (commune, province, region) and enterprise activity.
pub struct EconomicsExtractor {
    base: ExtractorBase,
}

impl EconomicsExtractor {
    pub fn new(warehouse: Arc<dyn Warehouse>, scope: ExtractorScope) -> Self {
        Self {
            base: ExtractorBase::new(warehouse, scope),
        }
    }

    pub fn from_base(base: ExtractorBase) -> Self {
        Self { base }
    }

    pub async fn tax_income(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.base.log_start("tax income", municipality_id);
        let outcome = self
            .base
            .periodic(
                self.base.period(DataDomain::TaxData),
                Granularity::Year,
                &[CURRENT, PREVIOUS_YEAR, FIVE_YEAR],
                |date_id| async move {
                    self.base
                        .fetch_one("tax income", TAX_INCOME, &[municipality_id.into(), date_id.into()])
                        .await
                        .map(|row| tax_record(&row))
                },
            )
            .await;
        self.base.log_end("tax income", municipality_id, usize::from(outcome.is_data()));
        outcome
    }

    pub async fn unemployment(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.base.log_start("unemployment", municipality_id);

        let hierarchy = match resolve_hierarchy(&self.base, municipality_id).await.into_data() {
            Ok(h) => h,
            Err(other) => return other,
        };

        let outcome = self
            .base
            .periodic(
                self.base.period(DataDomain::EconomicData),
                Granularity::Year,
                &[CURRENT, PREVIOUS_YEAR, THREE_YEAR],
                |date_id| self.unemployment_levels(&hierarchy, date_id),
            )
            .await;

        let outcome = outcome.map(|mut record| {
            record.insert(
                "hierarchy".into(),
                json!({
                    "commune_id": hierarchy.commune_id,
                    "commune_name": hierarchy.commune_name,
                    "province_id": hierarchy.province_id,
                    "province_name": hierarchy.province_name,
                    "region_id": hierarchy.region_id,
                    "region_name": hierarchy.region_name,
                }),
            );
            record
        });
        self.base.log_end("unemployment", municipality_id, usize::from(outcome.is_data()));
        outcome
    }

    /// `{commune, province, region}` for one year; empty when no level has a rate.
    async fn unemployment_levels(&self, hierarchy: &AdminHierarchy, date_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        let levels = [
            ("commune", Some(hierarchy.commune_id), Some(hierarchy.commune_name.clone())),
            ("province", hierarchy.province_id, hierarchy.province_name.clone()),
            ("region", hierarchy.region_id, hierarchy.region_name.clone()),
        ];

        let mut bucket = Map::new();
        let mut failures = Vec::new();
        for (level, entity, name) in levels {
            let entry = match entity {
                Some(id) => match self.unemployment_entry(id, date_id).await {
                    ExtractionOutcome::Data(mut entry) => {
                        entry.insert("name".into(), json!(name.unwrap_or_else(|| "Inconnue".into())));
                        entry
                    }
                    ExtractionOutcome::Failed(cause) => {
                        failures.push(cause);
                        Map::new()
                    }
                    ExtractionOutcome::Empty => Map::new(),
                },
                None => Map::new(),
            };
            bucket.insert(level.into(), Value::Object(entry));
        }

        let any_rate = bucket.values().any(|v| v.as_object().is_some_and(|m| !m.is_empty()));
        if any_rate {
            ExtractionOutcome::Data(bucket)
        } else if !failures.is_empty() {
            ExtractionOutcome::Failed(failures.join("; "))
        } else {
            ExtractionOutcome::Empty
        }
    }

    async fn unemployment_entry(&self, entity_id: i64, date_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        let row = match self
            .base
            .fetch_one(
                "unemployment rate",
                UNEMPLOYMENT_OVERALL,
                &[entity_id.into(), date_id.into()],
            )
            .await
            .into_data()
        {
            Ok(row) => row,
            Err(other) => return other,
        };

        let unemployment_type = text(&row, "cd_unemp_type");
        let overall_rate = measure(&row, "ms_unemployment_rate").unwrap_or(0.0) * 100.0;

        let mut by_age_group = json!({
            "under_25": {"rate": null, "trend": null},
            "25_to_50": {"rate": null, "trend": null},
            "over_50": {"rate": null, "trend": null},
        });
        let age_rows = self
            .base
            .fetch(
                "unemployment by age",
                UNEMPLOYMENT_BY_AGE,
                &[
                    entity_id.into(),
                    date_id.into(),
                    SqlParam::from(unemployment_type.as_str()),
                ],
            )
            .await
            .data()
            .unwrap_or_default();
        for age_row in &age_rows {
            let Some(min_age) = measure(age_row, "nb_min_age") else {
                continue;
            };
            let band = if min_age < 25.0 {
                "under_25"
            } else if min_age < 50.0 {
                "25_to_50"
            } else {
                "over_50"
            };
            let rate = measure(age_row, "ms_unemployment_rate").map(|r| r * 100.0);
            by_age_group[band]["rate"] = num(rate);
        }

        let mut entry = Map::new();
        entry.insert("year".into(), row.get("cd_year").cloned().unwrap_or(Value::Null));
        entry.insert("overall_rate".into(), json!(overall_rate));
        entry.insert("unemployment_type".into(), json!(unemployment_type));
        entry.insert("by_age_group".into(), by_age_group);
        ExtractionOutcome::Data(entry)
    }

    pub async fn business_activity(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        self.base.log_start("business activity", municipality_id);
        let outcome = self
            .base
            .periodic(
                self.base.period(DataDomain::EconomicData),
                Granularity::Year,
                &[CURRENT, PREVIOUS_YEAR],
                |date_id| self.business_for(municipality_id, date_id),
            )
            .await;
        self.base.log_end("business activity", municipality_id, usize::from(outcome.is_data()));
        outcome
    }

    /// `{general, sectors, by_size, foreign}` over NACE level-1 rows.
    async fn business_for(&self, municipality_id: i64, date_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        let params = [municipality_id.into(), date_id.into()];

        let totals = match self
            .base
            .fetch_one("enterprise totals", BUSINESS_TOTALS, &params)
            .await
            .into_data()
        {
            Ok(row) => row,
            Err(other) => return other,
        };
        let enterprises = measure(&totals, "total_enterprises");
        let share_base = enterprises.filter(|v| *v != 0.0).unwrap_or(1.0);

        let general = json!({
            "year": totals.get("cd_year").cloned().unwrap_or(Value::Null),
            "total_enterprises": num(enterprises),
            "total_starts": totals.get("total_starts").cloned().unwrap_or(Value::Null),
            "total_stops": totals.get("total_stops").cloned().unwrap_or(Value::Null),
            "net_creation": totals.get("total_net_creation").cloned().unwrap_or(Value::Null),
            "creation_rate": ratio(measure(&totals, "total_starts"), enterprises) * 100.0,
            "closure_rate": ratio(measure(&totals, "total_stops"), enterprises) * 100.0,
        });

        let mut sectors = Map::new();
        for row in self
            .base
            .fetch("enterprise sectors", BUSINESS_SECTORS, &params)
            .await
            .data()
            .unwrap_or_default()
        {
            let count = measure(&row, "sector_enterprises").unwrap_or(0.0);
            sectors.insert(
                row.get("cd_economic_activity").map(key_string).unwrap_or_default(),
                json!({
                    "description": text(&row, "activity_description"),
                    "enterprises": count,
                    "percentage": count / share_base * 100.0,
                    "starts": row.get("sector_starts").cloned().unwrap_or(Value::Null),
                    "stops": row.get("sector_stops").cloned().unwrap_or(Value::Null),
                    "net_creation": row.get("sector_net_creation").cloned().unwrap_or(Value::Null),
                    "year": row.get("cd_year").cloned().unwrap_or(Value::Null),
                }),
            );
        }

        let mut by_size = Map::new();
        for row in self
            .base
            .fetch("enterprise sizes", BUSINESS_SIZES, &params)
            .await
            .data()
            .unwrap_or_default()
        {
            let count = measure(&row, "size_enterprises").unwrap_or(0.0);
            by_size.insert(
                row.get("cd_size_class").map(key_string).unwrap_or_default(),
                json!({
                    "description": text(&row, "size_description"),
                    "min_employees": row.get("nb_min_employees").cloned().unwrap_or(Value::Null),
                    "max_employees": row.get("nb_max_employees").cloned().unwrap_or(Value::Null),
                    "enterprises": count,
                    "percentage": count / share_base * 100.0,
                }),
            );
        }

        let foreign = match self
            .base
            .fetch_one("foreign enterprises", BUSINESS_FOREIGN, &params)
            .await
            .data()
        {
            Some(row) => {
                let count = measure(&row, "foreign_enterprises");
                json!({
                    "enterprises": num(count),
                    "percentage": count.map(|c| c / share_base * 100.0).unwrap_or(0.0),
                    "starts": row.get("foreign_starts").cloned().unwrap_or(Value::Null),
                    "stops": row.get("foreign_stops").cloned().unwrap_or(Value::Null),
                })
            }
            None => json!({}),
        };

        let mut record = Map::new();
        record.insert("general".into(), general);
        record.insert("sectors".into(), Value::Object(sectors));
        record.insert("by_size".into(), Value::Object(by_size));
        record.insert("foreign".into(), foreign);
        ExtractionOutcome::Data(record)
    }
}

#[async_trait]
impl Extractor for EconomicsExtractor {
    fn base(&self) -> &ExtractorBase {
        &self.base
    }

    fn topic(&self) -> &'static str {
        "economics"
    }

    async fn extract_for(&self, municipality_id: i64) -> ExtractionOutcome<Map<String, Value>> {
        combine_topics(vec![
            ("tax_income", self.tax_income(municipality_id).await),
            ("unemployment", self.unemployment(municipality_id).await),
            ("business_activity", self.business_activity(municipality_id).await),
        ])
    }
}
