// immo-score-core/src/application/processors/economics.rs

use serde_json::{Map, Value, json};
use tracing::warn;

use super::{Periodic, ProcessingContext, Processor, empty_section, field};
use crate::domain::error::DomainError;
use crate::domain::value::{as_f64, f64_at_path, num, whole};

/// Level-1 NACE sections reported individually.
const MAIN_SECTORS: [(&str, &str); 16] = [
    ("A", "agriculture"),
    ("C", "manufacturing"),
    ("F", "construction"),
    ("G", "retail"),
    ("H", "transportation"),
    ("I", "hospitality"),
    ("J", "it_communication"),
    ("K", "finance"),
    ("L", "real_estate"),
    ("M", "professional"),
    ("N", "administrative"),
    ("O", "public_admin"),
    ("P", "education"),
    ("Q", "health_social"),
    ("R", "arts_entertainment"),
    ("S", "other_services"),
];

/// Reported age band, accepted warehouse codes, and the multiplier applied to the
/// overall rate when none of the codes is present.
const AGE_BANDS: [(&str, &[&str], f64); 3] = [
    ("under_25", &["under_25", "15-24", "15_24", "AGE_15_24", "YOUNG"], 1.5),
    ("25_to_50", &["25_to_50", "25-49", "25_49", "AGE_25_49", "ADULT"], 0.95),
    ("over_50", &["over_50", "50+", "50_PLUS", "AGE_50_PLUS", "SENIOR"], 0.9),
];

fn employment_index(sector: &str) -> f64 {
    match sector {
        "manufacturing" | "public_admin" | "health_social" => 1.5,
        "agriculture" | "retail" | "professional" => 0.8,
        _ => 1.0,
    }
}

fn size_band(max_employees: Option<f64>) -> usize {
    match max_employees {
        Some(m) if m <= 9.0 => 0,
        Some(m) if m <= 49.0 => 1,
        Some(m) if m <= 249.0 => 2,
        _ => 3,
    }
}

/// Rate of the first accepted code that carries one.
fn age_rate(by_age: Option<&Value>, codes: &[&str]) -> Option<f64> {
    let by_age = by_age?;
    codes
        .iter()
        .find_map(|code| by_age.get(*code).and_then(|entry| entry.get("rate")).and_then(as_f64))
}

fn level_rate(bucket: Option<&Map<String, Value>>, level: &str) -> Option<f64> {
    bucket?.get(level).and_then(|entry| entry.get("overall_rate")).and_then(as_f64)
}

fn pp_difference(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    Some(current? - previous?)
}

/// `economic_indicators`: income tax, unemployment and business activity.
pub struct EconomicsProcessor {
    context: ProcessingContext,
}

impl Processor for EconomicsProcessor {
    fn section(&self) -> &'static str {
        "economic_indicators"
    }

    fn context(&self) -> &ProcessingContext {
        &self.context
    }
}

impl EconomicsProcessor {
    pub fn new(context: ProcessingContext) -> Self {
        Self { context }
    }

    pub fn process_data(&self, raw: &Value) -> Result<Value, DomainError> {
        let tax = self.periodic(self.topic(raw, "tax_income")?)?;
        let unemployment = self.periodic(self.topic(raw, "unemployment")?)?;
        let business = self.periodic(self.topic(raw, "business_activity")?)?;

        Ok(json!({
            "income_tax": tax.map_or_else(empty_section, |t| self.income_tax(t)),
            "business_activity": business.map_or_else(empty_section, |b| self.business_activity(b)),
            "unemployment": unemployment.map_or_else(empty_section, |u| self.unemployment(u)),
        }))
    }

    fn income_tax(&self, data: Periodic<'_>) -> Value {
        let current = data.current();
        let average_income = field(current, "average_net_income");
        let previous = |bucket: Option<&Map<String, Value>>| bucket.and_then(|b| field(b, "average_net_income"));
        let (one_year, one_year_label) = self.change(average_income, previous(data.previous_year()));
        let (five_year, five_year_label) = self.change(average_income, previous(data.five_year()));

        let sources = current.get("income_sources").cloned().unwrap_or(Value::Null);
        let source = |name: &str| f64_at_path(&sources, &format!("{name}.percentage")).unwrap_or(0.0);

        json!({
            "year": current.get("year").cloned().unwrap_or(Value::Null),
            "income_overview": {
                "average_income": num(average_income),
                // Average taxable income stands in for the median, which the warehouse lacks.
                "median_income": num(field(current, "average_taxable_income")),
                "income_per_resident": num(field(current, "average_income_per_resident")),
                "income_trend": {
                    "one_year": one_year_label,
                    "one_year_pct": num(one_year),
                    "five_year": five_year_label,
                    "five_year_pct": num(five_year),
                    "classification": self.classify(five_year).as_str(),
                },
            },
            "tax_burden": {
                "average_tax_rate": field(current, "average_tax_burden_percentage").unwrap_or(0.0),
                "municipal_tax_rate": current
                    .get("tax_types")
                    .and_then(|t| t.get("municipal"))
                    .and_then(|m| m.get("percentage"))
                    .and_then(as_f64)
                    .unwrap_or(0.0),
            },
            "income_sources": {
                "professional_income_pct": source("professional"),
                "real_estate_income_pct": source("real_estate"),
                "investment_income_pct": source("movable_assets"),
                "other_income_pct": source("various"),
            },
        })
    }

    fn unemployment(&self, data: Periodic<'_>) -> Value {
        let current = data.current();
        let Some(overall_rate) = level_rate(Some(current), "commune") else {
            warn!("No commune-level unemployment rate");
            return empty_section();
        };
        let previous = data.previous_year();
        let trend_yoy = pp_difference(Some(overall_rate), level_rate(previous, "commune"));
        let trend_3y = pp_difference(Some(overall_rate), level_rate(data.bucket("three_year_data"), "commune"));

        let by_age = current.get("commune").and_then(|c| c.get("by_age_group"));
        let previous_by_age = previous.and_then(|p| p.get("commune")).and_then(|c| c.get("by_age_group"));

        let mut age_groups = Map::new();
        for (band, codes, multiplier) in AGE_BANDS {
            let entry = match age_rate(by_age, codes) {
                Some(rate) => json!({
                    "rate": rate,
                    "trend": num(pp_difference(Some(rate), age_rate(previous_by_age, codes))),
                    "is_estimated": false,
                }),
                None => json!({
                    "rate": overall_rate * multiplier,
                    "trend": num(trend_yoy),
                    "is_estimated": true,
                }),
            };
            age_groups.insert(band.to_string(), entry);
        }

        let comparison = |level: &str| {
            let rate = level_rate(Some(current), level);
            json!({
                "name": current
                    .get(level)
                    .and_then(|l| l.get("name"))
                    .cloned()
                    .unwrap_or(Value::Null),
                "rate": num(rate),
                "difference_pp": num(pp_difference(Some(overall_rate), rate)),
            })
        };

        json!({
            "year": current.get("commune").and_then(|c| c.get("year")).cloned().unwrap_or(Value::Null),
            "overall_rate": overall_rate,
            "trend_yoy": num(trend_yoy),
            "trend_3y": num(trend_3y),
            "high_unemployment": overall_rate > self.context.thresholds().high_unemployment,
            "by_age_group": age_groups,
            "comparison": {
                "province": comparison("province"),
                "region": comparison("region"),
            },
        })
    }

    fn business_activity(&self, data: Periodic<'_>) -> Value {
        let current = data.current();
        let general = current.get("general").and_then(Value::as_object);
        let general_value = |key: &str| general.and_then(|g| g.get(key)).cloned().unwrap_or(Value::Null);

        let enterprise_overview = json!({
            "year": general_value("year"),
            "total_enterprises": general_value("total_enterprises"),
            "net_creation": general_value("net_creation"),
            "creation_rate": general_value("creation_rate"),
            "closure_rate": general_value("closure_rate"),
        });

        let sectors = current.get("sectors").and_then(Value::as_object);
        let previous_sectors = data
            .previous_year()
            .and_then(|p| p.get("sectors"))
            .and_then(Value::as_object);
        let mut sector_section = Map::new();
        for (code, name) in MAIN_SECTORS {
            let Some(sector) = sectors.and_then(|s| s.get(code)) else {
                continue;
            };
            let enterprises = sector.get("enterprises").and_then(as_f64);
            let previous = previous_sectors
                .and_then(|s| s.get(code))
                .and_then(|s| s.get("enterprises"))
                .and_then(as_f64)
                .filter(|p| *p > 0.0);
            let trend = previous.map(|p| self.change(enterprises, Some(p)).1);
            sector_section.insert(
                name.to_string(),
                json!({
                    "enterprise_count": enterprises.map_or(Value::Null, whole),
                    "share_pct": sector.get("percentage").cloned().unwrap_or(Value::Null),
                    "trend": trend,
                    "employment_index": employment_index(name),
                }),
            );
        }

        let mut bands = [0.0_f64; 4];
        for size in current
            .get("by_size")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|s| s.values())
        {
            let max = size.get("max_employees").and_then(as_f64);
            bands[size_band(max)] += size.get("percentage").and_then(as_f64).unwrap_or(0.0);
        }

        let foreign = current.get("foreign");
        let foreign_count = foreign.and_then(|f| f.get("enterprises")).and_then(as_f64).unwrap_or(0.0);
        let foreign_net = foreign.and_then(|f| f.get("starts")).and_then(as_f64).unwrap_or(0.0)
            - foreign.and_then(|f| f.get("stops")).and_then(as_f64).unwrap_or(0.0);
        let foreign_growth = if foreign_count > 0.0 {
            foreign_net / foreign_count * 100.0
        } else {
            0.0
        };

        json!({
            "enterprise_overview": enterprise_overview,
            "sectors": sector_section,
            "enterprise_size": {
                "micro_enterprises_pct": bands[0],
                "small_enterprises_pct": bands[1],
                "medium_enterprises_pct": bands[2],
                "large_enterprises_pct": bands[3],
            },
            "foreign_investment": {
                "foreign_enterprises_count": foreign_count,
                "foreign_investment_growth": self.context.formatter().format_signed_percentage(Some(foreign_growth)),
            },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::extractors::{EconomicsExtractor, Extractor, ExtractorScope};
    use crate::application::testing::seeded_warehouse;
    use anyhow::Result;

    fn processor() -> EconomicsProcessor {
        EconomicsProcessor::new(ProcessingContext::default())
    }

    async fn namur() -> Result<Value> {
        let raw = EconomicsExtractor::new(seeded_warehouse(), ExtractorScope::default())
            .extract_for(92094)
            .await
            .into_value();
        Ok(processor().process_data(&raw)?)
    }

    fn close(value: &Value, expected: f64) -> bool {
        value.as_f64().is_some_and(|v| (v - expected).abs() < 1e-6)
    }

    #[tokio::test]
    async fn test_income_tax_sections() -> Result<()> {
        let eco = namur().await?;
        let income = &eco["income_tax"];
        assert!(close(&income["income_overview"]["median_income"], 30000.0));
        assert!(close(&income["income_overview"]["average_income"], 1.9e9 / 62000.0));
        assert_eq!(income["income_overview"]["income_trend"]["one_year"], json!("+2,2%"));
        assert!(close(&income["tax_burden"]["municipal_tax_rate"], 30.0 / 435.0 * 100.0));
        assert!(close(&income["income_sources"]["investment_income_pct"], 30.0 / 1900.0 * 100.0));
        assert!(income.get("income_distribution").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unemployment_measured_and_estimated_bands() -> Result<()> {
        let eco = namur().await?;
        let u = &eco["unemployment"];
        assert!(close(&u["overall_rate"], 10.5));
        assert!(close(&u["trend_yoy"], -0.5));
        assert!(close(&u["trend_3y"], -1.5));
        assert_eq!(u["high_unemployment"], json!(false));

        let young = &u["by_age_group"]["under_25"];
        assert!(close(&young["rate"], 22.0));
        assert_eq!(young["is_estimated"], json!(false));
        assert!(young["trend"].is_null());

        let senior = &u["by_age_group"]["over_50"];
        assert!(close(&senior["rate"], 10.5 * 0.9));
        assert_eq!(senior["is_estimated"], json!(true));
        assert!(close(&senior["trend"], -0.5));

        assert!(close(&u["comparison"]["province"]["difference_pp"], 1.0));
        assert_eq!(u["comparison"]["region"]["name"], json!("Région wallonne"));
        Ok(())
    }

    #[tokio::test]
    async fn test_business_activity() -> Result<()> {
        let eco = namur().await?;
        let b = &eco["business_activity"];
        assert_eq!(b["sectors"]["retail"]["enterprise_count"], json!(2000));
        assert_eq!(b["sectors"]["retail"]["employment_index"], json!(0.8));
        assert_eq!(b["sectors"]["manufacturing"]["trend"], json!("-2,4%"));
        assert!(b["sectors"].get("finance").is_none());

        let size = &b["enterprise_size"];
        assert!(close(&size["micro_enterprises_pct"], 80.0));
        assert!(close(&size["small_enterprises_pct"], 16.0));
        assert!(close(&size["medium_enterprises_pct"], 0.0));
        assert!(close(&size["large_enterprises_pct"], 4.0));

        assert_eq!(b["foreign_investment"]["foreign_investment_growth"], json!("+1,0%"));
        Ok(())
    }

    #[test]
    fn test_missing_commune_rate_empties_unemployment() -> Result<()> {
        let raw = json!({"unemployment": {"current_data": {"commune": {}, "region": {"overall_rate": 9.0}}}});
        let eco = processor().process_data(&raw)?;
        assert_eq!(eco["unemployment"], json!({}));
        assert_eq!(eco["income_tax"], json!({}));
        Ok(())
    }

    #[test]
    fn test_empty_input_gives_empty_sections() -> Result<()> {
        for raw in [json!({}), json!({"tax_income": {"current_data": {}}, "business_activity": {}})] {
            let eco = processor().process_data(&raw)?;
            for key in ["income_tax", "business_activity", "unemployment"] {
                assert_eq!(eco[key], json!({}), "{key} should be empty");
            }
        }
        Ok(())
    }

    #[test]
    fn test_alias_age_codes() {
        let by_age = json!({"15_24": {"rate": 20.0}, "50_PLUS": {"rate": null}});
        assert_eq!(age_rate(Some(&by_age), AGE_BANDS[0].1), Some(20.0));
        assert_eq!(age_rate(Some(&by_age), AGE_BANDS[2].1), None);
    }

    #[test]
    fn test_size_bands() {
        assert_eq!(size_band(Some(4.0)), 0);
        assert_eq!(size_band(Some(49.0)), 1);
        assert_eq!(size_band(Some(249.0)), 2);
        assert_eq!(size_band(None), 3);
    }
}
