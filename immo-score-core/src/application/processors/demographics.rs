// immo-score-core/src/application/processors/demographics.rs

use serde_json::{Map, Value, json};
use tracing::debug;

use super::{Periodic, ProcessingContext, Processor, empty_section, field};
use crate::domain::error::DomainError;
use crate::domain::value::{as_f64, num, whole};

/// Reporting age bands over exact ages, bounds inclusive.
const AGE_BANDS: [(&str, u32, u32); 4] = [
    ("under_18", 0, 17),
    ("18_to_35", 18, 35),
    ("36_to_65", 36, 65),
    ("over_65", 66, 120),
];

/// What the demographics raw record feeds: the `demographics` section and
/// `geographical_context.mobility`.
#[derive(Debug, Clone, PartialEq)]
pub struct DemographicSections {
    pub demographics: Value,
    pub mobility: Value,
}

pub struct DemographicsProcessor {
    context: ProcessingContext,
}

impl Processor for DemographicsProcessor {
    fn section(&self) -> &'static str {
        "demographics"
    }

    fn context(&self) -> &ProcessingContext {
        &self.context
    }
}

/// Population per exact age (all sexes), sorted by age. Non-numeric age keys are skipped.
fn age_distribution(bucket: &Map<String, Value>) -> Vec<(u32, f64)> {
    let mut ages: Vec<(u32, f64)> = bucket
        .get("age_groups")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .filter_map(|(age, entry)| {
            let age = age.parse::<u32>().ok()?;
            let population = entry
                .get("sexes")
                .and_then(Value::as_object)
                .into_iter()
                .flat_map(|sexes| sexes.values())
                .filter_map(|sex| sex.get("population").and_then(as_f64))
                .sum();
            Some((age, population))
        })
        .collect();
    ages.sort_by_key(|(age, _)| *age);
    ages
}

fn band_counts(distribution: &[(u32, f64)]) -> [f64; 4] {
    let mut counts = [0.0; 4];
    for (age, population) in distribution {
        if let Some(index) = AGE_BANDS.iter().position(|(_, min, max)| age >= min && age <= max) {
            counts[index] += population;
        }
    }
    counts
}

/// First age at which the cumulative population reaches half the total.
pub fn median_age(distribution: &[(u32, f64)], total_population: f64) -> Option<u32> {
    if total_population <= 0.0 {
        return None;
    }
    let half = total_population / 2.0;
    let mut cumulative = 0.0;
    for (age, population) in distribution {
        cumulative += population;
        if cumulative >= half {
            return Some(*age);
        }
    }
    None
}

/// Lower bound of a household age-group code such as `25_34` or `65_79`.
fn group_min_age(code: &str) -> Option<u32> {
    code.split(['_', '-']).next().and_then(|s| s.parse().ok())
}

fn share(count: f64, total: f64) -> f64 {
    if total > 0.0 { count / total * 100.0 } else { 0.0 }
}

impl DemographicsProcessor {
    pub fn new(context: ProcessingContext) -> Self {
        Self { context }
    }

    pub fn process_data(&self, raw: &Value, area_km2: Option<f64>) -> Result<DemographicSections, DomainError> {
        let population = self.periodic(self.topic(raw, "population_structure")?)?;
        let households = self.topic(raw, "household_composition")?;
        let vehicles = self.topic(raw, "household_vehicles")?;

        let household_count = vehicles
            .and_then(|v| v.get("commune_totals"))
            .and_then(|t| t.get("total_households"))
            .and_then(as_f64);

        let demographics = json!({
            "population_overview": population.map_or_else(empty_section, |p| self.population_overview(p, area_km2)),
            "age_structure": population.map_or_else(empty_section, |p| self.age_structure(p)),
            "household_composition": households.map_or_else(empty_section, |h| self.household_composition(h, household_count)),
            "cultural_diversity": population.map_or_else(empty_section, |p| self.cultural_diversity(p)),
        });
        let mobility = vehicles.map_or_else(empty_section, |v| self.mobility(v));

        Ok(DemographicSections { demographics, mobility })
    }

    fn population_overview(&self, data: Periodic<'_>, area_km2: Option<f64>) -> Value {
        let total = field(data.current(), "total_population").unwrap_or(0.0);
        let density = area_km2.filter(|a| *a > 0.0).map(|a| total / a);

        let (one_year, _) = self.change(Some(total), data.previous_year().and_then(|b| field(b, "total_population")));
        let (five_year, _) = self.change(Some(total), data.five_year().and_then(|b| field(b, "total_population")));
        // Linear projection: average yearly growth over the last five years.
        let forecast = five_year.map(|g| g / 5.0);

        json!({
            "total_population": whole(total),
            "population_density": num(density),
            "population_trend": {
                "one_year_growth": num(one_year),
                "five_year_growth": num(five_year),
                "forecast_growth": num(forecast),
            },
        })
    }

    fn age_structure(&self, data: Periodic<'_>) -> Value {
        let current = age_distribution(data.current());
        let total = field(data.current(), "total_population").unwrap_or(0.0);
        let divisor = if total > 0.0 { total } else { 1.0 };
        let counts = band_counts(&current);

        let previous = data.previous_year().map(|bucket| {
            let total = field(bucket, "total_population").unwrap_or(0.0);
            (band_counts(&age_distribution(bucket)), total)
        });

        let mut age_groups = Map::new();
        for (index, (band, _, _)) in AGE_BANDS.iter().enumerate() {
            let percentage = counts[index] / divisor * 100.0;
            let (trend, trend_pct) = match previous {
                None => (Value::Null, Value::Null),
                Some((prev_counts, prev_total)) if prev_counts[index] > 0.0 && prev_total > 0.0 => {
                    let prev_percentage = prev_counts[index] / prev_total * 100.0;
                    let (change, mut label) = self.change(Some(percentage), Some(prev_percentage));
                    // Keep very small moves visible at one decimal.
                    if let Some(c) = change.filter(|c| *c != 0.0 && c.abs() < 0.1) {
                        label = self.context.formatter().format_signed_percentage(Some(0.1_f64.copysign(c)));
                    }
                    (Value::String(label), num(change))
                }
                Some(_) => (json!("N/A"), Value::Null),
            };
            age_groups.insert(
                (*band).to_string(),
                json!({
                    "count": whole(counts[index]),
                    "percentage": percentage,
                    "trend": trend,
                    "trend_pct": trend_pct,
                }),
            );
        }

        let dependent = counts[0] + counts[3];
        let working_age = counts[1] + counts[2];
        let dependency_ratio = (working_age > 0.0).then(|| dependent / working_age);

        json!({
            "median_age": median_age(&current, total),
            "age_groups": age_groups,
            "dependency_ratio": num(dependency_ratio),
        })
    }

    fn household_composition(&self, data: &Map<String, Value>, household_count: Option<f64>) -> Value {
        let individuals = field(data, "total_individuals").unwrap_or(0.0);
        let mut single_person = [0.0_f64; 4]; // total, under_35, 35_to_65, over_65
        let mut couples_without_children = 0.0;
        let mut couples_with_children = 0.0;
        let mut single_parent = 0.0;

        for (code, cohabitation) in data
            .get("cohabitation_types")
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
        {
            let count = cohabitation.get("total_count").and_then(as_f64).unwrap_or(0.0);
            let description = cohabitation
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase();

            if description.contains("isolé") || description.contains("single person") {
                single_person[0] += count;
                for (group, group_count) in cohabitation
                    .get("age_groups")
                    .and_then(Value::as_object)
                    .into_iter()
                    .flatten()
                {
                    let group_count = as_f64(group_count).unwrap_or(0.0);
                    let slot = match group_min_age(group) {
                        Some(min) if min < 35 => 1,
                        Some(min) if min < 65 => 2,
                        Some(_) => 3,
                        None => continue,
                    };
                    single_person[slot] += group_count;
                }
            } else if description.contains("couple") && (description.contains("sans enfant") || description.contains("without children")) {
                couples_without_children += count;
            } else if description.contains("couple") && (description.contains("avec enfant") || description.contains("with children")) {
                couples_with_children += count;
            } else if description.contains("monoparental") || description.contains("single parent") {
                single_parent += count;
            } else {
                debug!(code = code.as_str(), description = description.as_str(), "Unmapped cohabitation type");
            }
        }

        let total = single_person[0] + couples_without_children + couples_with_children + single_parent;
        let entry = |count: f64| json!({"count": whole(count), "percentage": share(count, total)});
        let age_entry = |count: f64| json!({"count": whole(count), "percentage": share(count, single_person[0])});

        let average_household_size = household_count.filter(|h| *h > 0.0).map(|h| individuals / h);

        json!({
            "total_households": household_count.map_or(Value::Null, whole),
            "total_individuals": whole(individuals),
            "average_household_size": num(average_household_size),
            "is_estimated": data.get("is_estimated").and_then(Value::as_bool).unwrap_or(false),
            "household_types": {
                "single_person": {
                    "count": whole(single_person[0]),
                    "percentage": share(single_person[0], total),
                    "breakdown_by_age": {
                        "under_35": age_entry(single_person[1]),
                        "35_to_65": age_entry(single_person[2]),
                        "over_65": age_entry(single_person[3]),
                    },
                },
                "couples_without_children": entry(couples_without_children),
                "couples_with_children": entry(couples_with_children),
                "single_parent": entry(single_parent),
            },
        })
    }

    fn cultural_diversity(&self, data: Periodic<'_>) -> Value {
        let total = field(data.current(), "total_population").unwrap_or(0.0);
        let mut groups = [0.0_f64; 3]; // belgian, eu_non_belgian, non_eu

        for (code, nationality) in data
            .current()
            .get("nationalities")
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
        {
            let count = nationality.get("population").and_then(as_f64).unwrap_or(0.0);
            let group = nationality.get("group").and_then(Value::as_str).unwrap_or("OTHER");
            let slot = if code == "BE" {
                0
            } else if group == "EU" {
                1
            } else {
                2
            };
            groups[slot] += count;
        }

        let entry = |count: f64| json!({"count": whole(count), "percentage": share(count, total)});
        json!({
            "nationality_groups": {
                "belgian": entry(groups[0]),
                "eu_non_belgian": entry(groups[1]),
                "non_eu": entry(groups[2]),
            },
        })
    }

    fn mobility(&self, data: &Map<String, Value>) -> Value {
        let totals = data.get("commune_totals").and_then(Value::as_object);
        let households = totals
            .and_then(|t| field(t, "total_households"))
            .filter(|h| *h > 0.0)
            .unwrap_or(1.0);
        let average = totals
            .and_then(|t| field(t, "avg_vehicles_per_household"))
            .unwrap_or(0.0);

        // Rough split from the average alone; the warehouse has no per-household counts.
        let (without_vehicle, with_multiple) = if average > 0.0 {
            let without = households * (1.0 - average.min(1.0));
            let multiple = if average > 1.0 {
                households * ((average - 1.0) / average)
            } else {
                households * 0.1
            };
            (without, multiple)
        } else {
            (0.0, 0.0)
        };

        let mut sectors: Vec<(f64, Value)> = data
            .get("sectors")
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
            .map(|(sector_id, sector)| {
                let ratio = sector.get("vehicles_per_household").and_then(as_f64).unwrap_or(0.0);
                let comparison = (average > 0.0).then(|| (ratio - average) / average * 100.0);
                let name = sector
                    .get("sector_name")
                    .and_then(Value::as_str)
                    .filter(|n| !n.is_empty())
                    .map_or_else(|| format!("Sector-{sector_id}"), str::to_string);
                (
                    comparison.unwrap_or(0.0),
                    json!({
                        "sector_id": sector_id,
                        "sector_name": name,
                        "vehicles_per_household": ratio,
                        "comparison_to_average": num(comparison),
                    }),
                )
            })
            .collect();
        sectors.sort_by(|a, b| b.0.total_cmp(&a.0));

        json!({
            "year": data.get("year").cloned().unwrap_or(Value::Null),
            "vehicle_ownership": {
                "average_vehicles_per_household": average,
                "households_with_no_vehicle_pct": without_vehicle / households * 100.0,
                "households_with_multiple_vehicles_pct": with_multiple / households * 100.0,
            },
            "vehicle_distribution": {
                "by_sector": sectors.into_iter().map(|(_, s)| s).collect::<Vec<_>>(),
            },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::extractors::{DemographicsExtractor, Extractor, ExtractorScope};
    use crate::application::testing::seeded_warehouse;
    use anyhow::Result;

    fn processor() -> DemographicsProcessor {
        DemographicsProcessor::new(ProcessingContext::default())
    }

    async fn raw(id: i64) -> Value {
        DemographicsExtractor::new(seeded_warehouse(), ExtractorScope::default())
            .extract_for(id)
            .await
            .into_value()
    }

    fn close(value: &Value, expected: f64) -> bool {
        value.as_f64().is_some_and(|v| (v - expected).abs() < 1e-6)
    }

    #[tokio::test]
    async fn test_overview_and_density() -> Result<()> {
        let sections = processor().process_data(&raw(92094).await, Some(175.0))?;
        let overview = &sections.demographics["population_overview"];
        assert_eq!(overview["total_population"], json!(90000));
        assert!(close(&overview["population_density"], 90000.0 / 175.0));
        assert!(close(&overview["population_trend"]["five_year_growth"], 3000.0 / 87000.0 * 100.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_age_bands_median_and_dependency() -> Result<()> {
        let sections = processor().process_data(&raw(92094).await, None)?;
        let ages = &sections.demographics["age_structure"];
        assert_eq!(ages["median_age"], json!(40));
        assert_eq!(ages["age_groups"]["under_18"]["count"], json!(18000));
        assert_eq!(ages["age_groups"]["36_to_65"]["count"], json!(35000));
        assert!(close(&ages["dependency_ratio"], 0.8));
        // 20.00% now against 20.22% a year earlier.
        assert_eq!(ages["age_groups"]["under_18"]["trend"], json!("-1,1%"));
        assert!(ages["age_groups"]["under_18"]["trend_pct"].as_f64().unwrap() < -1.0);
        Ok(())
    }

    #[test]
    fn test_median_age_cumulative_rule() {
        let raw = json!({"population_structure": {"current_data": {
            "total_population": 150,
            "age_groups": {
                "30": {"sexes": {"M": {"population": 100}}},
                "70": {"sexes": {"F": {"population": 50}}}
            }
        }}});
        let sections = processor().process_data(&raw, None).unwrap();
        let ages = &sections.demographics["age_structure"];
        assert_eq!(ages["median_age"], json!(30));
        assert_eq!(ages["age_groups"]["36_to_65"]["count"], json!(0));
        assert!(ages["age_groups"]["36_to_65"]["trend"].is_null());
    }

    #[tokio::test]
    async fn test_estimated_households_and_diversity() -> Result<()> {
        let sections = processor().process_data(&raw(92094).await, None)?;
        let households = &sections.demographics["household_composition"];
        assert_eq!(households["is_estimated"], json!(true));
        assert!(close(&households["average_household_size"], 2.0));
        let single = &households["household_types"]["single_person"];
        assert_eq!(single["count"], json!(28125));
        assert_eq!(single["breakdown_by_age"]["over_65"]["count"], json!(11250));
        assert_eq!(households["household_types"]["single_parent"]["count"], json!(5625));

        let groups = &sections.demographics["cultural_diversity"]["nationality_groups"];
        assert_eq!(groups["belgian"]["count"], json!(82000));
        assert_eq!(groups["eu_non_belgian"]["count"], json!(3000));
        assert_eq!(groups["non_eu"]["count"], json!(5000));
        Ok(())
    }

    #[tokio::test]
    async fn test_mobility_sorted_by_comparison() -> Result<()> {
        let sections = processor().process_data(&raw(92094).await, None)?;
        let mobility = &sections.mobility;
        assert_eq!(mobility["year"], json!(2022));
        let sectors = mobility["vehicle_distribution"]["by_sector"].as_array().unwrap();
        assert_eq!(sectors[0]["sector_name"], json!("Salzinnes"));
        assert!(sectors[0]["comparison_to_average"].as_f64().unwrap() > 0.0);
        assert!(close(&mobility["vehicle_ownership"]["households_with_no_vehicle_pct"], 0.0));
        Ok(())
    }

    #[test]
    fn test_empty_record() -> Result<()> {
        let sections = processor().process_data(&json!({}), Some(10.0))?;
        for key in ["population_overview", "age_structure", "household_composition", "cultural_diversity"] {
            assert_eq!(sections.demographics[key], json!({}));
        }
        assert_eq!(sections.mobility, json!({}));
        Ok(())
    }

    #[test]
    fn test_household_group_codes() {
        assert_eq!(group_min_age("25_34"), Some(25));
        assert_eq!(group_min_age("65-79"), Some(65));
        assert_eq!(group_min_age("TOTAL"), None);
    }
}
