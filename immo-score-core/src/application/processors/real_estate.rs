// immo-score-core/src/application/processors/real_estate.rs

use serde_json::{Map, Value, json};
use tracing::warn;

use super::{Periodic, ProcessingContext, Processor, empty_section, field, sum_field};
use crate::domain::error::DomainError;
use crate::domain::format::calculate_avg;
use crate::domain::value::{as_f64, num, whole};

/// Transaction building types reported by property type.
const PROPERTY_TYPES: [(&str, &str); 7] = [
    ("200", "houses"),
    ("537", "apartments"),
    ("534", "studios"),
    ("533", "rooms"),
    ("240", "farms"),
    ("407", "commercial_houses"),
    ("OTHER", "other_residential"),
];

/// Building-stock categories keyed by building type code.
fn stock_category(code: &str) -> &'static str {
    match code {
        "200" => "single_family_houses",
        "401" => "apartment_buildings",
        "407" => "mixed_use_buildings",
        "410" | "411" | "412" | "420" => "commercial_buildings",
        _ => "other_buildings",
    }
}

/// Construction-period band from a statistic description ("Construits avant 1945", ...).
fn age_band(description: &str) -> Option<&'static str> {
    let d = description.to_lowercase();
    if d.contains("pre_1945") || d.contains("avant 1945") || d.contains("before 1945") {
        Some("pre_1945")
    } else if d.contains("1945_1970") || (d.contains("1945") && d.contains("1970")) {
        Some("1945_1970")
    } else if d.contains("1971_2000") || (d.contains("1971") && d.contains("2000")) {
        Some("1971_2000")
    } else if d.contains("2000") {
        Some("post_2000")
    } else {
        None
    }
}

fn percentage_of(count: f64, total: f64) -> f64 {
    if total > 0.0 { count / total * 100.0 } else { 0.0 }
}

pub struct RealEstateProcessor {
    context: ProcessingContext,
}

impl Processor for RealEstateProcessor {
    fn section(&self) -> &'static str {
        "real_estate_market"
    }

    fn context(&self) -> &ProcessingContext {
        &self.context
    }
}

impl RealEstateProcessor {
    pub fn new(context: ProcessingContext) -> Self {
        Self { context }
    }

    pub fn process_data(&self, raw: &Value) -> Result<Value, DomainError> {
        let transactions = self.periodic(self.topic(raw, "municipality_data")?)?;
        let stock = self.periodic(self.topic(raw, "building_stock")?)?;
        let sectors = self.topic(raw, "sector_data")?;

        Ok(json!({
            "municipality_overview": transactions.map_or_else(empty_section, |t| self.municipality_overview(t)),
            "by_property_type": transactions.map_or_else(empty_section, |t| self.property_types(t, stock)),
            "sector_analysis": sectors.map_or_else(empty_section, |s| self.sector_analysis(s)),
            "building_stock": stock.map_or_else(empty_section, |s| self.building_stock(s)),
        }))
    }

    fn municipality_overview(&self, data: Periodic<'_>) -> Value {
        let current = data.current();
        let total_transactions = sum_field(current, "ms_total_transactions");
        let total_price = sum_field(current, "ms_total_price");
        let total_surface = sum_field(current, "ms_total_surface");
        if total_transactions == 0.0 {
            warn!("No residential transactions in the current period");
            return empty_section();
        }

        let avg_price = calculate_avg(Some(total_price), Some(total_transactions));
        let avg_surface = calculate_avg(Some(total_surface), Some(total_transactions));

        let totals = |bucket: Option<&Map<String, Value>>| {
            bucket.map(|b| {
                let count = sum_field(b, "ms_total_transactions");
                (count, calculate_avg(Some(sum_field(b, "ms_total_price")), Some(count)))
            })
        };
        let (prev_count, prev_avg) = totals(data.previous_year()).unzip();
        let (five_count, five_avg) = totals(data.five_year()).unzip();

        let (transaction_change_1y, _) = self.change(Some(total_transactions), prev_count);
        let (price_change_1y, _) = self.change(avg_price, prev_avg.flatten());
        let (transaction_change_5y, _) = self.change(Some(total_transactions), five_count);
        let (price_change_5y, _) = self.change(avg_price, five_avg.flatten());

        // Percentiles come from the building type with the most transactions.
        let most_common = current
            .values()
            .max_by(|a, b| {
                let count = |v: &Value| v.get("ms_total_transactions").and_then(as_f64).unwrap_or(0.0);
                count(a).total_cmp(&count(b))
            })
            .and_then(Value::as_object);
        let percentile = |key: &str| most_common.and_then(|m| m.get(key)).cloned().unwrap_or(Value::Null);

        let market_trend = self
            .context
            .classifier()
            .classify_market_trend(price_change_1y, transaction_change_1y);

        json!({
            "last_period": {
                "total_transactions": whole(total_transactions),
                "price_trends": {
                    "mean_price": num(avg_price),
                    "median_price": percentile("ms_price_p50"),
                    "price_p10": percentile("ms_price_p10"),
                    "price_p25": percentile("ms_price_p25"),
                    "price_p75": percentile("ms_price_p75"),
                    "price_p90": percentile("ms_price_p90"),
                },
                "total_surface_sqm": whole(total_surface),
                "avg_surface_sqm": num(avg_surface),
            },
            "historical_trends": {
                "year_over_year": {
                    "transaction_change_pct": num(transaction_change_1y),
                    "price_change_pct": num(price_change_1y),
                },
                "five_year": {
                    "transaction_change_pct": num(transaction_change_5y),
                    "price_change_pct": num(price_change_5y),
                },
            },
            "market_trend": market_trend.as_str(),
        })
    }

    fn property_types(&self, data: Periodic<'_>, stock: Option<Periodic<'_>>) -> Value {
        let stock_current = stock.map(|s| s.current());

        let mut most_common: Option<(&str, f64)> = None;
        let mut most_valuable: Option<(&str, f64)> = None;
        let mut fastest_growing: Option<(&str, f64)> = None;
        let mut detailed = Map::new();
        let mut inventories = Vec::new();

        for (code, name) in PROPERTY_TYPES {
            let Some(entry) = data.current().get(code).and_then(Value::as_object) else {
                continue;
            };
            let transactions = field(entry, "ms_total_transactions").unwrap_or(0.0);
            let mean_price = field(entry, "ms_mean_price");

            if most_common.is_none_or(|(_, max)| transactions > max) {
                most_common = Some((name, transactions));
            }
            if let Some(price) = mean_price.filter(|p| most_valuable.is_none_or(|(_, max)| *p > max)) {
                most_valuable = Some((name, price));
            }

            let historical = |bucket: Option<&Map<String, Value>>| {
                bucket
                    .and_then(|b| b.get(code))
                    .and_then(|e| e.get("ms_mean_price"))
                    .and_then(as_f64)
            };
            let (growth_1y, growth_1y_label) = self.change(mean_price, historical(data.previous_year()));
            let (_, growth_5y_label) = self.change(mean_price, historical(data.five_year()));
            if let Some(growth) = growth_1y.filter(|g| fastest_growing.is_none_or(|(_, max)| *g > max)) {
                fastest_growing = Some((name, growth));
            }

            let inventory = stock_current
                .and_then(|s| s.get(code))
                .and_then(|t| t.pointer("/statistics/TOTAL/count"))
                .and_then(as_f64)
                .unwrap_or(0.0);
            inventories.push((name, inventory));

            let price_per_sqm = match (field(entry, "ms_total_price"), field(entry, "ms_total_surface")) {
                (Some(price), Some(surface)) if surface > 0.0 => Some(price / surface),
                _ => None,
            };

            detailed.insert(
                name.to_string(),
                json!({
                    "code": code,
                    "transaction_count": whole(transactions),
                    "inventory_count": whole(inventory),
                    "percentage_of_stock": 0.0,
                    "price_data": {
                        "mean_price": num(mean_price),
                        "median_price": entry.get("ms_price_p50").cloned().unwrap_or(Value::Null),
                        "price_per_sqm": num(price_per_sqm),
                        "price_evolution_1y": growth_1y_label,
                        "price_evolution_5y": growth_5y_label,
                    },
                }),
            );
        }

        let total_stock: f64 = inventories.iter().map(|(_, count)| count).sum();
        for (name, inventory) in inventories {
            if let Some(entry) = detailed.get_mut(name) {
                entry["percentage_of_stock"] = json!(percentage_of(inventory, total_stock));
            }
        }

        json!({
            "summary": {
                "most_common_type": most_common.map(|(n, _)| n),
                "fastest_growing_segment": fastest_growing.map(|(n, _)| n),
                "most_valuable_segment": most_valuable.map(|(n, _)| n),
            },
            "detailed_types": detailed,
        })
    }

    fn sector_analysis(&self, sectors: &Map<String, Value>) -> Value {
        let mut entries = Vec::new();
        let mut hottest: Option<(String, f64)> = None;
        let mut most_affordable: Option<(String, f64)> = None;

        for (sector_id, sector) in sectors {
            let name = sector
                .get("sector_name")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty())
                .map_or_else(|| format!("Sector-{sector_id}"), str::to_string);

            let mut transactions = 0.0;
            let mut medians = Vec::new();
            for residential in sector
                .get("residential_types")
                .and_then(Value::as_object)
                .into_iter()
                .flat_map(|m| m.values())
            {
                transactions += residential.get("nb_transactions").and_then(as_f64).unwrap_or(0.0);
                if let Some(p50) = residential.get("ms_price_p50").and_then(as_f64) {
                    medians.push(p50);
                }
            }
            if medians.is_empty() {
                continue;
            }

            // Upper median of the residential-type medians.
            medians.sort_by(f64::total_cmp);
            let median = medians[medians.len() / 2];

            if median > 0.0 {
                if hottest.as_ref().is_none_or(|(_, max)| median > *max) {
                    hottest = Some((name.clone(), median));
                }
                if most_affordable.as_ref().is_none_or(|(_, min)| median < *min) {
                    most_affordable = Some((name.clone(), median));
                }
            }

            entries.push(json!({
                "sector_id": sector_id,
                "sector_name": name,
                "transaction_count": whole(transactions),
                "median_price": median,
                "price_trend": null,
                "transaction_trend": null,
            }));
        }

        let disparity = match (&hottest, &most_affordable) {
            (Some((_, max)), Some((_, min))) if *min > 0.0 => Some((max - min) / min),
            _ => None,
        };

        json!({
            "summary": {
                "sectors_count": entries.len(),
                "price_disparity_index": num(disparity),
                "hottest_sector": hottest.map(|(n, _)| n),
                "most_affordable_sector": most_affordable.map(|(n, _)| n),
            },
            "sectors": entries,
        })
    }

    fn building_stock(&self, data: Periodic<'_>) -> Value {
        let mut total_buildings = 0.0;
        let mut housing_units = 0.0;
        let mut by_type: Map<String, Value> = Map::new();
        let mut type_counts: Vec<(&'static str, f64)> = Vec::new();
        let mut age_counts: Vec<(&'static str, f64)> = Vec::new();

        for (code, building) in data.current() {
            let Some(statistics) = building.get("statistics").and_then(Value::as_object) else {
                continue;
            };
            for (statistic, stat) in statistics {
                let count = stat.get("count").and_then(as_f64).unwrap_or(0.0);
                if statistic == "TOTAL" {
                    total_buildings += count;
                    let category = stock_category(code);
                    match type_counts.iter_mut().find(|(c, _)| *c == category) {
                        Some((_, existing)) => *existing += count,
                        None => type_counts.push((category, count)),
                    }
                } else if statistic.starts_with("AGE_") {
                    let description = stat.get("description").and_then(Value::as_str).unwrap_or_default();
                    if let Some(band) = age_band(description) {
                        match age_counts.iter_mut().find(|(b, _)| *b == band) {
                            Some((_, existing)) => *existing += count,
                            None => age_counts.push((band, count)),
                        }
                    }
                } else if statistic == "HOUSING_UNITS" {
                    housing_units += count;
                }
            }
        }

        let mut five_year_counts: Vec<(&'static str, f64)> = Vec::new();
        for (code, building) in data.five_year().into_iter().flatten() {
            if let Some(count) = building.pointer("/statistics/TOTAL/count").and_then(as_f64) {
                let category = stock_category(code);
                match five_year_counts.iter_mut().find(|(c, _)| *c == category) {
                    Some((_, existing)) => *existing += count,
                    None => five_year_counts.push((category, count)),
                }
            }
        }

        for (category, count) in &type_counts {
            let previous = five_year_counts
                .iter()
                .find(|(c, _)| c == category)
                .map(|(_, v)| *v);
            let evolution = previous.map(|p| self.change(Some(*count), Some(p)).1);
            by_type.insert(
                (*category).to_string(),
                json!({
                    "count": whole(*count),
                    "percentage": percentage_of(*count, total_buildings),
                    "evolution_5y": evolution,
                }),
            );
        }

        let by_age: Map<String, Value> = age_counts
            .iter()
            .map(|(band, count)| {
                (
                    (*band).to_string(),
                    json!({"count": whole(*count), "percentage": percentage_of(*count, total_buildings)}),
                )
            })
            .collect();

        json!({
            "total_buildings": whole(total_buildings),
            "by_type": by_type,
            "by_age": by_age,
            "housing_units": {
                "total_count": whole(housing_units),
                "units_per_building_avg": num(calculate_avg(Some(housing_units), Some(total_buildings))),
                "units_per_capita": null,
            },
        })
    }
}
