// immo-score-core/src/application/processors/building.rs

use serde_json::{Map, Value, json};

use super::{Periodic, ProcessingContext, Processor, empty_section, field};
use crate::domain::error::DomainError;
use crate::domain::value::{as_f64, num, round_to, whole};

/// Months between permit and delivery assumed for the supply pipeline.
const COMPLETION_TIMEFRAME: &str = "18 months";

/// Dwellings eventually delivered per dwelling permitted this quarter.
const PIPELINE_FACTOR: f64 = 1.5;

fn count_at(bucket: &Map<String, Value>, path: &str) -> f64 {
    let mut segments = path.split('.');
    let first = segments.next().and_then(|s| bucket.get(s));
    segments
        .fold(first, |value, segment| value.and_then(|v| v.get(segment)))
        .and_then(as_f64)
        .unwrap_or(0.0)
}

/// Composite 0..1 construction intensity from the permit trend and new dwellings.
pub fn construction_intensity(trend_yoy: Option<f64>, new_dwellings: f64) -> f64 {
    let mut index = 0.5;
    match trend_yoy {
        Some(t) if t < -20.0 => index -= 0.2,
        Some(t) if t < -10.0 => index -= 0.1,
        Some(t) if t > 20.0 => index += 0.2,
        Some(t) if t > 10.0 => index += 0.1,
        _ => {}
    }
    if new_dwellings > 100.0 {
        index += 0.1;
    } else if new_dwellings > 50.0 {
        index += 0.05;
    }
    index
}

pub fn development_phase(intensity: f64) -> &'static str {
    if intensity > 0.8 {
        "Strong Growth"
    } else if intensity > 0.6 {
        "Moderate Growth"
    } else if intensity < 0.2 {
        "Stagnation"
    } else if intensity < 0.4 {
        "Slowdown"
    } else {
        "Stable"
    }
}

pub fn supply_impact(units_coming: f64) -> &'static str {
    if units_coming > 200.0 {
        "High"
    } else if units_coming < 50.0 {
        "Low"
    } else {
        "Medium"
    }
}

/// `building_development`: permits and the construction activity derived from them.
pub struct BuildingProcessor {
    context: ProcessingContext,
}

impl Processor for BuildingProcessor {
    fn section(&self) -> &'static str {
        "building_development"
    }

    fn context(&self) -> &ProcessingContext {
        &self.context
    }
}

impl BuildingProcessor {
    pub fn new(context: ProcessingContext) -> Self {
        Self { context }
    }

    pub fn process_data(&self, raw: &Value) -> Result<Value, DomainError> {
        let Some(counts) = self.periodic(self.topic(raw, "permits_counts")?)? else {
            return Ok(empty_section());
        };
        let surface = self.periodic(self.topic(raw, "permits_surface")?)?;
        let volume = self.periodic(self.topic(raw, "permits_volume")?)?;

        let current = counts.current();
        let total = count_at(current, "total.buildings");
        let (trend_yoy, _) = self.change(
            Some(total),
            counts.previous_year().map(|p| count_at(p, "total.buildings")),
        );
        let residential = count_at(current, "residential.new_construction.buildings")
            + count_at(current, "residential.renovation.buildings");
        let new_dwellings = count_at(current, "residential.new_construction.dwellings");

        let permits = json!({
            "year": current.get("year").cloned().unwrap_or(Value::Null),
            "quarter": current.get("quarter").cloned().unwrap_or(Value::Null),
            "summary": {
                "total_permits_ytd": whole(total),
                "trend_yoy": num(trend_yoy),
                "residential_ratio": if total > 0.0 { residential / total } else { 0.0 },
            },
            "counts": {
                "residential": {
                    "new_construction": {
                        "buildings": whole(count_at(current, "residential.new_construction.buildings")),
                        "dwellings": whole(new_dwellings),
                        "houses": whole(count_at(current, "residential.new_construction.houses")),
                        "apartments": whole(count_at(current, "residential.new_construction.apartments")),
                    },
                    "renovation": {
                        "buildings": whole(count_at(current, "residential.renovation.buildings")),
                        "dwellings": whole(count_at(current, "residential.renovation.dwellings")),
                    },
                },
                "non_residential": {
                    "new_construction": {
                        "buildings": whole(count_at(current, "non_residential.new_construction.buildings")),
                    },
                    "renovation": {
                        "buildings": whole(count_at(current, "non_residential.renovation.buildings")),
                    },
                },
            },
            "surface": surface.map_or_else(empty_section, |s| self.surface(s, new_dwellings)),
            "volume": volume.map_or_else(empty_section, |v| self.volume(v)),
        });

        let intensity = construction_intensity(trend_yoy, new_dwellings);
        let units_coming = new_dwellings * PIPELINE_FACTOR;

        Ok(json!({
            "permits": permits,
            "construction_activity": {
                "construction_intensity_index": round_to(intensity, 2),
                "development_phase": development_phase(intensity),
                "supply_pipeline": {
                    "residential_units_coming": whole(units_coming),
                    "estimated_completion_timeframe": COMPLETION_TIMEFRAME,
                    "impact_on_supply": supply_impact(units_coming),
                },
            },
        }))
    }

    fn surface(&self, data: Periodic<'_>, new_dwellings: f64) -> Value {
        let total = field(data.current(), "total_surface_m2").unwrap_or(0.0);
        let average = field(data.current(), "avg_surface_per_dwelling_m2")
            .filter(|a| *a > 0.0)
            .or_else(|| (new_dwellings > 0.0).then(|| total / new_dwellings));
        let (trend, _) = self.change(Some(total), data.previous_year().and_then(|p| field(p, "total_surface_m2")));
        json!({
            "residential_new_construction_sqm": whole(total),
            "avg_dwelling_size_sqm": num(average),
            "trend_yoy": num(trend),
        })
    }

    fn volume(&self, data: Periodic<'_>) -> Value {
        let total = field(data.current(), "total_volume_m3").unwrap_or(0.0);
        let (trend, _) = self.change(Some(total), data.previous_year().and_then(|p| field(p, "total_volume_m3")));
        json!({
            "non_residential_new_construction_cubic_m": whole(total),
            "avg_volume_per_building_cubic_m": num(field(data.current(), "avg_volume_per_building_m3")),
            "trend_yoy": num(trend),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::extractors::{BuildingExtractor, Extractor, ExtractorScope};
    use crate::application::testing::seeded_warehouse;
    use anyhow::Result;

    fn processor() -> BuildingProcessor {
        BuildingProcessor::new(ProcessingContext::default())
    }

    async fn raw(id: i64) -> Value {
        BuildingExtractor::new(seeded_warehouse(), ExtractorScope::default())
            .extract_for(id)
            .await
            .into_value()
    }

    fn close(value: &Value, expected: f64) -> bool {
        value.as_f64().is_some_and(|v| (v - expected).abs() < 1e-6)
    }

    #[tokio::test]
    async fn test_permit_summary_and_counts() -> Result<()> {
        let building = processor().process_data(&raw(92094).await)?;
        let permits = &building["permits"];
        assert_eq!(permits["summary"]["total_permits_ytd"], json!(63));
        assert!(close(&permits["summary"]["trend_yoy"], 8.0 / 55.0 * 100.0));
        assert!(close(&permits["summary"]["residential_ratio"], 55.0 / 63.0));
        assert_eq!(permits["counts"]["residential"]["new_construction"]["dwellings"], json!(120));
        assert_eq!(permits["counts"]["non_residential"]["renovation"]["buildings"], json!(3));
        assert!(close(&permits["surface"]["avg_dwelling_size_sqm"], 90.0));
        assert!(close(&permits["volume"]["trend_yoy"], -3000.0 / 28000.0 * 100.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_construction_activity() -> Result<()> {
        let building = processor().process_data(&raw(92094).await)?;
        let activity = &building["construction_activity"];
        assert_eq!(activity["construction_intensity_index"], json!(0.7));
        assert_eq!(activity["development_phase"], json!("Moderate Growth"));
        assert_eq!(activity["supply_pipeline"]["residential_units_coming"], json!(180));
        assert_eq!(activity["supply_pipeline"]["impact_on_supply"], json!("Medium"));
        Ok(())
    }

    #[tokio::test]
    async fn test_no_permits_means_empty_section() -> Result<()> {
        assert_eq!(processor().process_data(&raw(62063).await)?, json!({}));
        Ok(())
    }

    #[test]
    fn test_intensity_ladder_checks_extremes_first() {
        assert!((construction_intensity(Some(-25.0), 0.0) - 0.3).abs() < 1e-9);
        assert!((construction_intensity(Some(-15.0), 60.0) - 0.45).abs() < 1e-9);
        assert!((construction_intensity(Some(30.0), 150.0) - 0.8).abs() < 1e-9);
        assert!((construction_intensity(None, 0.0) - 0.5).abs() < 1e-9);
        assert_eq!(development_phase(0.1), "Stagnation");
        assert_eq!(development_phase(0.3), "Slowdown");
        assert_eq!(development_phase(0.5), "Stable");
        assert_eq!(development_phase(0.9), "Strong Growth");
        assert_eq!(supply_impact(201.0), "High");
        assert_eq!(supply_impact(10.0), "Low");
    }

    #[test]
    fn test_renovation_only_quarter() -> Result<()> {
        let raw = json!({"permits_counts": {"current_data": {
            "year": 2024, "quarter": 1,
            "residential": {"renovation": {"buildings": 4, "dwellings": 4}},
            "non_residential": {},
            "total": {"buildings": 4, "dwellings": 4}
        }}});
        let building = processor().process_data(&raw)?;
        assert!(building["permits"]["summary"]["trend_yoy"].is_null());
        assert_eq!(building["permits"]["surface"], json!({}));
        assert_eq!(building["construction_activity"]["development_phase"], json!("Stable"));
        assert_eq!(building["construction_activity"]["supply_pipeline"]["impact_on_supply"], json!("Low"));
        Ok(())
    }
}
