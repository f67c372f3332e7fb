// immo-score-core/src/application/processors/investment.rs

// Investment indicators derived from the other processed sections, not from the warehouse.
// Every score here is a heuristic with fixed weights.

use serde_json::{Value, json};

use super::{ProcessingContext, Processor};
use crate::domain::value::{f64_at_path, is_blank, num, round_to};

const DEFAULT_GROSS_YIELD: f64 = 0.042;

const MORTGAGE_RATE: f64 = 0.025;
const MORTGAGE_TERM_YEARS: u32 = 25;
const DOWN_PAYMENT_SHARE: f64 = 0.2;
const MAX_DEBT_SERVICE_RATIO: f64 = 0.33;

/// Persons per household when turning population growth into household demand.
const PERSONS_PER_HOUSEHOLD: f64 = 2.5;

fn segment_name(band: &str) -> &'static str {
    match band {
        "18_to_35" => "Young adults & Early professionals",
        "36_to_65" => "Middle-aged families & Established professionals",
        "over_65" => "Seniors (65+)",
        _ => "Children & Teenagers",
    }
}

fn housing_preferences(band: &str) -> &'static str {
    match band {
        "18_to_35" => "Modern apartments or starter homes, proximity to employment centers and transportation",
        "36_to_65" => "Family homes with space, good school districts, established neighborhoods",
        "over_65" => "Single-level homes, smaller maintenance-free units, access to healthcare and amenities",
        _ => "",
    }
}

fn housing_impact(band: &str) -> &'static str {
    match band {
        "18_to_35" => "Decreasing demand for starter homes and rental properties",
        "36_to_65" => "Reduced demand for larger family homes and mid-range properties",
        "over_65" => "Potential oversupply of retirement/senior-focused properties",
        _ => "Shifting housing demand patterns",
    }
}

/// Monthly annuity for `principal` at the fixed mortgage terms.
pub fn monthly_payment(principal: f64) -> f64 {
    let rate = MORTGAGE_RATE / 12.0;
    let months = f64::from(MORTGAGE_TERM_YEARS * 12);
    let growth = (1.0 + rate).powf(months);
    principal * (rate * growth) / (growth - 1.0)
}

/// 1 when the mortgage costs nothing, 0 at or beyond the maximum debt-service ratio.
pub fn mortgage_affordability(median_price: f64, annual_income: f64) -> Option<f64> {
    if median_price <= 0.0 || annual_income <= 0.0 {
        return None;
    }
    let loan = median_price * (1.0 - DOWN_PAYMENT_SHARE);
    let debt_service_ratio = monthly_payment(loan) / (annual_income / 12.0);
    Some((1.0 - debt_service_ratio / MAX_DEBT_SERVICE_RATIO).clamp(0.0, 1.0))
}

pub fn rental_growth_label(demand_index: f64) -> &'static str {
    let index = round_to(demand_index, 2);
    if index > 0.7 {
        "Strong"
    } else if index > 0.6 {
        "Good"
    } else if index < 0.3 {
        "Very weak"
    } else if index < 0.4 {
        "Weak"
    } else {
        "Moderate"
    }
}

pub fn supply_demand_balance(construction_vs_absorption: f64) -> &'static str {
    if construction_vs_absorption > 1.25 {
        "Oversupply"
    } else if construction_vs_absorption > 1.1 {
        "Slight oversupply"
    } else if construction_vs_absorption < 0.75 {
        "Undersupply"
    } else if construction_vs_absorption < 0.9 {
        "Slight undersupply"
    } else {
        "Balanced"
    }
}

pub fn market_cycle_position(price_change: f64, transaction_change: f64) -> &'static str {
    let (p, t) = (price_change, transaction_change);
    if p > 10.0 && t > 5.0 {
        "Strong growth phase"
    } else if p > 5.0 && t > 0.0 {
        "Growth phase"
    } else if p < -5.0 && t < -5.0 {
        "Correction phase"
    } else if p < 0.0 && t < 0.0 {
        "Slowdown phase"
    } else if p > 0.0 && t < 0.0 {
        "Late growth phase (pre-correction)"
    } else if p.abs() < 2.0 && t.abs() < 3.0 {
        "Stabilization phase"
    } else {
        "Mid-growth phase"
    }
}

pub fn liquidity_score(transactions: f64, transaction_change: f64) -> f64 {
    let mut score: f64 = 50.0;
    if transactions > 100.0 {
        score += 20.0;
    } else if transactions > 50.0 {
        score += 10.0;
    } else if transactions < 10.0 {
        score -= 20.0;
    } else if transactions < 20.0 {
        score -= 10.0;
    }
    if transaction_change > 10.0 {
        score += 10.0;
    } else if transaction_change > 5.0 {
        score += 5.0;
    } else if transaction_change < -10.0 {
        score -= 10.0;
    } else if transaction_change < -5.0 {
        score -= 5.0;
    }
    score.clamp(0.0, 100.0)
}

pub fn value_for_money_score(price_to_income: Option<f64>) -> f64 {
    let mut score: f64 = 50.0;
    match price_to_income {
        Some(r) if r < 4.0 => score += 30.0,
        Some(r) if r < 5.0 => score += 20.0,
        Some(r) if r < 6.0 => score += 10.0,
        Some(r) if r > 8.0 => score -= 20.0,
        Some(r) if r > 7.0 => score -= 10.0,
        _ => {}
    }
    score.clamp(1.0, 100.0)
}

pub fn growth_potential_score(price_change: f64, population_growth_5y: f64) -> f64 {
    let mut score: f64 = 50.0;
    if price_change > 5.0 {
        score += 15.0;
    } else if price_change > 3.0 {
        score += 10.0;
    } else if price_change < 0.0 {
        score -= 10.0;
    }
    if population_growth_5y > 5.0 {
        score += 15.0;
    } else if population_growth_5y > 2.0 {
        score += 10.0;
    } else if population_growth_5y < 0.0 {
        score -= 10.0;
    }
    score.clamp(1.0, 100.0)
}

fn rank(score: f64) -> f64 {
    (101.0 - score).max(1.0)
}

/// `investment_analysis`, built from the processed real-estate, economics,
/// demographics and building sections.
pub struct InvestmentProcessor {
    context: ProcessingContext,
}

impl Processor for InvestmentProcessor {
    fn section(&self) -> &'static str {
        "investment_analysis"
    }

    fn context(&self) -> &ProcessingContext {
        &self.context
    }
}

/// The processed sections an analysis reads from.
struct Inputs<'a> {
    real_estate: &'a Value,
    economics: &'a Value,
    demographics: Option<&'a Value>,
    building: Option<&'a Value>,
}

impl Inputs<'_> {
    fn has_overview(&self) -> bool {
        !is_blank(self.real_estate.get("municipality_overview"))
    }

    fn median_price(&self) -> Option<f64> {
        f64_at_path(self.real_estate, "municipality_overview.last_period.price_trends.median_price")
    }

    fn average_income(&self) -> Option<f64> {
        f64_at_path(self.economics, "income_tax.income_overview.average_income")
    }

    fn price_to_income(&self) -> Option<f64> {
        match (self.median_price(), self.average_income()) {
            (Some(price), Some(income)) if income > 0.0 => Some(price / income),
            _ => None,
        }
    }

    fn trend(&self, path: &str) -> f64 {
        f64_at_path(self.real_estate, &format!("municipality_overview.historical_trends.{path}")).unwrap_or(0.0)
    }

    fn population(&self, path: &str) -> f64 {
        self.demographics
            .and_then(|d| f64_at_path(d, &format!("population_overview.{path}")))
            .unwrap_or(0.0)
    }
}

impl InvestmentProcessor {
    pub fn new(context: ProcessingContext) -> Self {
        Self { context }
    }

    pub fn process_data(
        &self,
        real_estate: &Value,
        economics: &Value,
        demographics: Option<&Value>,
        building: Option<&Value>,
    ) -> Value {
        let inputs = Inputs {
            real_estate,
            economics,
            demographics,
            building,
        };
        json!({
            "affordability_metrics": self.affordability(&inputs),
            "rental_market_potential": self.rental_potential(&inputs),
            "target_demographic_analysis": self.target_demographics(&inputs),
            "market_dynamics": self.market_dynamics(&inputs),
            "risk_assessment": self.risk_assessment(&inputs),
            "comparative_ranking": self.comparative_ranking(&inputs),
        })
    }

    fn affordability(&self, inputs: &Inputs<'_>) -> Value {
        let price_to_income = inputs.price_to_income();
        let affordability = match (inputs.median_price(), inputs.average_income()) {
            (Some(price), Some(income)) => mortgage_affordability(price, income),
            _ => None,
        };
        let score = match (price_to_income, affordability) {
            (Some(ratio), Some(index)) => {
                let ratio_component = (100.0 - (ratio - 3.0) * 15.0).max(0.0);
                Some((ratio_component * 0.6 + index * 100.0 * 0.4).clamp(0.0, 100.0))
            }
            _ => None,
        };
        json!({
            "price_to_income_ratio": num(price_to_income),
            "mortgage_affordability_index": num(affordability),
            "ownership_accessibility_score": num(score),
        })
    }

    fn rental_potential(&self, inputs: &Inputs<'_>) -> Value {
        let high_unemployment = self.context.thresholds().high_unemployment;
        let mut gross_yield = DEFAULT_GROSS_YIELD;
        if let Some(rate) = f64_at_path(inputs.economics, "unemployment.overall_rate") {
            if rate > high_unemployment {
                gross_yield -= 0.005;
            } else if rate < high_unemployment / 2.0 {
                gross_yield += 0.003;
            }
        }

        let mut demand_index = 0.5;
        if let Some(growth) = inputs
            .demographics
            .and_then(|d| f64_at_path(d, "population_overview.population_trend.five_year_growth"))
        {
            if growth > 5.0 {
                demand_index += 0.2;
                gross_yield += 0.003;
            } else if growth > 2.0 {
                demand_index += 0.1;
                gross_yield += 0.001;
            } else if growth < 0.0 {
                demand_index -= 0.1;
                gross_yield -= 0.001;
            }
        }

        json!({
            "estimated_rental_yield": round_to(gross_yield, 4),
            "rental_demand_index": round_to(demand_index, 2),
            "rental_growth_potential": rental_growth_label(demand_index),
        })
    }

    fn target_demographics(&self, inputs: &Inputs<'_>) -> Value {
        let age_groups = inputs
            .demographics
            .and_then(|d| d.get("age_structure"))
            .and_then(|a| a.get("age_groups"))
            .and_then(Value::as_object)
            .filter(|groups| !groups.is_empty());

        let Some(age_groups) = age_groups else {
            return json!({
                "growing_segments": [
                    {
                        "segment": "Seniors (65+)",
                        "growth_rate": 2.4,
                        "housing_preferences": "Smaller, accessible units close to amenities",
                        "is_estimated": true,
                    },
                    {
                        "segment": "Young professionals",
                        "growth_rate": 1.2,
                        "housing_preferences": "Modern apartments with good connectivity",
                        "is_estimated": true,
                    },
                ],
                "declining_segments": [
                    {
                        "segment": "Families with 3+ children",
                        "decline_rate": -0.8,
                        "housing_impact": "Reduced demand for large houses",
                        "is_estimated": true,
                    },
                ],
            });
        };

        let mut growing = Vec::new();
        let mut declining = Vec::new();
        for (band, group) in age_groups {
            // Children neither buy nor rent.
            if band == "under_18" {
                continue;
            }
            let Some(trend) = group.get("trend_pct").and_then(Value::as_f64) else {
                continue;
            };
            if trend >= 1.0 {
                growing.push(json!({
                    "segment": segment_name(band),
                    "growth_rate": round_to(trend, 1),
                    "housing_preferences": housing_preferences(band),
                    "is_estimated": false,
                }));
            } else if trend <= -1.0 {
                declining.push(json!({
                    "segment": segment_name(band),
                    "decline_rate": round_to(trend, 1),
                    "housing_impact": housing_impact(band),
                    "is_estimated": false,
                }));
            }
        }
        if growing.is_empty() {
            growing.push(json!({
                "segment": "Seniors (65+)",
                "growth_rate": 2.0,
                "housing_preferences": "Smaller, accessible units close to amenities",
                "is_estimated": true,
            }));
        }

        json!({
            "growing_segments": growing,
            "declining_segments": declining,
        })
    }

    fn market_dynamics(&self, inputs: &Inputs<'_>) -> Value {
        let new_dwellings = inputs
            .building
            .and_then(|b| f64_at_path(b, "permits.counts.residential.new_construction.dwellings"))
            .unwrap_or(0.0);
        let population = inputs.population("total_population");
        let growth = inputs.population("population_trend.one_year_growth");

        let new_households = population * growth / 100.0 / PERSONS_PER_HOUSEHOLD;
        let construction_vs_absorption = if new_households > 0.0 {
            new_dwellings / new_households
        } else {
            1.0
        };

        let cycle = if inputs.has_overview() {
            market_cycle_position(
                inputs.trend("year_over_year.price_change_pct"),
                inputs.trend("year_over_year.transaction_change_pct"),
            )
        } else {
            "Mid-growth phase"
        };

        json!({
            "supply_demand_balance": supply_demand_balance(construction_vs_absorption),
            "construction_vs_absorption_rate": construction_vs_absorption,
            "estimated_new_households": num(Some(new_households).filter(|h| *h > 0.0)),
            "market_cycle_position": cycle,
        })
    }

    fn risk_assessment(&self, inputs: &Inputs<'_>) -> Value {
        let volatility_indicator = (inputs.trend("year_over_year.price_change_pct")
            - inputs.trend("five_year.price_change_pct") / 5.0)
            .abs();
        let price_volatility = if volatility_indicator < 3.0 {
            "Low"
        } else if volatility_indicator > 7.0 {
            "High"
        } else {
            "Medium"
        };

        let transactions = f64_at_path(inputs.real_estate, "municipality_overview.last_period.total_transactions").unwrap_or(0.0);
        let liquidity = if inputs.has_overview() {
            liquidity_score(transactions, inputs.trend("year_over_year.transaction_change_pct"))
        } else {
            50.0
        };

        let oversupply_risk = match inputs
            .building
            .and_then(|b| b.pointer("/construction_activity/supply_pipeline/impact_on_supply"))
            .and_then(Value::as_str)
        {
            Some("High") => "High",
            Some("Low") => "Low",
            _ => "Medium",
        };

        let total_enterprises =
            f64_at_path(inputs.economics, "business_activity.enterprise_overview.total_enterprises").unwrap_or(0.0);
        let largest_sector_pct = inputs
            .economics
            .pointer("/business_activity/sectors")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|sectors| sectors.values())
            .filter_map(|sector| sector.get("enterprise_count").and_then(Value::as_f64))
            .filter(|_| total_enterprises > 0.0)
            .map(|count| count / total_enterprises * 100.0)
            .fold(0.0_f64, f64::max);
        let economic_dependency_risk = if largest_sector_pct > 40.0 {
            "High"
        } else if largest_sector_pct < 25.0 {
            "Low"
        } else {
            "Medium"
        };

        json!({
            "price_volatility": price_volatility,
            "liquidity_score": liquidity,
            "oversupply_risk": oversupply_risk,
            "economic_dependency_risk": economic_dependency_risk,
        })
    }

    fn comparative_ranking(&self, inputs: &Inputs<'_>) -> Value {
        let value_score = value_for_money_score(inputs.price_to_income());
        let growth_score = if inputs.demographics.is_some() {
            growth_potential_score(
                inputs.trend("year_over_year.price_change_pct"),
                inputs.population("population_trend.five_year_growth"),
            )
        } else {
            50.0
        };
        json!({
            "value_for_money_rank": rank(value_score),
            "growth_potential_rank": rank(growth_score),
            "overall_investment_score": round_to(value_score * 0.4 + growth_score * 0.6, 2),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn processor() -> InvestmentProcessor {
        InvestmentProcessor::new(ProcessingContext::default())
    }

    fn real_estate(median: f64, price_1y: f64, tx_1y: f64, price_5y: f64, transactions: f64) -> Value {
        json!({"municipality_overview": {
            "last_period": {"total_transactions": transactions, "price_trends": {"median_price": median}},
            "historical_trends": {
                "year_over_year": {"price_change_pct": price_1y, "transaction_change_pct": tx_1y},
                "five_year": {"price_change_pct": price_5y}
            }
        }})
    }

    fn economics(income: f64, unemployment: f64) -> Value {
        json!({
            "income_tax": {"income_overview": {"average_income": income}},
            "unemployment": {"overall_rate": unemployment},
            "business_activity": {
                "enterprise_overview": {"total_enterprises": 1000},
                "sectors": {"retail": {"enterprise_count": 450}, "professional": {"enterprise_count": 200}}
            }
        })
    }

    #[test]
    fn test_affordability_metrics() {
        let result = processor().process_data(&real_estate(300000.0, 0.0, 0.0, 0.0, 0.0), &economics(50000.0, 8.0), None, None);
        let a = &result["affordability_metrics"];
        assert_eq!(a["price_to_income_ratio"], json!(6.0));
        let index = a["mortgage_affordability_index"].as_f64().unwrap();
        assert!(index > 0.2 && index < 0.23, "index {index}");
        let score = a["ownership_accessibility_score"].as_f64().unwrap();
        assert!((score - (55.0 * 0.6 + index * 40.0)).abs() < 1e-9);
    }

    #[test]
    fn test_unaffordable_market_scores_zero_index() {
        assert_eq!(mortgage_affordability(1_000_000.0, 20000.0), Some(0.0));
        assert_eq!(mortgage_affordability(0.0, 20000.0), None);
        let result = processor().process_data(&json!({}), &json!({}), None, None);
        assert!(result["affordability_metrics"]["ownership_accessibility_score"].is_null());
    }

    #[test]
    fn test_rental_potential_signals() {
        let demo = json!({"population_overview": {"population_trend": {"five_year_growth": 6.0}}});
        let result = processor().process_data(&json!({}), &economics(40000.0, 4.0), Some(&demo), None);
        let r = &result["rental_market_potential"];
        assert_eq!(r["estimated_rental_yield"], json!(0.048));
        assert_eq!(r["rental_demand_index"], json!(0.7));
        assert_eq!(r["rental_growth_potential"], json!("Good"));

        let shrinking = json!({"population_overview": {"population_trend": {"five_year_growth": -1.0}}});
        let result = processor().process_data(&json!({}), &economics(40000.0, 15.0), Some(&shrinking), None);
        assert_eq!(result["rental_market_potential"]["estimated_rental_yield"], json!(0.036));
        assert_eq!(result["rental_market_potential"]["rental_growth_potential"], json!("Moderate"));
        assert_eq!(rental_growth_label(0.2), "Very weak");
        assert_eq!(rental_growth_label(0.35), "Weak");
    }

    #[test]
    fn test_target_segments_from_age_trends() {
        let demo = json!({"age_structure": {"age_groups": {
            "under_18": {"trend_pct": 5.0},
            "18_to_35": {"trend_pct": -1.2},
            "36_to_65": {"trend_pct": 1.8},
            "over_65": {"trend_pct": 0.4}
        }}});
        let result = processor().process_data(&json!({}), &json!({}), Some(&demo), None);
        let t = &result["target_demographic_analysis"];
        let growing = t["growing_segments"].as_array().unwrap();
        assert_eq!(growing.len(), 1);
        assert_eq!(growing[0]["segment"], json!("Middle-aged families & Established professionals"));
        assert_eq!(t["declining_segments"][0]["decline_rate"], json!(-1.2));
        assert_eq!(t["declining_segments"][0]["is_estimated"], json!(false));
    }

    #[test]
    fn test_target_segments_fallbacks_are_flagged() {
        let result = processor().process_data(&json!({}), &json!({}), None, None);
        let t = &result["target_demographic_analysis"];
        assert_eq!(t["growing_segments"].as_array().unwrap().len(), 2);
        assert_eq!(t["declining_segments"][0]["is_estimated"], json!(true));

        let flat = json!({"age_structure": {"age_groups": {"over_65": {"trend_pct": 0.2}}}});
        let result = processor().process_data(&json!({}), &json!({}), Some(&flat), None);
        let growing = result["target_demographic_analysis"]["growing_segments"].as_array().unwrap().clone();
        assert_eq!(growing[0]["growth_rate"], json!(2.0));
        assert_eq!(growing[0]["is_estimated"], json!(true));
    }

    #[test]
    fn test_market_dynamics() {
        let demo = json!({"population_overview": {
            "total_population": 100000,
            "population_trend": {"one_year_growth": 1.0}
        }});
        let building = json!({"permits": {"counts": {"residential": {"new_construction": {"dwellings": 200}}}}});
        let result = processor().process_data(
            &real_estate(250000.0, 6.0, 2.0, 20.0, 150.0),
            &json!({}),
            Some(&demo),
            Some(&building),
        );
        let m = &result["market_dynamics"];
        // 100 000 * 1% / 2.5 = 400 new households for 200 dwellings.
        assert_eq!(m["construction_vs_absorption_rate"], json!(0.5));
        assert_eq!(m["supply_demand_balance"], json!("Undersupply"));
        assert_eq!(m["market_cycle_position"], json!("Growth phase"));

        let result = processor().process_data(&json!({}), &json!({}), None, None);
        assert_eq!(result["market_dynamics"]["supply_demand_balance"], json!("Balanced"));
        assert_eq!(result["market_dynamics"]["market_cycle_position"], json!("Mid-growth phase"));
    }

    #[test]
    fn test_cycle_positions() {
        assert_eq!(market_cycle_position(12.0, 6.0), "Strong growth phase");
        assert_eq!(market_cycle_position(-6.0, -6.0), "Correction phase");
        assert_eq!(market_cycle_position(-1.0, -1.0), "Slowdown phase");
        assert_eq!(market_cycle_position(3.0, -1.0), "Late growth phase (pre-correction)");
        assert_eq!(market_cycle_position(1.0, 2.0), "Stabilization phase");
        assert_eq!(market_cycle_position(4.0, 8.0), "Mid-growth phase");
    }

    #[test]
    fn test_risk_assessment() {
        let building = json!({"construction_activity": {"supply_pipeline": {"impact_on_supply": "High"}}});
        let result = processor().process_data(
            &real_estate(250000.0, 10.0, 12.0, 5.0, 8.0),
            &economics(40000.0, 8.0),
            None,
            Some(&building),
        );
        let r = &result["risk_assessment"];
        assert_eq!(r["price_volatility"], json!("High"));
        assert_eq!(r["liquidity_score"], json!(40.0));
        assert_eq!(r["oversupply_risk"], json!("High"));
        assert_eq!(r["economic_dependency_risk"], json!("High"));
    }

    #[test]
    fn test_empty_sections_give_unknown_metrics() {
        let result = processor().process_data(&json!({}), &json!({}), None, None);
        for key in [
            "affordability_metrics",
            "rental_market_potential",
            "target_demographic_analysis",
            "market_dynamics",
            "risk_assessment",
            "comparative_ranking",
        ] {
            assert!(result[key].is_object(), "{key} should be present");
        }

        let a = &result["affordability_metrics"];
        assert_eq!(a["price_to_income_ratio"], Value::Null);
        assert_eq!(a["mortgage_affordability_index"], Value::Null);
        assert_eq!(a["ownership_accessibility_score"], Value::Null);

        assert_eq!(result["rental_market_potential"]["estimated_rental_yield"], json!(0.042));
        let segments = &result["target_demographic_analysis"]["growing_segments"];
        assert!(segments.as_array().unwrap().iter().all(|s| s["is_estimated"] == json!(true)));

        let m = &result["market_dynamics"];
        assert_eq!(m["estimated_new_households"], Value::Null);
        assert_eq!(m["market_cycle_position"], json!("Mid-growth phase"));
    }

    #[test]
    fn test_scores_and_ranks() {
        assert_eq!(liquidity_score(200.0, 20.0), 80.0);
        assert_eq!(liquidity_score(15.0, -7.0), 35.0);
        assert_eq!(value_for_money_score(Some(3.5)), 80.0);
        assert_eq!(value_for_money_score(Some(9.0)), 30.0);
        assert_eq!(value_for_money_score(None), 50.0);
        assert_eq!(growth_potential_score(6.0, 3.0), 75.0);
        assert_eq!(rank(100.0), 1.0);
        assert_eq!(rank(30.0), 71.0);

        let demo = json!({"population_overview": {"population_trend": {"five_year_growth": 3.0}}});
        let result = processor().process_data(
            &real_estate(450000.0, 6.0, 0.0, 0.0, 100.0),
            &economics(50000.0, 8.0),
            Some(&demo),
            None,
        );
        let c = &result["comparative_ranking"];
        assert_eq!(c["value_for_money_rank"], json!(71.0));
        assert_eq!(c["growth_potential_rank"], json!(26.0));
        assert_eq!(c["overall_investment_score"], json!(57.0));
    }
}
