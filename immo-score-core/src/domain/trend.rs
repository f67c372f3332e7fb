// immo-score-core/src/domain/trend.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::settings::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    StrongIncrease,
    Increase,
    Stable,
    Decrease,
    StrongDecrease,
    Unknown,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongIncrease => "strong_increase",
            Self::Increase => "increase",
            Self::Stable => "stable",
            Self::Decrease => "decrease",
            Self::StrongDecrease => "strong_decrease",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketTrend {
    Hot,
    Warm,
    Balanced,
    Cold,
    Cooling,
    Volatile,
    Unknown,
}

impl MarketTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Balanced => "balanced",
            Self::Cold => "cold",
            Self::Cooling => "cooling",
            Self::Volatile => "volatile",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MarketTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Threshold-driven classification shared by every processor.
#[derive(Debug, Clone, Default)]
pub struct TrendClassifier {
    thresholds: Thresholds,
}

impl TrendClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn classify_trend(&self, change: Option<f64>) -> Trend {
        self.classify_trend_with(change, self.thresholds.trend_positive, self.thresholds.trend_negative)
    }

    /// `[pos, ∞)` strong increase, `(0, pos)` increase, `[neg, 0]` stable,
    /// `[2·neg, neg)` decrease, below that strong decrease.
    pub fn classify_trend_with(&self, change: Option<f64>, positive: f64, negative: f64) -> Trend {
        let Some(c) = change else {
            return Trend::Unknown;
        };
        if c >= positive {
            Trend::StrongIncrease
        } else if c > 0.0 {
            Trend::Increase
        } else if c >= negative {
            Trend::Stable
        } else if c >= negative * 2.0 {
            Trend::Decrease
        } else {
            Trend::StrongDecrease
        }
    }

    pub fn classify_market_trend(&self, price_change: Option<f64>, transaction_change: Option<f64>) -> MarketTrend {
        let (Some(p), Some(t)) = (price_change, transaction_change) else {
            return MarketTrend::Unknown;
        };
        if p > self.thresholds.high_price_growth && t > 0.0 {
            MarketTrend::Hot
        } else if p > 0.0 && t > 0.0 {
            MarketTrend::Warm
        } else if p.abs() <= 2.0 && t.abs() <= 5.0 {
            MarketTrend::Balanced
        } else if p < self.thresholds.low_price_growth && t < 0.0 {
            MarketTrend::Cold
        } else if p < 0.0 && t < 0.0 {
            MarketTrend::Cooling
        } else if (p > 0.0 && t < 0.0) || (p < 0.0 && t > 0.0) {
            MarketTrend::Volatile
        } else {
            MarketTrend::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_ladder() {
        let c = TrendClassifier::default();
        assert_eq!(c.classify_trend(Some(5.0)), Trend::StrongIncrease);
        assert_eq!(c.classify_trend(Some(0.1)), Trend::Increase);
        assert_eq!(c.classify_trend(Some(0.0)), Trend::Stable);
        assert_eq!(c.classify_trend(Some(-5.0)), Trend::Stable);
        assert_eq!(c.classify_trend(Some(-7.0)), Trend::Decrease);
        assert_eq!(c.classify_trend(Some(-10.5)), Trend::StrongDecrease);
        assert_eq!(c.classify_trend(None), Trend::Unknown);
    }

    #[test]
    fn test_custom_cutoffs() {
        let c = TrendClassifier::default();
        assert_eq!(c.classify_trend_with(Some(9.0), 10.0, -5.0), Trend::Increase);
        assert_eq!(c.classify_trend_with(Some(10.0), 10.0, -5.0), Trend::StrongIncrease);
    }

    #[test]
    fn test_market_trend() {
        let c = TrendClassifier::default();
        assert_eq!(c.classify_market_trend(Some(12.0), Some(3.0)), MarketTrend::Hot);
        assert_eq!(c.classify_market_trend(Some(4.0), Some(3.0)), MarketTrend::Warm);
        assert_eq!(c.classify_market_trend(Some(-1.0), Some(-2.0)), MarketTrend::Balanced);
        assert_eq!(c.classify_market_trend(Some(-8.0), Some(-10.0)), MarketTrend::Cold);
        assert_eq!(c.classify_market_trend(Some(-3.0), Some(-10.0)), MarketTrend::Cooling);
        assert_eq!(c.classify_market_trend(Some(6.0), Some(-10.0)), MarketTrend::Volatile);
        assert_eq!(c.classify_market_trend(None, Some(1.0)), MarketTrend::Unknown);
    }
}
