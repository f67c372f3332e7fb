// immo-score-core/src/domain/period.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::domain::error::DomainError;

static ANNUAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})$").unwrap_or_else(|_| unreachable!()));
static QUARTERLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-Q([1-4])$").unwrap_or_else(|_| unreachable!()));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Year,
    Quarter,
}

/// A reporting period: `YYYY` or `YYYY-QN`.
///
/// Back-dating never changes granularity: a quarterly period only yields
/// quarterly periods and an annual one only annual periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Annual { year: i32 },
    Quarterly { year: i32, quarter: u8 },
}

impl Period {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if let Some(caps) = ANNUAL.captures(raw) {
            let year = caps[1]
                .parse()
                .map_err(|_| DomainError::InvalidPeriod(raw.to_string()))?;
            return Ok(Period::Annual { year });
        }
        if let Some(caps) = QUARTERLY.captures(raw) {
            let year = caps[1]
                .parse()
                .map_err(|_| DomainError::InvalidPeriod(raw.to_string()))?;
            let quarter = caps[2]
                .parse()
                .map_err(|_| DomainError::InvalidPeriod(raw.to_string()))?;
            return Ok(Period::Quarterly { year, quarter });
        }
        Err(DomainError::InvalidPeriod(raw.to_string()))
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Period::Annual { .. } => Granularity::Year,
            Period::Quarterly { .. } => Granularity::Quarter,
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            Period::Annual { year } | Period::Quarterly { year, .. } => *year,
        }
    }

    pub fn quarter(&self) -> Option<u8> {
        match self {
            Period::Annual { .. } => None,
            Period::Quarterly { quarter, .. } => Some(*quarter),
        }
    }

    /// The annual period containing this one.
    pub fn annual(&self) -> Period {
        Period::Annual { year: self.year() }
    }

    /// `n` periods earlier, at the same granularity.
    pub fn back(&self, n: u32) -> Period {
        match *self {
            Period::Annual { year } => Period::Annual {
                year: year - n as i32,
            },
            Period::Quarterly { year, quarter } => {
                let index = i64::from(year) * 4 + i64::from(quarter) - 1 - i64::from(n);
                Period::Quarterly {
                    year: index.div_euclid(4) as i32,
                    quarter: (index.rem_euclid(4) + 1) as u8,
                }
            }
        }
    }

    /// Same period, `years` years earlier (same quarter for quarterly periods).
    pub fn years_back(&self, years: u32) -> Period {
        match self.granularity() {
            Granularity::Year => self.back(years),
            Granularity::Quarter => self.back(years * 4),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Annual { year } => write!(f, "{year}"),
            Period::Quarterly { year, quarter } => write!(f, "{year}-Q{quarter}"),
        }
    }
}

impl FromStr for Period {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::parse(s)
    }
}

/// String-level back-dating: `resolve_back("2024-Q1", 1) == "2023-Q4"`.
pub fn resolve_back(period: &str, n: u32) -> Result<String, DomainError> {
    Ok(Period::parse(period)?.back(n).to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_parse_both_granularities() -> Result<()> {
        assert_eq!(Period::parse("2023")?, Period::Annual { year: 2023 });
        assert_eq!(
            Period::parse("2024-Q4")?,
            Period::Quarterly {
                year: 2024,
                quarter: 4
            }
        );
        assert_eq!(Period::parse("2024-Q4")?.granularity(), Granularity::Quarter);
        Ok(())
    }

    #[test]
    fn test_malformed_periods_are_rejected() {
        for raw in ["", "23", "2024Q4", "2024-Q5", "2024-Q0", "2024-q1", "20a4", "2024-Q12"] {
            assert!(
                matches!(Period::parse(raw), Err(DomainError::InvalidPeriod(_))),
                "{raw} should not parse"
            );
        }
    }

    #[test]
    fn test_annual_back_subtracts_years() -> Result<()> {
        for year in [2000, 2015, 2023] {
            for n in 0..20u32 {
                assert_eq!(
                    resolve_back(&year.to_string(), n)?,
                    (year - n as i32).to_string()
                );
            }
        }
        Ok(())
    }

    #[test]
    fn test_quarter_borrow_decrements_year() -> Result<()> {
        assert_eq!(resolve_back("2024-Q1", 1)?, "2023-Q4");
        assert_eq!(resolve_back("2024-Q3", 2)?, "2024-Q1");
        assert_eq!(resolve_back("2024-Q2", 6)?, "2022-Q4");
        assert_eq!(resolve_back("2024-Q4", 0)?, "2024-Q4");
        Ok(())
    }

    #[test]
    fn test_four_quarters_back_is_one_year_back() -> Result<()> {
        for year in [2001, 2010, 2024] {
            for quarter in 1..=4u8 {
                let p = Period::Quarterly { year, quarter };
                for k in 0..6u32 {
                    assert_eq!(
                        p.back(4 * k),
                        Period::Quarterly {
                            year: year - k as i32,
                            quarter
                        }
                    );
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_years_back_and_annual() -> Result<()> {
        let p = Period::parse("2024-Q4")?;
        assert_eq!(p.years_back(5).to_string(), "2019-Q4");
        assert_eq!(p.annual().to_string(), "2024");
        assert_eq!(Period::parse("2023")?.years_back(5).to_string(), "2018");
        Ok(())
    }
}
