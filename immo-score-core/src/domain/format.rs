// immo-score-core/src/domain/format.rs

use crate::domain::settings::NumberFormat;

pub const NOT_AVAILABLE: &str = "N/A";

/// Locale-aware number rendering (`1.234,56`, `+10,0%`) driven by [`NumberFormat`].
#[derive(Debug, Clone, Default)]
pub struct NumberFormatter {
    format: NumberFormat,
}

impl NumberFormatter {
    pub fn new(format: NumberFormat) -> Self {
        Self { format }
    }

    /// `None` renders as `N/A`. `decimal_places` falls back to the configured default.
    pub fn format_number(&self, value: Option<f64>, decimal_places: Option<usize>) -> String {
        let Some(value) = value.filter(|v| v.is_finite()) else {
            return NOT_AVAILABLE.to_string();
        };
        let places = decimal_places.unwrap_or(self.format.decimal_places);

        let rendered = format!("{:.*}", places, value.abs());
        let (int_part, frac_part) = match rendered.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (rendered.as_str(), None),
        };

        let mut out = String::with_capacity(rendered.len() + 4);
        let is_zero = rendered.chars().all(|c| c == '0' || c == '.');
        if value < 0.0 && !is_zero {
            out.push('-');
        }
        out.push_str(&group_thousands(int_part, &self.format.thousands_separator));
        if let Some(frac) = frac_part {
            out.push_str(&self.format.decimal_separator);
            out.push_str(frac);
        }
        out
    }

    pub fn format_price(&self, value: Option<f64>) -> String {
        self.format_number(value, Some(self.format.price_decimal_places))
    }

    pub fn format_percentage(&self, value: Option<f64>, include_sign: bool) -> String {
        if value.is_none() {
            return NOT_AVAILABLE.to_string();
        }
        let mut formatted = self.format_number(value, Some(self.format.percentage_decimal_places));
        if include_sign {
            formatted.push('%');
        }
        formatted
    }

    /// Percentage change with a signed label: `(Some(10.0), "+10,0%")`.
    ///
    /// Returns `(None, "N/A")` when either operand is missing or `previous` is zero.
    pub fn calculate_change(&self, current: Option<f64>, previous: Option<f64>) -> (Option<f64>, String) {
        match (current, previous) {
            (Some(c), Some(p)) if p != 0.0 => {
                let change = (c - p) / p * 100.0;
                (Some(change), self.format_signed_percentage(Some(change)))
            }
            _ => (None, NOT_AVAILABLE.to_string()),
        }
    }

    /// Signed label for an already computed change, in percentage points or percent.
    ///
    /// The sign follows the value, not its rounding: `-0.04` renders `-0,0%`.
    pub fn format_signed_percentage(&self, value: Option<f64>) -> String {
        match value {
            Some(v) => {
                let sign = if v >= 0.0 { "+" } else { "-" };
                format!("{sign}{}", self.format_percentage(Some(v.abs()), true))
            }
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

pub fn calculate_avg(total: Option<f64>, count: Option<f64>) -> Option<f64> {
    match (total, count) {
        (Some(t), Some(c)) if c != 0.0 => Some(t / c),
        _ => None,
    }
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn fr() -> NumberFormatter {
        NumberFormatter::default()
    }

    #[test]
    fn test_format_number_uses_configured_separators() {
        let f = fr();
        assert_eq!(f.format_number(Some(1234567.891), None), "1.234.567,89");
        assert_eq!(f.format_number(Some(999.0), Some(0)), "999");
        assert_eq!(f.format_number(Some(-1234.5), Some(1)), "-1.234,5");
        assert_eq!(f.format_number(Some(-0.01), Some(1)), "0,0");
        assert_eq!(f.format_number(None, None), "N/A");
    }

    #[test]
    fn test_price_and_percentage() {
        let f = fr();
        assert_eq!(f.format_price(Some(285_499.6)), "285.500");
        assert_eq!(f.format_percentage(Some(12.345), true), "12,3%");
        assert_eq!(f.format_percentage(Some(12.345), false), "12,3");
    }

    #[test]
    fn test_calculate_change_positive_and_negative() {
        let f = fr();
        assert_eq!(f.calculate_change(Some(110.0), Some(100.0)), (Some(10.0), "+10,0%".to_string()));
        let (pct, label) = f.calculate_change(Some(90.0), Some(100.0));
        assert_eq!(pct, Some(-10.0));
        assert_eq!(label, "-10,0%");
        assert_eq!(f.calculate_change(Some(100.0), Some(100.0)).1, "+0,0%");
        assert_eq!(f.calculate_change(Some(99.96), Some(100.0)).1, "-0,0%");
        assert_eq!(f.format_signed_percentage(Some(-0.04)), "-0,0%");
    }

    #[test]
    fn test_calculate_change_guards() {
        let f = fr();
        let na = (None, "N/A".to_string());
        assert_eq!(f.calculate_change(None, Some(100.0)), na);
        assert_eq!(f.calculate_change(Some(100.0), None), na);
        assert_eq!(f.calculate_change(Some(100.0), Some(0.0)), na);
    }

    #[test]
    fn test_english_separators() {
        let f = NumberFormatter::new(NumberFormat {
            decimal_separator: ".".into(),
            thousands_separator: ",".into(),
            ..NumberFormat::default()
        });
        assert_eq!(f.format_number(Some(1234.5), Some(2)), "1,234.50");
    }

    #[test]
    fn test_calculate_avg() {
        assert_eq!(calculate_avg(Some(10.0), Some(4.0)), Some(2.5));
        assert_eq!(calculate_avg(Some(10.0), Some(0.0)), None);
        assert_eq!(calculate_avg(None, Some(2.0)), None);
    }
}
