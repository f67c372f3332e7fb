// immo-score-core/src/domain/value.rs

// Lenient accessors over the nested JSON records flowing between extractors and processors.
// Warehouse measures can arrive as integers, floats or numeric strings.

use serde_json::Value;

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Walks `a.b.c`; `None` as soon as a segment is missing.
pub fn at_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

pub fn f64_at_path(value: &Value, path: &str) -> Option<f64> {
    at_path(value, path).and_then(as_f64)
}

/// `Some(x)` as a JSON number, `None` (or non-finite) as `null`.
pub fn num(value: Option<f64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

/// Integral values as JSON integers (`120`, not `120.0`), everything else as floats.
pub fn whole(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `true` for null, `{}`, `[]` or a missing value.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Object(m)) => m.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        _ => false,
    }
}

/// Entries of an object, or nothing for any other JSON type.
pub fn entries(value: &Value) -> impl Iterator<Item = (&String, &Value)> {
    value.as_object().into_iter().flat_map(|m| m.iter())
}

/// Renders a warehouse value as an object key (`200` -> `"200"`).
pub fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_lookup() {
        let doc = json!({"a": {"b": {"c": 4.5}}, "s": "12"});
        assert_eq!(f64_at_path(&doc, "a.b.c"), Some(4.5));
        assert_eq!(f64_at_path(&doc, "a.x.c"), None);
        assert_eq!(as_f64(&doc["s"]), Some(12.0));
        assert!(at_path(&doc, "a.b").is_some());
    }

    #[test]
    fn test_num_and_blank() {
        assert_eq!(num(Some(1.5)), json!(1.5));
        assert_eq!(num(None), Value::Null);
        assert_eq!(num(Some(f64::NAN)), Value::Null);
        assert!(is_blank(Some(&json!({}))));
        assert!(is_blank(None));
        assert!(!is_blank(Some(&json!(0))));
    }

    #[test]
    fn test_whole_keeps_counts_integral() {
        assert_eq!(whole(120.0), json!(120));
        assert_eq!(whole(12.5), json!(12.5));
        assert_eq!(whole(f64::NAN), Value::Null);
    }

    #[test]
    fn test_key_string() {
        assert_eq!(key_string(&json!(200)), "200");
        assert_eq!(key_string(&json!("OTHER")), "OTHER");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(-0.04, 1), -0.0);
    }
}
