// immo-score-core/src/infrastructure/json.rs

// JSON report sink: rendering honours indent / ensure_ascii / sort_keys.

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use std::io;
use std::path::Path;

use crate::domain::settings::JsonFormat;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;

pub fn render_json(value: &Value, format: &JsonFormat) -> Result<String, InfrastructureError> {
    let sorted;
    let value = if format.sort_keys {
        sorted = sort_keys(value);
        &sorted
    } else {
        value
    };

    let bytes = match format.indent {
        Some(width) => {
            let indent = b" ".repeat(width);
            serialize_with(value, PrettyFormatter::with_indent(&indent), format.ensure_ascii)?
        }
        None => serialize_with(value, CompactFormatter, format.ensure_ascii)?,
    };

    String::from_utf8(bytes).map_err(|e| InfrastructureError::Io(io::Error::other(e)))
}

pub fn write_json(path: &Path, value: &Value, format: &JsonFormat) -> Result<(), InfrastructureError> {
    let rendered = render_json(value, format)?;
    atomic_write(path, rendered)
}

pub fn read_json(path: &Path) -> Result<Value, InfrastructureError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn serialize_with<F: Formatter>(value: &Value, formatter: F, ensure_ascii: bool) -> Result<Vec<u8>, InfrastructureError> {
    let mut out = Vec::new();
    if ensure_ascii {
        let mut ser = Serializer::with_formatter(&mut out, AsciiEscaping { inner: formatter });
        value.serialize(&mut ser)?;
    } else {
        let mut ser = Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut ser)?;
    }
    Ok(out)
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                if let Some(child) = map.get(key) {
                    sorted.insert(key.clone(), sort_keys(child));
                }
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Escapes every non-ASCII char as `\uXXXX` (UTF-16 surrogate pairs above the BMP).
struct AsciiEscaping<F> {
    inner: F,
}

impl<F: Formatter> Formatter for AsciiEscaping<F> {
    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_default_format_keeps_insertion_order_and_accents() -> Result<()> {
        let doc = json!({"zeta": 1, "alpha": "Liège"});
        let out = render_json(&doc, &JsonFormat::default())?;
        assert_eq!(out, "{\n  \"zeta\": 1,\n  \"alpha\": \"Liège\"\n}");
        Ok(())
    }

    #[test]
    fn test_sorted_ascii_compact() -> Result<()> {
        let doc = json!({"zeta": {"b": 1, "a": 2}, "alpha": "Liège"});
        let format = JsonFormat {
            indent: None,
            ensure_ascii: true,
            sort_keys: true,
        };
        let out = render_json(&doc, &format)?;
        assert_eq!(out, r#"{"alpha":"Li\u00e8ge","zeta":{"a":2,"b":1}}"#);
        Ok(())
    }

    #[test]
    fn test_write_then_read() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out").join("r.json");
        let doc = json!({"communes": [1, 2]});
        write_json(&path, &doc, &JsonFormat::default())?;
        assert_eq!(read_json(&path)?, doc);
        Ok(())
    }
}
