//! Lenient readers over untrusted JSON.
//!
//! Every helper here is total: a value of the wrong type reads as absent.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static LEADING_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?)(\d+)").expect("valid regex"));

/// The first non-null value among `names` on an object.
pub(crate) fn field<'v>(raw: &'v Value, names: &[&str]) -> Option<&'v Value> {
    let obj = raw.as_object()?;
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|v| !v.is_null())
}

/// A trimmed, non-empty textual rendering of a scalar.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Read a list of strings. Anything but an array is an empty list; blank
/// entries are dropped, and objects contribute their `name`/`text` field.
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => field(item, &["name", "text", "description", "criterion"])
                .and_then(scalar_string),
            other => scalar_string(other),
        })
        .collect()
}

/// Whether a present, non-null value failed to read as a list.
pub(crate) fn is_non_list(value: Option<&Value>) -> bool {
    matches!(value, Some(v) if !v.is_array() && !v.is_null())
}

/// Parse an integer the way a lenient reader of "52", "52 years" or 52.7
/// would. Out-of-range magnitudes saturate.
pub(crate) fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let caps = LEADING_INTEGER.captures(s)?;
            let negative = &caps[1] == "-";
            let magnitude = &caps[2];
            let parsed = magnitude.parse::<i64>().unwrap_or(i64::MAX);
            Some(if negative { -parsed } else { parsed })
        }
        _ => None,
    }
}

/// Compact rendering of a raw value for correction messages.
pub(crate) fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "<missing>".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            let text = other.to_string();
            if text.chars().count() > 80 {
                let head: String = text.chars().take(77).collect();
                format!("{head}...")
            } else {
                text
            }
        }
    }
}
