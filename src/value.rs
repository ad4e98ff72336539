//! Row model and scalar coercions.
//!
//! Rows arrive from the upstream table with no declared schema, so every
//! cell is a [`Value`] (null, boolean, number, or text) and a [`Row`] is an
//! ordered mapping from case-preserving column name to value. The engine
//! never trusts the shape of a row: lookups on unknown columns return
//! `None`, and the coercion helpers here define the fallback for every
//! malformed or missing cell.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
    ser::SerializeMap,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric reading of the cell, `None` when the cell holds no number.
    ///
    /// Blank text and null read as zero; text that does not parse, and
    /// non-finite results, read as `None`.
    pub fn to_number(&self) -> Option<f64> {
        let number = match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().ok()?
                }
            }
        };
        number.is_finite().then_some(number)
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
        }
    }

    /// Calendar date carried by the cell, if any.
    ///
    /// Numbers are epoch milliseconds; text accepts RFC 3339 plus the
    /// common date and datetime layouts found in exported tables.
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Number(n) if n.is_finite() => {
                DateTime::<Utc>::from_timestamp_millis(*n as i64).map(|dt| dt.date_naive())
            }
            Value::Text(s) => parse_date_text(s.trim()),
            _ => None,
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Financial reading of an optional cell. Anything that is not a finite
/// number contributes zero so one malformed row cannot poison a sum.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    value.and_then(Value::to_number).unwrap_or(0.0)
}

pub fn coerce_text(value: Option<&Value>) -> String {
    value.map(Value::as_display).unwrap_or_default()
}

pub fn coerce_date(value: Option<&Value>) -> Option<NaiveDate> {
    value.and_then(Value::to_date)
}

fn parse_date_text(value: &str) -> Option<NaiveDate> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];
    const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y"];

    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.date_naive());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, fmt) {
            return Some(parsed.date_naive());
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(parsed.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

/// One record from the upstream table.
///
/// Column order is the order the source delivered them in; role inference
/// depends on it when several columns match the same candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets `column`, replacing an existing cell in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
                let mut row = Row::new();
                while let Some((column, value)) =
                    access.next_entry::<String, serde_json::Value>()?
                {
                    row.insert(column, Value::from_json(&value));
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_number_treats_blank_and_null_as_zero() {
        assert_eq!(Value::Null.to_number(), Some(0.0));
        assert_eq!(Value::text("  ").to_number(), Some(0.0));
        assert_eq!(Value::text(" 12.5 ").to_number(), Some(12.5));
        assert_eq!(Value::Bool(true).to_number(), Some(1.0));
    }

    #[test]
    fn to_number_rejects_garbage_and_non_finite() {
        assert_eq!(Value::text("abc").to_number(), None);
        assert_eq!(Value::text("1,000").to_number(), None);
        assert_eq!(Value::text("inf").to_number(), None);
        assert_eq!(Value::Number(f64::NAN).to_number(), None);
        assert_eq!(coerce_number(Some(&Value::text("abc"))), 0.0);
        assert_eq!(coerce_number(None), 0.0);
    }

    #[test]
    fn as_display_drops_integral_fraction() {
        assert_eq!(Value::Number(5.0).as_display(), "5");
        assert_eq!(Value::Number(1.5).as_display(), "1.5");
        assert_eq!(Value::Null.as_display(), "");
    }

    #[test]
    fn to_date_accepts_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        for raw in [
            "2024-01-05",
            "2024-01-05T10:11:12Z",
            "2024-01-05T10:11:12.123+02:00",
            "2024-01-05 10:11:12.5",
            "2024-01-05 10:11:12+00",
            "2024/01/05",
        ] {
            assert_eq!(Value::text(raw).to_date(), Some(expected), "{raw}");
        }
        assert_eq!(Value::Number(1_704_412_800_000.0).to_date(), Some(expected));
        assert_eq!(Value::text("soon").to_date(), None);
        assert_eq!(Value::Bool(true).to_date(), None);
    }

    #[test]
    fn row_preserves_insertion_order_and_replaces_in_place() {
        let mut row = Row::new().with("b", 1.0).with("A", "x");
        row.insert("b", 2.0);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["b", "A"]);
        assert_eq!(row.get("b"), Some(&Value::Number(2.0)));
        assert_eq!(row.get("a"), None);
    }

    #[test]
    fn row_deserialize_stringifies_nested_values() {
        let row: Row = serde_json::from_str(r#"{"tags":["a","b"],"n":2}"#).unwrap();
        assert_eq!(row.get("tags"), Some(&Value::text(r#"["a","b"]"#)));
        assert_eq!(row.get("n"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn row_json_round_trip_keeps_column_order() {
        let raw = r#"{"zeta":1.5,"alpha":"x","mid":null,"flag":true}"#;
        let row: Row = serde_json::from_str(raw).unwrap();
        assert_eq!(
            row.columns().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mid", "flag"]
        );
        assert_eq!(serde_json::to_string(&row).unwrap(), raw);
    }
}
