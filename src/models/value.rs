// file: src/models/value.rs
// description: tagged column values and ordered row mappings read from any dialect
// reference: internal data structures

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use indexmap::IndexMap;
use serde::ser::Serializer;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;

/// A single column value as decoded from a database row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Truthiness used when concatenating text columns: null, empty strings,
    /// zero, NaN and `false` are dropped.
    pub fn is_truthy(&self) -> bool {
        match self {
            SqlValue::Null => false,
            SqlValue::Bool(b) => *b,
            SqlValue::Int(i) => *i != 0,
            SqlValue::Float(f) => *f != 0.0 && !f.is_nan(),
            SqlValue::Text(s) => !s.is_empty(),
            SqlValue::Bytes(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            SqlValue::Bool(b) => Some(*b as i64),
            SqlValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// JSON form used for vector metadata. Nulls map to `None` because the
    /// remote index refuses null metadata values.
    pub fn to_metadata_value(&self) -> Option<Value> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(b) => Some(Value::Bool(*b)),
            SqlValue::Int(i) => Some(Value::Number((*i).into())),
            SqlValue::Float(f) => Number::from_f64(*f).map(Value::Number),
            SqlValue::Text(s) => Some(Value::String(s.clone())),
            SqlValue::Bytes(b) => Some(Value::String(BASE64.encode(b))),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => n.as_f64().map(SqlValue::Float).unwrap_or(SqlValue::Null),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "null"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(s) => write!(f, "{}", s),
            SqlValue::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SqlValue::Null => serializer.serialize_none(),
            SqlValue::Bool(b) => serializer.serialize_bool(*b),
            SqlValue::Int(i) => serializer.serialize_i64(*i),
            SqlValue::Float(f) => serializer.serialize_f64(*f),
            SqlValue::Text(s) => serializer.serialize_str(s),
            SqlValue::Bytes(b) => serializer.serialize_str(&BASE64.encode(b)),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Column name to value mapping that keeps the column order of the result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    columns: IndexMap<String, SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: IndexMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    /// Catalog views differ in the case of their column labels across dialects.
    pub fn get_ignore_case(&self, column: &str) -> Option<&SqlValue> {
        self.get(column).or_else(|| {
            self.columns
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(column))
                .map(|(_, value)| value)
        })
    }

    /// Sets `column`. An existing column keeps its position.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn to_metadata(&self) -> Map<String, Value> {
        self.iter()
            .filter_map(|(name, value)| value.to_metadata_value().map(|v| (name.to_string(), v)))
            .collect()
    }

    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        object
            .iter()
            .map(|(name, value)| (name.clone(), SqlValue::from_json(value)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness_matches_text_filter() {
        assert!(!SqlValue::Null.is_truthy());
        assert!(!SqlValue::Text(String::new()).is_truthy());
        assert!(!SqlValue::Int(0).is_truthy());
        assert!(!SqlValue::Float(0.0).is_truthy());
        assert!(!SqlValue::Float(f64::NAN).is_truthy());
        assert!(!SqlValue::Bool(false).is_truthy());

        assert!(SqlValue::Text(" ".to_string()).is_truthy());
        assert!(SqlValue::Int(-3).is_truthy());
        assert!(SqlValue::Bool(true).is_truthy());
        assert!(SqlValue::Bytes(vec![]).is_truthy());
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(SqlValue::Int(42).to_string(), "42");
        assert_eq!(SqlValue::Float(1.5).to_string(), "1.5");
        assert_eq!(SqlValue::Float(2.0).to_string(), "2");
        assert_eq!(SqlValue::Bool(true).to_string(), "true");
        assert_eq!(SqlValue::Null.to_string(), "null");
        assert_eq!(SqlValue::Bytes(b"abc".to_vec()).to_string(), "abc");
    }

    #[test]
    fn test_row_insert_replaces_in_place() {
        let mut row: Row = [("id", SqlValue::Int(1)), ("name", SqlValue::from("Ann"))]
            .into_iter()
            .collect();
        row.insert("id", 7i64);
        row.insert("extra", "x");

        let names: Vec<&str> = row.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["id", "name", "extra"]);
        assert_eq!(row.get("id"), Some(&SqlValue::Int(7)));
    }

    #[test]
    fn test_wide_row_keeps_result_set_order() {
        let row: Row = (0..500)
            .rev()
            .map(|i| (format!("c{}", i), SqlValue::Int(i)))
            .collect();

        assert_eq!(row.len(), 500);
        assert_eq!(row.iter().next().map(|(n, _)| n), Some("c499"));
        assert_eq!(row.iter().last().map(|(n, _)| n), Some("c0"));
        assert_eq!(row.get("c250"), Some(&SqlValue::Int(250)));
    }

    #[test]
    fn test_get_ignore_case() {
        let row: Row = [("TABLE_NAME", "users")].into_iter().collect();
        assert_eq!(row.get("table_name"), None);
        assert_eq!(row.get_ignore_case("table_name"), Some(&SqlValue::from("users")));
    }

    #[test]
    fn test_metadata_drops_nulls_and_encodes_bytes() {
        let row: Row = [
            ("id", SqlValue::Int(1)),
            ("note", SqlValue::Null),
            ("blob", SqlValue::Bytes(vec![0xff, 0x00])),
        ]
        .into_iter()
        .collect();

        let metadata = row.to_metadata();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata["id"], Value::from(1));
        assert_eq!(metadata["blob"], Value::from("/wA="));
    }

    #[test]
    fn test_serialize_keeps_column_order() {
        let row: Row = [("b", SqlValue::Int(1)), ("a", SqlValue::Null)]
            .into_iter()
            .collect();
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"b":1,"a":null}"#);
    }
}
