//! Record and record-set types
//!
//! A [`Record`] maps field names to JSON values. A [`RecordSet`] is the top
//! level shape of a stored file: either a single record or an ordered
//! sequence of records. Both shapes are legal and are preserved through
//! decode, mutate and encode.
//!
//! ## Field order
//!
//! `serde_json` is built with `preserve_order`, so a record keeps the order
//! its fields were inserted in. Column listings and tabular headers rely on
//! this.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A single record: field name to scalar or nested value
pub type Record = Map<String, Value>;

/// The content of a stored file, as records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordSet {
    /// A file holding one object
    Single(Record),
    /// A file holding an array of objects
    Many(Vec<Record>),
}

impl RecordSet {
    /// An empty sequence
    pub fn empty() -> Self {
        RecordSet::Many(Vec::new())
    }

    /// Number of records (1 for a single record)
    pub fn len(&self) -> usize {
        match self {
            RecordSet::Single(_) => 1,
            RecordSet::Many(records) => records.len(),
        }
    }

    /// True if this is an empty sequence
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the records as a slice, normalizing a single record to a
    /// one-element sequence.
    pub fn as_slice(&self) -> &[Record] {
        match self {
            RecordSet::Single(record) => std::slice::from_ref(record),
            RecordSet::Many(records) => records,
        }
    }

    /// Consume into a sequence of records
    pub fn into_vec(self) -> Vec<Record> {
        match self {
            RecordSet::Single(record) => vec![record],
            RecordSet::Many(records) => records,
        }
    }

    /// Iterate over the records
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.as_slice().iter()
    }
}

impl From<Record> for RecordSet {
    fn from(record: Record) -> Self {
        RecordSet::Single(record)
    }
}

impl From<Vec<Record>> for RecordSet {
    fn from(records: Vec<Record>) -> Self {
        RecordSet::Many(records)
    }
}

impl From<RecordSet> for Value {
    fn from(set: RecordSet) -> Self {
        match set {
            RecordSet::Single(record) => Value::Object(record),
            RecordSet::Many(records) => Value::Array(records.into_iter().map(Value::Object).collect()),
        }
    }
}

impl TryFrom<Value> for RecordSet {
    type Error = Error;

    /// Accepts an object, or an array whose elements are all objects.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(record) => Ok(RecordSet::Single(record)),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(record) => Ok(record),
                    other => Err(Error::UnreadableContent {
                        reason: format!("element {} is {}, expected an object", i, kind(&other)),
                    }),
                })
                .collect::<Result<Vec<_>>>()
                .map(RecordSet::Many),
            other => Err(Error::UnreadableContent {
                reason: format!("top level is {}, expected an object or array", kind(&other)),
            }),
        }
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// Content format
// =============================================================================

/// Serialized notation of a stored file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Structured-object notation (JSON)
    Json,
    /// Tabular-text notation (CSV), first row is the header
    Csv,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => write!(f, "json"),
            Format::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            other => Err(Error::invalid_input(format!(
                "unknown format '{}', expected \"json\" or \"csv\"",
                other
            ))),
        }
    }
}

// =============================================================================
// Scalar helpers
// =============================================================================

/// Render a value as the text a tabular cell would hold.
///
/// Strings are unquoted, null is empty, nested values are JSON text.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

/// Interpret a value as a number, accepting numeric strings.
pub fn scalar_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Equality that tolerates the string-only nature of tabular fields.
///
/// Same-typed values compare structurally. A string compared with a number
/// or boolean compares by text, so `"1"` equals `1` and `"true"` equals `true`.
pub fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::String(s), other @ (Value::Number(_) | Value::Bool(_)))
        | (other @ (Value::Number(_) | Value::Bool(_)), Value::String(s)) => {
            match (s.trim().parse::<f64>(), scalar_number(other)) {
                (Ok(x), Some(y)) => x == y,
                _ => s == &scalar_text(other),
            }
        }
        _ => a == b,
    }
}

/// Build a JSON number from a float, emitting an integer when it is whole.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_set_from_object_is_single() {
        let set = RecordSet::try_from(json!({"id": 1})).unwrap();
        assert!(matches!(set, RecordSet::Single(_)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0]["id"], json!(1));
    }

    #[test]
    fn test_record_set_from_array_is_many() {
        let set = RecordSet::try_from(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert!(matches!(set, RecordSet::Many(ref v) if v.len() == 2));
    }

    #[test]
    fn test_record_set_rejects_scalars() {
        assert!(matches!(
            RecordSet::try_from(json!(42)),
            Err(Error::UnreadableContent { .. })
        ));
        assert!(matches!(
            RecordSet::try_from(json!([{"id": 1}, "loose"])),
            Err(Error::UnreadableContent { .. })
        ));
    }

    #[test]
    fn test_record_set_value_round_trip_keeps_shape() {
        let single = json!({"id": 1, "name": "a"});
        let set = RecordSet::try_from(single.clone()).unwrap();
        assert_eq!(Value::from(set), single);

        let many = json!([{"id": 1}]);
        let set = RecordSet::try_from(many.clone()).unwrap();
        assert_eq!(Value::from(set), many);
    }

    #[test]
    fn test_field_order_preserved() {
        let set = RecordSet::try_from(json!({"z": 1, "a": 2, "m": 3})).unwrap();
        let keys: Vec<_> = set.as_slice()[0].keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_format_parse_and_display() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("csv".parse::<Format>().unwrap(), Format::Csv);
        assert!("xml".parse::<Format>().is_err());
        assert_eq!(Format::Csv.to_string(), "csv");
    }

    #[test]
    fn test_scalar_eq_coerces_tabular_strings() {
        assert!(scalar_eq(&json!("1"), &json!(1)));
        assert!(scalar_eq(&json!(1), &json!("1.0")));
        assert!(scalar_eq(&json!("true"), &json!(true)));
        assert!(scalar_eq(&json!(2), &json!(2.0)));
        assert!(!scalar_eq(&json!("a"), &json!(1)));
        assert!(!scalar_eq(&json!(null), &json!("")));
        assert!(scalar_eq(&json!("active"), &json!("active")));
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!(null)), "");
        assert_eq!(scalar_text(&json!("x")), "x");
        assert_eq!(scalar_text(&json!(1.5)), "1.5");
        assert_eq!(scalar_text(&json!({"a": 1})), "{\"a\":1}");
    }

    #[test]
    fn test_number_value_emits_integers_when_whole() {
        assert_eq!(number_value(60.0), json!(60));
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(number_value(f64::NAN), Value::Null);
    }

    #[test]
    fn test_number_value_out_of_i64_range_stays_float() {
        let two_pow_63 = 2f64.powi(63);
        assert_eq!(number_value(two_pow_63).as_f64(), Some(two_pow_63));
        assert_eq!(number_value(two_pow_63).as_i64(), None);
        assert_eq!(number_value(-two_pow_63), json!(i64::MIN));
    }
}
