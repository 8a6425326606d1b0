//! Query engine
//!
//! Filters and aggregates an in-memory record set after a read.
//!
//! A [`Query`] carries two explicit parts:
//! - `filters`: field/[`Predicate`] pairs, combined with logical AND
//! - `aggregates`: [`Aggregate`] directives, computed over the filtered set
//!
//! When a query has no aggregates the filtered records are returned as-is;
//! otherwise a [`Summary`] keyed `"{verb}:{field}"` is returned.
//!
//! The string convention used by loosely-typed callers (`"not:active"`,
//! `"gt:4"`, `$`-prefixed keys as aggregate directives) is accepted by
//! [`Query::from_pairs`] and converted to the tagged form once.

use repotable_core::{number_value, scalar_eq, scalar_number, scalar_text, Error, Record, RecordSet, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Result of an aggregate query: `"{verb}:{field}"` to computed value
pub type Summary = Map<String, Value>;

// =============================================================================
// Predicates
// =============================================================================

/// Test applied to one field of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "lowercase")]
pub enum Predicate {
    /// Field equals the value
    Eq(Value),
    /// Field is absent or differs from the value
    Not(Value),
    /// Field is less than the value
    Lt(Value),
    /// Field is less than or equal to the value
    Lte(Value),
    /// Field is greater than the value
    Gt(Value),
    /// Field is greater than or equal to the value
    Gte(Value),
    /// Field text starts with the string
    Starts(String),
    /// Field text ends with the string
    Ends(String),
    /// Field text contains the string
    Contains(String),
}

impl Predicate {
    /// Parse the `"{op}:{operand}"` string convention. Plain values, and
    /// strings without a known prefix, mean equality. `"eq:"` escapes a
    /// literal that itself starts with a prefix.
    pub fn parse(value: Value) -> Self {
        if let Some((op, operand)) = value.as_str().and_then(|s| s.split_once(':')) {
            let text = || Value::String(operand.to_string());
            let parsed = match op {
                "eq" => Some(Predicate::Eq(text())),
                "not" => Some(Predicate::Not(text())),
                "lt" => Some(Predicate::Lt(text())),
                "lte" => Some(Predicate::Lte(text())),
                "gt" => Some(Predicate::Gt(text())),
                "gte" => Some(Predicate::Gte(text())),
                "starts" => Some(Predicate::Starts(operand.to_string())),
                "ends" => Some(Predicate::Ends(operand.to_string())),
                "contains" => Some(Predicate::Contains(operand.to_string())),
                _ => None,
            };
            if let Some(predicate) = parsed {
                return predicate;
            }
        }
        Predicate::Eq(value)
    }

    /// Evaluate against a record's field; `None` means the field is absent.
    pub fn matches(&self, field: Option<&Value>) -> bool {
        let present = field.filter(|v| !v.is_null());
        match self {
            Predicate::Eq(expected) => field.is_some_and(|v| scalar_eq(v, expected)),
            Predicate::Not(expected) => !field.is_some_and(|v| scalar_eq(v, expected)),
            Predicate::Lt(bound) => present.is_some_and(|v| compare(v, bound) == Some(Ordering::Less)),
            Predicate::Lte(bound) => present.is_some_and(|v| {
                matches!(compare(v, bound), Some(Ordering::Less | Ordering::Equal))
            }),
            Predicate::Gt(bound) => present.is_some_and(|v| compare(v, bound) == Some(Ordering::Greater)),
            Predicate::Gte(bound) => present.is_some_and(|v| {
                matches!(compare(v, bound), Some(Ordering::Greater | Ordering::Equal))
            }),
            Predicate::Starts(s) => present.is_some_and(|v| scalar_text(v).starts_with(s.as_str())),
            Predicate::Ends(s) => present.is_some_and(|v| scalar_text(v).ends_with(s.as_str())),
            Predicate::Contains(s) => present.is_some_and(|v| scalar_text(v).contains(s.as_str())),
        }
    }
}

/// Numeric when both sides are numeric, otherwise by text.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (scalar_number(a), scalar_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => Some(scalar_text(a).cmp(&scalar_text(b))),
    }
}

/// One filter: a field and the predicate it must satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Field name
    pub field: String,
    /// Predicate
    pub predicate: Predicate,
}

// =============================================================================
// Aggregates
// =============================================================================

/// Reduction verb of an aggregate directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Number of records holding the field (`*` counts all records)
    Count,
    /// Sum of numeric values
    Sum,
    /// Mean of numeric values
    Avg,
    /// Smallest value
    Min,
    /// Largest value
    Max,
    /// Occurrences of each distinct value
    Group,
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Reduction::Count => "count",
            Reduction::Sum => "sum",
            Reduction::Avg => "avg",
            Reduction::Min => "min",
            Reduction::Max => "max",
            Reduction::Group => "group",
        };
        f.write_str(verb)
    }
}

impl FromStr for Reduction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "count" => Ok(Reduction::Count),
            "sum" => Ok(Reduction::Sum),
            "avg" | "average" | "mean" => Ok(Reduction::Avg),
            "min" => Ok(Reduction::Min),
            "max" => Ok(Reduction::Max),
            "group" | "groupby" => Ok(Reduction::Group),
            other => Err(Error::invalid_input(format!("unknown aggregate '{}'", other))),
        }
    }
}

/// Aggregate directive: a reduction applied to one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Reduction verb
    pub op: Reduction,
    /// Field the reduction reads
    pub field: String,
}

impl Aggregate {
    /// Summary key for this directive
    pub fn key(&self) -> String {
        format!("{}:{}", self.op, self.field)
    }

    /// Reduce the records to one value.
    pub fn reduce(&self, records: &[Record]) -> Value {
        if self.op == Reduction::Count && self.field == "*" {
            return Value::from(records.len());
        }
        let values: Vec<&Value> = records
            .iter()
            .filter_map(|r| r.get(&self.field))
            .filter(|v| !v.is_null())
            .collect();

        match self.op {
            Reduction::Count => Value::from(values.len()),
            Reduction::Sum => number_value(values.iter().filter_map(|v| scalar_number(v)).sum()),
            Reduction::Avg => {
                let numbers: Vec<f64> = values.iter().filter_map(|v| scalar_number(v)).collect();
                if numbers.is_empty() {
                    Value::Null
                } else {
                    number_value(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
            }
            Reduction::Min => extreme(&values, Ordering::Less),
            Reduction::Max => extreme(&values, Ordering::Greater),
            Reduction::Group => {
                let mut groups = Map::new();
                for value in values {
                    let count = groups
                        .entry(scalar_text(value))
                        .or_insert_with(|| Value::from(0u64));
                    *count = Value::from(count.as_u64().unwrap_or(0) + 1);
                }
                Value::Object(groups)
            }
        }
    }
}

/// Min or max: numeric when every value is numeric, otherwise by text.
fn extreme(values: &[&Value], want: Ordering) -> Value {
    let numbers: Option<Vec<f64>> = values.iter().map(|v| scalar_number(v)).collect();
    match numbers {
        Some(numbers) => numbers
            .into_iter()
            .reduce(|best, n| if n.partial_cmp(&best) == Some(want) { n } else { best })
            .map(number_value)
            .unwrap_or(Value::Null),
        None => values
            .iter()
            .map(|v| scalar_text(v))
            .reduce(|best, s| if s.cmp(&best) == want { s } else { best })
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

// =============================================================================
// Query
// =============================================================================

/// Filters plus aggregate directives
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Filters, all of which must hold
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Aggregate directives over the filtered records
    #[serde(default)]
    pub aggregates: Vec<Aggregate>,
}

/// Result of running a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryOutput {
    /// Filtered records (no aggregate directives)
    Records(RecordSet),
    /// Aggregate summary
    Summary(Summary),
}

impl QueryOutput {
    /// The records, if this is not a summary
    pub fn records(&self) -> Option<&RecordSet> {
        match self {
            QueryOutput::Records(set) => Some(set),
            QueryOutput::Summary(_) => None,
        }
    }

    /// The summary, if aggregates were requested
    pub fn summary(&self) -> Option<&Summary> {
        match self {
            QueryOutput::Summary(summary) => Some(summary),
            QueryOutput::Records(_) => None,
        }
    }
}

impl From<QueryOutput> for Value {
    fn from(output: QueryOutput) -> Self {
        match output {
            QueryOutput::Records(set) => set.into(),
            QueryOutput::Summary(summary) => Value::Object(summary),
        }
    }
}

impl Query {
    /// An empty query: every record, no aggregates
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter
    pub fn filter(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            predicate,
        });
        self
    }

    /// Add an equality filter
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, Predicate::Eq(value.into()))
    }

    /// Add an aggregate directive
    pub fn aggregate(mut self, op: Reduction, field: impl Into<String>) -> Self {
        self.aggregates.push(Aggregate {
            op,
            field: field.into(),
        });
        self
    }

    /// True if the query requests a summary
    pub fn is_aggregate(&self) -> bool {
        !self.aggregates.is_empty()
    }

    /// Build from a loosely-typed mapping.
    ///
    /// Keys starting with `$` are aggregate directives, in one of two forms:
    /// - `"$sum": "amt"` or `"$sum": ["amt", "qty"]`
    /// - `"$sum:amt": true`
    ///
    /// Every other key is a filter whose value goes through
    /// [`Predicate::parse`].
    pub fn from_pairs<K, I>(pairs: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut query = Query::new();
        for (key, value) in pairs {
            let key: String = key.into();
            let Some(directive) = key.strip_prefix('$') else {
                query = query.filter(key, Predicate::parse(value));
                continue;
            };
            if let Some((verb, field)) = directive.split_once(':') {
                query = query.aggregate(verb.parse()?, field);
                continue;
            }
            let op: Reduction = directive.parse()?;
            match value {
                Value::String(field) => query = query.aggregate(op, field),
                Value::Array(fields) => {
                    for field in fields {
                        match field {
                            Value::String(field) => query = query.aggregate(op, field),
                            other => {
                                return Err(Error::invalid_input(format!(
                                    "aggregate '{}' field must be a string, got {}",
                                    key, other
                                )))
                            }
                        }
                    }
                }
                other => {
                    return Err(Error::invalid_input(format!(
                        "aggregate '{}' needs a field name, got {}",
                        key, other
                    )))
                }
            }
        }
        Ok(query)
    }

    /// Build from a JSON object, see [`Query::from_pairs`].
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_pairs(map),
            Value::Null => Ok(Query::new()),
            other => Err(Error::invalid_input(format!("query must be an object, got {}", other))),
        }
    }

    /// Filter, then aggregate if any directives are present.
    pub fn run(&self, records: &RecordSet) -> QueryOutput {
        if self.is_aggregate() {
            let selected = select(records, &self.filters);
            QueryOutput::Summary(aggregate(&selected, &self.aggregates))
        } else if self.filters.is_empty() {
            QueryOutput::Records(records.clone())
        } else {
            QueryOutput::Records(RecordSet::Many(select(records, &self.filters)))
        }
    }
}

// =============================================================================
// Free functions
// =============================================================================

/// Records satisfying every filter. A single record is treated as a
/// one-element sequence.
pub fn select(records: &RecordSet, filters: &[Filter]) -> Vec<Record> {
    records
        .iter()
        .filter(|record| {
            filters
                .iter()
                .all(|f| f.predicate.matches(record.get(&f.field)))
        })
        .cloned()
        .collect()
}

/// Compute every aggregate over the records.
pub fn aggregate(records: &[Record], aggregates: &[Aggregate]) -> Summary {
    aggregates
        .iter()
        .map(|agg| (agg.key(), agg.reduce(records)))
        .collect()
}

/// Union of field names, in first-seen order.
pub fn columns(records: &[Record]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !seen.iter().any(|k| k == key) {
                seen.push(key.clone());
            }
        }
    }
    seen
}

/// Reshape a record onto a fixed column set: missing fields take the
/// default, fields outside the set are dropped.
pub fn conform(record: &Record, columns: &[String], default: &Value) -> Record {
    columns
        .iter()
        .map(|c| (c.clone(), record.get(c).cloned().unwrap_or_else(|| default.clone())))
        .collect()
}
