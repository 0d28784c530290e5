//! # Filters
//!
//! Typed filter values for list queries.
//!
//! A [`FilterSpec`] maps field names to a [`FilterValue`]. Each value is a tagged
//! union so the normalizer can dispatch on operators exhaustively: plain equality,
//! `like`, `gte`, `lte` and `in`. Absent (`Unset`) and `Null` values are kept in the
//! spec for callers that build filters from forms, but they never reach the wire.
//!
//! # Examples
//!
//! ```
//! use querito_core::{FilterSpec, FilterValue, Scalar};
//!
//! let filters = FilterSpec::new()
//!     .with("status", FilterValue::In(vec!["ACTIVE".into(), "PREVIEW".into()]))
//!     .with("name", FilterValue::Like("sakura".into()))
//!     .with("type", FilterValue::Unset);
//!
//! assert_eq!(filters.len(), 3);
//! assert_eq!(filters.get("name"), Some(&FilterValue::Like(Scalar::Text("sakura".into()))));
//! ```

use crate::error::{QueryError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Literal filter value meaning "no filter" (the select box's catch-all option).
pub const ALL_SENTINEL: &str = "all";

/// A single filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    /// Returns true for empty text, which the normalizer treats as "not set".
    pub fn is_empty_text(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.is_empty())
    }

    /// Returns true for the `"all"` sentinel.
    pub fn is_all_sentinel(&self) -> bool {
        matches!(self, Scalar::Text(s) if s == ALL_SENTINEL)
    }

    /// Stable JSON encoding used inside cache keys.
    pub(crate) fn to_json(&self) -> Result<Value> {
        Ok(match self {
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Float(f) => match integral(*f) {
                Some(i) => Value::from(i),
                None => serde_json::Number::from_f64(*f)
                    .map(Value::Number)
                    .ok_or_else(|| QueryError::validation(format!("non-finite number {f}")))?,
            },
        })
    }

    fn from_json(field: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Scalar::Text(s.clone())),
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Scalar::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Scalar::Float(f))
                } else {
                    Err(QueryError::validation(format!(
                        "field `{field}`: unsupported number {n}"
                    )))
                }
            }
            other => Err(QueryError::validation(format!(
                "field `{field}`: expected a scalar operand, got {other}"
            ))),
        }
    }
}

/// Whole floats up to 2^53 render and key exactly like the equivalent
/// integer, so `3.0` and `3` address the same entry.
fn integral(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= LIMIT {
        Some(f as i64)
    } else {
        None
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => match integral(*x) {
                Some(i) => write!(f, "{i}"),
                None => write!(f, "{x}"),
            },
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i as i64)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Backend filter-DSL operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Like,
    Gte,
    Lte,
    In,
}

impl Operator {
    /// Wire spelling, as used in `field:<op>=value`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Like => "like",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::In => "in",
        }
    }
}

/// Parses an operator name. An unknown operator is a validation error.
///
/// # Examples
///
/// ```
/// use querito_core::Operator;
///
/// let op: Operator = "gte".parse().unwrap();
/// assert_eq!(op, Operator::Gte);
/// assert!("between".parse::<Operator>().is_err());
/// ```
impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "like" => Ok(Operator::Like),
            "gte" => Ok(Operator::Gte),
            "lte" => Ok(Operator::Lte),
            "in" => Ok(Operator::In),
            other => Err(QueryError::validation(format!("unknown operator `{other}`"))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of one filter field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Field not provided. Never serialized.
    Unset,
    /// Explicit null. Never serialized.
    Null,
    /// Default equality, sent as a bare top-level `field=value` parameter.
    Eq(Scalar),
    Like(Scalar),
    Gte(Scalar),
    Lte(Scalar),
    In(Vec<Scalar>),
}

impl FilterValue {
    /// Builds an operator filter from its wire name.
    pub fn op(op: &str, value: impl Into<Scalar>) -> Result<Self> {
        let value = value.into();
        Ok(match op.parse::<Operator>()? {
            Operator::Like => FilterValue::Like(value),
            Operator::Gte => FilterValue::Gte(value),
            Operator::Lte => FilterValue::Lte(value),
            Operator::In => FilterValue::In(vec![value]),
        })
    }

    /// The operator for operator filters, `None` for equality and unset values.
    pub fn operator(&self) -> Option<Operator> {
        match self {
            FilterValue::Like(_) => Some(Operator::Like),
            FilterValue::Gte(_) => Some(Operator::Gte),
            FilterValue::Lte(_) => Some(Operator::Lte),
            FilterValue::In(_) => Some(Operator::In),
            FilterValue::Unset | FilterValue::Null | FilterValue::Eq(_) => None,
        }
    }

    /// Parses one field of a JSON filter object.
    ///
    /// Accepted shapes: `null`, a scalar, or `{"op": "<operator>", "value": ...}`.
    fn from_json(field: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(FilterValue::Null),
            Value::Object(obj) => {
                let op = obj
                    .get("op")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        QueryError::validation(format!("field `{field}`: missing operator"))
                    })?
                    .parse::<Operator>()?;
                let operand = obj.get("value").unwrap_or(&Value::Null);
                match op {
                    Operator::In => match operand {
                        Value::Array(items) => items
                            .iter()
                            .map(|item| Scalar::from_json(field, item))
                            .collect::<Result<Vec<_>>>()
                            .map(FilterValue::In),
                        other => Err(QueryError::validation(format!(
                            "field `{field}`: `in` expects an array, got {other}"
                        ))),
                    },
                    Operator::Like => Scalar::from_json(field, operand).map(FilterValue::Like),
                    Operator::Gte => Scalar::from_json(field, operand).map(FilterValue::Gte),
                    Operator::Lte => Scalar::from_json(field, operand).map(FilterValue::Lte),
                }
            }
            Value::Array(_) => Err(QueryError::validation(format!(
                "field `{field}`: bare arrays need an explicit `in` operator"
            ))),
            scalar => Scalar::from_json(field, scalar).map(FilterValue::Eq),
        }
    }
}

macro_rules! eq_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FilterValue {
                fn from(value: $t) -> Self {
                    FilterValue::Eq(value.into())
                }
            }
        )*
    };
}

eq_from!(Scalar, &str, String, i64, i32, f64, bool);

/// A partial, possibly sparse set of filters keyed by field name.
///
/// Backed by a `BTreeMap`, so iteration is always in lexicographic field order
/// regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    fields: BTreeMap<String, FilterValue>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FilterValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<FilterValue> {
        self.fields.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses a JSON object such as the dashboard's filter forms produce.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Validation`] when the input is not an object, uses an
    /// unknown operator, or has operands of the wrong shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use querito_core::{FilterSpec, FilterValue};
    /// use serde_json::json;
    ///
    /// let spec = FilterSpec::from_json(&json!({
    ///     "level": {"op": "gte", "value": 3},
    ///     "jlpt": "N5",
    ///     "deleted": null
    /// })).unwrap();
    ///
    /// assert_eq!(spec.get("level"), Some(&FilterValue::Gte(3.into())));
    /// assert_eq!(spec.get("deleted"), Some(&FilterValue::Null));
    ///
    /// let err = FilterSpec::from_json(&json!({"level": {"op": "between", "value": 3}}));
    /// assert!(err.is_err());
    /// ```
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            QueryError::validation(format!("filters must be an object, got {value}"))
        })?;
        let mut spec = FilterSpec::new();
        for (field, raw) in obj {
            spec.insert(field.clone(), FilterValue::from_json(field, raw)?);
        }
        Ok(spec)
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut spec = FilterSpec::new();
        for (k, v) in iter {
            spec.insert(k, v);
        }
        spec
    }
}
