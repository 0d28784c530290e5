//! # Query Key Normalizer
//!
//! Turns a partial filter/sort/pagination object into:
//!
//! - a canonical [`CacheKey`], identical for semantically equal queries regardless
//!   of field insertion order or unset fields
//! - the backend's wire parameters: bare `field=value` equality parameters, one
//!   `qs` parameter carrying the filter-DSL and sort token, and separate
//!   `currentPage` / `pageSize` parameters
//!
//! Normalization is pure: the same input always yields the same output and
//! nothing outside the arguments is read or written.
//!
//! # Examples
//!
//! ```
//! use querito_core::{normalize, FilterValue, ListQuery, SortSpec};
//!
//! let query = ListQuery::new()
//!     .filter("status", FilterValue::In(vec!["ACTIVE".into(), "PREVIEW".into()]))
//!     .filter("title", FilterValue::Like("sakura".into()))
//!     .filter("type", "all")
//!     .sort(SortSpec::desc("createdAt"))
//!     .page(1)
//!     .limit(10);
//!
//! let normalized = normalize("gacha-banner-list", &query).unwrap();
//! assert_eq!(
//!     normalized.wire.to_string(),
//!     "qs=status:in=ACTIVE|PREVIEW,title:like=sakura,sort:-createdAt&currentPage=1&pageSize=10"
//! );
//! assert!(normalized.cache_key.as_str().starts_with("gacha-banner-list/"));
//! ```

use crate::error::{QueryError, Result};
use crate::filter::{FilterValue, Scalar};
use crate::query::{ListQuery, ResourceDef};
use serde_json::{Map, Value};
use std::fmt;

/// Characters that would break the `qs` grammar or the query string itself.
const RESERVED_FIELD_CHARS: &[char] = &[',', ':', '=', '&', '|', '?'];

/// Top-level parameter carrying the filter-DSL.
pub const QS_PARAM: &str = "qs";
/// Top-level pagination parameters.
pub const PAGE_PARAM: &str = "currentPage";
pub const PAGE_SIZE_PARAM: &str = "pageSize";

/// Top-level parameters owned by the encoder; filters may not use them as field names.
const RESERVED_PARAMS: [&str; 3] = [QS_PARAM, PAGE_PARAM, PAGE_SIZE_PARAM];

/// Deterministic identifier of a (resource, filters, sort, pagination) combination.
///
/// Rendered as `<resource>/<canonical JSON>`, where the JSON object has sorted
/// keys. Prefix matching on the resource name is how invalidation finds every
/// page of a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resource part of the key (everything before the first `/`).
    pub fn resource(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(r, _)| r)
    }

    /// Invalidation match: true when the key starts with `prefix`.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered wire query parameters.
///
/// Values are not percent-encoded; that is the transport's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireParams {
    pairs: Vec<(String, String)>,
}

impl WireParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Display for WireParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub cache_key: CacheKey,
    pub wire: WireParams,
}

/// Normalizes a list query against a resource definition, applying its field
/// rewrites (such as `search` → `name:like`) first.
pub fn normalize_resource(resource: &ResourceDef, query: &ListQuery) -> Result<NormalizedQuery> {
    normalize(&resource.name, &resource.rewrite(query))
}

/// Normalizes a list query into a cache key and wire parameters.
///
/// # Errors
///
/// Fails fast with [`QueryError::Validation`] for an empty resource name, empty or
/// reserved-character field names, an empty sort field, non-finite numbers, or
/// operands that would corrupt the `qs` grammar.
pub fn normalize(resource_name: &str, query: &ListQuery) -> Result<NormalizedQuery> {
    if resource_name.is_empty() {
        return Err(QueryError::validation("resource name must not be empty"));
    }

    let mut key_filters = Map::new();
    let mut equality = Vec::new();
    let mut fragments = Vec::new();

    // FilterSpec iterates in lexicographic field order.
    for (field, value) in query.filters.iter() {
        validate_field(field)?;
        let Some(value) = retained(value) else {
            continue;
        };
        if RESERVED_PARAMS.contains(&field) {
            return Err(QueryError::validation(format!(
                "field `{field}` collides with a reserved query parameter"
            )));
        }
        key_filters.insert(field.to_string(), key_value(&value)?);
        match &value {
            FilterValue::Eq(scalar) => equality.push((field.to_string(), scalar.to_string())),
            FilterValue::Like(operand) | FilterValue::Gte(operand) | FilterValue::Lte(operand) => {
                let rendered = operand.to_string();
                if rendered.contains(',') {
                    return Err(QueryError::validation(format!(
                        "field `{field}`: operand must not contain `,`"
                    )));
                }
                if let Some(op) = value.operator() {
                    fragments.push(format!("{field}:{op}={rendered}"));
                }
            }
            FilterValue::In(members) => {
                let rendered = members
                    .iter()
                    .map(|m| {
                        let s = m.to_string();
                        if s.contains('|') || s.contains(',') {
                            Err(QueryError::validation(format!(
                                "field `{field}`: `in` member must not contain `|` or `,`"
                            )))
                        } else {
                            Ok(s)
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                fragments.push(format!("{field}:in={}", rendered.join("|")));
            }
            FilterValue::Unset | FilterValue::Null => {}
        }
    }

    let sort_token = match &query.sort {
        Some(sort) if sort.sort_by.is_empty() => {
            return Err(QueryError::validation("sort field must not be empty"));
        }
        Some(sort) => {
            validate_field(&sort.sort_by)?;
            Some(sort.token())
        }
        None => None,
    };

    // Inserted in key order, so the encoding stays canonical even with
    // serde_json's `preserve_order` feature enabled somewhere in the graph.
    let mut key = Map::new();
    if !key_filters.is_empty() {
        key.insert("filters".to_string(), Value::Object(key_filters));
    }
    if let Some(limit) = query.limit {
        key.insert("limit".to_string(), Value::from(limit));
    }
    if let Some(page) = query.page {
        key.insert("page".to_string(), Value::from(page));
    }
    if let Some(token) = &sort_token {
        key.insert("sort".to_string(), Value::String(token.clone()));
        fragments.push(token.clone());
    }

    let mut wire = WireParams::new();
    for (field, value) in equality {
        wire.push(field, value);
    }
    if !fragments.is_empty() {
        wire.push(QS_PARAM, fragments.join(","));
    }
    if let Some(page) = query.page {
        wire.push(PAGE_PARAM, page.to_string());
    }
    if let Some(limit) = query.limit {
        wire.push(PAGE_SIZE_PARAM, limit.to_string());
    }

    let cache_key = CacheKey(format!("{resource_name}/{}", Value::Object(key)));
    Ok(NormalizedQuery { cache_key, wire })
}

fn validate_field(field: &str) -> Result<()> {
    if field.is_empty() {
        return Err(QueryError::validation("field name must not be empty"));
    }
    if field.contains(RESERVED_FIELD_CHARS) {
        return Err(QueryError::validation(format!(
            "field `{field}` contains a reserved character"
        )));
    }
    Ok(())
}

/// Applies the drop rules, returning the value to serialize or `None`.
fn retained(value: &FilterValue) -> Option<FilterValue> {
    match value {
        FilterValue::Unset | FilterValue::Null => None,
        FilterValue::Eq(s) if s.is_empty_text() || s.is_all_sentinel() => None,
        FilterValue::Like(s) | FilterValue::Gte(s) | FilterValue::Lte(s) if s.is_empty_text() => {
            None
        }
        FilterValue::In(members) => {
            let kept: Vec<Scalar> = members
                .iter()
                .filter(|m| !m.is_empty_text())
                .cloned()
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(FilterValue::In(kept))
            }
        }
        other => Some(other.clone()),
    }
}

fn key_value(value: &FilterValue) -> Result<Value> {
    let op_entry = |op: &str, operand: Value| {
        let mut obj = Map::new();
        obj.insert("op".to_string(), Value::String(op.to_string()));
        obj.insert("value".to_string(), operand);
        Value::Object(obj)
    };
    Ok(match value {
        FilterValue::Eq(s) => s.to_json()?,
        FilterValue::Like(s) => op_entry("like", s.to_json()?),
        FilterValue::Gte(s) => op_entry("gte", s.to_json()?),
        FilterValue::Lte(s) => op_entry("lte", s.to_json()?),
        FilterValue::In(members) => op_entry(
            "in",
            Value::Array(
                members
                    .iter()
                    .map(Scalar::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
        ),
        FilterValue::Unset | FilterValue::Null => Value::Null,
    })
}
