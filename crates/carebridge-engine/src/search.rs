use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;
use url::form_urlencoded;

use carebridge_core::{ClinicalResource, CoreError, FhirInstant, Result};

/// Parameter names the engine interprets itself; everything else passes
/// through as a resource-specific equality filter.
const RESERVED_KEYS: [&str; 7] = [
    "identifier",
    "_lastUpdated",
    "_tag",
    "_profile",
    "_sort",
    "_count",
    "_offset",
];

const DEFAULT_COUNT: usize = 20;

/// Comparison prefix on date-valued parameters, e.g. `ge2024-01-01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePrefix {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl DatePrefix {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            "ge" => Some(Self::Ge),
            "le" => Some(Self::Le),
            _ => None,
        }
    }

    /// Apply the comparison with `actual` on the left: `actual op target`.
    pub fn matches(&self, actual: FhirInstant, target: FhirInstant) -> bool {
        match self {
            Self::Eq => actual == target,
            Self::Ne => actual != target,
            Self::Gt => actual > target,
            Self::Lt => actual < target,
            Self::Ge => actual >= target,
            Self::Le => actual <= target,
        }
    }
}

impl fmt::Display for DatePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Le => "le",
        };
        f.write_str(s)
    }
}

/// Split an optional comparison prefix off a date value. A bare date means
/// equality.
fn split_date_prefix(raw: &str) -> (DatePrefix, &str) {
    if raw.len() > 2
        && let Some(head) = raw.get(..2)
        && let Some(prefix) = DatePrefix::parse(head)
    {
        return (prefix, &raw[2..]);
    }
    (DatePrefix::Eq, raw)
}

/// One key of a sort specification. A leading `-` on the wire means
/// descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let (field, descending) = match spec.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (spec, false),
        };
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            descending,
        })
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Parsed search parameters.
///
/// The original pairs are retained verbatim so result-bundle navigation
/// links can be regenerated from the original query with only `_offset`
/// rewritten. Recognized keys also get typed views; repeated recognized keys
/// are honored first-occurrence-wins.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    raw: Vec<(String, String)>,
    last_updated: Option<(DatePrefix, FhirInstant)>,
    sort: Vec<SortKey>,
    count: Option<usize>,
    offset: usize,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a query string (without the leading `?`).
    pub fn parse(query: &str) -> Result<Self> {
        let pairs = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self::from_pairs(pairs)
    }

    /// Build from already-decoded key/value pairs.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self> {
        let mut params = Self {
            raw: pairs,
            ..Self::default()
        };
        let mut offset_seen = false;
        for (key, value) in params.raw.clone() {
            match key.as_str() {
                "_lastUpdated" if params.last_updated.is_none() => {
                    let (prefix, date) = split_date_prefix(&value);
                    let target = FhirInstant::parse_lenient(date)?;
                    params.last_updated = Some((prefix, target));
                }
                "_sort" if params.sort.is_empty() => {
                    params.sort = value.split(',').filter_map(SortKey::parse).collect();
                }
                "_count" if params.count.is_none() => {
                    let count = value.parse::<usize>().map_err(|_| {
                        CoreError::invalid_query(format!("_count is not a number: {value}"))
                    })?;
                    params.count = Some(count);
                }
                "_offset" if !offset_seen => {
                    offset_seen = true;
                    params.offset = value.parse::<usize>().map_err(|_| {
                        CoreError::invalid_query(format!("_offset is not a number: {value}"))
                    })?;
                }
                _ => {}
            }
        }
        Ok(params)
    }

    /// Add a resource-specific filter (or `identifier`/`_tag`/`_profile`).
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_sort(mut self, spec: &str) -> Self {
        self.raw.push(("_sort".to_string(), spec.to_string()));
        self.sort = spec.split(',').filter_map(SortKey::parse).collect();
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.raw.push(("_count".to_string(), count.to_string()));
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.raw.push(("_offset".to_string(), offset.to_string()));
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_last_updated(mut self, prefix: DatePrefix, target: FhirInstant) -> Self {
        self.raw
            .push(("_lastUpdated".to_string(), format!("{prefix}{target}")));
        self.last_updated = Some((prefix, target));
        self
    }

    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn count(&self) -> usize {
        self.count.unwrap_or(DEFAULT_COUNT)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn last_updated(&self) -> Option<(DatePrefix, FhirInstant)> {
        self.last_updated
    }

    fn first_raw(&self, key: &str) -> Option<&str> {
        self.raw
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn identifier(&self) -> Option<&str> {
        self.first_raw("identifier")
    }

    pub fn tag(&self) -> Option<&str> {
        self.first_raw("_tag")
    }

    pub fn profile(&self) -> Option<&str> {
        self.first_raw("_profile")
    }

    /// Resource-specific filters, in arrival order.
    pub fn custom_filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.raw
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Re-render the original query with only `_offset` rewritten. The pair
    /// is replaced in place when present, appended otherwise.
    pub fn query_string_with_offset(&self, offset: usize) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let mut offset_written = false;
        for (key, value) in &self.raw {
            if key == "_offset" {
                if !offset_written {
                    serializer.append_pair("_offset", &offset.to_string());
                    offset_written = true;
                }
            } else {
                serializer.append_pair(key, value);
            }
        }
        if !offset_written {
            serializer.append_pair("_offset", &offset.to_string());
        }
        serializer.finish()
    }
}

/// Check a resource against every filter in the parameter set. Filters are
/// conjunctive and applied in the documented order: identifier, lastUpdated,
/// tag, profile, then resource-specific equality filters.
pub fn matches(resource: &ClinicalResource, params: &SearchParams) -> bool {
    if let Some(needle) = params.identifier()
        && !matches_identifier(resource, needle)
    {
        return false;
    }
    if let Some((prefix, target)) = params.last_updated()
        && !prefix.matches(resource.meta.last_updated, target)
    {
        return false;
    }
    if let Some(tag) = params.tag()
        && !matches_tag(resource, tag)
    {
        return false;
    }
    if let Some(profile) = params.profile()
        && !resource.meta.profile.iter().any(|p| p == profile)
    {
        return false;
    }
    params
        .custom_filters()
        .all(|(field, value)| matches_field(resource, field, value))
}

/// Substring match against any identifier value the resource carries.
fn matches_identifier(resource: &ClinicalResource, needle: &str) -> bool {
    let Some(identifiers) = resource.field("identifier") else {
        return false;
    };
    let value_contains = |item: &Value| {
        item.get("value")
            .and_then(Value::as_str)
            .is_some_and(|v| v.contains(needle))
    };
    match identifiers {
        Value::Array(items) => items.iter().any(value_contains),
        Value::Object(_) => value_contains(identifiers),
        _ => false,
    }
}

/// Match `meta.tag` against `code` or `system|code`.
fn matches_tag(resource: &ClinicalResource, filter: &str) -> bool {
    let (system, code) = match filter.split_once('|') {
        Some((s, c)) => (Some(s), c),
        None => (None, filter),
    };
    resource.meta.tag.iter().any(|tag| {
        let code_matches = tag.get("code").and_then(Value::as_str) == Some(code);
        let system_matches = match system {
            Some(s) => tag.get("system").and_then(Value::as_str) == Some(s),
            None => true,
        };
        code_matches && system_matches
    })
}

/// Equality filter over a data field: matches when any scalar inside the
/// field's value equals the filter value. Nested coded concepts (for
/// example `category[].coding[].code`) are searched recursively.
fn matches_field(resource: &ClinicalResource, field: &str, value: &str) -> bool {
    match field {
        "_id" => resource.id.as_deref() == Some(value),
        _ => resource
            .field(field)
            .is_some_and(|found| value_contains_scalar(found, value)),
    }
}

fn value_contains_scalar(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s == needle,
        Value::Number(n) => n.to_string() == needle,
        Value::Bool(b) => b.to_string() == needle,
        Value::Array(items) => items.iter().any(|v| value_contains_scalar(v, needle)),
        Value::Object(map) => map.values().any(|v| value_contains_scalar(v, needle)),
        Value::Null => false,
    }
}

/// A sortable projection of one resource field.
#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Missing,
    Instant(FhirInstant),
    Number(f64),
    Text(String),
}

impl SortValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Instant(_) => 1,
            Self::Number(_) => 2,
            Self::Text(_) => 3,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Instant(a), Self::Instant(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn first_scalar(value: &Value) -> Option<SortValue> {
    match value {
        Value::String(s) => Some(scalar_from_str(s)),
        Value::Number(n) => n.as_f64().map(SortValue::Number),
        Value::Bool(b) => Some(SortValue::Text(b.to_string())),
        Value::Array(items) => items.iter().find_map(first_scalar),
        Value::Object(map) => map.values().find_map(first_scalar),
        Value::Null => None,
    }
}

fn scalar_from_str(s: &str) -> SortValue {
    match FhirInstant::parse_lenient(s) {
        Ok(instant) => SortValue::Instant(instant),
        Err(_) => SortValue::Text(s.to_string()),
    }
}

fn sort_value(resource: &ClinicalResource, field: &str) -> SortValue {
    match field {
        "_lastUpdated" | "lastUpdated" => SortValue::Instant(resource.meta.last_updated),
        "_id" | "id" => resource
            .id
            .as_ref()
            .map(|id| SortValue::Text(id.clone()))
            .unwrap_or(SortValue::Missing),
        "versionId" => resource
            .meta
            .version_id
            .as_ref()
            .and_then(|v| v.parse::<f64>().ok().map(SortValue::Number))
            .unwrap_or(SortValue::Missing),
        _ => resource
            .field(field)
            .and_then(first_scalar)
            .unwrap_or(SortValue::Missing),
    }
}

/// Stable multi-key sort. A missing value orders before any present value;
/// a descending key reverses its comparison.
pub fn sort_resources(resources: &mut [ClinicalResource], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    resources.sort_by(|a, b| {
        for key in keys {
            let ordering = sort_value(a, &key.field).compare(&sort_value(b, &key.field));
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
