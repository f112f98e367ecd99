//! Query serialization, base URL resolution, and origin checks.

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use std::sync::Arc;
use url::{form_urlencoded, Url};

/// Characters left intact by URI component encoding.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Escapes restored after encoding so query strings stay readable.
const READABLE: [(&str, &str); 7] = [
    ("%40", "@"),
    ("%3A", ":"),
    ("%24", "$"),
    ("%2C", ","),
    ("%20", "+"),
    ("%5B", "["),
    ("%5D", "]"),
];

/// Replaces the built-in query serialization for a request.
pub type ParamsSerializer = Arc<dyn Fn(&Params) -> String + Send + Sync>;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Skipped during serialization.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Serialized as ISO-8601 with millisecond precision.
    Date(DateTime<Utc>),
    /// Expanded into repeated `key[]=value` pairs.
    List(Vec<ParamValue>),
    /// Serialized as JSON text.
    Json(Value),
}

impl ParamValue {
    fn to_query_string(&self) -> String {
        match self {
            ParamValue::Null => String::new(),
            ParamValue::Bool(value) => value.to_string(),
            ParamValue::Int(value) => value.to_string(),
            ParamValue::Float(value) => format_float(*value),
            ParamValue::Str(value) => value.clone(),
            ParamValue::Date(value) => value.to_rfc3339_opts(SecondsFormat::Millis, true),
            ParamValue::List(_) | ParamValue::Json(_) => self.to_json().to_string(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ParamValue::Null => Value::Null,
            ParamValue::Bool(value) => Value::Bool(*value),
            ParamValue::Int(value) => Value::from(*value),
            ParamValue::Float(value) => Value::from(*value),
            ParamValue::Str(value) => Value::String(value.clone()),
            ParamValue::Date(_) => Value::String(self.to_query_string()),
            ParamValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ParamValue::Json(value) => value.clone(),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{}Infinity", sign);
    }
    value.to_string()
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        ParamValue::Date(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ParamValue::Null,
            Value::Bool(value) => ParamValue::Bool(value),
            Value::Number(number) => match number.as_i64() {
                Some(int) => ParamValue::Int(int),
                None => ParamValue::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(value) => ParamValue::Str(value),
            Value::Array(items) => ParamValue::List(items.into_iter().map(Into::into).collect()),
            object @ Value::Object(_) => ParamValue::Json(object),
        }
    }
}

/// Query parameters for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Ordered key/value pairs serialized by [`build_url`].
    Map(Vec<(String, ParamValue)>),
    /// Already-flattened pairs, form-urlencoded as-is.
    Serialized(Vec<(String, String)>),
}

impl Params {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Params::Map(Vec::new())
    }

    /// Appends a parameter. Converts pre-serialized params using string form.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Appends a parameter in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self {
            Params::Map(entries) => entries.push((key, value)),
            Params::Serialized(pairs) => {
                if value != ParamValue::Null {
                    pairs.push((key, value.to_query_string()));
                }
            }
        }
    }

    /// Wraps already-flattened pairs.
    pub fn serialized<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Params::Serialized(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        match self {
            Params::Map(entries) => entries.is_empty(),
            Params::Serialized(pairs) => pairs.is_empty(),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params::Map(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

fn encode(text: &str) -> String {
    let mut encoded = utf8_percent_encode(text, COMPONENT).to_string();
    for (escaped, readable) in READABLE {
        if encoded.contains(escaped) {
            encoded = encoded.replace(escaped, readable);
        }
    }
    encoded
}

fn serialize_map(entries: &[(String, ParamValue)]) -> String {
    let mut parts = Vec::new();
    for (key, value) in entries {
        let (key, values) = match value {
            ParamValue::Null => continue,
            ParamValue::List(items) => (format!("{}[]", key), items.iter().collect::<Vec<_>>()),
            other => (key.clone(), vec![other]),
        };
        let key = encode(&key);
        for value in values {
            if *value == ParamValue::Null {
                continue;
            }
            parts.push(format!("{}={}", key, encode(&value.to_query_string())));
        }
    }
    parts.join("&")
}

/// Appends `params` to `url` as a query string.
///
/// Any fragment is dropped before the query is appended. Keys are never
/// deduplicated, so appending the same params twice repeats them.
pub fn build_url(
    url: &str,
    params: Option<&Params>,
    serializer: Option<&ParamsSerializer>,
) -> String {
    let Some(params) = params else {
        return url.to_string();
    };

    let serialized = match (serializer, params) {
        (Some(serializer), _) => serializer(params),
        (None, Params::Serialized(pairs)) => form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish(),
        (None, Params::Map(entries)) => serialize_map(entries),
    };

    if serialized.is_empty() {
        return url.to_string();
    }

    let base = url.split('#').next().unwrap_or(url);
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base, separator, serialized)
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Returns `true` for `scheme://...` and protocol-relative `//...` URLs.
pub fn is_absolute_url(url: &str) -> bool {
    let rest = match url.find(':') {
        Some(index) if is_scheme(&url[..index]) => &url[index + 1..],
        _ => url,
    };
    rest.starts_with("//")
}

/// Joins `base` and `relative` with exactly one slash between them.
pub fn combine_url(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

/// The origin the client acts on behalf of.
///
/// Relative request URLs resolve against it, and it decides which requests
/// count as same-origin for cookies and XSRF protection. Computed once when the
/// client is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginContext {
    origin: Option<Url>,
}

impl OriginContext {
    /// A context with no origin: every absolute URL is cross-origin.
    pub fn none() -> Self {
        Self::default()
    }

    /// A context rooted at `origin`.
    pub fn new(origin: Url) -> Self {
        Self {
            origin: Some(origin),
        }
    }

    /// Returns the origin URL, if any.
    pub fn origin(&self) -> Option<&Url> {
        self.origin.as_ref()
    }

    /// Resolves `target` against the origin.
    pub fn resolve(&self, target: &str) -> Result<Url, url::ParseError> {
        Url::options().base_url(self.origin.as_ref()).parse(target)
    }

    /// Returns `true` if `target` shares scheme, host, and port with the origin.
    pub fn is_same_origin(&self, target: &Url) -> bool {
        self.origin
            .as_ref()
            .is_some_and(|origin| origin.origin() == target.origin())
    }
}
