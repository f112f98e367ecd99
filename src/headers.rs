//! Case-insensitive header maps and per-method header resolution.
//!
//! [`Headers`] is an ordered map whose keys compare case-insensitively. The
//! casing of the first occurrence of a name is kept; later writes with a
//! different casing replace the value only.
//!
//! [`RequestHeaders`] is the configuration-side shape: a `common` bucket, one
//! bucket per HTTP method, and the call-level headers. [`flatten`] collapses it
//! into the effective map for one method.

use crate::body::Body;
use http::{HeaderMap, Method};
use std::collections::BTreeMap;

pub(crate) const CONTENT_TYPE: &str = "Content-Type";

/// An ordered, case-insensitive header map.
///
/// A name may be *unset*: it is present as a mask over lower-priority buckets
/// but is never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Option<String>)>,
}

impl Headers {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    fn put(&mut self, name: &str, value: Option<String>) {
        match self.position(name) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Returns the value for `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.position(name)?;
        self.entries[index].1.as_deref()
    }

    /// Returns `true` if `name` has a value.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns `true` if `name` has an entry, including an unset mask.
    pub fn is_present(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Sets `name` to `value`, keeping the casing of an existing entry.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.put(name.as_ref(), Some(value.into()));
    }

    /// Masks `name` so it is not sent, even when a lower-priority bucket sets it.
    pub fn unset(&mut self, name: impl AsRef<str>) {
        self.put(name.as_ref(), None);
    }

    /// Removes `name` entirely, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.position(name)?;
        self.entries.remove(index).1
    }

    /// Iterates over the names and values that will be sent, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.as_deref()?)))
    }

    /// Overlays `other` onto `self`: its values (and masks) win on conflict.
    pub fn extend(&mut self, other: &Headers) {
        for (name, value) in &other.entries {
            self.put(name, value.clone());
        }
    }

    /// Returns the number of entries with a value.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns `true` if no entry has a value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}

impl From<&HeaderMap> for Headers {
    /// Normalizes transport headers: lowercase names, repeated values joined with `, `.
    fn from(map: &HeaderMap) -> Self {
        let mut headers = Headers::new();
        for name in map.keys() {
            let joined = map
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).trim().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            headers.set(name.as_str(), joined);
        }
        headers
    }
}

/// Headers as configured: shared, per-method, and call-level buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    /// Sent with every method.
    pub common: Headers,
    methods: BTreeMap<String, Headers>,
    /// Call-level headers; these win over both other buckets.
    pub own: Headers,
}

impl RequestHeaders {
    /// Creates empty buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a call-level header.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.own.set(name, value);
    }

    /// Returns a call-level header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.own.get(name)
    }

    /// Returns the bucket for `method`, if one exists.
    pub fn method(&self, method: &Method) -> Option<&Headers> {
        self.methods.get(&method.as_str().to_ascii_uppercase())
    }

    /// Returns the bucket for `method`, creating it if needed.
    pub fn method_mut(&mut self, method: &Method) -> &mut Headers {
        self.methods
            .entry(method.as_str().to_ascii_uppercase())
            .or_default()
    }

    /// Deep-merges `overrides` onto `self`, bucket by bucket.
    pub fn merge(&self, overrides: &RequestHeaders) -> RequestHeaders {
        let mut merged = self.clone();
        merged.common.extend(&overrides.common);
        for (method, bucket) in &overrides.methods {
            merged.methods.entry(method.clone()).or_default().extend(bucket);
        }
        merged.own.extend(&overrides.own);
        merged
    }
}

impl From<Headers> for RequestHeaders {
    fn from(own: Headers) -> Self {
        Self {
            own,
            ..Self::default()
        }
    }
}

/// Resolves the effective headers for `method`: `common`, then the method
/// bucket, then the call-level headers.
pub fn flatten(headers: &RequestHeaders, method: &Method) -> Headers {
    let mut flat = headers.common.clone();
    if let Some(bucket) = headers.method(method) {
        flat.extend(bucket);
    }
    flat.extend(&headers.own);
    flat
}

/// Drops `Content-Type` when the body has no serialized form, or when it is a
/// multipart form whose boundary the transport must choose.
pub fn strip_content_type(headers: &mut Headers, body: &Body) {
    if matches!(body, Body::Empty | Body::Form(_)) {
        headers.remove(CONTENT_TYPE);
    }
}
