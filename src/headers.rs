//! Header Store
//!
//! An ordered, case-insensitive multimap of header name → value used
//! throughout the library. Insertion order is preserved; setting a name that
//! is already present replaces the value in place, keeping its position.

use crate::error::Error;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single header entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Header name, stored with its original casing.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// Ordered sequence of `(name, value)` pairs with case-insensitive
/// uniqueness on name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderStore {
    entries: Vec<Header>,
}

impl HeaderStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the library defaults:
    /// `Accept-Encoding`, `Accept-Language`, and a `User-Agent` derived from
    /// the host crate identifiers.
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.set("Accept-Encoding", crate::defaults::http::ACCEPT_ENCODING);
        store.set("Accept-Language", crate::defaults::http::ACCEPT_LANGUAGE);
        store.set("User-Agent", crate::defaults::http::user_agent());
        store
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set `name` to `value`. If a header with the same name (ignoring case)
    /// exists it is replaced in place, keeping its position; otherwise the
    /// entry is appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].value = value,
            None => self.entries.push(Header { name, value }),
        }
    }

    /// Remove the header named `name` (ignoring case), if present.
    pub fn remove(&mut self, name: &str) -> Option<Header> {
        self.position(name).map(|idx| self.entries.remove(idx))
    }

    /// Look up the value for `name`, ignoring case.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.position(name)
            .map(|idx| self.entries[idx].value.as_str())
    }

    /// Whether a header named `name` (ignoring case) is present.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Merge `other` into `self`; `other` wins on collisions.
    pub fn merge(&mut self, other: &HeaderStore) {
        for header in &other.entries {
            self.set(header.name.clone(), header.value.clone());
        }
    }

    /// Collapse to a dictionary, last occurrence wins. Order unspecified.
    pub fn as_map(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    /// Convert to a `reqwest` header map for the wire.
    pub fn to_header_map(&self) -> Result<HeaderMap, Error> {
        let mut map = HeaderMap::new();
        for header in &self.entries {
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(|e| {
                Error::FailedBuildingUrlRequest(format!("invalid header name '{}': {e}", header.name))
            })?;
            let value = HeaderValue::from_str(&header.value).map_err(|e| {
                Error::FailedBuildingUrlRequest(format!(
                    "invalid header value for '{}': {e}",
                    header.name
                ))
            })?;
            map.append(name, value);
        }
        Ok(map)
    }

    /// Build a store from a `reqwest` header map. Values that are not valid
    /// UTF-8 are skipped.
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut store = Self::new();
        for (name, value) in map {
            if let Ok(v) = value.to_str() {
                store.set(name.as_str(), v);
            }
        }
        store
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(name))
    }
}

impl PartialEq for HeaderStore {
    /// Multiset equality after lowercasing names; order does not matter.
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        let mut counts: HashMap<(String, &str), isize> = HashMap::new();
        for h in &self.entries {
            *counts
                .entry((h.name.to_ascii_lowercase(), h.value.as_str()))
                .or_default() += 1;
        }
        for h in &other.entries {
            *counts
                .entry((h.name.to_ascii_lowercase(), h.value.as_str()))
                .or_default() -= 1;
        }
        counts.values().all(|&c| c == 0)
    }
}

impl Eq for HeaderStore {}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderStore {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut store = Self::new();
        for (name, value) in iter {
            store.set(name, value);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_is_case_insensitive_and_keeps_position() {
        let mut store = HeaderStore::new();
        store.set("Content-Type", "text/plain");
        store.set("X-Token", "a");
        let len_after_first = store.len();

        store.set("content-type", "application/json");
        assert_eq!(store.len(), len_after_first);
        assert_eq!(store.value("CONTENT-TYPE"), Some("application/json"));
        // Replacement kept the original slot.
        assert_eq!(store.iter().next().map(|h| h.value.as_str()), Some("application/json"));
    }

    #[test]
    fn remove_and_value_ignore_case() {
        let mut store = HeaderStore::new();
        store.set("Authorization", "Bearer t");
        assert!(store.contains("authorization"));
        assert!(store.remove("AUTHORIZATION").is_some());
        assert_eq!(store.value("Authorization"), None);
    }

    #[test]
    fn merge_other_wins() {
        let mut base: HeaderStore = [("Accept", "text/html"), ("X-A", "1")].into_iter().collect();
        let other: HeaderStore = [("accept", "application/json")].into_iter().collect();
        base.merge(&other);
        assert_eq!(base.value("Accept"), Some("application/json"));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn equality_is_multiset_after_lowercasing() {
        let a: HeaderStore = [("Accept", "x"), ("X-B", "2")].into_iter().collect();
        let b: HeaderStore = [("X-B", "2"), ("ACCEPT", "x")].into_iter().collect();
        assert_eq!(a, b);

        let c: HeaderStore = [("X-B", "3"), ("Accept", "x")].into_iter().collect();
        assert_ne!(a, c);
    }

    #[test]
    fn defaults_carry_user_agent() {
        let store = HeaderStore::with_defaults();
        assert!(store.value("user-agent").is_some());
        assert_eq!(
            store.value("accept-encoding"),
            Some(crate::defaults::http::ACCEPT_ENCODING)
        );
    }

    #[test]
    fn header_map_round_trip() {
        let store: HeaderStore = [("X-One", "1"), ("X-Two", "2")].into_iter().collect();
        let map = store.to_header_map().unwrap();
        let back = HeaderStore::from_header_map(&map);
        assert_eq!(store, back);
    }
}
