//! Captured request headers
//!
//! Headers are kept in arrival order. A name received once maps to a single
//! string, a name received several times maps to an array of its values.

use std::fmt;

use axum::http::HeaderMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Value(s) recorded for one header name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    /// Header received once
    Single(String),
    /// Header received more than once, in arrival order
    Multi(Vec<String>),
}

impl HeaderValues {
    /// First value for this header
    pub fn first(&self) -> Option<&str> {
        match self {
            HeaderValues::Single(v) => Some(v),
            HeaderValues::Multi(vs) => vs.first().map(String::as_str),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderValues::Single(first) => {
                let first = std::mem::take(first);
                *self = HeaderValues::Multi(vec![first, value]);
            }
            HeaderValues::Multi(vs) => vs.push(value),
        }
    }
}

/// Ordered header capture
///
/// Serializes as a JSON object whose keys keep arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, HeaderValues)>);

impl Headers {
    /// Create an empty header set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, merging with an earlier occurrence of the same name
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.0.push((name, HeaderValues::Single(value))),
        }
    }

    /// Look up a header by exact name
    pub fn get(&self, name: &str) -> Option<&HeaderValues> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Number of distinct header names
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no headers were captured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over names and values in arrival order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValues)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl From<&HeaderMap> for Headers {
    fn from(map: &HeaderMap) -> Self {
        let mut headers = Headers::new();
        for (name, value) in map.iter() {
            // Non-visible ASCII is kept lossily rather than dropped
            let value = match value.to_str() {
                Ok(v) => v.to_string(),
                Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };
            headers.append(name.as_str(), value);
        }
        headers
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, values) in &self.0 {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to string or string array")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, values)) = access.next_entry::<String, HeaderValues>()? {
                    entries.push((name, values));
                }
                Ok(Headers(entries))
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}
