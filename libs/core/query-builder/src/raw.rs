use std::collections::BTreeMap;
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde_json::{Map, Value};

/// Keys consumed by dedicated pipeline stages; the filter stage drops
/// them from the filter document.
pub const RESERVED_KEYS: [&str; 5] = ["search", "sort", "limit", "page", "fields"];

/// A decoded URL query string as an ordered key/value tree.
///
/// Supports flat pairs (`a=1`), bracket nesting (`price[gte]=10` becomes
/// `{"price": {"gte": "10"}}`), repeated keys (`tag=a&tag=b` becomes an
/// array), and percent-decoding of both keys and values. All scalar
/// values are kept as strings; downstream stages decide how to interpret
/// them.
///
/// Parsing never fails. A key with malformed bracket syntax is kept as a
/// literal flat key and rejected later by the filter stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQuery(BTreeMap<String, Value>);

impl RawQuery {
    /// Parse a query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let mut root: Map<String, Value> = Map::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (k, v),
                None => (pair, ""),
            };

            let key = decode_component(key);
            let value = decode_component(value);

            match split_key(&key) {
                Some(segments) => insert_path(&mut root, &segments, value),
                // Malformed brackets: keep the raw key literally
                None => insert_path(&mut root, &[key.clone()], value),
            }
        }

        Self(root.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Scalar string parameter, `None` when absent or non-scalar
    pub fn str_param(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Split `price[gte][x]` into `["price", "gte", "x"]`.
///
/// A trailing empty segment (`tags[]`) is dropped so the leaf insert
/// appends to an array. Returns `None` for malformed bracket syntax.
fn split_key(key: &str) -> Option<Vec<String>> {
    let open = match key.find('[') {
        None => {
            if key.contains(']') {
                return None;
            }
            return Some(vec![key.to_string()]);
        }
        Some(0) => return None,
        Some(open) => open,
    };

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];

    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return None;
        }
        let close = rest.find(']')?;
        let segment = &rest[1..close];
        rest = &rest[close + 1..];

        if segment.is_empty() {
            // Only valid as the trailing array marker
            if rest.is_empty() {
                break;
            }
            return None;
        }
        segments.push(segment.to_string());
    }

    Some(segments)
}

fn insert_path(node: &mut Map<String, Value>, segments: &[String], value: String) {
    let (head, tail) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };

    if tail.is_empty() {
        match node.get_mut(head) {
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, Value::String(value)]);
            }
            None => {
                node.insert(head.clone(), Value::String(value));
            }
        }
        return;
    }

    let child = node
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    if let Value::Object(map) = child {
        insert_path(map, tail, value);
    }
}

impl<S> FromRequestParts<S> for RawQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::parse(parts.uri.query().unwrap_or_default()))
    }
}
