//! Untyped records: the raw nested data a tree is parsed from.
//!
//! A record is any object-like value whose nested children live under a
//! configurable field. The trait keeps the builder and the nodes independent of
//! the concrete representation; implementations are provided for
//! `serde_json::Value` (objects) and `toml::Value` (tables).

use std::cmp::Ordering;
use std::fmt;

/// Structured value carrying application data plus optional nested children.
pub trait Record: Clone + fmt::Debug + 'static {
    /// True for object/record shaped values, false for scalars and sequences.
    fn is_record(&self) -> bool;

    /// Children stored under `field`, if the field holds a sequence.
    fn children(&self, field: &str) -> Option<&[Self]>;

    /// Detach and return the children stored under `field`.
    ///
    /// Returns `None` (leaving the value untouched) when the field is absent or
    /// does not hold a sequence.
    fn take_children(&mut self, field: &str) -> Option<Vec<Self>>;

    /// Store `children` as a sequence under `field`, replacing any previous value.
    fn set_children(&mut self, field: &str, children: Vec<Self>);

    /// Scalar value of `key`, usable for declarative ordering.
    fn sort_key(&self, key: &str) -> Option<SortKey>;
}

/// Comparable scalar extracted from a record field.
///
/// Values of different kinds order as booleans < numbers < strings.
#[derive(Debug, Clone)]
pub enum SortKey {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Bool(_) => 0,
            SortKey::Number(_) => 1,
            SortKey::Text(_) => 2,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Bool(b) => write!(f, "{}", b),
            SortKey::Number(n) => write!(f, "{}", n),
            SortKey::Text(s) => write!(f, "{}", s),
        }
    }
}

impl Record for serde_json::Value {
    fn is_record(&self) -> bool {
        self.is_object()
    }

    fn children(&self, field: &str) -> Option<&[Self]> {
        self.get(field)
            .and_then(serde_json::Value::as_array)
            .map(Vec::as_slice)
    }

    fn take_children(&mut self, field: &str) -> Option<Vec<Self>> {
        let map = self.as_object_mut()?;
        if !map.get(field).is_some_and(serde_json::Value::is_array) {
            return None;
        }
        match map.remove(field) {
            Some(serde_json::Value::Array(children)) => Some(children),
            _ => None,
        }
    }

    fn set_children(&mut self, field: &str, children: Vec<Self>) {
        if let Some(map) = self.as_object_mut() {
            map.insert(field.to_string(), serde_json::Value::Array(children));
        }
    }

    fn sort_key(&self, key: &str) -> Option<SortKey> {
        match self.get(key)? {
            serde_json::Value::Bool(b) => Some(SortKey::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(SortKey::Number),
            serde_json::Value::String(s) => Some(SortKey::Text(s.clone())),
            _ => None,
        }
    }
}

impl Record for toml::Value {
    fn is_record(&self) -> bool {
        self.is_table()
    }

    fn children(&self, field: &str) -> Option<&[Self]> {
        self.get(field)
            .and_then(toml::Value::as_array)
            .map(Vec::as_slice)
    }

    fn take_children(&mut self, field: &str) -> Option<Vec<Self>> {
        let table = self.as_table_mut()?;
        if !table.get(field).is_some_and(toml::Value::is_array) {
            return None;
        }
        match table.remove(field) {
            Some(toml::Value::Array(children)) => Some(children),
            _ => None,
        }
    }

    fn set_children(&mut self, field: &str, children: Vec<Self>) {
        if let Some(table) = self.as_table_mut() {
            table.insert(field.to_string(), toml::Value::Array(children));
        }
    }

    fn sort_key(&self, key: &str) -> Option<SortKey> {
        match self.get(key)? {
            toml::Value::Boolean(b) => Some(SortKey::Bool(*b)),
            toml::Value::Integer(i) => Some(SortKey::Number(*i as f64)),
            toml::Value::Float(f) => Some(SortKey::Number(*f)),
            toml::Value::String(s) => Some(SortKey::Text(s.clone())),
            toml::Value::Datetime(d) => Some(SortKey::Text(d.to_string())),
            _ => None,
        }
    }
}
