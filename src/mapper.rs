//! Positional mapping of row cells onto lower-cased header names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Header name to cell value for a single row.
///
/// Empty cells are never stored, so a missing column and a blank cell look the
/// same to every consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under the lower-cased `field` unless it trims to nothing.
    pub fn insert(&mut self, field: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        self.0.insert(field.to_lowercase(), value.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (field, value) in iter {
            map.insert(field.as_ref(), value.as_ref());
        }
        map
    }
}

/// Zips `header_fields` with `cells`. Short rows leave trailing fields
/// absent; cells past the last header are dropped.
pub fn map_row(header_fields: &[String], cells: &[String]) -> FieldMap {
    header_fields
        .iter()
        .zip(cells.iter())
        .filter(|(field, _)| !field.trim().is_empty())
        .collect()
}
