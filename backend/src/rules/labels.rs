//! Label lookup: short code fragments to readable names.
//!
//! The table is not injective (`DNG` and `NGF` both read "Natural Gas") and
//! not total: unknown keys pass through unchanged.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::RegistryError;

/// Code/label pairs in source order, duplicates included.
///
/// Deserializes from a JSON object without collapsing repeated keys, so a
/// repeated code can be reported instead of silently keeping the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelEntries(pub Vec<(String, String)>);

impl<'de> Deserialize<'de> for LabelEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = LabelEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of code fragments to labels")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((code, label)) = map.next_entry::<String, String>()? {
                    entries.push((code, label));
                }
                Ok(LabelEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl Serialize for LabelEntries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (code, label) in &self.0 {
            map.serialize_entry(code, label)?;
        }
        map.end()
    }
}

/// Immutable code → label lookup with identity fallback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelTable {
    labels: HashMap<String, String>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table, rejecting any code given more than once.
    pub fn from_entries<I>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut labels: HashMap<String, String> = HashMap::new();
        for (code, label) in entries {
            if let Some(first) = labels.get(&code) {
                return Err(RegistryError::DuplicateLabel {
                    code,
                    first: first.clone(),
                    second: label,
                });
            }
            labels.insert(code, label);
        }
        Ok(Self { labels })
    }

    /// Label for `key`, or `key` itself when unknown.
    pub fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
        self.labels.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Entries sorted by code.
    pub fn entries(&self) -> LabelEntries {
        let mut entries: Vec<(String, String)> = self
            .labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort();
        LabelEntries(entries)
    }
}
