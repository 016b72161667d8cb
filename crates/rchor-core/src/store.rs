use crate::value::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Store Σ: (process, var) -> Value.
///
/// Reads distinguish absent entries from any stored value; writes overwrite;
/// there is no delete. Iteration order is the key order, so serialized output
/// is deterministic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Store {
    map: BTreeMap<(String, String), Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, process: &str, var: &str) -> Option<Value> {
        self.map
            .get(&(process.to_string(), var.to_string()))
            .copied()
    }

    pub fn has(&self, process: &str, var: &str) -> bool {
        self.get(process, var).is_some()
    }

    pub fn set(&mut self, process: impl Into<String>, var: impl Into<String>, value: Value) {
        self.map.insert((process.into(), var.into()), value);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Entries in deterministic (process, var) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Value)> {
        self.map
            .iter()
            .map(|((p, x), v)| (p.as_str(), x.as_str(), *v))
    }
}

impl Serialize for Store {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.map.len()))?;
        for ((process, var), value) in &self.map {
            map.serialize_entry(&format!("{process}.{var}"), value)?;
        }
        map.end()
    }
}
