use crate::value::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Identity of one race: the owning process plus its key, written `p[k]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RaceKey {
    pub process: String,
    pub key: String,
}

impl RaceKey {
    pub fn new(process: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            key: key.into(),
        }
    }
}

impl Display for RaceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.process, self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceWinnerSide {
    Left,
    Right,
}

/// Outcome of one resolved race.
///
/// Everything except `discharged` is immutable after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceEntry {
    pub left_proc: String,
    pub right_proc: String,
    pub winner_side: RaceWinnerSide,
    pub winner_proc: String,
    pub loser_proc: String,
    pub v_winner: Value,
    pub v_loser: Value,
    pub discharged: bool,
}

/// Race memory M: RaceKey -> RaceEntry. Insert-once; only `discharged` may
/// flip, false -> true. The simulator checks `contains` before every `put`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RaceMemory {
    map: BTreeMap<RaceKey, RaceEntry>,
}

impl RaceMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &RaceKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn get(&self, key: &RaceKey) -> Option<&RaceEntry> {
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &RaceKey) -> Option<&mut RaceEntry> {
        self.map.get_mut(key)
    }

    pub fn put(&mut self, key: RaceKey, entry: RaceEntry) {
        debug_assert!(!self.map.contains_key(&key));
        self.map.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Entries in deterministic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&RaceKey, &RaceEntry)> {
        self.map.iter()
    }
}

impl Serialize for RaceMemory {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.map.len()))?;
        for (key, entry) in &self.map {
            map.serialize_entry(&key.to_string(), entry)?;
        }
        map.end()
    }
}
