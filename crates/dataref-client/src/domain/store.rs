//! Latest-value store keyed by dataref name.
//!
//! Written only by the correlator when a request resolves. Everything else
//! gets read access, so UI code can mirror dataref state without holding
//! its own mutable copy.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Instant;

use crate::domain::types::{DataRefName, DataRefType, DataRefValue};

/// Last known state of one dataref.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    /// Type the dataref was last read as
    pub data_type: DataRefType,
    /// `DataRefValue::Invalid` if the last read failed
    pub value: DataRefValue,
    /// When the last read resolved
    pub updated_at: Instant,
}

#[derive(Debug, Default)]
pub struct DataRefStore {
    entries: RwLock<HashMap<DataRefName, StoredValue>>,
}

impl DataRefStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, name: &DataRefName, data_type: DataRefType, value: DataRefValue) {
        let entry = StoredValue {
            data_type,
            value,
            updated_at: Instant::now(),
        };
        self.entries.write().insert(name.clone(), entry);
    }

    pub fn get(&self, name: &DataRefName) -> Option<StoredValue> {
        self.entries.read().get(name).cloned()
    }

    /// Latest value if the last read succeeded.
    pub fn value(&self, name: &DataRefName) -> Option<DataRefValue> {
        self.get(name)
            .map(|entry| entry.value)
            .filter(DataRefValue::is_valid)
    }

    /// All entries, sorted by name.
    pub fn snapshot(&self) -> Vec<(DataRefName, StoredValue)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
