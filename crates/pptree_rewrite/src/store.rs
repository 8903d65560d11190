//! Attribute preservation store.
//!
//! Maps a source-location key to the attribute snapshot of the marked cell
//! it came from. Two snapshots stored under one key must agree: if they
//! differ the key is poisoned and never restored, since there is no way to
//! tell which merged cell should receive which snapshot.

use pptree_ir::Attributes;
use std::collections::{BTreeMap, BTreeSet};

/// Result of [`AttributeStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// First snapshot for this key.
    Inserted,
    /// An identical snapshot was already stored.
    Duplicate,
    /// A different snapshot was stored; the key is now poisoned.
    Collision,
    /// The key was already poisoned.
    Poisoned,
}

/// Pass-scoped map from source-location key to attribute snapshot.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    records: BTreeMap<String, Attributes>,
    poisoned: BTreeSet<String>,
}

impl AttributeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `attributes` under `key`.
    pub fn save(&mut self, key: &str, attributes: &Attributes) -> SaveOutcome {
        if self.poisoned.contains(key) {
            return SaveOutcome::Poisoned;
        }
        match self.records.get(key) {
            None => {
                self.records.insert(key.to_string(), attributes.clone());
                SaveOutcome::Inserted
            }
            Some(existing) if existing == attributes => SaveOutcome::Duplicate,
            Some(_) => {
                self.records.remove(key);
                self.poisoned.insert(key.to_string());
                SaveOutcome::Collision
            }
        }
    }

    /// The snapshot for `key`, unless absent or poisoned.
    pub fn get(&self, key: &str) -> Option<&Attributes> {
        self.records.get(key)
    }

    /// Returns `true` if `key` saw conflicting snapshots.
    pub fn is_poisoned(&self, key: &str) -> bool {
        self.poisoned.contains(key)
    }

    /// Number of restorable keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there is nothing to restore.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Restorable keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}
