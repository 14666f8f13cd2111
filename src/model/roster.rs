//! The roster document: everything persisted between runs.

use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::registry::Registry;

use super::TargetState;

/// Persisted state for every known target.
///
/// `total` and `active` are caches for humans reading the file; both are
/// recomputed on every run and never trusted on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterDocument {
    /// Number of targets in the registry.
    #[serde(default)]
    pub total: usize,

    /// Ids of targets whose credential was present on the last run, in registry order.
    #[serde(default)]
    pub active: Vec<String>,

    /// State per target id.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetState>,
}

impl RosterDocument {
    /// A fully populated document for a fresh install.
    pub fn for_registry(registry: &Registry) -> Self {
        let mut doc = Self::default();
        doc.backfill(registry);
        doc
    }

    /// Adds a zero-value state for every registry target missing from the document.
    ///
    /// Entries for targets no longer in the registry are kept untouched,
    /// so removing a site from the config does not lose its history.
    pub fn backfill(&mut self, registry: &Registry) {
        self.total = registry.len();
        for target in registry.iter() {
            self.targets.entry(target.id.clone()).or_default();
        }
    }

    /// State for `id`, created on first use.
    pub fn state_mut(&mut self, id: &str) -> &mut TargetState {
        self.targets.entry(id.to_string()).or_default()
    }

    /// Number of active targets already checked in on `today`.
    pub fn completed_on(&self, today: Date) -> usize {
        self.active
            .iter()
            .filter_map(|id| self.targets.get(id))
            .filter(|state| !state.needs_processing(today))
            .count()
    }
}
