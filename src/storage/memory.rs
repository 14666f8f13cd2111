//! In-memory store for tests.

use std::cell::{Cell, RefCell};

use crate::model::RosterDocument;

use super::{Result, StateStore};

/// Keeps the roster document in memory and counts saves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: RefCell<Option<RosterDocument>>,
    saves: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `doc`.
    pub fn with_document(doc: RosterDocument) -> Self {
        Self {
            doc: RefCell::new(Some(doc)),
            saves: Cell::new(0),
        }
    }

    /// The last saved (or seeded) document.
    pub fn document(&self) -> Option<RosterDocument> {
        self.doc.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl StateStore for MemoryStore {
    fn read(&self) -> Result<Option<RosterDocument>> {
        Ok(self.doc.borrow().clone())
    }

    fn save(&self, doc: &RosterDocument) -> Result<()> {
        *self.doc.borrow_mut() = Some(doc.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
