//! Persistence for the roster document.
//!
//! The orchestrator only sees [`StateStore`]. Production uses
//! [`JsonFileStore`], a single pretty-printed JSON file:
//!
//! ```text
//! ~/.checkin/
//!   state.json        # Roster document
//!   state.json.lock   # Locked while a run holds the state file
//! ```
//!
//! [`MemoryStore`] keeps the document in memory for tests.

mod file;
mod lock;
mod memory;

use std::{io, path::PathBuf};

pub use file::JsonFileStore;
pub use lock::RunLock;
pub use memory::MemoryStore;

use crate::model::RosterDocument;
use crate::registry::Registry;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state file is locked by another run ({0})")]
    Locked(PathBuf),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Load/save access to the roster document.
pub trait StateStore {
    /// The stored document, or `None` if nothing was ever saved.
    fn read(&self) -> Result<Option<RosterDocument>>;

    /// Replaces the stored document atomically.
    ///
    /// Saving the same document twice leaves the same result.
    fn save(&self, doc: &RosterDocument) -> Result<()>;

    /// The stored document with every registry target present.
    ///
    /// A fresh store yields a default document; targets added to the registry
    /// since the last save get zero-value state.
    fn load(&self, registry: &Registry) -> Result<RosterDocument> {
        let mut doc = self.read()?.unwrap_or_default();
        doc.backfill(registry);
        Ok(doc)
    }
}
