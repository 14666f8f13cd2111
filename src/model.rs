//! Core data model for checkin.
//!
//! These types describe the roster: the remote targets we check in to,
//! the per-target state that survives between runs, and the field values
//! scraped from each site's pages.

mod field;
mod roster;
mod state;
mod target;

pub use field::{FieldValue, Fields, UNAVAILABLE};
pub use roster::RosterDocument;
pub use state::{NEVER_PROCESSED, TargetState};
pub use target::{Checkin, TargetDescriptor};
