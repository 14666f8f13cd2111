//! Output formatting for CLI display.

use jiff::civil::Date;

use crate::model::{TargetDescriptor, TargetState};
use crate::orchestrator::Outcome;

pub(super) fn format_outcome(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::SkippedNoCredential => "skipped (no credential)",
        Outcome::SkippedAlreadyDone => "skipped (already checked in today)",
        Outcome::Succeeded => "checked in",
        Outcome::Failed => "failed",
        Outcome::Due => "due (dry run, not checked in)",
    }
}

/// One line per recorded target: id, last check-in, activity marker.
pub(super) fn format_status_row(id: &str, state: &TargetState, active: bool, today: Date) -> String {
    let last = match state.last_processed_date {
        Some(date) if date == today => format!("{date} (today)"),
        Some(date) => date.to_string(),
        None => "never".to_string(),
    };
    let marker = if active { "active" } else { "inactive" };
    format!("{id:<12} [{marker}] last: {last}  fields: {}", state.fields.len())
}

pub(super) fn format_target_row(target: &TargetDescriptor, present: bool) -> String {
    let credential = if present { "set" } else { "missing" };
    format!(
        "{:<12} {}={credential}  {}",
        target.id,
        target.credential_key,
        target.checkin.entry_url()
    )
}
