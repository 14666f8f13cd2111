//! Per-target state persisted between runs.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use super::Fields;

/// Stored in place of a date for targets that have never completed a check-in.
pub const NEVER_PROCESSED: &str = "0000-00-00";

/// What we remember about one target.
///
/// `last_processed_date` and `fields` only ever change together, through
/// [`TargetState::record_success`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetState {
    /// Day of the last successful check-in, `None` if there never was one.
    #[serde(default, with = "processed_date")]
    pub last_processed_date: Option<Date>,

    /// Fields from the last successful extraction.
    #[serde(default)]
    pub fields: Fields,
}

impl TargetState {
    /// Whether this target still needs a check-in on `today`.
    pub fn needs_processing(&self, today: Date) -> bool {
        self.last_processed_date != Some(today)
    }

    /// Replaces the fields with a fresh extraction and marks `today` as done.
    pub fn record_success(&mut self, today: Date, fields: Fields) {
        *self = Self {
            last_processed_date: Some(today),
            fields,
        };
    }
}

/// `Option<Date>` as `"YYYY-MM-DD"`, with `"0000-00-00"` for `None`.
mod processed_date {
    use jiff::civil::Date;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::NEVER_PROCESSED;

    pub fn serialize<S: Serializer>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.collect_str(d),
            None => s.serialize_str(NEVER_PROCESSED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Date>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("" | NEVER_PROCESSED) => Ok(None),
            Some(s) => s
                .parse::<Date>()
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid date `{s}`: {e}"))),
        }
    }
}
