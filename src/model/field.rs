//! Field values scraped from a page.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder for a field whose pattern did not match.
///
/// Distinct from an empty string, which is a real (if blank) value.
pub const UNAVAILABLE: &str = "N/A";

/// Named field values, ordered by name for stable JSON output.
pub type Fields = BTreeMap<String, FieldValue>;

/// A single scraped value.
///
/// Serialized untagged so the state file reads naturally:
/// `"times": "5"` or `"notices": ["2024.01.01 - Maintenance"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A single captured value, or [`UNAVAILABLE`].
    Text(String),

    /// Every match of an "all matches" field, in page order.
    List(Vec<String>),
}

impl FieldValue {
    /// The sentinel value for a field that could not be parsed.
    pub fn unavailable() -> Self {
        Self::Text(UNAVAILABLE.to_string())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Text(s) if s == UNAVAILABLE)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::List(items) => f.write_str(&items.join("; ")),
        }
    }
}

/// Whatever a human may have typed into the state file.
///
/// Older documents stored zero-valued numbers and `[date, title]` pairs;
/// all of them are folded into text so a hand-edited file never fails to load.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Null,
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
    List(Vec<serde_json::Value>),
    Object(serde_json::Map<String, serde_json::Value>),
}

impl From<RawValue> for FieldValue {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Null => Self::unavailable(),
            RawValue::Text(s) => Self::Text(s),
            RawValue::Number(n) => Self::Text(n.to_string()),
            RawValue::Bool(b) => Self::Text(b.to_string()),
            RawValue::List(items) => Self::List(items.iter().map(flatten_json).collect()),
            RawValue::Object(map) => Self::Text(flatten_json(&serde_json::Value::Object(map))),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawValue::deserialize(deserializer).map(Self::from)
    }
}

fn flatten_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(parts) => parts
            .iter()
            .map(flatten_json)
            .collect::<Vec<_>>()
            .join(" - "),
        serde_json::Value::Object(entries) => entries
            .iter()
            .map(|(key, value)| format!("{key}: {}", flatten_json(value)))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_list_serialize_untagged() {
        let mut fields = Fields::new();
        fields.insert("times".into(), "5".into());
        fields.insert("notices".into(), FieldValue::List(vec!["a".into()]));

        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"notices":["a"],"times":"5"}"#);
    }

    #[test]
    fn hand_edited_values_are_folded_into_text() {
        let json = r#"{
            "times": 0,
            "share_ratio": 1.5,
            "level": null,
            "notices": [["2024.01.01", "Maintenance"], "plain"]
        }"#;
        let fields: Fields = serde_json::from_str(json).unwrap();

        assert_eq!(fields["times"], FieldValue::from("0"));
        assert_eq!(fields["share_ratio"], FieldValue::from("1.5"));
        assert!(fields["level"].is_unavailable());
        assert_eq!(
            fields["notices"],
            FieldValue::List(vec!["2024.01.01 - Maintenance".into(), "plain".into()])
        );
    }

    #[test]
    fn objects_are_folded_into_text() {
        let fields: Fields =
            serde_json::from_str(r#"{"times": {"n": 5}, "rank": {"pos": "12", "of": [345]}}"#)
                .unwrap();

        assert_eq!(fields["times"], FieldValue::from("n: 5"));
        assert_eq!(fields["rank"], FieldValue::from("of: 345, pos: 12"));
    }

    #[test]
    fn empty_text_is_not_unavailable() {
        assert!(!FieldValue::from("").is_unavailable());
        assert!(FieldValue::unavailable().is_unavailable());
    }
}
