//! Response extraction: raw HTML in, success flag and named fields out.
//!
//! Every field is matched independently. A pattern that no longer matches
//! yields [`UNAVAILABLE`](crate::model::UNAVAILABLE) for that field only;
//! the rest of the page is still read.

use regex::Captures;

use crate::grammar::{FieldRule, Grammar};
use crate::model::{FieldValue, Fields};

/// Outcome of reading one response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub success: bool,
    pub fields: Fields,
}

impl ExtractionResult {
    /// A failed extraction: no sentinel, unreachable page, or missing token.
    pub fn failed() -> Self {
        Self::default()
    }
}

/// Reads `body` with `grammar`.
///
/// Without the sentinel the result is unsuccessful and no field is read.
pub fn extract(body: &str, grammar: &Grammar) -> ExtractionResult {
    if !body.contains(&grammar.sentinel) {
        return ExtractionResult::failed();
    }

    let fields = grammar
        .fields
        .iter()
        .map(|rule| (rule.name.clone(), extract_field(body, rule)))
        .collect();

    ExtractionResult {
        success: true,
        fields,
    }
}

fn extract_field(body: &str, rule: &FieldRule) -> FieldValue {
    if rule.all {
        return FieldValue::List(
            rule.pattern
                .captures_iter(body)
                .map(|caps| render(&caps, rule))
                .collect(),
        );
    }

    match rule.pattern.captures(body) {
        Some(caps) => FieldValue::Text(render(&caps, rule)),
        None => FieldValue::unavailable(),
    }
}

/// Joins the capture groups of one match; a pattern without groups yields the whole match.
fn render(caps: &Captures<'_>, rule: &FieldRule) -> String {
    let value = if caps.len() > 1 {
        caps.iter()
            .skip(1)
            .map(|group| group.map_or("", |m| m.as_str()))
            .collect::<Vec<_>>()
            .join(&rule.join)
    } else {
        caps[0].to_string()
    };

    if rule.strip {
        value.chars().filter(|c| !c.is_whitespace()).collect()
    } else {
        value
    }
}
