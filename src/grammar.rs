//! Declarative scraping grammars.
//!
//! A grammar is a success sentinel plus a table of field patterns. Grammars
//! are plain data: the built-in ones live in [`crate::registry`], and more can
//! be declared in the config file, so a site whose markup drifts is fixed by
//! editing a pattern, never the orchestrator.

use regex::Regex;
use serde::Deserialize;

/// Errors raised while compiling a grammar.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("invalid pattern for field `{field}`: {source}")]
    Pattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown grammar: {0}")]
    Unknown(String),
}

/// One row of a grammar table, as written in source or in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldSpec {
    /// Key under which the value is stored.
    pub name: String,

    /// Human label used in reports. Defaults to `name`.
    #[serde(default)]
    pub label: Option<String>,

    /// Regex; capture groups select the value.
    pub pattern: String,

    /// Remove all whitespace from the captured value.
    #[serde(default)]
    pub strip: bool,

    /// Collect every match into a list instead of taking the first.
    #[serde(default)]
    pub all: bool,

    /// Separator used when the pattern has several capture groups.
    #[serde(default)]
    pub join: Option<String>,
}

impl FieldSpec {
    pub fn new(name: &str, label: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            label: Some(label.to_string()),
            pattern: pattern.to_string(),
            strip: false,
            all: false,
            join: None,
        }
    }

    #[must_use]
    pub fn stripped(mut self) -> Self {
        self.strip = true;
        self
    }

    #[must_use]
    pub fn every_match(mut self) -> Self {
        self.all = true;
        self
    }

    #[must_use]
    pub fn joined(mut self, separator: &str) -> Self {
        self.join = Some(separator.to_string());
        self
    }
}

/// A compiled field rule.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub label: String,
    pub pattern: Regex,
    pub strip: bool,
    pub all: bool,
    pub join: String,
}

impl FieldRule {
    pub fn compile(spec: &FieldSpec) -> Result<Self, GrammarError> {
        let pattern = Regex::new(&spec.pattern).map_err(|source| GrammarError::Pattern {
            field: spec.name.clone(),
            source,
        })?;

        Ok(Self {
            name: spec.name.clone(),
            label: spec.label.clone().unwrap_or_else(|| spec.name.clone()),
            pattern,
            strip: spec.strip,
            all: spec.all,
            join: spec.join.clone().unwrap_or_default(),
        })
    }
}

/// Sentinel + field table for one kind of page.
#[derive(Debug, Clone)]
pub struct Grammar {
    /// Substring whose presence marks the response as successful.
    pub sentinel: String,

    /// Fields extracted from successful responses, in report order.
    pub fields: Vec<FieldRule>,
}

impl Grammar {
    pub fn compile(sentinel: &str, specs: &[FieldSpec]) -> Result<Self, GrammarError> {
        let fields = specs
            .iter()
            .map(FieldRule::compile)
            .collect::<Result<_, _>>()?;

        Ok(Self {
            sentinel: sentinel.to_string(),
            fields,
        })
    }

    /// Accepts any response and extracts nothing.
    ///
    /// Used where a response is only a trigger and success is verified elsewhere.
    pub fn accept_any() -> Self {
        Self {
            sentinel: String::new(),
            fields: Vec::new(),
        }
    }
}
