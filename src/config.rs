//! checkin configuration.
//!
//! Loaded from `--config <path>` or `~/.checkin/config.toml`. A missing
//! default file means defaults; a missing explicit file is an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::fetch::RetryPolicy;
use crate::grammar::FieldSpec;

/// Errors raised while loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("no config file found at {0}")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config at {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// checkin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Roster document location. Defaults to `~/.checkin/state.json`.
    pub state_file: Option<PathBuf>,

    /// Per-request timeout.
    pub timeout_secs: u64,

    /// Attempts per request, including the first.
    pub attempts: u32,

    /// Pause between attempts.
    pub retry_delay_ms: u64,

    pub user_agent: String,

    pub notify: NotifyConfig,

    /// Extra grammars, by name, usable from `[[targets]]`.
    pub grammars: BTreeMap<String, GrammarConfig>,

    /// Targets added on top of the built-in roster.
    pub targets: Vec<TargetConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: None,
            timeout_secs: 10,
            attempts: RetryPolicy::DEFAULT_ATTEMPTS,
            retry_delay_ms: 1000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36"
                .to_string(),
            notify: NotifyConfig::default(),
            grammars: BTreeMap::new(),
            targets: Vec::new(),
        }
    }
}

/// Where the run report goes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NotifyConfig {
    /// Reports are only logged.
    #[default]
    None,

    /// Run `program [args..] <title> <body>`.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },

    /// POST `{"title", "content"}` as JSON.
    Webhook { url: String },
}

/// A grammar declared in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GrammarConfig {
    pub sentinel: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// A target declared in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetConfig {
    pub id: String,
    pub credential_key: String,
    pub checkin_url: String,
    pub reference_url: String,

    /// Grammar for the check-in response: a built-in name or a `[grammars.*]` key.
    pub grammar: String,

    /// Grammar for the reference page. Defaults to `grammar`.
    #[serde(default)]
    pub reference_grammar: Option<String>,

    /// When set, the check-in URL is first scraped for a one-time token.
    #[serde(default)]
    pub token_pattern: Option<String>,

    /// Query parameter carrying the token.
    #[serde(default)]
    pub token_param: Option<String>,
}

impl Config {
    /// Load config from `explicit`, or from the default path if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::path().ok_or(ConfigError::NoHome)?, false),
        };

        if !path.exists() {
            if required {
                return Err(ConfigError::Missing(path));
            }
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        Self::parse(&contents, &path)
    }

    /// Parse and validate config text; `path` is only used in messages.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if config.attempts == 0 {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                message: "attempts must be at least 1".to_string(),
            });
        }
        if config.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                message: "timeout-secs must be at least 1".to_string(),
            });
        }

        Ok(config)
    }

    /// The config file path: `~/.checkin/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".checkin").join("config.toml"))
    }

    /// The roster document path: `state-file` if set, else `~/.checkin/state.json`.
    pub fn state_path(&self) -> Option<PathBuf> {
        self.state_file
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".checkin").join("state.json")))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    const SAMPLE: &str = r#"
state-file = "/var/lib/checkin/state.json"
attempts = 5
retry-delay-ms = 250

[notify]
kind = "command"
program = "ql"
args = ["notify"]

[grammars.tracker]
sentinel = "Logout"

[[grammars.tracker.fields]]
name = "bonus"
label = "Bonus"
pattern = 'Bonus: ([\d.,]+)'
strip = true

[[targets]]
id = "TRACKER"
credential-key = "TRACKER_cookie"
checkin-url = "https://tracker.test/attendance.php"
reference-url = "https://tracker.test/index.php"
grammar = "nexusphp-attendance"
reference-grammar = "tracker"
"#;

    #[test]
    fn parses_full_config() {
        let config = Config::parse(SAMPLE, Path::new("config.toml")).unwrap();

        assert_eq!(
            config.state_path(),
            Some(PathBuf::from("/var/lib/checkin/state.json"))
        );
        assert_eq!(config.retry_policy().max_attempts(), 5);
        assert_eq!(config.retry_policy().delay(), Duration::from_millis(250));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(
            config.notify,
            NotifyConfig::Command {
                program: "ql".into(),
                args: vec!["notify".into()],
            }
        );

        let grammar = &config.grammars["tracker"];
        assert_eq!(grammar.sentinel, "Logout");
        assert!(grammar.fields[0].strip);

        let target = &config.targets[0];
        assert_eq!(target.id, "TRACKER");
        assert_eq!(target.reference_grammar.as_deref(), Some("tracker"));
        assert!(target.token_pattern.is_none());
    }

    #[test]
    fn empty_config_is_default() {
        let config = Config::parse("", Path::new("config.toml")).unwrap();

        assert_eq!(config.attempts, 3);
        assert_eq!(config.retry_delay_ms, 1000);
        assert_eq!(config.notify, NotifyConfig::None);
        assert!(config.targets.is_empty());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = Config::parse("attempts = 0", Path::new("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn unknown_notify_kind_is_rejected() {
        let err = Config::parse("[notify]\nkind = \"pigeon\"", Path::new("config.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn loads_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "timeout-secs = 30").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }
}
