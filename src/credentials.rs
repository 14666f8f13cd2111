//! Credential lookup.
//!
//! Credentials are opaque session cookies obtained elsewhere. A target whose
//! credential is missing is inactive for the run.

use std::collections::HashMap;
use std::env;

/// Looks up the credential stored under a key.
pub trait CredentialSource {
    /// The credential for `key`, or `None` if absent or blank.
    fn credential(&self, key: &str) -> Option<String>;
}

/// Reads credentials from environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn credential(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl CredentialSource for HashMap<String, String> {
    fn credential(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty()).cloned()
    }
}
