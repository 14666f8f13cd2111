//! Test fixtures shared across modules.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::fetch::{FetchError, Fetcher, Request};
use crate::grammar::{FieldSpec, Grammar};
use crate::model::{Checkin, TargetDescriptor};
use crate::notify::{NotifyError, Notifier};
use crate::registry::Registry;

pub const SENTINEL: &str = "Welcome back";

pub fn checkin_grammar() -> Grammar {
    Grammar::compile(
        SENTINEL,
        &[
            FieldSpec::new("times", "Check-ins", r"times=(\d+)"),
            FieldSpec::new("reward", "Reward", r"reward=(\d+)"),
        ],
    )
    .unwrap()
}

pub fn reference_grammar() -> Grammar {
    Grammar::compile(
        SENTINEL,
        &[
            FieldSpec::new("share_ratio", "Share ratio", r"share_ratio=(\d+\.\d+)"),
            FieldSpec::new("mails", "New messages", r"mails=(\d+)"),
        ],
    )
    .unwrap()
}

pub fn checkin_url(id: &str) -> String {
    format!("https://{}.test/attendance.php", id.to_lowercase())
}

pub fn reference_url(id: &str) -> String {
    format!("https://{}.test/index.php", id.to_lowercase())
}

/// A direct check-in target reading `<id>_cookie`.
pub fn descriptor(id: &str) -> TargetDescriptor {
    TargetDescriptor {
        id: id.to_string(),
        credential_key: format!("{id}_cookie"),
        checkin: Checkin::Direct {
            url: checkin_url(id),
        },
        reference_url: reference_url(id),
        checkin_grammar: checkin_grammar(),
        reference_grammar: reference_grammar(),
    }
}

pub fn sample_registry(ids: &[&str]) -> Registry {
    Registry::new(ids.iter().map(|id| descriptor(id)).collect()).unwrap()
}

pub fn credentials(ids: &[&str]) -> HashMap<String, String> {
    ids.iter()
        .map(|id| (format!("{id}_cookie"), format!("uid={id}")))
        .collect()
}

/// Serves canned bodies by URL and records every call.
///
/// Unknown URLs answer 503.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, String>,
    pub calls: RefCell<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|u| *u == url).count()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Fetcher for ScriptedFetcher {
    fn get(&self, request: &Request<'_>) -> Result<String, FetchError> {
        self.calls.borrow_mut().push(request.url.to_string());
        self.pages
            .get(request.url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 503,
                url: request.url.to_string(),
            })
    }
}

/// Records notifications; optionally fails every call.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<(String, String)>>,
    pub fail: bool,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .borrow_mut()
            .push((title.to_string(), body.to_string()));
        if self.fail {
            return Err(NotifyError::Rejected("channel down".to_string()));
        }
        Ok(())
    }
}
