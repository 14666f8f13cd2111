//! The check-in run: one pass over the registry.
//!
//! For each target, in registry order:
//!
//! 1. No credential → skipped, nothing recorded.
//! 2. Already checked in today → skipped.
//! 3. Otherwise check in, then read the reference page (both retried).
//!    Both extractions successful → fields merged and today recorded.
//!    Anything else → failure fragment, stored state untouched.
//!
//! The roster document is loaded once and saved once. Only persistence
//! errors abort a run; every per-target failure stays inside that target.
//!
//! A preview run stops after the eligibility checks: eligible targets are
//! reported as due, nothing is fetched, saved or sent.

use jiff::civil::Date;
use reqwest::Url;
use tracing::{error, info, info_span, warn};

use crate::credentials::CredentialSource;
use crate::extract::{ExtractionResult, extract};
use crate::fetch::{self, Fetcher, Request, RetryPolicy};
use crate::grammar::Grammar;
use crate::model::{Checkin, FieldValue, RosterDocument, TargetDescriptor};
use crate::notify::Notifier;
use crate::registry::Registry;
use crate::report::{self, Assembled, Report, Summary};
use crate::storage::{self, StateStore};

/// What happened to one target in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    SkippedNoCredential,
    SkippedAlreadyDone,
    Succeeded,
    Failed,

    /// Eligible, but left alone by a preview run.
    Due,
}

impl Outcome {
    /// Whether the target was fetched this run.
    pub fn processed(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Result of a whole run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Outcome per visited target, in registry order.
    pub outcomes: Vec<(String, Outcome)>,

    /// The assembled report, sent or not.
    pub report: Assembled,

    /// Whether the notifier was invoked.
    pub notified: bool,
}

impl RunSummary {
    pub fn outcome(&self, id: &str) -> Option<Outcome> {
        self.outcomes
            .iter()
            .find(|(target, _)| target == id)
            .map(|&(_, outcome)| outcome)
    }
}

/// Everything a run needs, passed in explicitly.
pub struct Orchestrator<'a> {
    registry: &'a Registry,
    credentials: &'a dyn CredentialSource,
    fetcher: &'a dyn Fetcher,
    store: &'a dyn StateStore,
    notifier: &'a dyn Notifier,
    retry: RetryPolicy,
    only: Vec<String>,
    preview: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        registry: &'a Registry,
        credentials: &'a dyn CredentialSource,
        fetcher: &'a dyn Fetcher,
        store: &'a dyn StateStore,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            registry,
            credentials,
            fetcher,
            store,
            notifier,
            retry: RetryPolicy::default(),
            only: Vec::new(),
            preview: false,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Restricts the run to the given ids. Empty means every target.
    #[must_use]
    pub fn only(mut self, ids: Vec<String>) -> Self {
        self.only = ids;
        self
    }

    /// Evaluates eligibility only; the store, fetcher and notifier are not used
    /// beyond loading the document.
    #[must_use]
    pub fn preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Runs one pass over the registry for `today`.
    pub fn run(&self, today: Date) -> storage::Result<RunSummary> {
        let mut doc = self.store.load(self.registry)?;
        // Never trust the cached active list.
        doc.active = self.registry.active_ids(self.credentials);

        let mut report = Report::new();
        let mut outcomes = Vec::new();
        for target in self.registry.iter() {
            if !self.only.is_empty() && !self.only.contains(&target.id) {
                continue;
            }
            let span = info_span!("target", target = %target.id);
            let _enter = span.enter();
            let outcome = self.process(target, &mut doc, today, &mut report);
            outcomes.push((target.id.clone(), outcome));
        }

        if !self.preview {
            self.store.save(&doc)?;
        }

        let report = report.assemble(Summary {
            total: doc.total,
            active: doc.active.len(),
            completed_today: doc.completed_on(today),
        });

        let notified = report.processed && !self.preview;
        if notified {
            if let Err(e) = self.notifier.notify(report::TITLE, &report.body) {
                error!(error = %e, "failed to send notification");
            }
        } else {
            info!("nothing processed, no notification");
        }

        Ok(RunSummary {
            outcomes,
            report,
            notified,
        })
    }

    fn process(
        &self,
        target: &TargetDescriptor,
        doc: &mut RosterDocument,
        today: Date,
        report: &mut Report,
    ) -> Outcome {
        let Some(credential) = self.credentials.credential(&target.credential_key) else {
            info!(key = %target.credential_key, "no credential, skipping");
            return Outcome::SkippedNoCredential;
        };

        let state = doc.state_mut(&target.id);
        if !state.needs_processing(today) {
            info!("already checked in today, skipping");
            return Outcome::SkippedAlreadyDone;
        }

        if self.preview {
            info!("due for check-in");
            report.push_due(&target.id);
            return Outcome::Due;
        }

        info!("checking in");
        let checkin = self.check_in(target, &credential);
        let reference = self.read_page(
            target,
            &credential,
            &target.reference_url,
            &target.reference_grammar,
        );

        if !(checkin.success && reference.success) {
            warn!(
                checkin = checkin.success,
                reference = reference.success,
                "check-in failed"
            );
            report.push_failure(&target.id);
            return Outcome::Failed;
        }

        let mut fields = checkin.fields;
        fields.extend(reference.fields);
        state.record_success(today, fields);

        let entries: Vec<(&str, &FieldValue)> = target
            .checkin_grammar
            .fields
            .iter()
            .chain(&target.reference_grammar.fields)
            .filter_map(|rule| {
                state
                    .fields
                    .get(&rule.name)
                    .map(|value| (rule.label.as_str(), value))
            })
            .collect();
        report.push_success(&target.id, &entries);

        info!("checked in");
        Outcome::Succeeded
    }

    fn check_in(&self, target: &TargetDescriptor, credential: &str) -> ExtractionResult {
        match &target.checkin {
            Checkin::Direct { url } => {
                self.read_page(target, credential, url, &target.checkin_grammar)
            }
            Checkin::Signed {
                page_url,
                token,
                param,
            } => {
                let Some(page) = self.get(target, credential, page_url) else {
                    return ExtractionResult::failed();
                };
                let Some(value) = token.captures(&page).and_then(|c| c.get(1)) else {
                    warn!("no check-in token on page");
                    return ExtractionResult::failed();
                };
                let signed = match Url::parse(page_url) {
                    Ok(mut url) => {
                        url.query_pairs_mut().append_pair(param, value.as_str());
                        url
                    }
                    Err(e) => {
                        warn!(url = %page_url, error = %e, "invalid check-in URL");
                        return ExtractionResult::failed();
                    }
                };
                self.read_page(target, credential, signed.as_str(), &target.checkin_grammar)
            }
        }
    }

    fn read_page(
        &self,
        target: &TargetDescriptor,
        credential: &str,
        url: &str,
        grammar: &Grammar,
    ) -> ExtractionResult {
        let Some(body) = self.get(target, credential, url) else {
            return ExtractionResult::failed();
        };
        let result = extract(&body, grammar);
        if !result.success {
            warn!(url, "success marker missing from response");
        }
        result
    }

    fn get(&self, target: &TargetDescriptor, credential: &str, url: &str) -> Option<String> {
        let request = Request {
            url,
            credential,
            referer: &target.reference_url,
        };
        match fetch::fetch(self.fetcher, &self.retry, &request) {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(error = %e, "request gave up");
                None
            }
        }
    }
}
