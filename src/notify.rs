//! Outbound notification of the run report.
//!
//! Delivery is best-effort: the orchestrator logs a failed notification and
//! carries on.

use std::io;
use std::process::Command;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use tracing::info;

use crate::config::NotifyConfig;

/// Errors from a notification channel.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to run notifier: {0}")]
    Io(#[from] io::Error),

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Delivers a titled report somewhere a human will see it.
pub trait Notifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Drops every notification. Used when no channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, title: &str, _body: &str) -> Result<(), NotifyError> {
        info!(title, "no notification channel configured");
        Ok(())
    }
}

/// Runs an external program with the title and body as its last two arguments.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(title)
            .arg(body)
            .output()?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(NotifyError::Rejected(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )))
        }
    }
}

/// POSTs `{"title", "content"}` JSON to a URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    content: &'a str,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload {
                title,
                content: body,
            })
            .send()?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected(format!("webhook answered {status}")))
        }
    }
}

/// Builds the notifier described by `config`.
pub fn from_config(
    config: &NotifyConfig,
    timeout: Duration,
) -> Result<Box<dyn Notifier>, NotifyError> {
    let notifier: Box<dyn Notifier> = match config {
        NotifyConfig::None => Box::new(NoopNotifier),
        NotifyConfig::Command { program, args } => {
            Box::new(CommandNotifier::new(program.clone(), args.clone()))
        }
        NotifyConfig::Webhook { url } => Box::new(WebhookNotifier::new(url.clone(), timeout)?),
    };
    Ok(notifier)
}
