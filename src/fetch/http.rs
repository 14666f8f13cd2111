//! Blocking `reqwest` fetcher.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, COOKIE, REFERER};

use super::{FetchError, Fetcher, Request};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Real HTTP fetcher: browser-like headers, per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, request: &Request<'_>) -> Result<String, FetchError> {
        let response = self
            .client
            .get(request.url)
            .header(ACCEPT, ACCEPT_HTML)
            .header(COOKIE, request.credential)
            .header(REFERER, request.referer)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: request.url.to_string(),
            });
        }

        Ok(response.text()?)
    }
}
