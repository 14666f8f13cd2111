//! HTTP fetching with bounded retry.
//!
//! [`Fetcher`] is a single GET. [`fetch`] wraps it in a [`RetryPolicy`] and
//! turns the final failure into [`Unreachable`], which callers treat like any
//! other unsuccessful response rather than a crash.

mod http;
mod retry;

pub use http::HttpFetcher;
pub use retry::{Exhausted, RetryPolicy};

use tracing::debug;

/// Errors from a single request attempt.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

/// A GET request against one target.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    pub url: &'a str,

    /// Opaque session cookie.
    pub credential: &'a str,

    pub referer: &'a str,
}

/// Performs one GET and returns the response body.
///
/// Non-2xx statuses are errors.
pub trait Fetcher {
    fn get(&self, request: &Request<'_>) -> Result<String, FetchError>;
}

/// A URL that failed on every attempt.
#[derive(Debug, thiserror::Error)]
#[error("{url} unreachable after {attempts} attempt(s): {last}")]
pub struct Unreachable {
    pub url: String,
    pub attempts: u32,
    #[source]
    pub last: FetchError,
}

/// Fetches `request`, retrying every failure per `policy`.
pub fn fetch(
    fetcher: &dyn Fetcher,
    policy: &RetryPolicy,
    request: &Request<'_>,
) -> Result<String, Unreachable> {
    debug!(url = request.url, "fetching");
    policy
        .run(|_| fetcher.get(request), |_| true)
        .map_err(|Exhausted { attempts, last }| Unreachable {
            url: request.url.to_string(),
            attempts,
            last,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;
    use std::time::Duration;

    struct AlwaysDown {
        calls: Cell<u32>,
    }

    impl Fetcher for AlwaysDown {
        fn get(&self, request: &Request<'_>) -> Result<String, FetchError> {
            self.calls.set(self.calls.get() + 1);
            Err(FetchError::Status {
                status: 503,
                url: request.url.to_string(),
            })
        }
    }

    fn request() -> Request<'static> {
        Request {
            url: "https://example.test/attendance.php",
            credential: "uid=1",
            referer: "https://example.test/index.php",
        }
    }

    #[test]
    fn exhausted_fetch_is_unreachable_after_exactly_n_calls() {
        let fetcher = AlwaysDown {
            calls: Cell::new(0),
        };
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let err = fetch(&fetcher, &policy, &request()).unwrap_err();

        assert_eq!(fetcher.calls.get(), 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.url, "https://example.test/attendance.php");
        assert!(matches!(err.last, FetchError::Status { status: 503, .. }));
    }

    #[test]
    fn status_error_message_names_url() {
        let err = FetchError::Status {
            status: 404,
            url: "https://example.test/".into(),
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://example.test/");
    }
}
