//! Target descriptors: the remote services we check in to.

use regex::Regex;

use crate::grammar::Grammar;

/// One remote service, fixed for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct TargetDescriptor {
    /// Unique id, also the key in the roster document.
    pub id: String,

    /// Name of the environment variable holding the session cookie.
    pub credential_key: String,

    /// How the check-in request is made.
    pub checkin: Checkin,

    /// Page read after the check-in for account metrics.
    /// Also sent as the referer on every request to this target.
    pub reference_url: String,

    /// Grammar applied to the check-in response.
    pub checkin_grammar: Grammar,

    /// Grammar applied to the reference page.
    pub reference_grammar: Grammar,
}

/// How a target's check-in is triggered.
#[derive(Debug, Clone)]
pub enum Checkin {
    /// A plain GET on the attendance endpoint.
    Direct { url: String },

    /// The check-in link carries a one-time token scraped from a page.
    ///
    /// The page is fetched, `token` is matched against it (first capture group),
    /// and the page URL is requested again with `param=<token>` appended.
    Signed {
        page_url: String,
        token: Regex,
        param: String,
    },
}

impl Checkin {
    /// The URL first requested for this check-in.
    pub fn entry_url(&self) -> &str {
        match self {
            Self::Direct { url } => url,
            Self::Signed { page_url, .. } => page_url,
        }
    }
}
