//! Error taxonomy for the scrape, extract and resolve pipeline.
//!
//! Only [`ExtractError`] is allowed to escape the core pipeline as a real
//! error. Everything else is converted into a structured outcome close to
//! where it happens: a failed [`SearchResponse`](crate::dokotoku::SearchResponse)
//! for searches, an [`Unresolved`] reason for affiliate resolution.

use thiserror::Error;

/// Failures of a browser session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The browser could not be started (or connected to). Fatal for the call.
    #[error("browser launch failed: {0}")]
    LaunchFailure(String),

    /// A navigation did not finish loading within its budget.
    #[error("navigation to {url} timed out after {secs}s")]
    NavigationTimeout { url: String, secs: u64 },

    /// The browser reported a navigation error.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A page operation (content, url, input) failed after navigation.
    #[error("page operation failed: {0}")]
    Page(String),
}

/// The extractor only fails on input that is not a document at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("malformed HTML: {0}")]
    MalformedHtml(String),
}

/// Validation failures of a search request. Nothing is scraped when these occur.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("keyword is required")]
    EmptyKeyword,
}

/// Why a link was not rewritten. Every variant means "use the original link".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Unresolved {
    /// No referral value is configured for the partner.
    #[error("no affiliate rule for partner '{0}'")]
    RuleMissing(String),

    /// The redirector still pointed at the comparison site after following it.
    #[error("redirect did not leave the source site: {0}")]
    RedirectUnresolved(String),

    /// The URL could not be parsed for parameter injection.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Following the redirect exceeded its time cap.
    #[error("redirect resolution timed out: {0}")]
    Timeout(String),

    /// The browser session used to follow the redirect failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}
