//! Error types for share resolution.
//!
//! Resolution errors never reach the HTTP layer directly: the resolver folds
//! them into a failed [`ShareInfo`](super::ShareInfo). They exist so each
//! strategy can report a precise reason in logs.

use thiserror::Error;

/// Errors that can occur while resolving a share link.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The share URL could not be parsed.
    #[error("invalid share URL '{input}'\n  Suggestion: Provide a full https:// share link")]
    InvalidShareUrl {
        /// The raw input.
        input: String,
    },

    /// The share page request failed or returned a non-success status.
    #[error("failed to fetch share page {url}: {reason}")]
    PageFetch {
        /// The share page URL.
        url: String,
        /// Why the fetch failed.
        reason: String,
    },

    /// A provider request exceeded its time budget.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// A provider JSON API answered with something unusable.
    #[error("{endpoint} API failed: {reason}")]
    Api {
        /// Short endpoint label (e.g. "share-info").
        endpoint: &'static str,
        /// Why the answer was rejected.
        reason: String,
    },

    /// HTTP client construction failed.
    #[error("HTTP client construction failed for {purpose}: {reason}")]
    ClientBuild {
        /// What the client was for.
        purpose: &'static str,
        /// The builder error.
        reason: String,
    },
}

impl ResolveError {
    /// Creates an `InvalidShareUrl` error.
    #[must_use]
    pub fn invalid_share_url(input: &str) -> Self {
        Self::InvalidShareUrl {
            input: input.to_string(),
        }
    }

    /// Creates a `PageFetch` error.
    #[must_use]
    pub fn page_fetch(url: &str, reason: impl Into<String>) -> Self {
        Self::PageFetch {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(url: &str) -> Self {
        Self::Timeout {
            url: url.to_string(),
        }
    }

    /// Creates an `Api` error.
    #[must_use]
    pub fn api(endpoint: &'static str, reason: impl Into<String>) -> Self {
        Self::Api {
            endpoint,
            reason: reason.into(),
        }
    }

    /// Creates a `ClientBuild` error.
    #[must_use]
    pub fn client_build(purpose: &'static str, source: &reqwest::Error) -> Self {
        Self::ClientBuild {
            purpose,
            reason: source.to_string(),
        }
    }

    /// Maps a transport error from `url` into `Timeout` or `reason`-tagged variants.
    #[must_use]
    pub(crate) fn from_transport(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(url)
        } else {
            Self::page_fetch(url, error.to_string())
        }
    }
}
