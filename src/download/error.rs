//! Error types for the download module.
//!
//! Every reqwest failure from a preflight or streaming fetch is converted into
//! one [`StreamError`] variant before leaving this module.

use std::error::Error as StdError;

use thiserror::Error;
use url::Url;

/// Redirect target left the trusted host set.
///
/// Raised from inside the redirect policy and recovered from the reqwest
/// error's source chain.
#[derive(Debug, Clone, Error)]
#[error("redirect to untrusted host '{host}' rejected")]
pub struct RedirectRejected {
    /// Host the upstream tried to send us to.
    pub host: String,
}

/// Redirect chain exceeded the hop budget.
#[derive(Debug, Clone, Error)]
#[error("too many redirects (limit {limit})")]
pub struct TooManyRedirects {
    /// The hop budget.
    pub limit: usize,
}

/// Errors that can occur while checking or streaming an upstream file.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The target URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The upstream answered 404.
    #[error("file not found at {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The upstream answered with a status outside the accepted range.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request exceeded its time budget.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// DNS resolution or TCP connect failed.
    #[error("unable to connect to {url}: {source}")]
    Unreachable {
        /// The URL that could not be reached.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The target or a redirect hop is outside the trusted host set.
    #[error("request to {url} rejected: host '{host}' is not trusted")]
    RedirectRejected {
        /// The URL originally requested.
        url: String,
        /// The untrusted host.
        host: String,
    },

    /// The redirect chain was longer than allowed.
    #[error("too many redirects requesting {url}")]
    TooManyRedirects {
        /// The URL originally requested.
        url: String,
    },

    /// Any other transport failure.
    #[error("transport error requesting {url}: {source}")]
    Transport {
        /// The URL being requested.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// A response header could not be built from upstream data.
    #[error("invalid {name} header value")]
    InvalidHeader {
        /// Header name.
        name: &'static str,
    },

    /// HTTP client construction failed.
    #[error("HTTP client construction failed: {source}")]
    ClientBuild {
        /// The builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl StreamError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a not-found error.
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::NotFound { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a redirect rejection error.
    pub fn redirect_rejected(url: impl Into<String>, host: impl Into<String>) -> Self {
        Self::RedirectRejected {
            url: url.into(),
            host: host.into(),
        }
    }

    /// Converts a reqwest failure for `url` into exactly one variant.
    ///
    /// Redirect-policy errors are recovered from the source chain so that a
    /// pinning rejection is never reported as a generic transport failure.
    #[must_use]
    pub fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        if let Some(rejected) = find_source::<RedirectRejected>(&error) {
            return Self::redirect_rejected(url.as_str(), rejected.host.clone());
        }
        if find_source::<TooManyRedirects>(&error).is_some() {
            return Self::TooManyRedirects {
                url: url.to_string(),
            };
        }
        if error.is_timeout() {
            return Self::timeout(url.as_str());
        }
        if error.is_redirect() {
            return Self::TooManyRedirects {
                url: url.to_string(),
            };
        }
        if error.is_connect() {
            return Self::Unreachable {
                url: url.to_string(),
                source: error,
            };
        }
        Self::Transport {
            url: url.to_string(),
            source: error,
        }
    }

    /// Returns true for pinning rejections.
    #[must_use]
    pub fn is_security_rejection(&self) -> bool {
        matches!(self, Self::RedirectRejected { .. })
    }
}

/// Finds the first error of type `T` in `error`'s source chain, including itself.
fn find_source<'a, T>(error: &'a (dyn StdError + 'static)) -> Option<&'a T>
where
    T: StdError + 'static,
{
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(found) = err.downcast_ref::<T>() {
            return Some(found);
        }
        current = err.source();
    }
    None
}
