//! Pinned HTTP client for upstream file servers.
//!
//! Every request made through [`ProxyClient`] is checked against the
//! [`HostAllowList`] before it is sent, and again on every redirect hop.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::{Attempt, Policy};
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, DOWNLOAD_TIMEOUT, MAX_REDIRECTS, PREFLIGHT_TIMEOUT};
use super::error::{RedirectRejected, StreamError, TooManyRedirects};
use crate::classifier::HostAllowList;
use crate::user_agent;

/// HTTP client for preflight checks and streaming fetches.
///
/// Create once and share; the inner reqwest client pools connections.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    allow_list: Arc<HostAllowList>,
}

impl ProxyClient {
    /// Creates a client pinned to `allow_list`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ClientBuild`] when reqwest cannot build the client.
    pub fn new(allow_list: Arc<HostAllowList>) -> Result<Self, StreamError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .read_timeout(DOWNLOAD_TIMEOUT)
            // Bodies are relayed byte-for-byte; the caller sees the upstream encoding.
            .no_gzip()
            .user_agent(user_agent::default_proxy_user_agent())
            .redirect(pinned_redirect_policy(Arc::clone(&allow_list)))
            .build()
            .map_err(|source| StreamError::ClientBuild { source })?;
        Ok(Self { client, allow_list })
    }

    /// The allow-list this client is pinned to.
    #[must_use]
    pub fn allow_list(&self) -> &HostAllowList {
        &self.allow_list
    }

    /// Header-only existence check.
    ///
    /// Accepts final statuses 200–399.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::NotFound`] for 404, [`StreamError::RedirectRejected`]
    /// when the target or any hop is untrusted, and the matching transport
    /// variant otherwise.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn preflight(&self, url: &Url) -> Result<(), StreamError> {
        self.ensure_trusted(url)?;

        let response = self
            .client
            .head(url.clone())
            .timeout(PREFLIGHT_TIMEOUT)
            .send()
            .await
            .map_err(|e| StreamError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        debug!(status, final_url = %response.url(), "preflight answered");
        if status == 404 {
            return Err(StreamError::not_found(url.as_str()));
        }
        if !(200..400).contains(&status) {
            return Err(StreamError::http_status(url.as_str(), status));
        }
        Ok(())
    }

    /// Starts a streaming GET and returns once response headers arrive.
    ///
    /// The body is not read here; callers stream it with `bytes_stream()`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Timeout`] when headers do not arrive within the
    /// download budget, [`StreamError::HttpStatus`] for non-2xx answers, and the
    /// same pinning/transport variants as [`preflight`](Self::preflight).
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<reqwest::Response, StreamError> {
        self.ensure_trusted(url)?;

        let response = tokio::time::timeout(DOWNLOAD_TIMEOUT, self.client.get(url.clone()).send())
            .await
            .map_err(|_| StreamError::timeout(url.as_str()))?
            .map_err(|e| StreamError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::http_status(url.as_str(), status.as_u16()));
        }
        Ok(response)
    }

    fn ensure_trusted(&self, url: &Url) -> Result<(), StreamError> {
        if self.allow_list.allows_url(url) {
            return Ok(());
        }
        let host = url.host_str().unwrap_or_default();
        warn!(host, "target host outside allow-list");
        Err(StreamError::redirect_rejected(url.as_str(), host))
    }
}

/// Follows at most [`MAX_REDIRECTS`] hops, each of which must stay on a trusted host.
fn pinned_redirect_policy(allow_list: Arc<HostAllowList>) -> Policy {
    Policy::custom(move |attempt: Attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error(TooManyRedirects {
                limit: MAX_REDIRECTS,
            });
        }
        if !allow_list.allows_url(attempt.url()) {
            let host = attempt.url().host_str().unwrap_or_default().to_string();
            warn!(host = %host, status = attempt.status().as_u16(), "redirect to untrusted host blocked");
            return attempt.error(RedirectRejected { host });
        }
        attempt.follow()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ProxyClient {
        ProxyClient::new(Arc::new(HostAllowList::provider_default())).unwrap()
    }

    #[tokio::test]
    async fn test_preflight_rejects_untrusted_target_before_sending() {
        let url = Url::parse("https://evil.com/file.bin").unwrap();
        let err = client().preflight(&url).await.unwrap_err();
        assert!(err.is_security_rejection(), "got {err}");
    }

    #[tokio::test]
    async fn test_fetch_rejects_untrusted_target_before_sending() {
        let url = Url::parse("http://127.0.0.1:9/file.bin").unwrap();
        let err = client().fetch(&url).await.unwrap_err();
        assert!(err.is_security_rejection(), "got {err}");
    }

    #[test]
    fn test_allow_list_accessor() {
        assert!(client().allow_list().allows_host("terabox.com"));
    }
}
