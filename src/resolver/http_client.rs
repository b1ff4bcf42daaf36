//! Shared HTTP client construction policy for provider-facing requests.
//!
//! Share pages and provider APIs all get the same browser user agent,
//! compression, and connect timeout. Callers choose the redirect policy.

use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;

use crate::user_agent::BROWSER_USER_AGENT;

use super::ResolveError;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Share page fetch budget.
pub(crate) const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Share-info and download API budget.
pub(crate) const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Redirect hops allowed while fetching a share page.
pub(crate) const PAGE_MAX_REDIRECTS: usize = 5;

/// Builds a provider client with the given redirect policy.
///
/// `purpose` only labels construction errors.
///
/// # Errors
///
/// Returns [`ResolveError::ClientBuild`] when reqwest cannot build the client.
pub(crate) fn build_provider_http_client(
    purpose: &'static str,
    redirect: Policy,
) -> Result<Client, ResolveError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(BROWSER_USER_AGENT)
        .redirect(redirect)
        .gzip(true)
        .build()
        .map_err(|error| ResolveError::client_build(purpose, &error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_provider_http_client_with_each_policy() {
        assert!(build_provider_http_client("page", Policy::limited(PAGE_MAX_REDIRECTS)).is_ok());
        assert!(build_provider_http_client("download-api", Policy::none()).is_ok());
    }

    #[test]
    fn test_api_budget_is_tighter_than_page_budget() {
        assert!(API_TIMEOUT < PAGE_FETCH_TIMEOUT);
    }
}
