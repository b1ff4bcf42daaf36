//! Shared User-Agent strings for provider-facing and proxy HTTP clients.
//!
//! The provider serves share pages and its JSON APIs only to browser-looking
//! clients, so resolver traffic uses a desktop browser UA. Raw file fetches
//! identify the proxy itself.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/terabox-proxy";

/// Browser User-Agent sent to share pages and provider APIs.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Default User-Agent for proxied file fetches.
#[must_use]
pub(crate) fn default_proxy_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("terabox-proxy/{version} (+{PROJECT_UA_URL})")
}
