//! Share link resolution pipeline.
//!
//! A share link points at an HTML page, not at bytes. Resolution fetches that
//! page once, then runs a fixed list of extraction strategies in order until
//! one yields [`FileMetadata`]. Strategies never fail the resolution on their
//! own; only "every strategy missed" does.
//!
//! # Architecture
//!
//! - [`ShareResolver`] - Page fetch plus the ordered strategy loop
//! - [`ExtractionStrategy`] - Async trait that individual strategies implement
//! - [`Extraction`] - Tagged outcome of a single strategy
//! - [`EmbeddedListingStrategy`] - Page-embedded file listing (located, not parsed)
//! - [`ShareInfoApiStrategy`] - Provider share-info JSON API
//! - [`DownloadLinkMaterializer`] - Resolved metadata to byte-serving URL
//!
//! # Example
//!
//! ```no_run
//! use terabox_proxy::resolver::{DownloadLinkMaterializer, ShareResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = ShareResolver::new()?;
//! let share_url = "https://www.terabox.com/s/1AbCdEf";
//! let info = resolver.resolve(share_url).await;
//! if let Some(file) = &info.file {
//!     println!("{} ({:?} bytes)", file.filename, file.size);
//! }
//! let link = DownloadLinkMaterializer::new()?.materialize(&info, share_url).await;
//! println!("stream from: {link:?}");
//! # Ok(())
//! # }
//! ```

mod error;
mod http_client;
mod materializer;
mod page;
mod share_api;
mod utils;

pub use error::ResolveError;
pub use materializer::DownloadLinkMaterializer;
pub use page::{EmbeddedListingStrategy, ScriptFindings, inline_scripts, inspect_scripts};
pub use share_api::ShareInfoApiStrategy;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, REFERER};
use reqwest::redirect::Policy;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub(crate) use utils::compile_static_regex;

use http_client::{PAGE_FETCH_TIMEOUT, PAGE_MAX_REDIRECTS, build_provider_http_client};
use utils::share_id_from_url;

/// Provider homepage; used as the default API host and page `Referer`.
pub const DEFAULT_BASE_URL: &str = "https://www.terabox.com";

/// `ShareInfo::error` when the share page cannot be fetched.
pub const PAGE_FETCH_FAILED: &str = "Failed to fetch share page";

/// `ShareInfo::error` when every strategy missed.
pub const EXTRACTION_FAILED: &str = "Unable to extract download information from share page";

/// `ShareInfo::message` accompanying [`EXTRACTION_FAILED`].
pub const EXTRACTION_FAILED_HINT: &str =
    "structure may have changed or file may not be accessible";

/// Metadata for the file behind a share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Display filename.
    pub filename: String,
    /// Size in bytes, when reported.
    pub size: Option<i64>,
    /// Provider file identifier.
    pub fs_id: Option<String>,
    /// Share identifier the file was resolved from.
    pub share_id: String,
    /// Direct download link, only when the provider exposed one.
    pub download_url: Option<String>,
}

/// Outcome of resolving a share link.
///
/// `success == false` is terminal for the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareInfo {
    pub success: bool,
    pub file: Option<FileMetadata>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ShareInfo {
    /// A successful resolution.
    #[must_use]
    pub fn found(file: FileMetadata) -> Self {
        Self {
            success: true,
            file: Some(file),
            error: None,
            message: None,
        }
    }

    /// A failed resolution.
    #[must_use]
    pub fn failed(error: impl Into<String>, message: Option<&str>) -> Self {
        Self {
            success: false,
            file: None,
            error: Some(error.into()),
            message: message.map(str::to_string),
        }
    }
}

/// A fetched share page, handed to each strategy.
#[derive(Debug, Clone)]
pub struct SharePage {
    /// The share URL as supplied by the caller.
    pub share_url: Url,
    /// Identifier derived from the share URL, if any.
    pub share_id: Option<String>,
    /// What the page's inline scripts revealed.
    pub findings: ScriptFindings,
}

/// Result of a single strategy.
#[derive(Debug, Clone)]
pub enum Extraction {
    /// Metadata found; resolution stops here.
    Found(FileMetadata),
    /// Nothing usable; the reason is logged.
    Missed(String),
    /// The data is there but this path is not implemented.
    Unsupported(&'static str),
}

/// One way of pulling file metadata out of a share.
///
/// Uses `async_trait` so strategies can be stored as `Box<dyn ExtractionStrategy>`.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Attempts extraction. Must not panic on unexpected page or API shapes.
    async fn extract(&self, page: &SharePage) -> Extraction;
}

/// Resolves share links into [`ShareInfo`].
pub struct ShareResolver {
    client: Client,
    homepage: String,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ShareResolver {
    /// Creates a resolver against the default provider host.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when HTTP client construction fails.
    pub fn new() -> Result<Self, ResolveError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a resolver with the default strategy order against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the base URL is invalid or client construction fails.
    pub fn with_base_url(base_url: &str) -> Result<Self, ResolveError> {
        let api_client = build_provider_http_client("share-info-api", Policy::default())?;
        let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![
            Box::new(EmbeddedListingStrategy),
            Box::new(ShareInfoApiStrategy::new(api_client, base_url)?),
        ];
        Self::with_strategies(base_url, strategies)
    }

    /// Creates a resolver with an explicit strategy list, tried in order.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when HTTP client construction fails.
    pub fn with_strategies(
        base_url: &str,
        strategies: Vec<Box<dyn ExtractionStrategy>>,
    ) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_provider_http_client(
                "share-page",
                Policy::limited(PAGE_MAX_REDIRECTS),
            )?,
            homepage: format!("{}/", base_url.trim_end_matches('/')),
            strategies,
        })
    }

    /// Returns the registered strategy names in order.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolves a share link. Never errors; failures are a `success == false` [`ShareInfo`].
    #[instrument(skip(self), fields(share_url = %share_url))]
    pub async fn resolve(&self, share_url: &str) -> ShareInfo {
        let Ok(url) = Url::parse(share_url.trim()) else {
            warn!(error = %ResolveError::invalid_share_url(share_url), "share URL rejected");
            return ShareInfo::failed(PAGE_FETCH_FAILED, None);
        };

        let html = match self.fetch_page(&url).await {
            Ok(html) => html,
            Err(error) => {
                warn!(error = %error, "share page fetch failed");
                return ShareInfo::failed(PAGE_FETCH_FAILED, None);
            }
        };

        let findings = inspect_scripts(&html);
        match &findings.session_token {
            Some(token) => debug!(token_len = token.len(), "session token captured"),
            None => debug!("no session token on share page"),
        }

        let page = SharePage {
            share_id: share_id_from_url(&url),
            share_url: url,
            findings,
        };

        for strategy in &self.strategies {
            match strategy.extract(&page).await {
                Extraction::Found(file) => {
                    info!(strategy = strategy.name(), filename = %file.filename, "share resolved");
                    return ShareInfo::found(file);
                }
                Extraction::Missed(reason) => {
                    debug!(strategy = strategy.name(), reason = %reason, "strategy missed");
                }
                Extraction::Unsupported(reason) => {
                    debug!(strategy = strategy.name(), reason, "strategy not supported; falling through");
                }
            }
        }

        warn!(tried = self.strategies.len(), "no strategy produced file metadata");
        ShareInfo::failed(EXTRACTION_FAILED, Some(EXTRACTION_FAILED_HINT))
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, ResolveError> {
        let response = self
            .client
            .get(url.clone())
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(REFERER, &self.homepage)
            .timeout(PAGE_FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| ResolveError::from_transport(url.as_str(), &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::page_fetch(
                url.as_str(),
                format!("HTTP {}", status.as_u16()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| ResolveError::from_transport(url.as_str(), &e))
    }
}

impl std::fmt::Debug for ShareResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareResolver")
            .field("homepage", &self.homepage)
            .field("strategies", &self.strategy_names())
            .finish_non_exhaustive()
    }
}
