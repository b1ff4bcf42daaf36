//! Per-request download pipeline.
//!
//! `Received → Classified → {Rejected | DirectReady | Resolving} →
//! {ResolutionFailed | Resolved} → Materializing → {NoStreamAvailable | Streaming}`.
//!
//! Every stage either hands a value to the next one or ends the request with
//! an [`ApiError`]. The pipeline never writes to the caller itself; it returns
//! a [`PipelineOutcome`] and the handler decides how to answer.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::classifier::{Classification, HostAllowList};
use crate::config::ServerConfig;
use crate::download::{PendingResponse, ProxyClient, StreamError};
use crate::resolver::{DownloadLinkMaterializer, FileMetadata, ShareResolver};
use crate::server::ApiError;

/// What the caller gets once the pipeline has finished.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Upstream headers are in; the body is ready to stream.
    Stream(PendingResponse),
    /// The share resolved but no download link could be obtained.
    ManualAction(FileMetadata),
}

/// Classifier, resolver, materializer and proxy wired together.
#[derive(Debug)]
pub struct DownloadPipeline {
    allow_list: Arc<HostAllowList>,
    resolver: ShareResolver,
    materializer: DownloadLinkMaterializer,
    proxy: ProxyClient,
}

impl DownloadPipeline {
    /// Builds a pipeline from server configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when an HTTP client cannot be constructed or the
    /// provider base URL is invalid.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        Self::new(&config.provider_base_url, config.allow_list())
    }

    /// Builds a pipeline against `provider_base_url`, trusting `allow_list`.
    ///
    /// # Errors
    ///
    /// Returns an error when an HTTP client cannot be constructed or the
    /// provider base URL is invalid.
    pub fn new(provider_base_url: &str, allow_list: HostAllowList) -> anyhow::Result<Self> {
        let allow_list = Arc::new(allow_list);
        Ok(Self {
            resolver: ShareResolver::with_base_url(provider_base_url)?,
            materializer: DownloadLinkMaterializer::with_base_url(provider_base_url)?,
            proxy: ProxyClient::new(Arc::clone(&allow_list))?,
            allow_list,
        })
    }

    /// The host allow-list used for classification and redirect pinning.
    #[must_use]
    pub fn allow_list(&self) -> &HostAllowList {
        &self.allow_list
    }

    /// Runs one request through every stage.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] of the first stage that short-circuits.
    #[instrument(skip(self, url))]
    pub async fn run(&self, url: Option<&str>) -> Result<PipelineOutcome, ApiError> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(ApiError::url_required)?;

        let target = match self.allow_list.classify(url) {
            Classification::Invalid => {
                info!(url, "rejected: host not on allow-list");
                return Err(ApiError::invalid_url());
            }
            Classification::DirectLink => {
                debug!(url, "direct link");
                url.to_string()
            }
            Classification::ShareLink => {
                info!(url, "resolving share link");
                let info = self.resolver.resolve(url).await;
                if !info.success {
                    warn!(url, error = ?info.error, "share resolution failed");
                    return Err(ApiError::resolution_failed(&info));
                }
                match self.materializer.materialize(&info, url).await {
                    Some(link) => link,
                    None => {
                        let Some(file) = info.file else {
                            return Err(ApiError::resolution_failed(&info));
                        };
                        info!(filename = %file.filename, "no download link; manual action required");
                        return Ok(PipelineOutcome::ManualAction(file));
                    }
                }
            }
        };

        self.stream(&target).await.map(PipelineOutcome::Stream)
    }

    async fn stream(&self, target: &str) -> Result<PendingResponse, ApiError> {
        let target_url = Url::parse(target).map_err(|e| {
            warn!(target, error = %e, "download link is not a valid URL");
            ApiError::from_download(&StreamError::invalid_url(target))
        })?;

        self.proxy.preflight(&target_url).await.map_err(|e| {
            warn!(url = %target_url, error = %e, "preflight failed");
            ApiError::from_preflight(&e)
        })?;

        let upstream = self.proxy.fetch(&target_url).await.map_err(|e| {
            warn!(url = %target_url, error = %e, "download request failed");
            ApiError::from_download(&e)
        })?;

        let pending = PendingResponse::new(upstream, &target_url).map_err(|e| {
            warn!(url = %target_url, error = %e, "could not shape response headers");
            ApiError::from_download(&e)
        })?;
        info!(url = %target_url, filename = pending.filename(), "streaming");
        Ok(pending)
    }
}
