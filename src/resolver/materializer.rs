//! Download link materialization.
//!
//! Turns resolved share metadata into the URL that actually serves bytes.
//! When the share-info answer already carried a `dlink` it is used as-is;
//! otherwise the provider's download API is asked once.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;
use reqwest::header::REFERER;
use reqwest::redirect::Policy;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::http_client::{API_TIMEOUT, build_provider_http_client};
use super::utils::{non_empty, provider_endpoint};
use super::{DEFAULT_BASE_URL, FileMetadata, ResolveError, ShareInfo};

const DOWNLOAD_API_PATH: &str = "share/download";

/// Obtains the final byte-serving URL for a resolved share.
#[derive(Debug)]
pub struct DownloadLinkMaterializer {
    client: Client,
    endpoint: Url,
}

impl DownloadLinkMaterializer {
    /// Creates a materializer against the default provider host.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when HTTP client construction fails.
    pub fn new() -> Result<Self, ResolveError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a materializer against a custom provider base URL (for tests).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the base URL is invalid or client construction fails.
    pub fn with_base_url(base_url: &str) -> Result<Self, ResolveError> {
        Ok(Self {
            client: build_provider_http_client("download-api", Policy::none())?,
            endpoint: provider_endpoint(base_url, DOWNLOAD_API_PATH)?,
        })
    }

    /// Returns the download URL for `info`, or `None` when none can be obtained.
    ///
    /// `None` is an expected outcome: the caller reports the file metadata
    /// without a stream.
    #[instrument(skip(self, info), fields(share_url = %share_url))]
    pub async fn materialize(&self, info: &ShareInfo, share_url: &str) -> Option<String> {
        let file = info.file.as_ref().filter(|_| info.success)?;

        if let Some(url) = &file.download_url {
            debug!("using download link exposed by share-info");
            return Some(url.clone());
        }

        let Some(fs_id) = file.fs_id.as_deref() else {
            debug!("no file identifier; download API not called");
            return None;
        };

        match self.request_link(file, fs_id, share_url).await {
            Ok(link) => Some(link),
            Err(error) => {
                warn!(error = %error, "download link unavailable");
                None
            }
        }
    }

    async fn request_link(
        &self,
        file: &FileMetadata,
        fs_id: &str,
        share_url: &str,
    ) -> Result<String, ResolveError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        // uk/sign come from page state the resolver does not capture yet; the
        // provider usually rejects the call without them.
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("shareid", &file.share_id)
            .append_pair("fid_list", &format!("[{fs_id}]"))
            .append_pair("timestamp", &timestamp.to_string())
            .append_pair("uk", "")
            .append_pair("sign", "");

        let response = self
            .client
            .get(url)
            .header(REFERER, share_url)
            .timeout(API_TIMEOUT)
            .send()
            .await
            .map_err(|e| ResolveError::from_transport(self.endpoint.as_str(), &e))?;

        let status = response.status().as_u16();
        if !(200..400).contains(&status) {
            return Err(ResolveError::api("download", format!("HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ResolveError::api("download", format!("unexpected body: {e}")))?;

        extract_dlink(&body).ok_or_else(|| ResolveError::api("download", "no dlink in response"))
    }
}

/// Reads `dlink` from the top level or from the first `list` entry.
fn extract_dlink(body: &Value) -> Option<String> {
    non_empty(body.get("dlink").and_then(Value::as_str)).or_else(|| {
        non_empty(
            body.get("list")
                .and_then(|list| list.get(0))
                .and_then(|entry| entry.get("dlink"))
                .and_then(Value::as_str),
        )
    })
}
