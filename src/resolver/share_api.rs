//! Share-info API strategy.
//!
//! `GET {base}/api/shorturlinfo?shorturl=<id>&root=1` answers with
//! `{"errno": 0, "list": [{...}]}` for accessible shares. The API is
//! undocumented, so every field is read leniently.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::REFERER;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::http_client::API_TIMEOUT;
use super::utils::non_empty;
use super::{Extraction, ExtractionStrategy, FileMetadata, ResolveError, SharePage};

const SHARE_INFO_PATH: &str = "api/shorturlinfo";

#[derive(Debug, Deserialize)]
struct ShareInfoResponse {
    errno: Option<i64>,
    #[serde(default)]
    list: Vec<ApiFileEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiFileEntry {
    server_filename: Option<String>,
    filename: Option<String>,
    size: Option<Value>,
    fs_id: Option<Value>,
    dlink: Option<String>,
}

impl ApiFileEntry {
    /// Builds metadata from the entry, or `None` when no filename field is usable.
    pub(crate) fn into_metadata(self, share_id: &str) -> Option<FileMetadata> {
        let filename = non_empty(self.server_filename.as_deref())
            .or_else(|| non_empty(self.filename.as_deref()))?;
        Some(FileMetadata {
            filename,
            size: self.size.as_ref().and_then(lenient_i64),
            fs_id: self.fs_id.as_ref().and_then(lenient_string),
            share_id: share_id.to_string(),
            download_url: non_empty(self.dlink.as_deref()),
        })
    }
}

/// Accepts `123` or `"123"`.
fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts numeric or string identifiers.
fn lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => non_empty(Some(s.as_str())),
        _ => None,
    }
}

/// Resolves file metadata through the provider's share-info API.
#[derive(Debug)]
pub struct ShareInfoApiStrategy {
    client: Client,
    endpoint: Url,
}

impl ShareInfoApiStrategy {
    /// Creates the strategy against `{base_url}/api/shorturlinfo`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the base URL does not parse.
    pub fn new(client: Client, base_url: &str) -> Result<Self, ResolveError> {
        Ok(Self {
            client,
            endpoint: super::utils::provider_endpoint(base_url, SHARE_INFO_PATH)?,
        })
    }

    async fn fetch(&self, page: &SharePage, share_id: &str) -> Result<FileMetadata, ResolveError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("shorturl", share_id)
            .append_pair("root", "1");

        let response = self
            .client
            .get(url)
            .header(REFERER, page.share_url.as_str())
            .timeout(API_TIMEOUT)
            .send()
            .await
            .map_err(|e| ResolveError::from_transport(self.endpoint.as_str(), &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::api(
                "share-info",
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body: ShareInfoResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::api("share-info", format!("unexpected body: {e}")))?;

        match body.errno {
            Some(0) => {}
            Some(errno) => return Err(ResolveError::api("share-info", format!("errno {errno}"))),
            None => return Err(ResolveError::api("share-info", "missing errno")),
        }

        let entry = body
            .list
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::api("share-info", "empty file list"))?;

        entry
            .into_metadata(share_id)
            .ok_or_else(|| ResolveError::api("share-info", "first entry has no filename"))
    }
}

#[async_trait]
impl ExtractionStrategy for ShareInfoApiStrategy {
    fn name(&self) -> &'static str {
        "share-info-api"
    }

    #[tracing::instrument(skip(self, page), fields(strategy = "share-info-api"))]
    async fn extract(&self, page: &SharePage) -> Extraction {
        let Some(share_id) = page.share_id.as_deref() else {
            return Extraction::Missed("share URL has no identifier".to_string());
        };

        match self.fetch(page, share_id).await {
            Ok(file) => {
                debug!(filename = %file.filename, has_dlink = file.download_url.is_some(), "share-info API resolved file");
                Extraction::Found(file)
            }
            Err(error) => {
                warn!(error = %error, "share-info API lookup failed");
                Extraction::Missed(error.to_string())
            }
        }
    }
}
