//! Two-phase proxied response.
//!
//! A [`PendingResponse`] owns the upstream response and the headers that will
//! be sent, but nothing has reached the caller yet, so failures can still be
//! answered with a JSON error. [`PendingResponse::commit`] hands the body to
//! axum; from then on failures are only logged because the status line and
//! headers are already on the wire.

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use futures_util::StreamExt;
use tracing::{debug, warn};
use url::Url;

use super::constants::DEFAULT_CONTENT_TYPE;
use super::error::StreamError;
use super::filename::derive_filename;

/// Upstream response plus the caller-facing headers derived from it.
#[derive(Debug)]
pub struct PendingResponse {
    upstream: reqwest::Response,
    headers: HeaderMap,
    filename: String,
    target: Url,
}

impl PendingResponse {
    /// Shapes caller-facing headers from the upstream response.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidHeader`] when an upstream value cannot be
    /// carried into a response header.
    pub fn new(upstream: reqwest::Response, target: &Url) -> Result<Self, StreamError> {
        let upstream_headers = upstream.headers();

        let content_type = upstream_headers
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

        let disposition = upstream_headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok());
        let filename = derive_filename(disposition, target);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, content_type);
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")).map_err(
                |_| StreamError::InvalidHeader {
                    name: "content-disposition",
                },
            )?,
        );
        for name in [CONTENT_LENGTH, CONTENT_ENCODING] {
            if let Some(value) = upstream_headers.get(&name) {
                headers.insert(name, value.clone());
            }
        }

        Ok(Self {
            upstream,
            headers,
            filename,
            target: target.clone(),
        })
    }

    /// Headers that will be sent on commit.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Filename offered in `Content-Disposition`.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Commits the response: status 200, shaped headers, upstream bytes streamed as they arrive.
    ///
    /// A transport failure while streaming is logged and ends the body early;
    /// no second response is attempted.
    #[must_use]
    pub fn commit(self) -> Response {
        let Self {
            upstream,
            headers,
            filename,
            target,
        } = self;
        debug!(url = %target, filename = %filename, "response committed; streaming upstream body");

        let stream = upstream.bytes_stream().inspect(move |chunk| {
            if let Err(error) = chunk {
                warn!(url = %target, error = %error, "upstream stream failed after response was committed");
            }
        });

        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = StatusCode::OK;
        *response.headers_mut() = headers;
        response
    }
}
