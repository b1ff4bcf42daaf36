//! JSON error responses and the error taxonomy they are drawn from.
//!
//! Pipeline failures are converted into exactly one [`ErrorKind`] before they
//! reach a handler. The kind fixes the HTTP status; `error` and `message` are
//! the caller-facing body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::download::StreamError;
use crate::resolver::ShareInfo;

const GENERIC_INTERNAL_MESSAGE: &str = "An unexpected error occurred";

/// Failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing URL or disallowed domain; client fault.
    Validation,
    /// Upstream 404, unreachable host, or share resolution failure.
    NotFound,
    /// A network call exceeded its budget.
    Timeout,
    /// Download transport failure before the response started.
    UpstreamTransport,
    /// A redirect left the trusted host set.
    SecurityRejection,
    /// Anything unexpected.
    Internal,
}

impl ErrorKind {
    /// HTTP status for this kind.
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::SecurityRejection => StatusCode::NOT_FOUND,
            Self::Timeout | Self::UpstreamTransport | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// A terminal error response.
#[derive(Debug, Clone, Error)]
#[error("{error}: {message}")]
pub struct ApiError {
    kind: ErrorKind,
    error: &'static str,
    message: String,
    reason: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl ApiError {
    fn new(kind: ErrorKind, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            error,
            message: message.into(),
            reason: None,
        }
    }

    /// The failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Short error label (`error` field).
    #[must_use]
    pub fn error(&self) -> &'static str {
        self.error
    }

    /// Human-readable message (`message` field).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// Request body had no usable `url`.
    #[must_use]
    pub fn url_required() -> Self {
        Self::new(
            ErrorKind::Validation,
            "URL is required",
            "Please provide a URL in the request body",
        )
    }

    /// URL is unparseable or outside the provider's domains.
    #[must_use]
    pub fn invalid_url() -> Self {
        Self::new(
            ErrorKind::Validation,
            "Invalid URL format",
            "URL must be from terabox.com or 1024terabox.com",
        )
    }

    /// Request body was not valid JSON for `{ "url": string }`.
    #[must_use]
    pub fn invalid_body(detail: &str, expose_details: bool) -> Self {
        Self::new(
            ErrorKind::Validation,
            "Invalid request body",
            if expose_details {
                detail.to_string()
            } else {
                "Request body must be JSON of the form {\"url\": \"...\"}".to_string()
            },
        )
    }

    /// Share resolution ended with `success == false`.
    #[must_use]
    pub fn resolution_failed(info: &ShareInfo) -> Self {
        let mut err = Self::new(
            ErrorKind::NotFound,
            "Share URL resolution failed",
            info.error
                .clone()
                .unwrap_or_else(|| "Unable to resolve share link".to_string()),
        );
        err.reason.clone_from(&info.message);
        err
    }

    /// Maps a preflight failure.
    #[must_use]
    pub fn from_preflight(error: &StreamError) -> Self {
        match error {
            StreamError::NotFound { .. } => Self::new(
                ErrorKind::NotFound,
                "File not found",
                "The requested file is not accessible or does not exist",
            ),
            StreamError::Timeout { .. } => Self::request_timeout(),
            StreamError::Unreachable { .. } => Self::new(
                ErrorKind::NotFound,
                "File not accessible",
                "Unable to connect to the file server",
            ),
            StreamError::RedirectRejected { .. } => Self::untrusted_redirect(),
            StreamError::ClientBuild { .. } => Self::internal(&error.to_string(), false),
            _ => Self::new(
                ErrorKind::NotFound,
                "File not accessible",
                "Unable to access the requested file",
            ),
        }
    }

    /// Maps a failure of the streaming GET or of response shaping.
    #[must_use]
    pub fn from_download(error: &StreamError) -> Self {
        match error {
            StreamError::RedirectRejected { .. } => Self::untrusted_redirect(),
            StreamError::Timeout { .. } => Self::request_timeout(),
            StreamError::InvalidHeader { .. } => Self::new(
                ErrorKind::UpstreamTransport,
                "Stream error",
                "Error occurred while streaming the file",
            ),
            _ => Self::new(
                ErrorKind::UpstreamTransport,
                "Download failed",
                "Failed to download the file from the server",
            ),
        }
    }

    /// Unexpected failure; `detail` is only shown when `expose_details` is set.
    #[must_use]
    pub fn internal(detail: &str, expose_details: bool) -> Self {
        Self::new(
            ErrorKind::Internal,
            "Internal server error",
            if expose_details {
                detail.to_string()
            } else {
                GENERIC_INTERNAL_MESSAGE.to_string()
            },
        )
    }

    fn request_timeout() -> Self {
        Self::new(
            ErrorKind::Timeout,
            "Request timeout",
            "The server took too long to respond",
        )
    }

    fn untrusted_redirect() -> Self {
        Self::new(
            ErrorKind::SecurityRejection,
            "File not accessible",
            "The file server redirected to an untrusted domain",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error,
            message: &self.message,
            reason: self.reason.as_deref(),
        };
        (self.kind.status(), Json(body)).into_response()
    }
}
