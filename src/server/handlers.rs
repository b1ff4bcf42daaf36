//! Route handlers.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use super::AppState;
use super::error::ApiError;
use crate::pipeline::PipelineOutcome;
use crate::resolver::FileMetadata;

const MANUAL_ACTION_MESSAGE: &str =
    "File information retrieved, but a direct download link is not available";
const MANUAL_ACTION_NOTE: &str = "Open the share link in a browser to download this file";

/// Body of `POST /api/download`.
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManualActionBody<'a> {
    success: bool,
    message: &'static str,
    file_info: FileInfo<'a>,
}

#[derive(Debug, Serialize)]
struct FileInfo<'a> {
    filename: &'a str,
    size: Option<i64>,
    note: &'static str,
}

fn manual_action(file: &FileMetadata) -> Response {
    let body = ManualActionBody {
        success: true,
        message: MANUAL_ACTION_MESSAGE,
        file_info: FileInfo {
            filename: &file.filename,
            size: file.size,
            note: MANUAL_ACTION_NOTE,
        },
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn panic_detail(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("handler panicked")
}

/// `POST /api/download`
pub async fn download(
    State(state): State<AppState>,
    body: Result<Json<LinkRequest>, JsonRejection>,
) -> Response {
    let expose = state.environment.exposes_error_details();
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected request body");
            return ApiError::invalid_body(&rejection.body_text(), expose).into_response();
        }
    };

    let outcome = AssertUnwindSafe(state.pipeline.run(request.url.as_deref()))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(PipelineOutcome::Stream(pending))) => pending.commit(),
        Ok(Ok(PipelineOutcome::ManualAction(file))) => manual_action(&file),
        Ok(Err(api_error)) => api_error.into_response(),
        Err(payload) => {
            let detail = panic_detail(payload.as_ref());
            error!(detail, "download handler panicked");
            ApiError::internal(detail, expose).into_response()
        }
    }
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "Server is running" }))
}

/// `GET /`
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "TeraBox Download API",
        "endpoints": {
            "download": "POST /api/download",
            "health": "GET /health",
        },
    }))
}

/// Any unmatched route.
pub async fn fallback() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found",
            "message": "The requested endpoint does not exist",
        })),
    )
        .into_response()
}
