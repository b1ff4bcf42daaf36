//! TeraBox share-link download proxy.
//!
//! This library turns user-supplied TeraBox links into direct, streamable
//! downloads and proxies the bytes back to the caller.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`classifier`] - Host allow-list and share/direct link classification
//! - [`resolver`] - Share page scraping, share-info API lookup, download link materialization
//! - [`download`] - Preflight checks and pinned streaming fetches
//! - [`pipeline`] - Per-request orchestration of the stages above
//! - [`server`] - axum routes, rate-limit gate, and JSON error responses

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classifier;
pub mod config;
pub mod download;
pub mod pipeline;
pub mod resolver;
pub mod server;
mod user_agent;

// Re-export commonly used types
pub use classifier::{Classification, HostAllowList, classify};
pub use config::{Environment, RateLimitConfig, ServerConfig};
pub use download::{PendingResponse, ProxyClient, StreamError, derive_filename};
pub use pipeline::{DownloadPipeline, PipelineOutcome};
pub use resolver::{DownloadLinkMaterializer, FileMetadata, ResolveError, ShareInfo, ShareResolver};
pub use server::{ApiError, AppState, ErrorKind, FixedWindowGate, GateDecision, RequestGate};
