//! Streaming proxy for upstream file servers.
//!
//! This module checks that a target exists, then streams it back to the
//! caller without buffering the body in memory.
//!
//! # Features
//!
//! - Header-only preflight (10s) before committing to a download
//! - Streaming GET (30s to first byte, 30s idle per read)
//! - Redirect-domain pinning: every hop must stay on the host allow-list
//! - Filename derivation from Content-Disposition or the URL path
//! - Two-phase responses: JSON errors before commit, log-only after
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use terabox_proxy::HostAllowList;
//! use terabox_proxy::download::{PendingResponse, ProxyClient};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ProxyClient::new(Arc::new(HostAllowList::provider_default()))?;
//! let target = Url::parse("https://d.terabox.com/file/abc")?;
//! client.preflight(&target).await?;
//! let pending = PendingResponse::new(client.fetch(&target).await?, &target)?;
//! println!("serving {}", pending.filename());
//! let _response = pending.commit();
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod filename;
mod response;

pub use client::ProxyClient;
pub use error::{RedirectRejected, StreamError, TooManyRedirects};
pub use filename::derive_filename;
pub use response::PendingResponse;
