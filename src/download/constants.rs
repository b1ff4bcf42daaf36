//! Constants for the download module (timeouts, redirect budget, defaults).

use std::time::Duration;

/// HTTP connect timeout for upstream file servers.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Budget for the header-only preflight check.
pub const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(10);

/// Budget for the streaming GET to start responding, and for each idle read afterwards.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Redirect hops followed by preflight and download requests.
pub const MAX_REDIRECTS: usize = 5;

/// Content type used when the upstream sends none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Filename used when neither headers nor URL provide one.
pub const FALLBACK_FILENAME: &str = "download";
