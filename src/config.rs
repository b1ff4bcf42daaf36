//! Runtime configuration for the proxy server.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::classifier::HostAllowList;
use crate::resolver::DEFAULT_BASE_URL;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default requests allowed per client per window.
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 20;

/// Default rate-limit window.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Deployment mode; controls how much detail internal errors expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Development responses include internal error detail; production ones do not.
    #[must_use]
    pub fn exposes_error_details(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(format!(
                "unknown environment '{other}' (expected development or production)"
            )),
        }
    }
}

/// Per-client request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

/// Everything needed to build and bind the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub environment: Environment,
    pub rate_limit: RateLimitConfig,
    /// Provider host used for share-info and download API calls.
    pub provider_base_url: String,
    /// Hosts trusted in addition to the provider's own domains.
    pub extra_allowed_hosts: Vec<String>,
}

impl ServerConfig {
    /// Socket address to listen on.
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Provider allow-list extended with configured hosts.
    #[must_use]
    pub fn allow_list(&self) -> HostAllowList {
        HostAllowList::provider_default().with_extra_hosts(&self.extra_allowed_hosts)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            environment: Environment::default(),
            rate_limit: RateLimitConfig::default(),
            provider_base_url: DEFAULT_BASE_URL.to_string(),
            extra_allowed_hosts: Vec::new(),
        }
    }
}
