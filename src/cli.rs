//! CLI argument definitions using clap derive macros.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use clap::Parser;

use terabox_proxy::config::{DEFAULT_PORT, DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_WINDOW_SECS};
use terabox_proxy::resolver::DEFAULT_BASE_URL;
use terabox_proxy::{Environment, RateLimitConfig, ServerConfig};

/// Resolve TeraBox share links and stream the files behind them.
///
/// Runs an HTTP server exposing `POST /api/download`.
#[derive(Parser, Debug)]
#[command(name = "terabox-proxy")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Deployment environment (development exposes internal error detail)
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub environment: Environment,

    /// Requests allowed per client per window (1-10000)
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_MAX, value_parser = clap::value_parser!(u32).range(1..=10000))]
    pub rate_limit_max: u32,

    /// Rate-limit window length in seconds (1-86400)
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_WINDOW_SECS, value_parser = clap::value_parser!(u64).range(1..=86400))]
    pub rate_limit_window_secs: u64,

    /// Provider base URL for share-info and download API calls
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub provider_base_url: String,

    /// Extra host to trust for downloads and redirects (repeatable)
    #[arg(long = "allow-host", value_name = "HOST")]
    pub allow_hosts: Vec<String>,
}

impl Args {
    /// Server configuration described by these arguments.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind: self.bind,
            port: self.port,
            environment: self.environment,
            rate_limit: RateLimitConfig {
                max_requests: self.rate_limit_max,
                window: Duration::from_secs(self.rate_limit_window_secs),
            },
            provider_base_url: self.provider_base_url.clone(),
            extra_allowed_hosts: self.allow_hosts.clone(),
        }
    }
}
