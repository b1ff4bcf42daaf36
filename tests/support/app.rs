//! Spawns the real router on an ephemeral localhost port.

use terabox_proxy::server::{self, AppState};
use terabox_proxy::{RateLimitConfig, ServerConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct TestApp {
    pub base_url: String,
    _shutdown: oneshot::Sender<()>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Config pointing the provider at `provider_base_url` and trusting localhost.
pub fn config_for(provider_base_url: &str) -> ServerConfig {
    ServerConfig {
        provider_base_url: provider_base_url.to_string(),
        extra_allowed_hosts: vec!["127.0.0.1".to_string()],
        ..ServerConfig::default()
    }
}

pub fn with_rate_limit(mut config: ServerConfig, max_requests: u32) -> ServerConfig {
    config.rate_limit = RateLimitConfig {
        max_requests,
        ..RateLimitConfig::default()
    };
    config
}

pub async fn spawn_app(config: ServerConfig) -> TestApp {
    let state = AppState::from_config(&config).expect("app state");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind app listener");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(server::serve(listener, state, async move {
        let _ = rx.await;
    }));

    TestApp {
        base_url: format!("http://{addr}"),
        _shutdown: tx,
    }
}
