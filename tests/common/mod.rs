//! Shared test harness for integration tests.
//!
//! [`TestHarness`] points every provider and the proxy allow-list at one
//! wiremock upstream and serves the router on a random port.

#![allow(dead_code)]

use std::net::SocketAddr;

use aniweave::config::{Config, ProviderConfig};
use aniweave::server::{create_router, AppContext};
use aniweave_common::ProviderId;
use wiremock::MockServer;

pub struct TestHarness {
    pub ctx: AppContext,
    pub upstream: MockServer,
    pub addr: SocketAddr,
}

impl TestHarness {
    /// Mock upstream, every provider pointed at it, server on a random port.
    pub async fn start() -> Self {
        let upstream = MockServer::start().await;
        let config = config_for(&upstream.uri());
        Self::with_config(config, upstream).await
    }

    pub async fn with_config(config: Config, upstream: MockServer) -> Self {
        let ctx = AppContext::new(config).expect("failed to build context");
        let app = create_router(ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            ctx,
            upstream,
            addr,
        }
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    /// Proxy URL for an upstream path, as a player would request it.
    pub fn proxy_url(&self, upstream_path: &str, kind: &str) -> String {
        let target = format!("{}{}", self.upstream.uri(), upstream_path);
        self.url(&format!(
            "/api/proxy?url={}&type={kind}",
            urlencoding::encode(&target)
        ))
    }
}

/// Configuration with every provider served by `base_url`, caching off.
pub fn config_for(base_url: &str) -> Config {
    let mut config = Config::default();
    config.cache.ttl_secs = 0;
    config.fallback.deadline_secs = 10;
    config.proxy.allowed_hosts = vec!["127.0.0.1".to_string()];
    config.proxy.allow_provider_hosts = false;
    for id in ProviderId::ALL {
        config.providers.insert(
            id,
            ProviderConfig {
                base_url: Some(base_url.to_string()),
                timeout_secs: 5,
                rate_limit_per_sec: 100,
                ..Default::default()
            },
        );
    }
    config
}

pub const ANIMEWORLD_PAGE: &str = r#"<html><body>
<h1 id="anime-title">Frieren</h1>
<div class="widget player">
  <div class="server" data-name="9">
    <ul>
      <li class="episode"><a data-episode-num="1" data-id="Aa1" href="/play/frieren.abc/Aa1">1</a></li>
      <li class="episode"><a data-episode-num="2" data-id="Bb2" href="/play/frieren.abc/Bb2">2</a></li>
    </ul>
  </div>
</div>
</body></html>"#;

pub fn unity_series(title: &str, numbers: &[u32]) -> serde_json::Value {
    let episodes: Vec<_> = numbers
        .iter()
        .map(|n| serde_json::json!({ "id": format!("u{n}"), "number": n }))
        .collect();
    serde_json::json!({ "series": { "title": title, "episodes": episodes } })
}
