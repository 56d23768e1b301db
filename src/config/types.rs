use aniweave_common::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub fallback: FallbackConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub embed: EmbedConfig,

    /// Per-provider overrides, keyed by wire name (`[providers.animeworld]`).
    #[serde(default)]
    pub providers: BTreeMap<ProviderId, ProviderConfig>,
}

impl Config {
    /// Settings for one provider, falling back to defaults when the table is absent.
    pub fn provider(&self, id: ProviderId) -> ProviderConfig {
        self.providers.get(&id).cloned().unwrap_or_default()
    }

    /// Base URL for one provider, honoring overrides.
    pub fn provider_base_url(&self, id: ProviderId) -> String {
        self.providers
            .get(&id)
            .and_then(|p| p.base_url.clone())
            .unwrap_or_else(|| id.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Hosts the egress proxy may contact: the configured list plus every
    /// enabled provider's own host.
    pub fn proxy_allow_list(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .proxy
            .allowed_hosts
            .iter()
            .map(|h| h.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        if self.proxy.allow_provider_hosts {
            for id in ProviderId::ALL {
                if !self.provider(id).enabled {
                    continue;
                }
                if let Ok(url) = url::Url::parse(&self.provider_base_url(id)) {
                    if let Some(host) = url.host_str() {
                        let host = host.trim_start_matches("www.").to_ascii_lowercase();
                        hosts.push(host);
                    }
                }
            }
        }
        hosts.sort();
        hosts.dedup();
        hosts
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

// ---------------------------------------------------------------------------
// Proxy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Public path of the proxy route, used when rewriting manifests.
    #[serde(default = "default_proxy_endpoint")]
    pub endpoint: String,

    /// Hosts (and their subdomains) the proxy may fetch from.
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    /// Also allow the host of every enabled provider.
    #[serde(default = "default_true")]
    pub allow_provider_hosts: bool,

    #[serde(default = "default_proxy_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Referer sent upstream, keyed by host suffix.
    #[serde(default = "default_referers")]
    pub referers: BTreeMap<String, String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            endpoint: default_proxy_endpoint(),
            allowed_hosts: default_allowed_hosts(),
            allow_provider_hosts: true,
            timeout_secs: default_proxy_timeout(),
            max_redirects: default_max_redirects(),
            referers: default_referers(),
        }
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Referer for a target host: the longest matching suffix wins.
    pub fn referer_for(&self, host: &str) -> Option<&str> {
        let host = host.to_ascii_lowercase();
        self.referers
            .iter()
            .filter(|(suffix, _)| host == **suffix || host.ends_with(&format!(".{suffix}")))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(_, referer)| referer.as_str())
    }
}

fn default_proxy_endpoint() -> String {
    "/api/proxy".to_string()
}

fn default_allowed_hosts() -> Vec<String> {
    [
        "streampeaker.org",
        "vixcloud.co",
        "scws-content.net",
        "kwik.cx",
        "kwik.si",
        "owocdn.top",
        "megacloud.blog",
        "mangaworld.ac",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_true() -> bool {
    true
}

fn default_proxy_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_referers() -> BTreeMap<String, String> {
    [
        ("owocdn.top", "https://kwik.cx/"),
        ("kwik.cx", "https://animepahe.ru/"),
        ("vixcloud.co", "https://www.animeunity.so/"),
        ("scws-content.net", "https://vixcloud.co/"),
        ("animegg.org", "https://www.animegg.org/"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

// ---------------------------------------------------------------------------
// Fallback / cache / embed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FallbackConfig {
    /// Overall deadline for one fallback chain.
    #[serde(default = "default_fallback_deadline")]
    pub deadline_secs: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_fallback_deadline(),
        }
    }
}

impl FallbackConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

fn default_fallback_deadline() -> u64 {
    45
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Record cache TTL; 0 disables the cache.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    120
}

fn default_cache_entries() -> usize {
    512
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbedConfig {
    /// Player host used for opaque-embed streams.
    #[serde(default = "default_embed_host")]
    pub host: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            host: default_embed_host(),
        }
    }
}

fn default_embed_host() -> String {
    "https://megacloud.blog/embed".to_string()
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Override the upstream base URL (mirrors move often).
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_sec: u32,

    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            timeout_secs: default_provider_timeout(),
            rate_limit_per_sec: default_rate_limit(),
            user_agent: None,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_provider_timeout() -> u64 {
    20
}

fn default_rate_limit() -> u32 {
    5
}
