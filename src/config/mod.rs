mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./aniweave.toml",
        "~/.config/aniweave/config.toml",
        "/etc/aniweave/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if !config.proxy.endpoint.starts_with('/') && !config.proxy.endpoint.starts_with("http") {
        anyhow::bail!(
            "Proxy endpoint must be an absolute path or URL, got '{}'",
            config.proxy.endpoint
        );
    }

    if config.proxy_allow_list().is_empty() {
        anyhow::bail!("Proxy allow-list is empty; nothing could be proxied");
    }

    if config.fallback.deadline_secs == 0 {
        anyhow::bail!("Fallback deadline cannot be 0");
    }

    url::Url::parse(&config.embed.host)
        .with_context(|| format!("Invalid embed host: {}", config.embed.host))?;

    for (id, provider) in &config.providers {
        if let Some(base) = &provider.base_url {
            url::Url::parse(base)
                .with_context(|| format!("Invalid base_url for provider '{}': {}", id, base))?;
        }
        if provider.enabled && !(5..=60).contains(&provider.timeout_secs) {
            tracing::warn!(
                provider = %id,
                timeout_secs = provider.timeout_secs,
                "Provider timeout outside the usual 5-60s range"
            );
        }
        if provider.rate_limit_per_sec == 0 {
            anyhow::bail!("Provider '{}' has a rate limit of 0 requests/s", id);
        }
    }

    Ok(())
}
