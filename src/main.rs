mod cli;

use aniweave::{config, server};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting aniweave");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "aniweave=trace,aniweave_extract=trace,aniweave_hls=debug,tower_http=debug".to_string()
        } else {
            "aniweave=debug,aniweave_extract=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("aniweave {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Extract {
            provider,
            file,
            base_url,
        } => extract_file(provider, &file, base_url.as_deref()),
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };
    config::validate_config(&config)?;

    let enabled: Vec<&str> = aniweave_common::ProviderId::ALL
        .into_iter()
        .filter(|id| config.provider(*id).enabled)
        .map(|id| id.display_name())
        .collect();
    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Proxy endpoint: {}", config.proxy.endpoint);
    println!("  Proxy allow-list: {}", config.proxy_allow_list().join(", "));
    println!("  Fallback deadline: {}s", config.fallback.deadline_secs);
    println!("  Providers: {}", enabled.join(", "));
    Ok(())
}

fn extract_file(
    provider: aniweave_common::ProviderId,
    file: &std::path::Path,
    base_url: Option<&str>,
) -> Result<()> {
    let document = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read document: {:?}", file))?;
    let base_url = base_url.unwrap_or(provider.default_base_url());
    let record = aniweave_extract::extract_record(provider, &document, base_url)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
