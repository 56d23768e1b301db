use aniweave_common::ProviderId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aniweave")]
#[command(author, version, about = "Multi-source anime and manga aggregation service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API and proxy
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,

    /// Run a provider extractor over a saved page and print the record
    Extract {
        /// Provider id (`AW`, `animeworld`, ...)
        #[arg(required = true)]
        provider: ProviderId,

        /// Saved HTML or JSON document
        #[arg(required = true)]
        file: PathBuf,

        /// URL the document was fetched from, for resolving relative links
        #[arg(long)]
        base_url: Option<String>,
    },
}
