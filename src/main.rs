//! imgrelay - prompt-to-image HTTP relay
//!
//! A small server that accepts `{ "prompt": ... }` requests and forwards
//! them to a Hugging Face inference endpoint, returning the generated
//! image as a base64 data URL.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgrelay::config::{Config, TokenSource};
use imgrelay::relay::run_server;

#[derive(Parser)]
#[command(name = "imgrelay")]
#[command(about = "Prompt-to-image HTTP relay for Hugging Face inference")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
}

fn init_tracing(fallback_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn warn_on_placeholder(config: &Config, source: &TokenSource) {
    if config.upstream.api_token.is_placeholder() {
        tracing::warn!(
            "No API token configured (set {} or [upstream].api_token) - \
             the provider will reject requests",
            imgrelay::config::TOKEN_ENV_VAR
        );
    } else {
        tracing::info!(source = %source, "API token resolved");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let (mut config, token_source) = Config::load(&config)?;
            init_tracing(&config.logging.level);

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            warn_on_placeholder(&config, &token_source);
            run_server(config).await
        }

        Commands::Check { config: path } => {
            let (config, token_source) = Config::load(&path)?;
            init_tracing(&config.logging.level);

            tracing::info!(config = %path, "Configuration is valid");
            tracing::info!(listen = %config.server.listen, "Listen address");
            tracing::info!(url = %config.upstream.url, "Upstream endpoint");
            warn_on_placeholder(&config, &token_source);
            Ok(())
        }
    }
}
