//! CLI entry point for the graphkb-gateway update daemon.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use graphkb_core::config::GatewayConfig;
use graphkb_gateway::auth::hash_token;
use graphkb_gateway::{build_router, GatewayState, TokenRegistry};
use graphkb_graph::{GraphClient, GraphConfig};

#[derive(Parser)]
#[command(name = "graphkb-gateway")]
#[command(about = "Update gateway for the GraphKB knowledge graph")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file prefix (default: graphkb).
    #[arg(short, long, default_value = "graphkb", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the update API (default).
    Serve {
        /// Override the listen address from config.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Print the BLAKE3 digest of a source token for `token_blake3`.
    HashToken {
        token: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::HashToken { ref token }) => {
            println!("{}", hash_token(token).to_hex());
            Ok(())
        }
        Some(Command::Serve { listen }) => serve(&cli.config, listen).await,
        None => serve(&cli.config, None).await,
    }
}

async fn serve(config_prefix: &str, listen: Option<SocketAddr>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let mut gateway_config = GatewayConfig::load(config_prefix)?;
    if let Some(addr) = listen {
        gateway_config.listen = addr;
    }

    let registry = TokenRegistry::from_config(&gateway_config.sources)?;
    tracing::info!(sources = registry.len(), "Token registry loaded");

    let graph_config = load_graph_config(config_prefix);
    let graph = GraphClient::connect(&graph_config).await?;

    let state = GatewayState::new(&gateway_config, Arc::new(registry), Arc::new(graph));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(gateway_config.listen).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        max_concurrent_updates = gateway_config.max_concurrent_updates,
        "Gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn load_graph_config(file_prefix: &str) -> GraphConfig {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("GRAPHKB")
                .separator("__")
                .try_parsing(true),
        )
        .build();

    match cfg {
        Ok(c) => {
            let defaults = GraphConfig::default();
            GraphConfig {
                uri: c.get_string("neo4j.uri").unwrap_or(defaults.uri),
                user: c.get_string("neo4j.user").unwrap_or(defaults.user),
                password: c.get_string("neo4j.password").unwrap_or(defaults.password),
                max_connections: c
                    .get_int("neo4j.max_connections")
                    .ok()
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(defaults.max_connections),
                fetch_size: defaults.fetch_size,
            }
        }
        Err(_) => GraphConfig::default(),
    }
}
