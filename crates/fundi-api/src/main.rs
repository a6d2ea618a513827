//! # fundi-api Server Entry Point
//!
//! Loads configuration, wires the provider adapters and the engine, and
//! serves the HTTP surface.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use fundi_api::{app, AppState, ServerConfig};
use fundi_core::PhoneNumber;
use fundi_gateway::{
    GatewayRouter, MtnGateway, OrangeGateway, PaymentGatewayAdapter, SandboxGateway,
};
use fundi_settlement::{InMemoryDirectory, SettlementEngine};

/// Fundi settlement API server.
///
/// Serves provider webhooks and read-only aggregate views over the
/// escrow settlement engine.
#[derive(Parser, Debug)]
#[command(name = "fundi-api", version, about)]
struct Cli {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Path to the JSON configuration file. Omit for sandbox defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ServerConfig::default(),
    };

    let mut adapters: Vec<Arc<dyn PaymentGatewayAdapter>> = Vec::new();
    if let Some(mtn) = config.mtn {
        adapters.push(Arc::new(MtnGateway::new(mtn)?));
    }
    if let Some(orange) = config.orange {
        adapters.push(Arc::new(OrangeGateway::new(orange)?));
    }
    if let Some(secret) = config.sandbox_secret {
        adapters.push(Arc::new(SandboxGateway::unrestricted(secret)));
    }
    if adapters.is_empty() {
        tracing::warn!("no provider configured, falling back to the sandbox");
        adapters.push(Arc::new(SandboxGateway::unrestricted("sandbox-dev-secret")));
    }
    let router = GatewayRouter::new(adapters);

    let directory = match config.default_wallet_msisdn {
        Some(raw) => {
            let msisdn = PhoneNumber::parse(&raw).context("default_wallet_msisdn")?;
            Arc::new(InMemoryDirectory::permissive(msisdn))
        }
        None => Arc::new(InMemoryDirectory::new()),
    };

    let engine = Arc::new(SettlementEngine::new(config.engine, router, directory));
    let app = app(AppState::new(engine));

    tracing::info!(bind = %cli.bind, "fundi-api listening");
    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("binding {}", cli.bind))?;
    axum::serve(listener, app).await?;
    Ok(())
}
