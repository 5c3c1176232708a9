//! Trino MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to explore and query Trino clusters.

use clap::Parser;
use mcp_trino::config::{Config, SemanticSettings, TransportMode};
use mcp_trino::db::ConnectionManager;
use mcp_trino::extensions::Extensions;
use mcp_trino::semantic::{CachingProvider, SemanticProvider, StaticProvider};
use mcp_trino::tools::Toolkit;
use mcp_trino::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Build the semantic provider, if a metadata file is configured.
fn semantic_provider(
    settings: &SemanticSettings,
) -> Result<Option<Arc<dyn SemanticProvider>>, Box<dyn std::error::Error>> {
    let Some(path) = &settings.file else {
        return Ok(None);
    };
    info!(path = %path.display(), "Loading semantic metadata");
    let provider: Arc<dyn SemanticProvider> = Arc::new(StaticProvider::from_file(path)?);
    Ok(Some(match settings.cache {
        Some(cache) => Arc::new(CachingProvider::new(provider, cache)),
        None => provider,
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    let resolved = match config.resolve() {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("Usage: mcp-trino --trino-host <host> --trino-user <user>");
            eprintln!("       TRINO_HOST=<host> TRINO_USER=<user> mcp-trino");
            eprintln!();
            eprintln!("Examples:");
            eprintln!("  mcp-trino --trino-host localhost --trino-user admin");
            eprintln!("  mcp-trino --config mcp-trino.yaml --transport http");
            eprintln!(
                "  TRINO_ADDITIONAL_SERVERS='{{\"staging\":{{\"host\":\"staging.example.com\"}}}}' mcp-trino"
            );
            std::process::exit(1);
        }
    };

    info!(
        transport = %config.transport,
        "Starting Trino MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        host = %resolved.manager.primary.host,
        port = resolved.manager.primary.port,
        ssl = resolved.manager.primary.ssl,
        additional = resolved.manager.additional.len(),
        "Configured Trino connections"
    );

    let manager = Arc::new(ConnectionManager::new(resolved.manager)?);

    let mut extensions = Extensions::new();
    let metrics = extensions.install_builtin(&resolved.extensions);

    let mut builder = Toolkit::builder(manager)
        .config(resolved.toolkit)
        .extensions(extensions);
    if let Some(provider) = semantic_provider(&resolved.semantic)? {
        builder = builder.semantic_provider(provider);
    }
    let mut toolkit = builder.build();
    toolkit.register_all();
    let toolkit = Arc::new(toolkit);

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            StdioTransport::new(toolkit).run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                toolkit,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Some(metrics) = metrics {
        for (name, value) in metrics.counters() {
            info!(counter = %name, value, "Tool metrics");
        }
    }

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
