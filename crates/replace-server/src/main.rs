//! MCP server entry point for sandboxed regexp replacement.
//!
//! # Usage
//!
//! Build the WASI engine, then run the server via stdio transport:
//!
//! ```bash
//! mcp-regexp-replace --path2engine ./rs-regexp-replace-wasi.wasm --mem 64 --timeout 100
//! ```
//!
//! Or serve stateless Streamable HTTP at `http://127.0.0.1:12040/mcp`:
//!
//! ```bash
//! mcp-regexp-replace --path2engine ./rs-regexp-replace-wasi.wasm --port 12040
//! ```
//!
//! Or configure it in an MCP client:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "regexp-replace": {
//!       "command": "mcp-regexp-replace",
//!       "args": ["--path2engine", "/opt/rs-regexp-replace-wasi.wasm"]
//!     }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use regexp_replace_server::{Cli, ReplaceService, Transport, http};
use regexp_replace_wasm_runtime::WasmReplacer;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    tracing::info!("Starting mcp-regexp-replace v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.runtime_config().context("invalid configuration")?;
    let replacer = Arc::new(
        WasmReplacer::from_config(&config).context("failed to create WASI replacer")?,
    );
    tracing::info!(
        engine = %config.module_path.display(),
        memory_pages = config.memory_limit.get(),
        timeout_ms = cli.timeout_ms,
        "Engine ready"
    );

    // Serve until the client disconnects, then close the engine either way
    let served = match cli.transport() {
        Transport::Stdio => serve_stdio(Arc::clone(&replacer)).await,
        Transport::Http(addr) => http::serve(addr, replacer.clone(), shutdown_signal())
            .await
            .with_context(|| format!("HTTP server on {addr} failed")),
    };

    let stats = replacer.collect_stats();
    tracing::info!(
        total_calls = stats.total_calls,
        successful_calls = stats.successful_calls,
        failed_calls = stats.total_failures(),
        avg_call_time_us = stats.avg_call_time_us,
        "Server shutdown complete"
    );

    replacer
        .engine()
        .close()
        .context("failed to close WASI engine")?;
    served
}

async fn serve_stdio(replacer: Arc<WasmReplacer>) -> Result<()> {
    let service = ReplaceService::new(replacer).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Logs go to stderr; stdout carries the MCP protocol.
fn init_logging(cli: &Cli) -> Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new(cli.log_filter())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()?;
    }
    Ok(())
}
