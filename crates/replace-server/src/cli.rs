//! Command-line flags for the `mcp-regexp-replace` binary.

use clap::Parser;
use regexp_replace_core::{MemoryPages, Result, RuntimeConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default `tracing` filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,regexp_replace_wasm_runtime=info";

/// Filter used with `--verbose`.
pub const VERBOSE_LOG_FILTER: &str = "info,regexp_replace=debug,guest_stderr=debug";

/// Transport the server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// MCP over stdin/stdout
    Stdio,
    /// Stateless Streamable HTTP on this address
    Http(SocketAddr),
}

/// Regular expression replacer served over MCP stdio.
///
/// Every call runs the WASI engine in a fresh sandbox with bounded memory
/// and a per-call timeout.
#[derive(Parser, Debug)]
#[command(name = "mcp-regexp-replace")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the WASI regexp replacement engine
    #[arg(
        long = "path2engine",
        env = "REGEXP_REPLACE_ENGINE",
        default_value = RuntimeConfig::DEFAULT_MODULE_PATH
    )]
    pub engine_path: PathBuf,

    /// WASM memory limit in MiB
    #[arg(long = "mem", default_value_t = 64, value_parser = clap::value_parser!(u32).range(1..=4096))]
    pub memory_mib: u32,

    /// WASM execution timeout in milliseconds
    #[arg(long = "timeout", default_value_t = RuntimeConfig::DEFAULT_TIMEOUT_MS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: u64,

    /// Serve Streamable HTTP on this port instead of stdio
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Address to bind with --port
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST), requires = "port")]
    pub host: IpAddr,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Builds the runtime configuration from the flags.
    ///
    /// # Errors
    ///
    /// Returns [`InitializationFault`](regexp_replace_core::Error::InitializationFault)
    /// if the flags describe an invalid configuration.
    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        let config = RuntimeConfig::builder()
            .module_path(&self.engine_path)
            .memory_limit(MemoryPages::from_mib(self.memory_mib)?)
            .execution_timeout(Duration::from_millis(self.timeout_ms))
            .build();
        config.validate()?;
        Ok(config)
    }

    /// The transport selected by `--port`.
    #[must_use]
    pub const fn transport(&self) -> Transport {
        match self.port {
            Some(port) => Transport::Http(SocketAddr::new(self.host, port)),
            None => Transport::Stdio,
        }
    }

    /// The `tracing` filter directives to use when `RUST_LOG` is unset.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        if self.verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        }
    }
}
