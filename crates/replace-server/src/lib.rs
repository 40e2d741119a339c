//! MCP server library for sandboxed regexp replacement.
//!
//! The server exposes one tool, `regexp-replace`, which takes a pattern, a
//! text, and a replacement and returns the text with every match replaced.
//! Matching itself runs in the untrusted WASI engine loaded by
//! [`regexp_replace_wasm_runtime`]; this crate only wires it to MCP, over
//! stdio or, with `--port`, Streamable HTTP (see [`http`]).
//!
//! # Examples
//!
//! ```no_run
//! use regexp_replace_core::RuntimeConfig;
//! use regexp_replace_server::service::ReplaceService;
//! use regexp_replace_wasm_runtime::WasmReplacer;
//! use rmcp::ServiceExt;
//! use rmcp::transport::stdio;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let replacer = Arc::new(WasmReplacer::from_config(&RuntimeConfig::default())?);
//! let service = ReplaceService::new(replacer.clone()).serve(stdio()).await?;
//! service.waiting().await?;
//! replacer.engine().close()?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod http;
pub mod service;
pub mod types;

pub use cli::{Cli, Transport};
pub use service::ReplaceService;
pub use types::{RegexpReplaceParams, RegexpReplaceResult, ToolError};
