//! Sandboxed execution of an untrusted regexp replacement module.
//!
//! Every call runs the guest WASI command module in a fresh, uniquely
//! identified wasmtime instance with its own linear memory, bounded by a
//! per-call deadline. The request goes in on stdin as JSON, the response
//! comes back on stdout, and every failure is folded into the fixed
//! [`ErrorKind`](regexp_replace_core::ErrorKind) taxonomy.
//!
//! # Components
//!
//! - [`engine`] - Runtime Manager: process-wide engine, compiled module, epoch ticker
//! - [`instance`] - Instance Factory: per-call spawn, run, abort, release
//! - [`codec`] - boundary encoding of requests and decoding of responses
//! - [`classify`] - Error Classifier: internal errors to caller-facing kinds
//! - [`replacer`] - Execution Coordinator: one call, one outcome
//!
//! # Examples
//!
//! ```no_run
//! use regexp_replace_core::traits::Replacer;
//! use regexp_replace_core::{ReplaceRequest, RuntimeConfig};
//! use regexp_replace_wasm_runtime::WasmReplacer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RuntimeConfig::builder()
//!     .module_path("rs-regexp-replace-wasi.wasm")
//!     .build();
//! let replacer = WasmReplacer::from_config(&config)?;
//!
//! let outcome = replacer
//!     .replace_with_default_timeout(ReplaceRequest::new("a+", "aaa bbb aaa", "X"))
//!     .await;
//! assert_eq!(outcome.replaced_text(), Some("X bbb X"));
//!
//! replacer.engine().close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod classify;
pub mod codec;
pub mod engine;
pub mod instance;
pub mod replacer;

pub use engine::{CompiledModule, InstanceLimits, SandboxEngine};
pub use instance::{InstanceFactory, InstanceHandle, InstanceRegistry};
pub use replacer::WasmReplacer;
