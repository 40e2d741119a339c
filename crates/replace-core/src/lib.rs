//! Core types, configuration, and errors for sandboxed regexp replacement.
//!
//! This crate provides the foundational types shared by the WASM runtime and
//! the MCP server crates.
//!
//! # Architecture
//!
//! The core consists of:
//! - Strong domain types for the three untrusted request fields
//! - Instance identifiers and memory page limits
//! - Error hierarchy with contextual information
//! - The closed [`ErrorKind`] taxonomy surfaced to callers
//! - The [`Replacer`](traits::Replacer) trait implemented by execution engines
//! - Runtime configuration and statistics

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod config;
mod error;
mod outcome;
mod types;

pub mod stats;
pub mod traits;

pub use config::{RuntimeConfig, RuntimeConfigBuilder};
pub use error::{Error, Result};
pub use outcome::{ErrorKind, ReplaceOutcome};
pub use types::{
    InstanceId, MemoryPages, ReplaceRequest, UntrustedPattern, UntrustedReplacement,
    UntrustedText,
};
