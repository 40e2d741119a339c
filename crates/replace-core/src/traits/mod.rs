//! Core traits for sandboxed replacement.
//!
//! # Module Structure
//!
//! - `replacer` - The replace operation exposed to outer layers

mod replacer;

pub use replacer::Replacer;
