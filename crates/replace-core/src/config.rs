//! Runtime configuration for the replacement sandbox.
//!
//! # Examples
//!
//! ```
//! use regexp_replace_core::{MemoryPages, RuntimeConfig};
//! use std::time::Duration;
//!
//! // Use default configuration
//! let config = RuntimeConfig::default();
//! assert_eq!(config.memory_limit.get(), 1024);
//! assert_eq!(config.execution_timeout, Duration::from_millis(100));
//!
//! // Create custom configuration
//! let custom = RuntimeConfig::builder()
//!     .memory_limit(MemoryPages::from_mib(16).unwrap())
//!     .execution_timeout(Duration::from_millis(250))
//!     .build();
//! assert!(custom.validate().is_ok());
//! ```

use crate::{Error, MemoryPages, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the replacement sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Location of the guest WASI module.
    ///
    /// Default: `./engine/rs/rs-regexp-replace-wasi/rs-regexp-replace-wasi.wasm`
    pub module_path: PathBuf,

    /// Maximum linear memory per instance.
    ///
    /// Applied uniformly to every instance. Default: 64 MiB (1024 pages)
    pub memory_limit: MemoryPages,

    /// Per-call deadline used when the caller does not supply one.
    ///
    /// Default: 100 milliseconds
    pub execution_timeout: Duration,

    /// Capacity of the captured guest stdout.
    ///
    /// Writes beyond this fail inside the guest. Default: 1 MiB
    pub max_output_bytes: usize,

    /// Capacity of the captured guest stderr.
    ///
    /// Default: 64 KiB
    pub max_diagnostic_bytes: usize,

    /// Period of the engine epoch ticker.
    ///
    /// Each tick is a preemption point for running guests, so this bounds how
    /// late a deadline or cancellation can be observed. Default: 1 millisecond
    pub epoch_tick: Duration,
}

impl RuntimeConfig {
    /// Default guest module location.
    pub const DEFAULT_MODULE_PATH: &'static str =
        "./engine/rs/rs-regexp-replace-wasi/rs-regexp-replace-wasi.wasm";

    /// Default per-call timeout in milliseconds.
    pub const DEFAULT_TIMEOUT_MS: u64 = 100;

    /// Default stdout capture size.
    pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

    /// Default stderr capture size.
    pub const DEFAULT_MAX_DIAGNOSTIC_BYTES: usize = 64 * 1024;

    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::new()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InitializationFault`] if:
    /// - Execution timeout is zero
    /// - Epoch tick is zero
    /// - Output capture size is zero
    /// - Module path is empty
    ///
    /// # Examples
    ///
    /// ```
    /// use regexp_replace_core::RuntimeConfig;
    /// use std::time::Duration;
    ///
    /// let config = RuntimeConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// let mut invalid = RuntimeConfig::default();
    /// invalid.execution_timeout = Duration::ZERO;
    /// assert!(invalid.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| Error::InitializationFault {
            message: message.to_string(),
            source: None,
        };

        if self.execution_timeout.is_zero() {
            return Err(invalid("execution timeout must be greater than zero"));
        }
        if self.epoch_tick.is_zero() {
            return Err(invalid("epoch tick must be greater than zero"));
        }
        if self.max_output_bytes == 0 {
            return Err(invalid("output capture size must be greater than zero"));
        }
        if self.module_path.as_os_str().is_empty() {
            return Err(invalid("module path cannot be empty"));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            module_path: PathBuf::from(Self::DEFAULT_MODULE_PATH),
            memory_limit: MemoryPages::DEFAULT,
            execution_timeout: Duration::from_millis(Self::DEFAULT_TIMEOUT_MS),
            max_output_bytes: Self::DEFAULT_MAX_OUTPUT_BYTES,
            max_diagnostic_bytes: Self::DEFAULT_MAX_DIAGNOSTIC_BYTES,
            epoch_tick: Duration::from_millis(1),
        }
    }
}

/// Builder for [`RuntimeConfig`].
///
/// # Examples
///
/// ```
/// use regexp_replace_core::RuntimeConfig;
/// use std::time::Duration;
///
/// let config = RuntimeConfig::builder()
///     .module_path("/opt/engine.wasm")
///     .execution_timeout(Duration::from_millis(50))
///     .max_output_bytes(4096)
///     .build();
///
/// assert_eq!(config.max_output_bytes, 4096);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    /// Creates a builder seeded with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the guest module location.
    #[must_use]
    pub fn module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.module_path = path.into();
        self
    }

    /// Sets the per-instance memory limit.
    #[must_use]
    pub const fn memory_limit(mut self, pages: MemoryPages) -> Self {
        self.config.memory_limit = pages;
        self
    }

    /// Sets the default per-call timeout.
    #[must_use]
    pub const fn execution_timeout(mut self, timeout: Duration) -> Self {
        self.config.execution_timeout = timeout;
        self
    }

    /// Sets the stdout capture size.
    #[must_use]
    pub const fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.config.max_output_bytes = bytes;
        self
    }

    /// Sets the stderr capture size.
    #[must_use]
    pub const fn max_diagnostic_bytes(mut self, bytes: usize) -> Self {
        self.config.max_diagnostic_bytes = bytes;
        self
    }

    /// Sets the epoch ticker period.
    #[must_use]
    pub const fn epoch_tick(mut self, tick: Duration) -> Self {
        self.config.epoch_tick = tick;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> RuntimeConfig {
        self.config
    }
}
