//! Error types for sandboxed regexp replacement.
//!
//! Every failure the runtime can observe is represented here, from startup
//! faults (engine initialization, module compilation) to per-call faults
//! (timeouts, traps, malformed guest output). Per-call errors are classified
//! into an [`ErrorKind`](crate::ErrorKind) before they reach a caller; the
//! variants below are the internal, diagnostic-rich form.
//!
//! # Examples
//!
//! ```
//! use regexp_replace_core::{Error, Result};
//!
//! fn pages(value: u32) -> Result<u32> {
//!     if value == 0 {
//!         return Err(Error::InitializationFault {
//!             message: "memory limit must be at least one page".to_string(),
//!             source: None,
//!         });
//!     }
//!     Ok(value)
//! }
//!
//! let err = pages(0).unwrap_err();
//! assert!(err.is_startup_fault());
//! ```

use thiserror::Error;

/// Boxed underlying cause, as produced by the sandboxing engine.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for sandboxed replacement.
#[derive(Error, Debug)]
pub enum Error {
    /// The sandboxing engine could not be created.
    ///
    /// Raised for invalid configuration (zero memory pages, zero timeout)
    /// or when the engine itself rejects its settings. Fatal at startup.
    #[error("Engine initialization failed: {message}")]
    InitializationFault {
        /// Description of the initialization problem
        message: String,
        /// Underlying engine error, if any
        #[source]
        source: Option<BoxError>,
    },

    /// The guest module could not be loaded, validated, or linked.
    ///
    /// Fatal at startup.
    #[error("Module compilation failed: {message}")]
    CompileFault {
        /// Description of the compilation problem
        message: String,
        /// Underlying engine error, if any
        #[source]
        source: Option<BoxError>,
    },

    /// Host-side identifier or per-call configuration could not be produced.
    ///
    /// Never caused by caller input.
    #[error("Instance configuration failed: {message}")]
    ConfigurationFault {
        /// Description of the configuration problem
        message: String,
        /// Underlying error, if any
        #[source]
        source: Option<BoxError>,
    },

    /// The request could not be serialized for the guest.
    #[error("Failed to encode request")]
    InputEncoding {
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// The guest did not finish before the call deadline.
    #[error("Instance {instance} timed out after {timeout_ms}ms")]
    Timeout {
        /// Identifier of the aborted instance
        instance: String,
        /// Deadline that elapsed, in milliseconds
        timeout_ms: u64,
    },

    /// The guest failed to start, trapped, or exited abnormally.
    #[error("Instance {instance} failed: {message}")]
    InstantiationFault {
        /// Identifier of the failed instance
        instance: String,
        /// Description of the failure
        message: String,
        /// Underlying engine error, if any
        #[source]
        source: Option<BoxError>,
    },

    /// The guest output matched none of the known response shapes.
    #[error("Failed to decode guest output: {message}")]
    OutputDecoding {
        /// Description of the decoding failure
        message: String,
        /// Underlying serde error, if the output was not valid JSON
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The guest reported a well-formed application error.
    #[error("Guest reported error {code}: {message}")]
    Application {
        /// Application error code (`2` means invalid pattern)
        code: i64,
        /// Message supplied by the guest
        message: String,
    },
}

impl Error {
    /// Returns `true` if this error can only occur while starting up.
    ///
    /// # Examples
    ///
    /// ```
    /// use regexp_replace_core::Error;
    ///
    /// let err = Error::CompileFault {
    ///     message: "bad magic".to_string(),
    ///     source: None,
    /// };
    /// assert!(err.is_startup_fault());
    /// ```
    #[must_use]
    pub const fn is_startup_fault(&self) -> bool {
        matches!(
            self,
            Self::InitializationFault { .. } | Self::CompileFault { .. }
        )
    }

    /// Returns `true` if this is a timeout error.
    ///
    /// # Examples
    ///
    /// ```
    /// use regexp_replace_core::Error;
    ///
    /// let err = Error::Timeout {
    ///     instance: "instance-0".to_string(),
    ///     timeout_ms: 10,
    /// };
    /// assert!(err.is_timeout());
    /// ```
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is an application error reported by the guest.
    #[must_use]
    pub const fn is_application_error(&self) -> bool {
        matches!(self, Self::Application { .. })
    }

    /// Returns `true` if this is a host-side configuration error.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::ConfigurationFault { .. })
    }
}

/// Result type alias for replacement operations.
pub type Result<T> = std::result::Result<T, Error>;
