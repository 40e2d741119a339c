//! Caller-facing result of one replacement call.
//!
//! A call ends in exactly one [`ReplaceOutcome`]. Failures carry an
//! [`ErrorKind`] from a fixed taxonomy and a message that is safe to show to
//! the caller; underlying engine errors never appear here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed taxonomy of failures surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Guest reported application-error code 2: the pattern did not compile.
    InvalidPattern,
    /// Guest reported any other application-error code.
    RuntimeFault,
    /// The call deadline elapsed before the guest produced output.
    Timeout,
    /// Host-side identifier or configuration generation failed.
    ConfigurationFault,
    /// The request could not be serialized.
    InputEncodingFault,
    /// The guest output matched no known shape.
    OutputDecodingFault,
    /// The guest failed to start or trapped.
    InstantiationFault,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::InvalidPattern,
        Self::RuntimeFault,
        Self::Timeout,
        Self::ConfigurationFault,
        Self::InputEncodingFault,
        Self::OutputDecodingFault,
        Self::InstantiationFault,
    ];

    /// Position of this kind in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::InvalidPattern => 0,
            Self::RuntimeFault => 1,
            Self::Timeout => 2,
            Self::ConfigurationFault => 3,
            Self::InputEncodingFault => 4,
            Self::OutputDecodingFault => 5,
            Self::InstantiationFault => 6,
        }
    }

    /// Client-safe message for this kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use regexp_replace_core::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::Timeout.client_message(), "Text replacement timed out");
    /// ```
    #[must_use]
    pub const fn client_message(self) -> &'static str {
        match self {
            Self::InvalidPattern => "Invalid regular expression pattern",
            Self::RuntimeFault => "Text replacement failed",
            Self::Timeout => "Text replacement timed out",
            Self::ConfigurationFault => "Engine configuration error",
            Self::InputEncodingFault => "Invalid pattern, text, or replacement input format",
            Self::OutputDecodingFault => "Engine output error",
            Self::InstantiationFault => "Engine instantiation failed",
        }
    }

    /// Stable `snake_case` name, as serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPattern => "invalid_pattern",
            Self::RuntimeFault => "runtime_fault",
            Self::Timeout => "timeout",
            Self::ConfigurationFault => "configuration_fault",
            Self::InputEncodingFault => "input_encoding_fault",
            Self::OutputDecodingFault => "output_decoding_fault",
            Self::InstantiationFault => "instantiation_fault",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one replacement call.
///
/// # Examples
///
/// ```
/// use regexp_replace_core::{ErrorKind, ReplaceOutcome};
///
/// let ok = ReplaceOutcome::replaced("X bbb X");
/// assert_eq!(ok.replaced_text(), Some("X bbb X"));
///
/// let failed = ReplaceOutcome::failed(ErrorKind::Timeout, "Text replacement timed out");
/// assert_eq!(failed.error_kind(), Some(ErrorKind::Timeout));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplaceOutcome {
    /// The guest replaced every match.
    Replaced {
        /// Text after replacement
        replaced_text: String,
    },
    /// The call failed.
    Failed {
        /// Classified failure kind
        kind: ErrorKind,
        /// Client-safe description
        message: String,
    },
}

impl ReplaceOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn replaced(text: impl Into<String>) -> Self {
        Self::Replaced {
            replaced_text: text.into(),
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    /// Returns `true` if the call succeeded.
    #[must_use]
    pub const fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced { .. })
    }

    /// Returns the replaced text on success.
    #[must_use]
    pub fn replaced_text(&self) -> Option<&str> {
        match self {
            Self::Replaced { replaced_text } => Some(replaced_text),
            Self::Failed { .. } => None,
        }
    }

    /// Returns the failure kind on failure.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Replaced { .. } => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }

    /// Returns the failure message on failure.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Replaced { .. } => None,
            Self::Failed { message, .. } => Some(message),
        }
    }
}
