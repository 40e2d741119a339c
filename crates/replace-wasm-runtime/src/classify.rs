//! Error Classifier: internal errors to the caller-facing taxonomy.

use regexp_replace_core::{Error, ErrorKind, ReplaceOutcome};

/// Application-error code the guest uses for a pattern that does not compile.
pub const INVALID_PATTERN_CODE: i64 = 2;

/// Maps an internal error to its [`ErrorKind`].
///
/// Total and deterministic. Startup faults never arise from a call; if one
/// does reach here it is reported as [`ErrorKind::ConfigurationFault`].
///
/// # Examples
///
/// ```
/// use regexp_replace_core::{Error, ErrorKind};
/// use regexp_replace_wasm_runtime::classify::classify;
///
/// let err = Error::Application { code: 2, message: "bad pattern".to_string() };
/// assert_eq!(classify(&err), ErrorKind::InvalidPattern);
///
/// let err = Error::Application { code: 7, message: "x".to_string() };
/// assert_eq!(classify(&err), ErrorKind::RuntimeFault);
/// ```
#[must_use]
pub const fn classify(error: &Error) -> ErrorKind {
    match error {
        Error::Application { code, .. } if *code == INVALID_PATTERN_CODE => {
            ErrorKind::InvalidPattern
        }
        Error::Application { .. } => ErrorKind::RuntimeFault,
        Error::Timeout { .. } => ErrorKind::Timeout,
        Error::ConfigurationFault { .. }
        | Error::InitializationFault { .. }
        | Error::CompileFault { .. } => ErrorKind::ConfigurationFault,
        Error::InputEncoding { .. } => ErrorKind::InputEncodingFault,
        Error::OutputDecoding { .. } => ErrorKind::OutputDecodingFault,
        Error::InstantiationFault { .. } => ErrorKind::InstantiationFault,
    }
}

/// Converts an internal error into a caller-facing outcome.
///
/// Application errors keep the guest's message; host faults get the fixed
/// client message of their kind, so engine details never reach the caller.
#[must_use]
pub fn to_outcome(error: &Error) -> ReplaceOutcome {
    let kind = classify(error);
    match error {
        Error::Application { message, .. } => ReplaceOutcome::failed(kind, message.clone()),
        _ => ReplaceOutcome::failed(kind, kind.client_message()),
    }
}
