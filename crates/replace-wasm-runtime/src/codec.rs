//! Boundary encoding between the host and the guest.
//!
//! Requests go to the guest's stdin as one JSON object
//! `{"pattern", "text", "replacement"}`. The guest answers on stdout with
//! either `{"replaced_text": ...}` or `{"error": {"code", "message"}}`.
//! The reference guest writes both keys every time, so responses are
//! decoded by field presence: a non-null `error` wins, then a string
//! `replaced_text`, and anything else is malformed.

use regexp_replace_core::{Error, ReplaceRequest, Result};
use serde_json::{Map, Value};

/// Bytes of raw guest output kept in decode diagnostics.
pub const PREVIEW_BYTES: usize = 256;

/// A well-formed guest response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestResponse {
    /// The guest replaced every match.
    Replaced(String),
    /// The guest reported an error of its own.
    ApplicationError {
        /// Guest error code; `2` is an invalid pattern.
        code: i64,
        /// Guest-supplied description.
        message: String,
    },
}

impl GuestResponse {
    /// Converts the response into the replaced text or an
    /// [`Error::Application`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Application`] for [`GuestResponse::ApplicationError`].
    pub fn into_result(self) -> Result<String> {
        match self {
            Self::Replaced(text) => Ok(text),
            Self::ApplicationError { code, message } => Err(Error::Application { code, message }),
        }
    }
}

/// Encodes a request for the guest's stdin.
///
/// # Errors
///
/// Returns [`Error::InputEncoding`] if serialization fails.
///
/// # Examples
///
/// ```
/// use regexp_replace_core::ReplaceRequest;
/// use regexp_replace_wasm_runtime::codec;
///
/// let bytes = codec::encode(&ReplaceRequest::new("a+", "aaa", "X")).unwrap();
/// assert_eq!(bytes, br#"{"pattern":"a+","text":"aaa","replacement":"X"}"#);
/// ```
pub fn encode(request: &ReplaceRequest) -> Result<Vec<u8>> {
    serde_json::to_vec(request).map_err(|source| Error::InputEncoding { source })
}

/// Decodes the guest's stdout.
///
/// Never panics on arbitrary input. Extra fields are ignored and trailing
/// whitespace is accepted.
///
/// # Errors
///
/// Returns [`Error::OutputDecoding`] if the output is not a JSON object of
/// a known shape. An application error is not a decoding failure; it is
/// returned as [`GuestResponse::ApplicationError`].
///
/// # Examples
///
/// ```
/// use regexp_replace_wasm_runtime::codec::{self, GuestResponse};
///
/// let ok = codec::decode(br#"{"replaced_text":"foo","error":null}"#).unwrap();
/// assert_eq!(ok, GuestResponse::Replaced("foo".to_string()));
///
/// let failed = codec::decode(br#"{"error":{"code":2,"message":"bad"}}"#).unwrap();
/// assert!(matches!(failed, GuestResponse::ApplicationError { code: 2, .. }));
///
/// assert!(codec::decode(b"not json").is_err());
/// ```
pub fn decode(output: &[u8]) -> Result<GuestResponse> {
    let mut object: Map<String, Value> = serde_json::from_slice(output).map_err(|e| {
        log_preview(output, "guest output is not a JSON object");
        Error::OutputDecoding {
            message: format!("guest output is not a JSON object ({} bytes)", output.len()),
            source: Some(e),
        }
    })?;

    match object.remove("error") {
        None | Some(Value::Null) => {}
        Some(error) => {
            return decode_application_error(error).ok_or_else(|| {
                malformed(output, "`error` must be an object with integer `code` and string `message`")
            });
        }
    }

    match object.remove("replaced_text") {
        Some(Value::String(text)) => Ok(GuestResponse::Replaced(text)),
        Some(_) => Err(malformed(output, "`replaced_text` must be a string")),
        None => Err(malformed(output, "neither `replaced_text` nor `error` present")),
    }
}

fn decode_application_error(error: Value) -> Option<GuestResponse> {
    let Value::Object(mut error) = error else {
        return None;
    };
    let code = error.get("code").and_then(Value::as_i64)?;
    match error.remove("message") {
        Some(Value::String(message)) => Some(GuestResponse::ApplicationError { code, message }),
        _ => None,
    }
}

fn malformed(output: &[u8], reason: &str) -> Error {
    log_preview(output, reason);
    Error::OutputDecoding {
        message: reason.to_string(),
        source: None,
    }
}

fn log_preview(output: &[u8], reason: &str) {
    let end = output.len().min(PREVIEW_BYTES);
    tracing::debug!(
        output_bytes = output.len(),
        preview = %String::from_utf8_lossy(&output[..end]),
        "Undecodable guest output: {reason}"
    );
}
