//! Parameter and result types for the `regexp-replace` tool.

use regexp_replace_core::{ReplaceOutcome, ReplaceRequest};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Error code reported to MCP clients for every failed call.
pub const CLIENT_ERROR_CODE: i64 = -1;

/// Parameters for the `regexp-replace` tool.
///
/// # Examples
///
/// ```
/// use regexp_replace_server::types::RegexpReplaceParams;
///
/// let params: RegexpReplaceParams = serde_json::from_str(
///     r#"{"pattern": "a+", "text": "aaa bbb aaa", "replacement": "X"}"#,
/// )
/// .unwrap();
/// assert_eq!(params.pattern, "a+");
/// ```
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RegexpReplaceParams {
    /// Regular expression to search for (Rust `regex` syntax)
    pub pattern: String,

    /// Text to search in
    pub text: String,

    /// Replacement for every match; `$1` or `${name}` refer to capture groups
    pub replacement: String,
}

impl From<RegexpReplaceParams> for ReplaceRequest {
    fn from(params: RegexpReplaceParams) -> Self {
        Self::new(params.pattern, params.text, params.replacement)
    }
}

/// Error payload returned to MCP clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolError {
    /// Always [`CLIENT_ERROR_CODE`]
    pub code: i64,

    /// Client-safe description of the failure
    pub message: String,
}

/// Result of the `regexp-replace` tool.
///
/// Exactly one of the two fields is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegexpReplaceResult {
    /// Text after every match was replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_text: Option<String>,

    /// Failure details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl RegexpReplaceResult {
    /// Returns `true` if this result carries an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<ReplaceOutcome> for RegexpReplaceResult {
    /// Failures carry the fixed message of their kind, never engine details
    /// or guest-supplied text.
    fn from(outcome: ReplaceOutcome) -> Self {
        match outcome {
            ReplaceOutcome::Replaced { replaced_text } => Self {
                replaced_text: Some(replaced_text),
                error: None,
            },
            ReplaceOutcome::Failed { kind, .. } => Self {
                replaced_text: None,
                error: Some(ToolError {
                    code: CLIENT_ERROR_CODE,
                    message: kind.client_message().to_string(),
                }),
            },
        }
    }
}
