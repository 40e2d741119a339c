//! MCP server implementation for sandboxed regexp replacement.
//!
//! The `ReplaceService` provides one tool, `regexp-replace`, backed by any
//! [`Replacer`]; the binary wires in the WASI sandbox.

use crate::types::{RegexpReplaceParams, RegexpReplaceResult};
use regexp_replace_core::ReplaceRequest;
use regexp_replace_core::traits::Replacer;
use rmcp::handler::server::ServerHandler;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{ErrorData as McpError, tool, tool_handler, tool_router};
use std::sync::Arc;

/// MCP server exposing regexp replacement.
///
/// Each tool call is one [`Replacer::replace_with_default_timeout`] call.
/// Failures are returned as tool-level errors with a fixed client message,
/// never as protocol errors.
///
/// # Examples
///
/// ```no_run
/// use regexp_replace_core::RuntimeConfig;
/// use regexp_replace_server::service::ReplaceService;
/// use regexp_replace_wasm_runtime::WasmReplacer;
/// use rmcp::ServiceExt;
/// use rmcp::transport::stdio;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let replacer = Arc::new(WasmReplacer::from_config(&RuntimeConfig::default())?);
/// let service = ReplaceService::new(replacer).serve(stdio()).await?;
/// service.waiting().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ReplaceService {
    /// Backend running each replacement
    replacer: Arc<dyn Replacer>,

    /// Tool router for MCP protocol
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for ReplaceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaceService")
            .field("default_timeout", &self.replacer.default_timeout())
            .finish_non_exhaustive()
    }
}

impl ReplaceService {
    /// Creates a service over `replacer`.
    #[must_use]
    pub fn new(replacer: Arc<dyn Replacer>) -> Self {
        Self {
            replacer,
            tool_router: Self::tool_router(),
        }
    }

    /// Runs one replacement and shapes the result for MCP clients.
    pub async fn replace(&self, params: RegexpReplaceParams) -> RegexpReplaceResult {
        let request = ReplaceRequest::from(params);
        let outcome = self.replacer.replace_with_default_timeout(request).await;
        if let Some(kind) = outcome.error_kind() {
            tracing::debug!(%kind, "Tool call failed");
        }
        RegexpReplaceResult::from(outcome)
    }
}

#[tool_router]
impl ReplaceService {
    /// Replace every match of a regular expression in text.
    #[tool(
        name = "regexp-replace",
        description = "Replace every match of a regular expression in text. Supports capture group references such as $1 in the replacement. Runs in an isolated WebAssembly sandbox with memory and time limits."
    )]
    async fn regexp_replace(
        &self,
        Parameters(params): Parameters<RegexpReplaceParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.replace(params).await;

        let body = serde_json::to_string(&result).map_err(|e| {
            McpError::internal_error(format!("Failed to serialize result: {e}"), None)
        })?;

        if result.is_error() {
            Ok(CallToolResult::error(vec![Content::text(body)]))
        } else {
            Ok(CallToolResult::success(vec![Content::text(body)]))
        }
    }
}

#[tool_handler]
impl ServerHandler for ReplaceService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Regular expression replacer. Call regexp-replace with a pattern, \
                 the text to search, and a replacement string."
                    .to_string(),
            ),
        }
    }
}
