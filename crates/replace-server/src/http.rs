//! Streamable HTTP transport.
//!
//! Serves the same [`ReplaceService`] as the stdio transport, mounted at
//! [`MCP_PATH`] in stateless mode: every POST is answered on its own, with
//! no session to resume. Request bodies are capped at [`MAX_BODY_BYTES`].

use crate::service::ReplaceService;
use axum::Router;
use regexp_replace_core::traits::Replacer;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Route the MCP endpoint is mounted at.
pub const MCP_PATH: &str = "/mcp";

/// Largest accepted request body (1 MiB).
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds the HTTP router for `replacer`.
///
/// Bodies whose declared length exceeds [`MAX_BODY_BYTES`] are rejected with
/// `413 Payload Too Large` before reaching the MCP handler; longer streamed
/// bodies fail when the handler reads past the cap.
#[must_use]
pub fn router(replacer: Arc<dyn Replacer>) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(ReplaceService::new(Arc::clone(&replacer))),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            stateful_mode: false,
            ..Default::default()
        },
    );

    Router::new()
        .nest_service(MCP_PATH, service)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

/// Serves [`router`] on `addr` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(
    addr: SocketAddr,
    replacer: Arc<dyn Replacer>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        path = MCP_PATH,
        "Listening for Streamable HTTP"
    );

    axum::serve(listener, router(replacer))
        .with_graceful_shutdown(shutdown)
        .await
}
