//! Replace operation trait.
//!
//! This module defines the `Replacer` trait, the single operation the core
//! exposes to outer protocol layers.

use crate::{ReplaceOutcome, ReplaceRequest};
use async_trait::async_trait;
use std::time::Duration;

/// Replaces pattern matches in text, once per call.
///
/// Implementations never fail at the Rust level: every failure is folded
/// into [`ReplaceOutcome::Failed`] with a classified kind. All
/// implementations must be `Send + Sync` so one instance can serve
/// concurrent calls.
///
/// # Examples
///
/// ```
/// use regexp_replace_core::traits::Replacer;
/// use regexp_replace_core::{ErrorKind, ReplaceOutcome, ReplaceRequest};
/// use async_trait::async_trait;
/// use std::time::Duration;
///
/// struct Literal;
///
/// #[async_trait]
/// impl Replacer for Literal {
///     async fn replace(&self, request: ReplaceRequest, _deadline: Duration) -> ReplaceOutcome {
///         if request.pattern.as_str().is_empty() {
///             return ReplaceOutcome::failed(ErrorKind::InvalidPattern, "empty pattern");
///         }
///         ReplaceOutcome::replaced(
///             request
///                 .text
///                 .as_str()
///                 .replace(request.pattern.as_str(), request.replacement.as_str()),
///         )
///     }
///
///     fn default_timeout(&self) -> Duration {
///         Duration::from_millis(100)
///     }
/// }
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let outcome = Literal
///     .replace_with_default_timeout(ReplaceRequest::new("a", "banana", "o"))
///     .await;
/// assert_eq!(outcome.replaced_text(), Some("bonono"));
/// # });
/// ```
#[async_trait]
pub trait Replacer: Send + Sync {
    /// Runs one replacement, bounded by `deadline`.
    async fn replace(&self, request: ReplaceRequest, deadline: Duration) -> ReplaceOutcome;

    /// Deadline used by [`replace_with_default_timeout`](Self::replace_with_default_timeout).
    fn default_timeout(&self) -> Duration;

    /// Runs one replacement bounded by the configured default timeout.
    async fn replace_with_default_timeout(&self, request: ReplaceRequest) -> ReplaceOutcome {
        self.replace(request, self.default_timeout()).await
    }
}
