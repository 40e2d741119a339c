//! Execution Coordinator: drives one call from request to outcome.
//!
//! A call moves through encode, spawn and run, capture, release, decode.
//! Whatever happens along the way, the caller receives exactly one
//! [`ReplaceOutcome`] and the instance created for the call is released
//! exactly once, before the outcome is returned.

use crate::classify::{classify, to_outcome};
use crate::codec;
use crate::engine::{CompiledModule, SandboxEngine};
use crate::instance::InstanceFactory;
use async_trait::async_trait;
use regexp_replace_core::stats::{ReplacerStats, StatsProvider};
use regexp_replace_core::traits::Replacer;
use regexp_replace_core::{ErrorKind, ReplaceOutcome, ReplaceRequest, Result, RuntimeConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Characters of untrusted input kept in failure logs.
const LOG_PREVIEW_CHARS: usize = 64;

/// [`Replacer`] backed by a sandboxed WASI guest.
///
/// Share across tasks with `Arc`; every call runs in its own instance and
/// nothing but the engine and compiled module is shared between calls.
///
/// # Examples
///
/// ```no_run
/// use regexp_replace_core::traits::Replacer;
/// use regexp_replace_core::{ReplaceRequest, RuntimeConfig};
/// use regexp_replace_wasm_runtime::{SandboxEngine, WasmReplacer};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> regexp_replace_core::Result<()> {
/// let engine = Arc::new(SandboxEngine::new(&RuntimeConfig::default())?);
/// let module = engine.load("engine.wasm".as_ref())?;
/// let replacer = WasmReplacer::new(engine, module, Duration::from_millis(100));
///
/// let outcome = replacer
///     .replace(ReplaceRequest::new("(", "text", ""), Duration::from_millis(50))
///     .await;
/// assert!(!outcome.is_replaced());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WasmReplacer {
    engine: Arc<SandboxEngine>,
    module: CompiledModule,
    factory: InstanceFactory,
    default_timeout: Duration,
    counters: CallCounters,
}

#[derive(Debug, Default)]
struct CallCounters {
    total_calls: AtomicU64,
    successful_calls: AtomicU64,
    failures: [AtomicU64; ErrorKind::ALL.len()],
    total_call_time_us: AtomicU64,
}

impl WasmReplacer {
    /// Creates a coordinator over an engine and its compiled guest.
    #[must_use]
    pub fn new(engine: Arc<SandboxEngine>, module: CompiledModule, default_timeout: Duration) -> Self {
        Self {
            engine,
            module,
            factory: InstanceFactory::new(),
            default_timeout,
            counters: CallCounters::default(),
        }
    }

    /// Creates the engine and loads the guest named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`InitializationFault`](regexp_replace_core::Error::InitializationFault)
    /// or [`CompileFault`](regexp_replace_core::Error::CompileFault); both
    /// are fatal at startup.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        let engine = SandboxEngine::new(config)?;
        let module = engine.load(&config.module_path)?;
        Ok(Self::new(Arc::new(engine), module, config.execution_timeout))
    }

    /// The shared engine.
    #[must_use]
    pub fn engine(&self) -> &SandboxEngine {
        &self.engine
    }

    /// The compiled guest.
    #[must_use]
    pub const fn module(&self) -> &CompiledModule {
        &self.module
    }

    /// The factory spawning this coordinator's instances.
    #[must_use]
    pub const fn factory(&self) -> &InstanceFactory {
        &self.factory
    }

    /// Instances alive right now.
    #[must_use]
    pub fn live_instances(&self) -> usize {
        self.factory.registry().live_count()
    }

    /// Runs one call and returns the replaced text or the internal error.
    ///
    /// The instance is released before decoding starts.
    ///
    /// # Errors
    ///
    /// Any per-call [`Error`](regexp_replace_core::Error) variant; see
    /// [`classify`] for how each maps to an [`ErrorKind`].
    pub async fn execute(&self, request: &ReplaceRequest, deadline: Duration) -> Result<String> {
        let input = codec::encode(request)?;
        tracing::trace!(input_bytes = input.len(), "Request encoded");

        let handle = self
            .factory
            .spawn(&self.engine, &self.module, input, deadline)
            .await?;

        let output = handle.output();
        tracing::trace!(output_bytes = output.len(), elapsed = ?handle.elapsed(), "Output captured");
        handle.close();

        codec::decode(&output)?.into_result()
    }

    /// Snapshot of call statistics.
    #[must_use]
    pub fn collect_stats(&self) -> ReplacerStats {
        let total_calls = self.counters.total_calls.load(Ordering::Relaxed);
        let total_time = self.counters.total_call_time_us.load(Ordering::Relaxed);
        let avg_call_time_us = total_time.checked_div(total_calls).unwrap_or(0);

        ReplacerStats::new(
            total_calls,
            self.counters.successful_calls.load(Ordering::Relaxed),
            ErrorKind::ALL
                .iter()
                .map(|kind| (*kind, self.counters.failures[kind.index()].load(Ordering::Relaxed))),
            self.live_instances(),
            avg_call_time_us,
        )
    }
}

#[async_trait]
impl Replacer for WasmReplacer {
    async fn replace(&self, request: ReplaceRequest, deadline: Duration) -> ReplaceOutcome {
        let span = tracing::debug_span!(
            "replace",
            instance = tracing::field::Empty,
            deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        );
        let started = Instant::now();
        self.counters.total_calls.fetch_add(1, Ordering::Relaxed);

        let result = self.execute(&request, deadline).instrument(span.clone()).await;

        let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.counters
            .total_call_time_us
            .fetch_add(elapsed_us, Ordering::Relaxed);

        match result {
            Ok(text) => {
                self.counters.successful_calls.fetch_add(1, Ordering::Relaxed);
                span.in_scope(|| tracing::debug!(elapsed_us, "Replacement succeeded"));
                ReplaceOutcome::replaced(text)
            }
            Err(e) => {
                let kind = classify(&e);
                self.counters.failures[kind.index()].fetch_add(1, Ordering::Relaxed);
                span.in_scope(|| {
                    tracing::warn!(
                        kind = %kind,
                        error = %e,
                        pattern = %preview(request.pattern.as_str()),
                        text = %preview(request.text.as_str()),
                        "Replacement failed"
                    );
                });
                to_outcome(&e)
            }
        }
    }

    fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}

impl StatsProvider for WasmReplacer {
    type Stats = ReplacerStats;

    fn capture_stats(&self) -> Self::Stats {
        self.collect_stats()
    }
}

fn preview(value: &str) -> &str {
    match value.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}
