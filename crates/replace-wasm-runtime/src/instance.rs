//! Instance Factory: one fresh sandbox per call.
//!
//! Every call gets its own wasmtime [`Store`] with a new linear memory, its
//! own in-memory stdin/stdout/stderr, and a unique [`InstanceId`] that is
//! also passed to the guest as its program name. Nothing is shared between
//! instances except the immutable [`CompiledModule`].
//!
//! An instance is tracked in the [`InstanceRegistry`] from spawn until its
//! [`InstanceHandle`] is dropped or closed, on every path: success, guest
//! error, timeout, and cancellation of the calling future.

use crate::engine::{CompiledModule, SandboxEngine};
use regexp_replace_core::{Error, InstanceId, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wasmtime::{Store, StoreLimits};
use wasmtime_wasi::I32Exit;
use wasmtime_wasi::WasiCtxBuilder;
use wasmtime_wasi::p1::WasiP1Ctx;
use wasmtime_wasi::p2::pipe::{MemoryInputPipe, MemoryOutputPipe};

/// Per-store host state.
pub(crate) struct SandboxState {
    pub(crate) wasi: WasiP1Ctx,
    limits: StoreLimits,
}

/// Set of instances currently alive.
///
/// Cheap to clone; clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
    live: Arc<Mutex<HashSet<InstanceId>>>,
}

impl InstanceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id` as live until the returned lease is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationFault`] if `id` is already live or the
    /// registry lock is poisoned.
    pub(crate) fn register(&self, id: InstanceId) -> Result<InstanceLease> {
        let mut live = self.live.lock().map_err(|_| Error::ConfigurationFault {
            message: "instance registry lock poisoned".to_string(),
            source: None,
        })?;
        if !live.insert(id) {
            return Err(Error::ConfigurationFault {
                message: format!("duplicate instance identifier {id}"),
                source: None,
            });
        }
        Ok(InstanceLease {
            id,
            live: Arc::clone(&self.live),
        })
    }

    /// Number of instances alive right now.
    #[must_use]
    pub fn live_count(&self) -> usize {
        match self.live.lock() {
            Ok(live) => live.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Returns `true` if `id` is alive.
    #[must_use]
    pub fn is_live(&self, id: InstanceId) -> bool {
        match self.live.lock() {
            Ok(live) => live.contains(&id),
            Err(poisoned) => poisoned.into_inner().contains(&id),
        }
    }
}

/// Removes its instance from the registry when dropped.
pub(crate) struct InstanceLease {
    id: InstanceId,
    live: Arc<Mutex<HashSet<InstanceId>>>,
}

impl Drop for InstanceLease {
    fn drop(&mut self) {
        let mut live = match self.live.lock() {
            Ok(live) => live,
            Err(poisoned) => poisoned.into_inner(),
        };
        live.remove(&self.id);
    }
}

/// A finished sandbox instance and its captured output.
///
/// Dropping the handle releases the instance: its store and memory are
/// freed, its diagnostic output is forwarded to the log, and its identifier
/// leaves the registry.
pub struct InstanceHandle {
    id: InstanceId,
    store: Store<SandboxState>,
    stdout: MemoryOutputPipe,
    stderr: MemoryOutputPipe,
    started: Instant,
    elapsed: Duration,
    _lease: InstanceLease,
}

impl std::fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("id", &self.id)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

impl InstanceHandle {
    /// Identifier of this instance.
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Everything the guest wrote to stdout.
    #[must_use]
    pub fn output(&self) -> Vec<u8> {
        self.stdout.contents().to_vec()
    }

    /// Wall-clock time from spawn until the guest finished.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Releases the instance.
    pub fn close(self) {
        drop(self);
    }

    fn forward_diagnostics(&self) {
        let diagnostics = self.stderr.contents();
        if diagnostics.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&diagnostics);
        for line in text.lines().filter(|line| !line.is_empty()) {
            tracing::debug!(target: "guest_stderr", instance = %self.id, "{line}");
        }
    }
}

impl Drop for InstanceHandle {
    fn drop(&mut self) {
        self.forward_diagnostics();
        tracing::trace!(instance = %self.id, "Instance released");
    }
}

/// Creates, runs and tracks sandbox instances.
///
/// # Examples
///
/// ```
/// use regexp_replace_wasm_runtime::InstanceFactory;
///
/// let factory = InstanceFactory::new();
/// assert_eq!(factory.registry().live_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InstanceFactory {
    registry: InstanceRegistry,
}

impl InstanceFactory {
    /// Creates a factory with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory that records instances in `registry`.
    #[must_use]
    pub const fn with_registry(registry: InstanceRegistry) -> Self {
        Self { registry }
    }

    /// The registry of live instances.
    #[must_use]
    pub const fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    /// Spawns a fresh instance, feeds it `input` on stdin, and runs it to
    /// completion within `deadline`.
    ///
    /// The guest's program name is the new instance identifier, which is
    /// also recorded as the `instance` field of the current span. On any error
    /// the instance is released before this returns; if the returned future
    /// is dropped early the instance is released as well.
    ///
    /// # Errors
    ///
    /// - [`Error::ConfigurationFault`] if the engine is closed or the
    ///   identifier cannot be registered
    /// - [`Error::Timeout`] if `deadline` elapses first; partial output is
    ///   discarded
    /// - [`Error::InstantiationFault`] if the guest fails to instantiate,
    ///   traps, or exits with a non-zero status
    pub async fn spawn(
        &self,
        engine: &SandboxEngine,
        module: &CompiledModule,
        input: Vec<u8>,
        deadline: Duration,
    ) -> Result<InstanceHandle> {
        if engine.is_closed() {
            return Err(Error::ConfigurationFault {
                message: "sandbox engine is closed".to_string(),
                source: None,
            });
        }

        let id = InstanceId::generate();
        tracing::Span::current().record("instance", tracing::field::display(id));
        let lease = self.registry.register(id)?;
        let limits = engine.limits();
        let input_bytes = input.len();

        let stdout = MemoryOutputPipe::new(limits.max_output_bytes);
        let stderr = MemoryOutputPipe::new(limits.max_diagnostic_bytes);
        let wasi = WasiCtxBuilder::new()
            .stdin(MemoryInputPipe::new(input))
            .stdout(stdout.clone())
            .stderr(stderr.clone())
            .arg(id.to_string())
            .build_p1();

        let mut store = Store::new(
            engine.inner(),
            SandboxState {
                wasi,
                limits: limits.store_limits(),
            },
        );
        store.limiter(|state| &mut state.limits);
        store.set_epoch_deadline(1);
        store.epoch_deadline_async_yield_and_update(1);

        let mut handle = InstanceHandle {
            id,
            store,
            stdout,
            stderr,
            started: Instant::now(),
            elapsed: Duration::ZERO,
            _lease: lease,
        };

        tracing::debug!(instance = %id, input_bytes, "Instance spawned");

        let run =
            tokio::time::timeout(deadline, run_to_completion(&mut handle.store, module, id)).await;
        handle.elapsed = handle.started.elapsed();

        match run {
            Ok(Ok(())) => {
                tracing::debug!(
                    instance = %id,
                    elapsed_us = handle.elapsed.as_micros(),
                    "Instance finished"
                );
                Ok(handle)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                let timeout_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(instance = %id, timeout_ms, "Instance aborted at deadline");
                Err(Error::Timeout {
                    instance: id.to_string(),
                    timeout_ms,
                })
            }
        }
    }
}

async fn run_to_completion(
    store: &mut Store<SandboxState>,
    module: &CompiledModule,
    id: InstanceId,
) -> Result<()> {
    let instance = module
        .pre()
        .instantiate_async(&mut *store)
        .await
        .map_err(|e| fault(id, "failed to instantiate guest", Some(e)))?;

    let start = instance
        .get_typed_func::<(), ()>(&mut *store, "_start")
        .map_err(|e| fault(id, "guest entry point unavailable", Some(e)))?;

    match start.call_async(&mut *store, ()).await {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<I32Exit>() {
            Some(I32Exit(0)) => Ok(()),
            Some(I32Exit(status)) => Err(fault(
                id,
                &format!("guest exited with status {status}"),
                None,
            )),
            None => Err(fault(id, "guest trapped", Some(e))),
        },
    }
}

fn fault(id: InstanceId, message: &str, source: Option<wasmtime::Error>) -> Error {
    Error::InstantiationFault {
        instance: id.to_string(),
        message: message.to_string(),
        source: source.map(Into::into),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_tracks_leases() {
        let registry = InstanceRegistry::new();
        let id = InstanceId::generate();

        let lease = registry.register(id).unwrap();
        assert_eq!(registry.live_count(), 1);
        assert!(registry.is_live(id));

        drop(lease);
        assert_eq!(registry.live_count(), 0);
        assert!(!registry.is_live(id));
    }

    #[test]
    fn test_registry_rejects_duplicate_id() {
        let registry = InstanceRegistry::new();
        let id = InstanceId::generate();

        let _lease = registry.register(id).unwrap();
        let err = registry.register(id).err().unwrap();
        assert!(err.is_configuration_error());
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_registry_clones_share_state() {
        let registry = InstanceRegistry::new();
        let factory = InstanceFactory::with_registry(registry.clone());

        let _lease = registry.register(InstanceId::generate()).unwrap();
        assert_eq!(factory.registry().live_count(), 1);
    }
}
