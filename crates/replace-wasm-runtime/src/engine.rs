//! Runtime Manager: the process-wide wasmtime engine and the compiled guest.
//!
//! A [`SandboxEngine`] is created once at startup, shared read-only by every
//! call, and closed once at shutdown. It owns:
//!
//! - the wasmtime [`Engine`], configured for async execution with epoch
//!   interruption;
//! - the [`InstanceLimits`] applied uniformly to every instance;
//! - a background epoch ticker. Each tick is a preemption point at which a
//!   running guest yields to the async executor, so deadlines and
//!   cancellation are observed even while the guest spins.
//!
//! [`SandboxEngine::compile`] turns guest bytes into a [`CompiledModule`]
//! once. Both initialization and compile failures are fatal at startup.

use crate::instance::SandboxState;
use regexp_replace_core::{Error, MemoryPages, Result, RuntimeConfig};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use wasmtime::{
    Config, Engine, ExternType, InstancePre, Linker, Module, StoreLimits, StoreLimitsBuilder,
    Strategy, WasmBacktraceDetails,
};

/// Resource limits applied to every instance spawned from one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceLimits {
    /// Maximum linear memory per instance.
    pub memory: MemoryPages,
    /// Capacity of the captured stdout.
    pub max_output_bytes: usize,
    /// Capacity of the captured stderr.
    pub max_diagnostic_bytes: usize,
}

impl InstanceLimits {
    /// Builds the per-store limiter for one instance.
    pub(crate) fn store_limits(&self) -> StoreLimits {
        let memory_bytes = usize::try_from(self.memory.bytes()).unwrap_or(usize::MAX);
        StoreLimitsBuilder::new()
            .memory_size(memory_bytes)
            .instances(1)
            .build()
    }
}

impl From<&RuntimeConfig> for InstanceLimits {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            memory: config.memory_limit,
            max_output_bytes: config.max_output_bytes,
            max_diagnostic_bytes: config.max_diagnostic_bytes,
        }
    }
}

/// Process-wide sandboxing engine.
///
/// # Lifecycle
///
/// Create with [`SandboxEngine::new`], compile the guest with
/// [`SandboxEngine::compile`] or [`SandboxEngine::load`], share by reference
/// (or `Arc`) with every caller, and call [`SandboxEngine::close`] exactly
/// once after the system stops accepting calls. Dropping an unclosed engine
/// also stops the ticker.
///
/// # Examples
///
/// ```
/// use regexp_replace_core::RuntimeConfig;
/// use regexp_replace_wasm_runtime::SandboxEngine;
///
/// let engine = SandboxEngine::new(&RuntimeConfig::default()).unwrap();
/// assert_eq!(engine.limits().memory.get(), 1024);
///
/// engine.close().unwrap();
/// assert!(engine.close().is_err());
/// ```
pub struct SandboxEngine {
    engine: Engine,
    limits: InstanceLimits,
    ticker: EpochTicker,
    closed: AtomicBool,
}

impl std::fmt::Debug for SandboxEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxEngine")
            .field("limits", &self.limits)
            .field("epoch_tick", &self.ticker.tick)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl SandboxEngine {
    /// Creates the engine and starts its epoch ticker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InitializationFault`] if the configuration is invalid,
    /// wasmtime rejects its settings, or the ticker thread cannot start.
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        config.validate()?;

        let mut wasmtime_config = Config::new();
        wasmtime_config.wasm_backtrace_details(WasmBacktraceDetails::Enable);
        wasmtime_config.async_support(true);
        wasmtime_config.epoch_interruption(true);
        wasmtime_config.strategy(Strategy::Cranelift);

        let engine = Engine::new(&wasmtime_config).map_err(|e| Error::InitializationFault {
            message: "failed to create wasmtime engine".to_string(),
            source: Some(e.into()),
        })?;

        let ticker = EpochTicker::start(engine.clone(), config.epoch_tick)?;
        let limits = InstanceLimits::from(config);

        tracing::info!(
            memory_pages = limits.memory.get(),
            epoch_tick_us = config.epoch_tick.as_micros(),
            "Sandbox engine created"
        );

        Ok(Self {
            engine,
            limits,
            ticker,
            closed: AtomicBool::new(false),
        })
    }

    /// Creates an engine with default settings and the given memory limit.
    ///
    /// # Errors
    ///
    /// See [`SandboxEngine::new`].
    pub fn with_memory_limit(memory: MemoryPages) -> Result<Self> {
        Self::new(&RuntimeConfig::builder().memory_limit(memory).build())
    }

    /// Validates, compiles and links guest bytes.
    ///
    /// WASI preview 1 imports are resolved here, so a guest that needs
    /// anything else fails at startup rather than on its first call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CompileFault`] if the bytes are not a valid module,
    /// an import cannot be resolved, or the module has no `_start` export.
    pub fn compile(&self, wasm_bytes: &[u8]) -> Result<CompiledModule> {
        let module = Module::new(&self.engine, wasm_bytes).map_err(|e| Error::CompileFault {
            message: format!("invalid WebAssembly module ({} bytes)", wasm_bytes.len()),
            source: Some(e.into()),
        })?;

        if !matches!(module.get_export("_start"), Some(ExternType::Func(_))) {
            return Err(Error::CompileFault {
                message: "module is not a WASI command: missing `_start` export".to_string(),
                source: None,
            });
        }

        let mut linker: Linker<SandboxState> = Linker::new(&self.engine);
        wasmtime_wasi::p1::add_to_linker_async(&mut linker, |state: &mut SandboxState| {
            &mut state.wasi
        })
        .map_err(|e| Error::CompileFault {
            message: "failed to link WASI preview 1".to_string(),
            source: Some(e.into()),
        })?;

        let pre = linker
            .instantiate_pre(&module)
            .map_err(|e| Error::CompileFault {
                message: "module imports cannot be resolved".to_string(),
                source: Some(e.into()),
            })?;

        tracing::info!(size_bytes = wasm_bytes.len(), "Guest module compiled");

        Ok(CompiledModule {
            pre,
            size_bytes: wasm_bytes.len(),
        })
    }

    /// Reads guest bytes from `path` and compiles them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CompileFault`] if the file cannot be read or the
    /// bytes do not compile.
    pub fn load(&self, path: &Path) -> Result<CompiledModule> {
        let bytes = std::fs::read(path).map_err(|e| Error::CompileFault {
            message: format!("failed to read module from {}", path.display()),
            source: Some(e.into()),
        })?;
        self.compile(&bytes).map_err(|e| match e {
            Error::CompileFault { message, source } => Error::CompileFault {
                message: format!("{message} from {}", path.display()),
                source,
            },
            other => other,
        })
    }

    /// Stops the epoch ticker and marks the engine closed.
    ///
    /// Must run once, after the system has stopped accepting calls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationFault`] if the engine was already closed.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::ConfigurationFault {
                message: "sandbox engine already closed".to_string(),
                source: None,
            });
        }
        self.ticker.stop();
        tracing::info!("Sandbox engine closed");
        Ok(())
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Limits applied to every instance.
    #[must_use]
    pub const fn limits(&self) -> InstanceLimits {
        self.limits
    }

    pub(crate) const fn inner(&self) -> &Engine {
        &self.engine
    }
}

impl Drop for SandboxEngine {
    fn drop(&mut self) {
        self.ticker.stop();
    }
}

/// Compiled, pre-linked guest module.
///
/// Immutable after creation and cheap to clone; every instance is created
/// from the same pre-resolved imports.
#[derive(Clone)]
pub struct CompiledModule {
    pre: InstancePre<SandboxState>,
    size_bytes: usize,
}

impl std::fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledModule")
            .field("size_bytes", &self.size_bytes)
            .finish_non_exhaustive()
    }
}

impl CompiledModule {
    /// Size of the guest binary this module was compiled from.
    #[must_use]
    pub const fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub(crate) const fn pre(&self) -> &InstancePre<SandboxState> {
        &self.pre
    }
}

/// Background thread advancing the engine epoch at a fixed period.
struct EpochTicker {
    tick: Duration,
    stop: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl EpochTicker {
    fn start(engine: Engine, tick: Duration) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("wasm-epoch-ticker".to_string())
            .spawn(move || {
                while !stop_flag.load(Ordering::Acquire) {
                    std::thread::sleep(tick);
                    engine.increment_epoch();
                }
            })
            .map_err(|e| Error::InitializationFault {
                message: "failed to start epoch ticker".to_string(),
                source: Some(e.into()),
            })?;

        Ok(Self {
            tick,
            stop,
            thread: Mutex::new(Some(thread)),
        })
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        let thread = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(thread) = thread
            && thread.join().is_err()
        {
            tracing::error!("Epoch ticker thread panicked");
        }
    }
}
