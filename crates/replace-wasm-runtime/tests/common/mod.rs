//! Shared fixtures: WAT guests and replacer construction.

#![allow(dead_code)]

use regexp_replace_core::{RuntimeConfig, RuntimeConfigBuilder};
use regexp_replace_wasm_runtime::{SandboxEngine, WasmReplacer};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

pub const SPIN: &str = include_str!("../wasm/spin.wat");
pub const TRAP: &str = include_str!("../wasm/trap.wat");
pub const ECHO: &str = include_str!("../wasm/echo.wat");
pub const PROGRAM_NAME: &str = include_str!("../wasm/program_name.wat");

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("regexp_replace_wasm_runtime=debug,guest_stderr=debug")
        .with_test_writer()
        .try_init();
}

fn escape(payload: &[u8]) -> String {
    payload.iter().fold(String::new(), |mut out, byte| {
        let _ = write!(out, "\\{byte:02x}");
        out
    })
}

/// Guest that writes `payload` to stdout and returns.
pub fn stdout_guest(payload: &str) -> String {
    stdout_guest_with_pages(payload, 1)
}

/// Guest with `pages` of initial memory that writes `payload` to stdout.
pub fn stdout_guest_with_pages(payload: &str, pages: u32) -> String {
    format!(
        r#"(module
            (import "wasi_snapshot_preview1" "fd_write"
                (func $fd_write (param i32 i32 i32 i32) (result i32)))
            (memory (export "memory") {pages})
            (data (i32.const 64) "{data}")
            (func (export "_start")
                (i32.store (i32.const 0) (i32.const 64))
                (i32.store (i32.const 4) (i32.const {len}))
                (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 16)))))"#,
        data = escape(payload.as_bytes()),
        len = payload.len(),
    )
}

/// Guest that writes `diagnostic` to stderr, then `payload` to stdout.
pub fn chatty_guest(diagnostic: &str, payload: &str) -> String {
    let offset = 64 + diagnostic.len();
    format!(
        r#"(module
            (import "wasi_snapshot_preview1" "fd_write"
                (func $fd_write (param i32 i32 i32 i32) (result i32)))
            (memory (export "memory") 1)
            (data (i32.const 64) "{diagnostic_data}")
            (data (i32.const {offset}) "{payload_data}")
            (func (export "_start")
                (i32.store (i32.const 0) (i32.const 64))
                (i32.store (i32.const 4) (i32.const {diagnostic_len}))
                (drop (call $fd_write (i32.const 2) (i32.const 0) (i32.const 1) (i32.const 16)))
                (i32.store (i32.const 0) (i32.const {offset}))
                (i32.store (i32.const 4) (i32.const {payload_len}))
                (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 16)))))"#,
        diagnostic_data = escape(diagnostic.as_bytes()),
        diagnostic_len = diagnostic.len(),
        payload_data = escape(payload.as_bytes()),
        payload_len = payload.len(),
    )
}

/// Guest that exits through `proc_exit(status)` after writing `payload`.
pub fn exit_guest(payload: &str, status: i32) -> String {
    format!(
        r#"(module
            (import "wasi_snapshot_preview1" "fd_write"
                (func $fd_write (param i32 i32 i32 i32) (result i32)))
            (import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))
            (memory (export "memory") 1)
            (data (i32.const 64) "{data}")
            (func (export "_start")
                (i32.store (i32.const 0) (i32.const 64))
                (i32.store (i32.const 4) (i32.const {len}))
                (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 16)))
                (call $proc_exit (i32.const {status}))))"#,
        data = escape(payload.as_bytes()),
        len = payload.len(),
    )
}

/// Guest that grows its memory by `pages` and traps if growth fails,
/// otherwise writes a success payload.
pub fn grow_guest(pages: u32) -> String {
    let payload = r#"{"replaced_text":"grown"}"#;
    format!(
        r#"(module
            (import "wasi_snapshot_preview1" "fd_write"
                (func $fd_write (param i32 i32 i32 i32) (result i32)))
            (memory (export "memory") 1)
            (data (i32.const 64) "{data}")
            (func (export "_start")
                (if (i32.eq (memory.grow (i32.const {pages})) (i32.const -1))
                    (then unreachable))
                (i32.store (i32.const 0) (i32.const 64))
                (i32.store (i32.const 4) (i32.const {len}))
                (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 16)))))"#,
        data = escape(payload.as_bytes()),
        len = payload.len(),
    )
}

pub fn wasm(wat: &str) -> Vec<u8> {
    wat::parse_str(wat).expect("Failed to parse WAT")
}

pub fn replacer_with(config: &RuntimeConfig, wat: &str) -> WasmReplacer {
    let engine = SandboxEngine::new(config).expect("Failed to create engine");
    let module = engine.compile(&wasm(wat)).expect("Failed to compile guest");
    WasmReplacer::new(Arc::new(engine), module, config.execution_timeout)
}

/// Defaults with a default deadline generous enough for unoptimized builds.
pub fn test_config() -> RuntimeConfigBuilder {
    RuntimeConfig::builder().execution_timeout(Duration::from_secs(5))
}

pub fn replacer(wat: &str) -> WasmReplacer {
    replacer_with(&test_config().build(), wat)
}
