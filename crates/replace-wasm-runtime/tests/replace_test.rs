//! Coordinator behavior against scripted WAT guests.

mod common;

use common::*;
use regexp_replace_core::traits::Replacer;
use regexp_replace_core::{ErrorKind, ReplaceRequest, RuntimeConfig};
use regexp_replace_wasm_runtime::SandboxEngine;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn request() -> ReplaceRequest {
    ReplaceRequest::new("a+", "aaa bbb aaa", "X")
}

#[tokio::test]
async fn test_success_payload() {
    init_tracing();
    let replacer = replacer(&stdout_guest(r#"{"replaced_text":"foo","error":null}"#));

    let outcome = replacer.replace_with_default_timeout(request()).await;

    assert_eq!(outcome.replaced_text(), Some("foo"));
    assert_eq!(replacer.live_instances(), 0);
}

#[tokio::test]
async fn test_invalid_pattern_code() {
    init_tracing();
    let replacer = replacer(&stdout_guest(
        r#"{"replaced_text":"","error":{"code":2,"message":"bad pattern"}}"#,
    ));

    let outcome = replacer.replace_with_default_timeout(request()).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::InvalidPattern));
    assert_eq!(outcome.message(), Some("bad pattern"));
}

#[tokio::test]
async fn test_other_codes_are_runtime_faults() {
    init_tracing();
    for code in [7, 1, 0] {
        let payload = format!(r#"{{"error":{{"code":{code},"message":"x"}}}}"#);
        let replacer = replacer(&stdout_guest(&payload));

        let outcome = replacer.replace_with_default_timeout(request()).await;

        assert_eq!(
            outcome.error_kind(),
            Some(ErrorKind::RuntimeFault),
            "code {code}"
        );
    }
}

#[tokio::test]
async fn test_malformed_output() {
    init_tracing();
    for payload in ["", "not json", "{}", r#"{"replaced_text":5}"#, r#"{"error":{}}"#] {
        let replacer = replacer(&stdout_guest(payload));

        let outcome = replacer.replace_with_default_timeout(request()).await;

        assert_eq!(
            outcome.error_kind(),
            Some(ErrorKind::OutputDecodingFault),
            "payload {payload:?}"
        );
        assert_eq!(outcome.message(), Some("Engine output error"));
        assert_eq!(replacer.live_instances(), 0);
    }
}

#[tokio::test]
async fn test_request_reaches_guest_stdin() {
    init_tracing();
    let replacer = replacer(ECHO);
    let input = ReplaceRequest::new("(", "tricky \"quoted\" text", "\\1");

    let handle = replacer
        .factory()
        .spawn(
            replacer.engine(),
            replacer.module(),
            regexp_replace_wasm_runtime::codec::encode(&input).unwrap(),
            Duration::from_secs(1),
        )
        .await
        .expect("echo guest should finish");

    let echoed: ReplaceRequest = serde_json::from_slice(&handle.output()).unwrap();
    assert_eq!(echoed, input);
    handle.close();
    assert_eq!(replacer.live_instances(), 0);
}

#[tokio::test]
async fn test_echoed_request_is_not_a_known_shape() {
    let replacer = replacer(ECHO);

    let outcome = replacer.replace_with_default_timeout(request()).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::OutputDecodingFault));
}

#[tokio::test]
async fn test_trap_is_instantiation_fault() {
    init_tracing();
    let replacer = replacer(TRAP);

    let outcome = replacer.replace_with_default_timeout(request()).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::InstantiationFault));
    assert_eq!(outcome.message(), Some("Engine instantiation failed"));
    assert_eq!(replacer.live_instances(), 0);
}

#[tokio::test]
async fn test_proc_exit_status() {
    init_tracing();
    let payload = r#"{"replaced_text":"done"}"#;

    let clean = replacer(&exit_guest(payload, 0));
    let outcome = clean.replace_with_default_timeout(request()).await;
    assert_eq!(outcome.replaced_text(), Some("done"));

    let failing = replacer(&exit_guest(payload, 3));
    let outcome = failing.replace_with_default_timeout(request()).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::InstantiationFault));
}

#[tokio::test]
async fn test_guest_stderr_does_not_affect_result() {
    init_tracing();
    let replacer = replacer(&chatty_guest(
        "warning: something odd\n",
        r#"{"replaced_text":"ok"}"#,
    ));

    let outcome = replacer.replace_with_default_timeout(request()).await;

    assert_eq!(outcome.replaced_text(), Some("ok"));
}

#[tokio::test]
async fn test_output_cap() {
    init_tracing();
    let config = test_config().max_output_bytes(8).build();
    let replacer = replacer_with(&config, &stdout_guest(r#"{"replaced_text":"too long"}"#));

    let outcome = replacer.replace_with_default_timeout(request()).await;

    assert!(!outcome.is_replaced());
    assert!(matches!(
        outcome.error_kind(),
        Some(ErrorKind::OutputDecodingFault | ErrorKind::InstantiationFault)
    ));
    assert_eq!(replacer.live_instances(), 0);
}

#[tokio::test]
async fn test_closed_engine_is_configuration_fault() {
    init_tracing();
    let replacer = replacer(&stdout_guest(r#"{"replaced_text":"foo"}"#));
    replacer.engine().close().unwrap();

    let outcome = replacer.replace_with_default_timeout(request()).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::ConfigurationFault));
    assert_eq!(outcome.message(), Some("Engine configuration error"));
}

#[tokio::test]
async fn test_load_from_file() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&wasm(&stdout_guest(r#"{"replaced_text":"from disk"}"#)))
        .unwrap();

    let config = test_config().module_path(file.path()).build();
    let replacer = regexp_replace_wasm_runtime::WasmReplacer::from_config(&config).unwrap();

    let outcome = replacer.replace_with_default_timeout(request()).await;
    assert_eq!(outcome.replaced_text(), Some("from disk"));
}

#[test]
fn test_from_config_missing_module() {
    let config = test_config()
        .module_path("/nonexistent/rs-regexp-replace-wasi.wasm")
        .build();

    let err = regexp_replace_wasm_runtime::WasmReplacer::from_config(&config).unwrap_err();

    assert!(err.is_startup_fault());
}

#[test]
fn test_compile_faults() {
    let engine = SandboxEngine::new(&RuntimeConfig::default()).unwrap();

    let invalid = engine.compile(b"\0asm\x01\0\0\0garbage").unwrap_err();
    assert!(invalid.is_startup_fault());

    let unknown_import = engine
        .compile(&wasm(
            r#"(module
                (import "wasi_snapshot_preview1" "no_such_call" (func))
                (func (export "_start")))"#,
        ))
        .unwrap_err();
    assert!(unknown_import.is_startup_fault());
}

#[tokio::test]
async fn test_stats_track_outcomes() {
    init_tracing();
    let replacer = Arc::new(replacer(&stdout_guest(r#"{"replaced_text":"foo"}"#)));

    for _ in 0..3 {
        let outcome = replacer.replace_with_default_timeout(request()).await;
        assert!(outcome.is_replaced());
    }
    replacer.engine().close().unwrap();
    let outcome = replacer.replace_with_default_timeout(request()).await;
    assert!(!outcome.is_replaced());

    let stats = replacer.collect_stats();
    assert_eq!(stats.total_calls, 4);
    assert_eq!(stats.successful_calls, 3);
    assert_eq!(stats.failure_count(ErrorKind::ConfigurationFault), 1);
    assert_eq!(stats.total_failures(), 1);
    assert_eq!(stats.live_instances, 0);
}
