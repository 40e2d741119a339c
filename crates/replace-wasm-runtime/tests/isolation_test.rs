//! Deadlines, cancellation, resource limits, and isolation under concurrency.

mod common;

use common::*;
use regexp_replace_core::traits::Replacer;
use regexp_replace_core::{ErrorKind, MemoryPages, ReplaceRequest};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn request() -> ReplaceRequest {
    ReplaceRequest::new("(a+)+$", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa!", "X")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deadline_aborts_spinning_guest() {
    init_tracing();
    let replacer = replacer(SPIN);

    let started = Instant::now();
    let outcome = replacer
        .replace(request(), Duration::from_millis(10))
        .await;
    let elapsed = started.elapsed();

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Timeout));
    assert_eq!(outcome.message(), Some("Text replacement timed out"));
    assert!(
        elapsed < Duration::from_millis(500),
        "timeout observed after {elapsed:?}"
    );
    assert_eq!(replacer.live_instances(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_repeated_timeouts_leak_nothing() {
    init_tracing();
    let replacer = replacer(SPIN);

    for _ in 0..20 {
        let outcome = replacer.replace(request(), Duration::from_millis(5)).await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Timeout));
    }

    assert_eq!(replacer.live_instances(), 0);
    assert_eq!(replacer.collect_stats().failure_count(ErrorKind::Timeout), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_runaway_call_does_not_degrade_others() {
    init_tracing();
    let spinning = Arc::new(replacer(SPIN));
    let healthy = Arc::new(replacer(&stdout_guest(r#"{"replaced_text":"fine"}"#)));

    let runaway = {
        let spinning = Arc::clone(&spinning);
        tokio::spawn(async move {
            spinning
                .replace(request(), Duration::from_millis(300))
                .await
        })
    };

    let mut calls = Vec::new();
    for _ in 0..32 {
        let healthy = Arc::clone(&healthy);
        calls.push(tokio::spawn(async move {
            let started = Instant::now();
            let outcome = healthy
                .replace(ReplaceRequest::new("a", "a", "b"), Duration::from_secs(5))
                .await;
            (outcome, started.elapsed())
        }));
    }

    for call in calls {
        let (outcome, elapsed) = call.await.unwrap();
        assert_eq!(outcome.replaced_text(), Some("fine"));
        assert!(elapsed < Duration::from_secs(2), "healthy call took {elapsed:?}");
    }

    let outcome = runaway.await.unwrap();
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Timeout));
    assert_eq!(spinning.live_instances(), 0);
    assert_eq!(healthy.live_instances(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancellation_releases_instance() {
    init_tracing();
    let replacer = Arc::new(replacer(SPIN));

    let call = {
        let replacer = Arc::clone(&replacer);
        tokio::spawn(async move { replacer.replace(request(), Duration::from_secs(60)).await })
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while replacer.live_instances() == 0 {
        assert!(Instant::now() < deadline, "instance never started");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    call.abort();
    let joined = call.await;
    assert!(joined.unwrap_err().is_cancelled());
    assert_eq!(replacer.live_instances(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_instance_ids_are_unique() {
    init_tracing();
    let replacer = Arc::new(replacer(PROGRAM_NAME));

    let mut spawns = Vec::with_capacity(1000);
    for _ in 0..1000 {
        let replacer = Arc::clone(&replacer);
        spawns.push(tokio::spawn(async move {
            let handle = replacer
                .factory()
                .spawn(
                    replacer.engine(),
                    replacer.module(),
                    Vec::new(),
                    Duration::from_secs(30),
                )
                .await
                .expect("spawn should succeed");
            let id = handle.id().to_string();
            let program_name = String::from_utf8(handle.output()).unwrap();
            handle.close();
            (id, program_name)
        }));
    }

    let mut seen = HashSet::new();
    for spawn in spawns {
        let (id, program_name) = spawn.await.unwrap();
        assert_eq!(id, program_name, "guest must see its own identifier");
        assert!(seen.insert(id), "duplicate instance identifier");
    }

    assert_eq!(seen.len(), 1000);
    assert_eq!(replacer.live_instances(), 0);
}

#[tokio::test]
async fn test_instances_do_not_share_memory() {
    init_tracing();
    let replacer = replacer(ECHO);

    let first = replacer
        .factory()
        .spawn(
            replacer.engine(),
            replacer.module(),
            b"a much longer first input".to_vec(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    let second = replacer
        .factory()
        .spawn(
            replacer.engine(),
            replacer.module(),
            b"short".to_vec(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_ne!(first.id(), second.id());
    assert_eq!(replacer.live_instances(), 2);
    assert_eq!(first.output(), b"a much longer first input");
    assert_eq!(second.output(), b"short");

    first.close();
    assert_eq!(replacer.live_instances(), 1);
    drop(second);
    assert_eq!(replacer.live_instances(), 0);
}

#[tokio::test]
async fn test_initial_memory_above_limit() {
    init_tracing();
    let config = test_config()
        .memory_limit(MemoryPages::new(16).unwrap())
        .build();
    let payload = r#"{"replaced_text":"fits"}"#;

    let at_limit = replacer_with(&config, &stdout_guest_with_pages(payload, 16));
    let outcome = at_limit.replace_with_default_timeout(request()).await;
    assert_eq!(outcome.replaced_text(), Some("fits"));

    let over_limit = replacer_with(&config, &stdout_guest_with_pages(payload, 17));
    let outcome = over_limit.replace_with_default_timeout(request()).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::InstantiationFault));
    assert_eq!(over_limit.live_instances(), 0);
}

#[tokio::test]
async fn test_memory_growth_is_capped() {
    init_tracing();
    let config = test_config()
        .memory_limit(MemoryPages::new(16).unwrap())
        .build();

    let small = replacer_with(&config, &grow_guest(4));
    let outcome = small.replace_with_default_timeout(request()).await;
    assert_eq!(outcome.replaced_text(), Some("grown"));

    let large = replacer_with(&config, &grow_guest(64));
    let outcome = large.replace_with_default_timeout(request()).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::InstantiationFault));
}
