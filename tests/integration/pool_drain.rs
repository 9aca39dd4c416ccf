//! Worker pool registry and drain behavior across a full run.

use std::sync::Arc;

use scriptflow::backend::ScriptBackend;
use scriptflow::{Driver, TaskResult};

use crate::fixtures::{RecordingBackend, ScriptTree};

#[test]
fn test_trailing_branch_finishes_before_run_returns() {
    // A branch with no leaf after it is not awaited by its queue; the
    // driver's drain must still see it through before reporting.
    let tree = ScriptTree::new();
    tree.script("00_first.sql", "first;")
        .script("10_trail/00_slow.sql", "sleep:300 trail;");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    let report = driver.run().unwrap();

    assert_eq!(report.result, TaskResult::Success);
    assert!(backend.position_of("trail").is_some());
    let trail = report
        .tree
        .items
        .iter()
        .find(|n| n.label == "10_trail")
        .unwrap();
    assert_eq!(trail.result, TaskResult::Success);
}

#[test]
fn test_pool_settles_after_run() {
    let tree = ScriptTree::new();
    tree.script("10_a/00_x.sql", "sleep:50 a;")
        .script("20_b/00_y.sql", "sleep:50 b;")
        .script("30_end.sql", "end;");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    driver.run().unwrap();

    // Root queue worker plus one worker per branch, all accounted for.
    assert_eq!(driver.pool().registered(), 3);
    assert_eq!(driver.pool().outstanding(), 0);
}

#[test]
fn test_drain_is_idempotent_and_monitor_safe() {
    let tree = ScriptTree::new();
    tree.script("00_a.sql", "a;");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    driver.run().unwrap();

    driver.pool().monitor();
    driver.pool().drain();
    assert_eq!(driver.pool().outstanding(), 0);
}

#[test]
fn test_failed_trailing_branch_reported_but_advisory() {
    let tree = ScriptTree::new();
    tree.script("00_first.sql", "first;")
        .script("10_trail/00_bad.sql", "sleep:100 x; fail: boom;");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    let report = driver.run().unwrap();

    assert_eq!(report.result, TaskResult::Success);
    let trail = report
        .tree
        .items
        .iter()
        .find(|n| n.label == "10_trail")
        .unwrap();
    assert_eq!(trail.result, TaskResult::Failure);
}
