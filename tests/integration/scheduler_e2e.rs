//! End-to-end tree execution through the driver.

use std::sync::Arc;

use scriptflow::backend::ScriptBackend;
use scriptflow::core::NodeReport;
use scriptflow::{Driver, TaskResult};

use crate::fixtures::{RecordingBackend, ScriptTree};

fn node<'a>(items: &'a [NodeReport], label: &str) -> &'a NodeReport {
    items
        .iter()
        .find(|n| n.label == label)
        .unwrap_or_else(|| panic!("no node '{}' in report", label))
}

#[test]
fn test_flat_tree_runs_in_name_order() {
    let tree = ScriptTree::new();
    tree.script("20_c.sql", "third;")
        .script("00_a.sql", "first;")
        .script("10_b.sql", "second;");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    let report = driver.run().unwrap();

    assert_eq!(report.result, TaskResult::Success);
    assert_eq!(backend.recorded(), vec!["first", "second", "third"]);
}

#[test]
fn test_full_scenario_init_branches_publish() {
    let tree = ScriptTree::new();
    tree.script("00_init.sql", "init;")
        .script("10_dims/00_load.sql", "sleep:100 dims-load;")
        .script("10_dims/10_check.sql", "dims-check;")
        .script("20_facts/00_load.sql", "sleep:100 facts-load;")
        .script("30_publish.sql", "publish;");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    let report = driver.run().unwrap();

    assert_eq!(report.result, TaskResult::Success);

    let recorded = backend.recorded();
    // Init first, publish last, both branches fully in between.
    assert_eq!(recorded.first().map(String::as_str), Some("init"));
    assert_eq!(recorded.last().map(String::as_str), Some("publish"));
    assert!(backend.position_of("dims-load") < backend.position_of("dims-check"));

    let dims = node(&report.tree.items, "10_dims");
    assert_eq!(dims.kind, "branch");
    assert_eq!(dims.result, TaskResult::Success);
    assert_eq!(node(&dims.children, "10_check.sql").result, TaskResult::Success);
    assert_eq!(node(&report.tree.items, "20_facts").result, TaskResult::Success);
}

#[test]
fn test_failing_init_prevents_branches() {
    let tree = ScriptTree::new();
    tree.script("00_init.sql", "fail: init;")
        .script("10_dims/00_load.sql", "dims-load;")
        .script("30_publish.sql", "publish;");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    let report = driver.run().unwrap();

    assert_eq!(report.result, TaskResult::Failure);
    assert_eq!(backend.recorded(), vec!["fail: init"]);
    assert_eq!(
        node(&report.tree.items, "00_init.sql").result,
        TaskResult::Failure
    );
    assert_eq!(
        node(&report.tree.items, "10_dims").result,
        TaskResult::NotStarted
    );
    assert_eq!(
        node(&report.tree.items, "30_publish.sql").result,
        TaskResult::NotStarted
    );
}

#[test]
fn test_branch_failure_is_advisory_for_parent() {
    let tree = ScriptTree::new();
    tree.script("10_dims/00_load.sql", "fail: dims-load;")
        .script("10_dims/10_check.sql", "dims-check;")
        .script("30_publish.sql", "publish;");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    let report = driver.run().unwrap();

    // The branch fails internally but the enclosing queue carries on.
    assert_eq!(report.result, TaskResult::Success);
    let dims = node(&report.tree.items, "10_dims");
    assert_eq!(dims.result, TaskResult::Failure);
    assert_eq!(
        node(&dims.children, "00_load.sql").result,
        TaskResult::Failure
    );
    assert_eq!(
        node(&dims.children, "10_check.sql").result,
        TaskResult::NotStarted
    );
    assert_eq!(backend.recorded().last().map(String::as_str), Some("publish"));
}

#[test]
fn test_mixed_branch_outcomes() {
    let tree = ScriptTree::new();
    tree.script("00_init.sql", "init-a;")
        .script("10_init.sql", "init-b;")
        .script("20_rule/00_a.sql", "rule20-a;")
        .script("20_rule/20_b.sql", "fail: rule20-b;")
        .script("30_rule/00_a.sql", "rule30-a;")
        .script("30_rule/10_b.sql", "rule30-b;")
        .script("30_rule/20_c.sql", "rule30-c;")
        .script("80_fin.sql", "fin-a;")
        .script("90_fin.sql", "fin-b;");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    let report = driver.run().unwrap();

    // One branch fails, the other succeeds; the trailing leaves still run
    // after the barrier and the run as a whole succeeds.
    assert_eq!(report.result, TaskResult::Success);

    let rule20 = node(&report.tree.items, "20_rule");
    assert_eq!(rule20.result, TaskResult::Failure);
    assert_eq!(node(&rule20.children, "00_a.sql").result, TaskResult::Success);
    assert_eq!(node(&rule20.children, "20_b.sql").result, TaskResult::Failure);

    let rule30 = node(&report.tree.items, "30_rule");
    assert_eq!(rule30.result, TaskResult::Success);

    let recorded = backend.recorded();
    assert_eq!(&recorded[..2], &["init-a".to_string(), "init-b".to_string()]);
    assert_eq!(
        &recorded[recorded.len() - 2..],
        &["fin-a".to_string(), "fin-b".to_string()]
    );
    assert!(backend.position_of("rule30-c") < backend.position_of("fin-a"));
}

#[test]
fn test_nested_branches() {
    let tree = ScriptTree::new();
    tree.script("10_outer/00_first.sql", "outer-first;")
        .script("10_outer/10_inner/00_deep.sql", "deep;")
        .script("10_outer/20_last.sql", "outer-last;")
        .script("20_end.sql", "end;");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    let report = driver.run().unwrap();

    assert_eq!(report.result, TaskResult::Success);
    // The inner branch finishes before the leaf that follows it.
    assert!(backend.position_of("deep") < backend.position_of("outer-last"));
    assert!(backend.position_of("outer-first") < backend.position_of("deep"));

    let outer = node(&report.tree.items, "10_outer");
    let inner = node(&outer.children, "10_inner");
    assert_eq!(inner.kind, "branch");
    assert_eq!(inner.result, TaskResult::Success);
}

#[test]
fn test_sibling_branches_overlap() {
    let tree = ScriptTree::new();
    tree.script("10_dims/00_load.sql", "sleep:300 dims;")
        .script("20_facts/00_load.sql", "sleep:300 facts;")
        .script("30_publish.sql", "publish;");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);

    let start = std::time::Instant::now();
    let report = driver.run().unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.result, TaskResult::Success);
    // Driver polling adds some slack; two serialized 300ms branches plus
    // polling would still take well over 550ms.
    assert!(
        elapsed < std::time::Duration::from_millis(550),
        "branches did not overlap: {:?}",
        elapsed
    );
}

#[test]
fn test_dry_run_reports_success_without_executing() {
    let tree = ScriptTree::new();
    tree.script("00_a.sql", "fail: would-fail;")
        .script("10_dims/00_load.sql", "dims;");

    let mut config = tree.config();
    config.dry_run = true;

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(config, Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    let report = driver.run().unwrap();

    assert_eq!(report.result, TaskResult::Success);
    assert!(backend.recorded().is_empty());
    assert_eq!(
        node(&report.tree.items, "00_a.sql").result,
        TaskResult::Success
    );
    assert_eq!(
        node(&report.tree.items, "10_dims").result,
        TaskResult::Success
    );
}

#[test]
fn test_params_flow_into_statements() {
    let tree = ScriptTree::new();
    tree.script("00_a.sql", "load into ${target} for ${run_date};");

    let mut config = tree.config();
    config
        .params
        .insert("target".to_string(), "warehouse".to_string());
    config
        .params
        .insert("run_date".to_string(), "2024-06-01".to_string());

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(config, Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    driver.run().unwrap();

    assert_eq!(
        backend.recorded(),
        vec!["load into warehouse for 2024-06-01"]
    );
}

#[test]
fn test_non_matching_files_and_empty_dirs_ignored() {
    let tree = ScriptTree::new();
    tree.script("00_a.sql", "a;")
        .script("readme.txt", "not a script")
        .dir("10_empty");

    let backend = RecordingBackend::new();
    let driver = Driver::with_backend(tree.config(), Arc::clone(&backend) as Arc<dyn ScriptBackend>);
    let report = driver.run().unwrap();

    assert_eq!(report.result, TaskResult::Success);
    assert_eq!(backend.recorded(), vec!["a"]);
    // The empty directory is present but leaf-shaped and never launched.
    assert_eq!(report.tree.items.len(), 2);
    assert_eq!(
        node(&report.tree.items, "10_empty").result,
        TaskResult::NotStarted
    );
}
