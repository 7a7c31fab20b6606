//! S3: Outcome-driven teardown policy.
//!
//! Destroy-by-default, preserve-on-failure opt-in, teardown errors that
//! never mask the test result, and provisioner rollback on a partial
//! prerequisite stack.

use std::sync::Arc;

use serial_test::serial;
use tokio_util::sync::CancellationToken;

use terraprobe_core::engine::PlanSummary;
use terraprobe_harness::{RunResult, TeardownDecision, run_scenario, summarize};

use crate::helpers::mock_engine::{MockEngine, MockRemote};
use crate::helpers::scenarios::{ScenarioBuilder, template_dir};
use crate::helpers::sessions::SessionBuilder;

fn drifting_plan() -> PlanSummary {
    PlanSummary {
        add: 0,
        change: 1,
        destroy: 0,
        destroyed_addresses: vec![],
    }
}

/// Drifted plan with preserve-on-failure -> both workdirs stay on disk for debugging.
#[tokio::test]
#[serial]
async fn test_e2e_failure_with_preserve_keeps_workdirs_on_disk() {
    let prereq_dir = template_dir();
    let test_dir = template_dir();
    let engine = Arc::new(MockEngine::drifting(drifting_plan()));
    let scenario = ScenarioBuilder::new("cts-preserve", test_dir.path())
        .prereq(prereq_dir.path())
        .build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_PRESERVE_KEY")
        .preserve_on_failure(true)
        .build()
        .await;

    let report = run_scenario::<_, MockRemote>(
        &session,
        &engine,
        None,
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Failed);
    assert_eq!(report.error_kind.as_deref(), Some("consistency"));
    assert_eq!(report.teardown.decision, TeardownDecision::Preserve);
    assert_eq!(report.teardown.preserved.len(), 2, "test and prerequisite workdirs");
    assert!(report.teardown.destroyed.is_empty());
    // No destroy was issued for either stack
    assert_eq!(
        engine.calls(),
        ["init", "apply", "outputs", "init", "apply", "plan"]
    );
    for path in &report.teardown.preserved {
        assert!(std::path::Path::new(path).is_dir(), "preserved path must exist: {path}");
        std::fs::remove_dir_all(path).expect("cleanup of preserved workdir");
    }
}

/// Drifted plan without the flag -> both stacks are destroyed, newest first.
#[tokio::test]
#[serial]
async fn test_e2e_failure_without_preserve_destroys_everything() {
    let prereq_dir = template_dir();
    let test_dir = template_dir();
    let engine = Arc::new(MockEngine::drifting(drifting_plan()));
    let scenario = ScenarioBuilder::new("cts-destroy", test_dir.path())
        .prereq(prereq_dir.path())
        .build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_DESTROY_KEY").build().await;

    let report = run_scenario::<_, MockRemote>(
        &session,
        &engine,
        None,
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Failed);
    assert_eq!(report.teardown.decision, TeardownDecision::Destroy);
    assert_eq!(report.teardown.destroyed, ["test", "prerequisite"]);
    assert!(report.teardown.preserved.is_empty());
    assert_eq!(engine.destroyed_dirs().len(), 2);
}

/// Passing run with preserve-on-failure set -> the flag does not apply, stack is destroyed.
#[tokio::test]
#[serial]
async fn test_e2e_pass_with_preserve_flag_still_destroys() {
    let test_dir = template_dir();
    let engine = Arc::new(MockEngine::passing());
    let scenario = ScenarioBuilder::new("cts-pass", test_dir.path()).build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_PASS_KEY")
        .preserve_on_failure(true)
        .build()
        .await;

    let report = run_scenario::<_, MockRemote>(
        &session,
        &engine,
        None,
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Passed);
    assert_eq!(report.teardown.decision, TeardownDecision::Destroy);
    assert_eq!(report.teardown.destroyed, ["test"]);
    assert!(report.teardown.preserved.is_empty());
}

/// Destroy fails after a pass -> the pass stands, the error lands in the teardown report.
#[tokio::test]
#[serial]
async fn test_e2e_destroy_failure_is_reported_not_masking_the_pass() {
    let test_dir = template_dir();
    let engine = Arc::new(MockEngine::failing("destroy", "state lock held by another run"));
    let scenario = ScenarioBuilder::new("cts-locked", test_dir.path()).build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_LOCKED_KEY").build().await;

    let report = run_scenario::<_, MockRemote>(
        &session,
        &engine,
        None,
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Passed);
    assert!(report.has_teardown_errors());
    assert!(report.teardown.errors[0].contains("state lock held"));
    assert!(report.teardown.destroyed.is_empty());

    let summary = summarize(std::slice::from_ref(&report));
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.teardown_errors, 1);
    assert!(!summary.any_failure());
}

/// Prerequisite outputs fail mid-provision -> the partial stack is rolled back, run aborts.
#[tokio::test]
#[serial]
async fn test_e2e_provision_failure_rolls_back_the_prereq() {
    let prereq_dir = template_dir();
    let test_dir = template_dir();
    let engine = Arc::new(MockEngine::failing("outputs", "output block is malformed"));
    let scenario = ScenarioBuilder::new("cts-rollback", test_dir.path())
        .prereq(prereq_dir.path())
        .build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_ROLLBACK_KEY").build().await;

    let report = run_scenario::<_, MockRemote>(
        &session,
        &engine,
        None,
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Failed);
    assert_eq!(report.error_kind.as_deref(), Some("provision"));
    assert!(report.error.as_ref().unwrap().contains("output block is malformed"));
    // The rollback destroy belongs to the provisioner, not the teardown report
    assert_eq!(engine.calls(), ["init", "apply", "outputs", "destroy"]);
    assert!(report.teardown.destroyed.is_empty());
    assert!(report.teardown.preserved.is_empty());
}
