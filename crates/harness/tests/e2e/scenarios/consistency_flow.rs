//! S1: Consistency protocol flow.
//!
//! Full pipeline runs through the public session path: provision a
//! prerequisite stack, bind variables, execute the consistency protocol,
//! and tear everything down. Also covers batch coordination and report
//! serialization.

use std::sync::Arc;

use serial_test::serial;
use tokio_util::sync::CancellationToken;

use terraprobe_harness::{Coordinator, RunResult, TeardownDecision, run_scenario, summarize};

use crate::helpers::mock_engine::{MockEngine, MockRemote};
use crate::helpers::scenarios::{ScenarioBuilder, template_dir};
use crate::helpers::sessions::SessionBuilder;

/// Passing scenario with a prerequisite -> both stacks run and both are destroyed.
#[tokio::test]
#[serial]
async fn test_e2e_single_scenario_full_pass() {
    let prereq_dir = template_dir();
    let test_dir = template_dir();
    let engine = Arc::new(
        MockEngine::passing().with_output("vpn_gateway_id", serde_json::json!("gw-123")),
    );
    let scenario = ScenarioBuilder::new("cts-vpn", test_dir.path())
        .prereq(prereq_dir.path())
        .build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_FULL_PASS_KEY").build().await;

    let report = run_scenario::<_, MockRemote>(
        &session,
        &engine,
        None,
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Passed);
    assert_eq!(report.scenario, "cts-vpn");
    assert_eq!(report.protocol, "consistency");
    assert_eq!(report.region, "us-south");
    assert!(report.prefix.starts_with("cts-vpn-"));
    assert!(report.error.is_none());
    assert!(report.error_kind.is_none());
    assert_eq!(
        report.output.as_ref().unwrap()["vpn_gateway_id"],
        "gw-123"
    );

    // Prerequisite first, then the test stack, then teardown in reverse order
    assert_eq!(
        engine.calls(),
        ["init", "apply", "outputs", "init", "apply", "plan", "outputs", "destroy", "destroy"]
    );
    assert_eq!(report.teardown.decision, TeardownDecision::Destroy);
    assert_eq!(report.teardown.destroyed, ["test", "prerequisite"]);
    assert!(report.teardown.errors.is_empty());
}

/// Same scenario run twice -> distinct prefixes and run ids, no shared state.
#[tokio::test]
#[serial]
async fn test_e2e_each_run_gets_a_unique_prefix() {
    let test_dir = template_dir();
    let engine = Arc::new(MockEngine::passing());
    let scenario = ScenarioBuilder::new("cts-prefix", test_dir.path()).build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_PREFIX_KEY").build().await;
    let cancel = CancellationToken::new();

    let first = run_scenario::<_, MockRemote>(&session, &engine, None, &scenario, &cancel).await;
    let second = run_scenario::<_, MockRemote>(&session, &engine, None, &scenario, &cancel).await;

    assert_eq!(first.result, RunResult::Passed);
    assert_eq!(second.result, RunResult::Passed);
    assert_ne!(first.prefix, second.prefix);
    assert_ne!(first.run_id, second.run_id);
    // tag + "-" + 6-char suffix
    assert_eq!(first.prefix.len(), "cts-prefix".len() + 7);
}

/// Mixed batch through the coordinator -> reports in input order, summary counts match.
#[tokio::test]
#[serial]
async fn test_e2e_batch_reports_in_input_order_with_summary() {
    let dir_a = template_dir();
    let dir_c = template_dir();
    let engine = Arc::new(MockEngine::passing());
    let scenarios = vec![
        ScenarioBuilder::new("batch-a", dir_a.path()).build(),
        // Staging fails for a template directory that does not exist
        ScenarioBuilder::new("batch-b", std::path::Path::new("/nonexistent/e2e-template"))
            .build(),
        ScenarioBuilder::new("batch-c", dir_c.path()).build(),
    ];
    let session = SessionBuilder::new("TERRAPROBE_E2E_BATCH_KEY")
        .max_concurrent(2)
        .build()
        .await;

    let coordinator = Coordinator::<_, MockRemote>::new(session, Arc::clone(&engine), None);
    let reports = coordinator
        .run_all(scenarios, &CancellationToken::new())
        .await;

    let names: Vec<&str> = reports.iter().map(|r| r.scenario.as_str()).collect();
    assert_eq!(names, ["batch-a", "batch-b", "batch-c"]);
    assert_eq!(reports[0].result, RunResult::Passed);
    assert_eq!(reports[1].result, RunResult::Failed);
    assert_eq!(reports[1].error_kind.as_deref(), Some("stage"));
    assert_eq!(reports[2].result, RunResult::Passed);

    let summary = summarize(&reports);
    assert_eq!(summary.passed, 2);
    assert_eq!(summary.failed, 1);
    assert!(summary.any_failure());
}

/// Finished report -> serializes to the documented JSON shape.
#[tokio::test]
#[serial]
async fn test_e2e_run_reports_are_json_serializable() {
    let test_dir = template_dir();
    let engine = Arc::new(MockEngine::passing().with_output("vpc_id", serde_json::json!("r006")));
    let scenario = ScenarioBuilder::new("cts-json", test_dir.path()).build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_JSON_KEY").build().await;

    let report = run_scenario::<_, MockRemote>(
        &session,
        &engine,
        None,
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    let json = serde_json::to_value(&report).expect("report must serialize");
    assert_eq!(json["result"], "passed");
    assert_eq!(json["scenario"], "cts-json");
    assert_eq!(json["protocol"], "consistency");
    assert_eq!(json["output"]["vpc_id"], "r006");
    assert_eq!(json["teardown"]["decision"], "destroy");
    assert!(json["duration_secs"].is_number());
    assert!(json["error"].is_null());
    // Consistency runs pin no base version, so the field is absent entirely
    assert!(json.get("base_version").is_none());
}
