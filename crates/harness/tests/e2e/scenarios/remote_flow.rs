//! S5: Remote-managed (schematics) protocol flow.
//!
//! Bundle collection, job submission, polling under paused time, the
//! wait ceiling, and secure-variable handling -- all through the full
//! pipeline rather than the executor alone.

use std::path::PathBuf;
use std::sync::Arc;

use serial_test::serial;
use tokio_util::sync::CancellationToken;

use terraprobe_core::vars::VarValue;
use terraprobe_harness::{Protocol, RunResult, run_scenario};

use crate::helpers::mock_engine::{MockEngine, MockRemote};
use crate::helpers::scenarios::{ScenarioBuilder, bundled_template_dir, template_dir};
use crate::helpers::sessions::SessionBuilder;

/// Job succeeds after two running polls -> remote output becomes the report output.
#[tokio::test(start_paused = true)]
#[serial]
async fn test_e2e_remote_job_success_returns_output() {
    let template = bundled_template_dir();
    let engine = Arc::new(MockEngine::passing());
    let remote = MockRemote::succeeding_after(2, serde_json::json!({"workspace_id": "ws-1"}));
    let scenario = ScenarioBuilder::new("sch-vpn", template.path())
        .protocol(Protocol::Schematics)
        .default_var("ibmcloud_api_key", "s3cret-value")
        .secure(&["ibmcloud_api_key"])
        .build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_REMOTE_OK_KEY").build().await;

    let report = run_scenario(
        &session,
        &engine,
        Some(&remote),
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Passed);
    assert_eq!(report.protocol, "schematics");
    assert_eq!(
        report.output,
        Some(serde_json::json!({"workspace_id": "ws-1"}))
    );
    assert_eq!(remote.poll_count(), 3);
    // The local engine is never involved in a remote run
    assert!(engine.calls().is_empty());
    assert!(report.teardown.destroyed.is_empty());

    let submissions = remote.submissions();
    assert_eq!(submissions.len(), 1);
    let request = &submissions[0];
    assert_eq!(request.name, format!("{}-job", report.prefix));
    assert_eq!(request.region, "us-south");
    assert_eq!(request.base_dir, template.path());

    // Module sources are bundled, local artifacts are not
    assert!(request.files.contains(&PathBuf::from("main.tf")));
    assert!(request.files.contains(&PathBuf::from("variables.tf")));
    assert!(request.files.contains(&PathBuf::from("modules/vpc/main.tf")));
    assert!(request.files.iter().all(|f| !f.starts_with(".terraform")));
    assert!(
        request
            .files
            .iter()
            .all(|f| f.extension().is_none_or(|ext| ext != "tfstate"))
    );

    // Secure values ride in the payload but never in its debug form
    let key = request
        .vars
        .iter()
        .find(|v| v.name == "ibmcloud_api_key")
        .expect("secure var must be submitted");
    assert!(key.secure);
    assert_eq!(key.value, VarValue::from("s3cret-value"));
    assert!(!format!("{request:?}").contains("s3cret-value"));
}

/// Job ends in failure -> the scenario fails with the remote reason.
#[tokio::test(start_paused = true)]
#[serial]
async fn test_e2e_remote_job_failure_marks_the_scenario_failed() {
    let template = template_dir();
    let engine = Arc::new(MockEngine::passing());
    let remote = MockRemote::failing_after(1, "plan failed in workspace");
    let scenario = ScenarioBuilder::new("sch-fail", template.path())
        .protocol(Protocol::Schematics)
        .build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_REMOTE_FAIL_KEY").build().await;

    let report = run_scenario(
        &session,
        &engine,
        Some(&remote),
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Failed);
    assert_eq!(report.error_kind.as_deref(), Some("remote"));
    assert!(report.error.as_ref().unwrap().contains("plan failed in workspace"));
    assert_eq!(remote.poll_count(), 2);
}

/// Job never finishes -> the wait ceiling fires and the prerequisite is still destroyed.
#[tokio::test(start_paused = true)]
#[serial]
async fn test_e2e_remote_timeout_still_reports_and_tears_down() {
    let prereq_dir = template_dir();
    let template = template_dir();
    let engine = Arc::new(MockEngine::passing());
    let remote = MockRemote::never_finishing();
    let scenario = ScenarioBuilder::new("sch-timeout", template.path())
        .protocol(Protocol::Schematics)
        .prereq(prereq_dir.path())
        .build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_REMOTE_SLOW_KEY")
        .poll_interval_secs(30)
        .timeout_mins(1)
        .build()
        .await;

    let report = run_scenario(
        &session,
        &engine,
        Some(&remote),
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Failed);
    assert_eq!(report.error_kind.as_deref(), Some("timeout"));
    assert!(report.error.as_ref().unwrap().contains("60s"));
    // 30s interval against a 60s ceiling: polls at t=0 and t=30 only
    assert_eq!(remote.poll_count(), 2);
    // The prerequisite stack existed, so the timeout still tears it down
    assert_eq!(report.teardown.destroyed, ["prerequisite"]);
    assert_eq!(engine.calls(), ["init", "apply", "outputs", "destroy"]);
}

/// Schematics scenario without a configured runner -> fails up front.
#[tokio::test]
#[serial]
async fn test_e2e_remote_not_configured_is_a_failure() {
    let template = template_dir();
    let engine = Arc::new(MockEngine::passing());
    let scenario = ScenarioBuilder::new("sch-nohelper", template.path())
        .protocol(Protocol::Schematics)
        .build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_REMOTE_NONE_KEY").build().await;

    let report = run_scenario::<_, MockRemote>(
        &session,
        &engine,
        None,
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Failed);
    assert_eq!(report.error_kind.as_deref(), Some("remote"));
    assert!(report.error.as_ref().unwrap().contains("not configured"));
    assert!(engine.calls().is_empty());
}

/// Prerequisite output mapped into the scenario -> present in the submitted payload.
#[tokio::test(start_paused = true)]
#[serial]
async fn test_e2e_prereq_outputs_flow_into_the_submission() {
    let prereq_dir = template_dir();
    let template = template_dir();
    let engine = Arc::new(
        MockEngine::passing().with_output("subnet_id", serde_json::json!("sub-42")),
    );
    let remote = MockRemote::succeeding_after(0, serde_json::Value::Null);
    let scenario = ScenarioBuilder::new("sch-wired", template.path())
        .protocol(Protocol::Schematics)
        .prereq(prereq_dir.path())
        .output_var("existing_subnet_id", "subnet_id")
        .required(&["existing_subnet_id"])
        .build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_REMOTE_WIRED_KEY").build().await;

    let report = run_scenario(
        &session,
        &engine,
        Some(&remote),
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Passed);
    let submissions = remote.submissions();
    let wired = submissions[0]
        .vars
        .iter()
        .find(|v| v.name == "existing_subnet_id")
        .expect("mapped output must reach the payload");
    assert_eq!(wired.value, VarValue::from("sub-42"));
    assert_eq!(wired.data_type, "string");
    assert!(!wired.secure);
}

/// Remote API rejects the submission -> remote failure before any poll.
#[tokio::test]
#[serial]
async fn test_e2e_submission_rejected_by_the_api() {
    let template = template_dir();
    let engine = Arc::new(MockEngine::passing());
    let remote = MockRemote::rejecting("403 forbidden for region");
    let scenario = ScenarioBuilder::new("sch-denied", template.path())
        .protocol(Protocol::Schematics)
        .build();
    let session = SessionBuilder::new("TERRAPROBE_E2E_REMOTE_DENIED_KEY").build().await;

    let report = run_scenario(
        &session,
        &engine,
        Some(&remote),
        &scenario,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.result, RunResult::Failed);
    assert_eq!(report.error_kind.as_deref(), Some("remote"));
    assert!(report.error.as_ref().unwrap().contains("403 forbidden"));
    assert_eq!(remote.poll_count(), 0);
    assert!(remote.submissions().is_empty());
}
