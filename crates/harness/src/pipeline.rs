//! 시나리오 파이프라인 1건의 전체 흐름
//!
//! provision → bind → execute → teardown을 순서대로 밟고, 어떤 경로로
//! 끝나든 [`ScenarioReport`] 하나로 수렴합니다. 단계별 실패 처리 규칙:
//!
//! - 설정/바인딩 실패: 엔진 호출 전이면 그대로 중단, 선행 스택이 이미
//!   있으면 정리까지 수행
//! - 프로비저닝 실패: 프로비저너가 부분 스택을 롤백한 뒤 중단
//! - 실행 실패·취소: outcome으로 내려와 정리 결정까지 흘러감
//! - 정리 실패: 리포트에 누적될 뿐 테스트 성패를 바꾸지 않음
//!
//! 취소 신호는 실행 단계의 엔진 호출을 끊지만, 그 시점까지 만들어진
//! 리소스의 정리는 여전히 시도합니다.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use terraprobe_core::engine::{Engine, RemoteRunner};
use terraprobe_core::error::ExecuteError;
use terraprobe_core::identity::RunIdentity;
use terraprobe_core::metrics as m;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::binder;
use crate::executor::{self, ExecutionOutput, TestOutcome};
use crate::provision::Provisioner;
use crate::report::{RunResult, ScenarioReport};
use crate::scenario::{Protocol, Scenario};
use crate::session::SessionContext;
use crate::teardown::{self, TeardownDecision, TeardownReport};

/// 시나리오 하나를 끝까지 실행하고 리포트를 돌려줍니다.
///
/// 에러를 반환하지 않습니다. 모든 실패는 리포트의 `result`/`error` 필드로
/// 기록되며, 호출자(코디네이터)는 리포트만 수집하면 됩니다.
pub async fn run_scenario<E: Engine, R: RemoteRunner>(
    session: &SessionContext,
    engine: &Arc<E>,
    remote: Option<&R>,
    scenario: &Scenario,
    cancel: &CancellationToken,
) -> ScenarioReport {
    let started_at = Utc::now();
    let start = Instant::now();
    let identity = RunIdentity::generate(&scenario.name, &scenario.region);

    metrics::counter!(
        m::RUNS_STARTED_TOTAL,
        m::LABEL_PROTOCOL => scenario.protocol.as_str()
    )
    .increment(1);
    metrics::gauge!(m::RUNS_ACTIVE).increment(1.0);
    info!(
        scenario = %scenario.name,
        prefix = %identity.prefix,
        region = %identity.region,
        protocol = %scenario.protocol,
        "scenario started"
    );

    let outcome = drive(session, engine, remote, scenario, &identity, cancel).await;

    metrics::gauge!(m::RUNS_ACTIVE).decrement(1.0);
    metrics::counter!(
        m::RUNS_COMPLETED_TOTAL,
        m::LABEL_RESULT => outcome.result.as_str()
    )
    .increment(1);

    let duration_secs = start.elapsed().as_secs_f64();
    match outcome.result {
        RunResult::Passed | RunResult::Skipped => {
            info!(
                scenario = %scenario.name,
                prefix = %identity.prefix,
                result = %outcome.result,
                duration_secs = start.elapsed().as_secs(),
                "scenario finished"
            );
        }
        RunResult::Failed | RunResult::Cancelled => {
            warn!(
                scenario = %scenario.name,
                prefix = %identity.prefix,
                result = %outcome.result,
                kind = outcome.error_kind.as_deref().unwrap_or("unknown"),
                duration_secs = start.elapsed().as_secs(),
                "scenario finished"
            );
        }
    }

    ScenarioReport {
        run_id: Uuid::new_v4(),
        scenario: scenario.name.clone(),
        prefix: identity.prefix,
        region: identity.region,
        protocol: scenario.protocol.as_str().to_owned(),
        base_version: scenario.upgrade.as_ref().and_then(|u| u.base_version.clone()),
        result: outcome.result,
        error: outcome.error,
        error_kind: outcome.error_kind,
        output: outcome.output,
        teardown: outcome.teardown,
        started_at,
        duration_secs,
    }
}

/// 단계 진행의 중간 결과 — 리포트 조립 직전 형태
struct PipelineOutcome {
    result: RunResult,
    error: Option<String>,
    error_kind: Option<String>,
    output: Option<serde_json::Value>,
    teardown: TeardownReport,
}

async fn drive<E: Engine, R: RemoteRunner>(
    session: &SessionContext,
    engine: &Arc<E>,
    remote: Option<&R>,
    scenario: &Scenario,
    identity: &RunIdentity,
    cancel: &CancellationToken,
) -> PipelineOutcome {
    // 전역 생략 플래그는 프로비저닝보다 먼저 판정한다. 생략된 시나리오는
    // 엔진을 한 번도 부르지 않는다.
    if scenario.protocol == Protocol::Upgrade && session.skip_upgrade_test() {
        info!(scenario = %scenario.name, "upgrade test skipped by global flag");
        return PipelineOutcome {
            result: RunResult::Skipped,
            error: None,
            error_kind: None,
            output: None,
            teardown: TeardownReport::empty(TeardownDecision::Destroy),
        };
    }

    // 시작 전에 취소가 도착했으면 만들 리소스도 정리할 리소스도 없다
    if cancel.is_cancelled() {
        return PipelineOutcome {
            result: RunResult::Cancelled,
            error: Some(ExecuteError::Cancelled.to_string()),
            error_kind: Some(ExecuteError::Cancelled.kind().to_owned()),
            output: None,
            teardown: TeardownReport::empty(TeardownDecision::Destroy),
        };
    }

    // 선행 스택 — 실패 시 프로비저너가 부분 스택을 롤백하므로 여기서는
    // 추가 정리 없이 중단한다
    let mut prereq_workdir = None;
    let mut prereq_outputs = None;
    if let Some(prereq) = &scenario.prerequisite {
        let provisioner = Provisioner::new(Arc::clone(engine));
        let mut vars = prereq.vars.clone();
        vars.insert("prefix", identity.prefix.as_str());
        vars.insert("region", identity.region.as_str());

        match provisioner
            .provision(&prereq.template_dir, identity, &vars)
            .await
        {
            Ok(handle) => {
                prereq_outputs = Some(handle.outputs().clone());
                prereq_workdir = Some(handle.into_workdir());
            }
            Err(e) => {
                return PipelineOutcome {
                    result: RunResult::Failed,
                    error: Some(e.to_string()),
                    error_kind: Some("provision".to_owned()),
                    output: None,
                    teardown: TeardownReport::empty(TeardownDecision::decide(
                        false,
                        session.preserve_on_failure(),
                    )),
                };
            }
        }
    }

    // 변수 바인딩 — 선행 스택이 이미 올라가 있을 수 있으므로 실패해도
    // 정리 정책은 그대로 적용한다
    let vars = match binder::bind(scenario, identity, session.registry(), prereq_outputs.as_ref())
    {
        Ok(vars) => vars,
        Err(e) => {
            let decision = TeardownDecision::decide(false, session.preserve_on_failure());
            let teardown =
                teardown::run(engine.as_ref(), decision, None, prereq_workdir, &identity.prefix)
                    .await;
            return PipelineOutcome {
                result: RunResult::Failed,
                error: Some(e.to_string()),
                error_kind: Some("config".to_owned()),
                output: None,
                teardown,
            };
        }
    };

    // 프로토콜 실행 — 실패·취소도 outcome으로 내려와 정리까지 간다
    let ExecutionOutput { outcome, workdir } =
        executor::execute(session, engine.as_ref(), remote, scenario, identity, &vars, cancel)
            .await;

    let decision = TeardownDecision::decide(outcome.succeeded, session.preserve_on_failure());
    let teardown =
        teardown::run(engine.as_ref(), decision, workdir, prereq_workdir, &identity.prefix).await;

    PipelineOutcome {
        result: classify(&outcome),
        error: outcome.error.as_ref().map(ToString::to_string),
        error_kind: outcome.error.as_ref().map(|e| e.kind().to_owned()),
        output: outcome.output,
        teardown,
    }
}

/// 실행 outcome을 최종 결과로 분류합니다.
fn classify(outcome: &TestOutcome) -> RunResult {
    if outcome.skipped {
        RunResult::Skipped
    } else if outcome.succeeded {
        RunResult::Passed
    } else if matches!(outcome.error, Some(ExecuteError::Cancelled)) {
        RunResult::Cancelled
    } else {
        RunResult::Failed
    }
}
