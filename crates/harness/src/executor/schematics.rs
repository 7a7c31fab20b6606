//! 원격 관리형 러너 프로토콜
//!
//! 템플릿을 소스 번들로 묶어 원격 러너에 제출하고, 종료 상태가 나올 때까지
//! 폴링합니다. 폴링 간격과 전체 시간 한도는 전부 이쪽(하네스)의 책임이며,
//! 러너 구현은 submit/poll만 압니다. 그래서 테스트가 임의의 타이밍을
//! 스크립트할 수 있습니다.
//!
//! secure로 표시된 변수 값은 제출 페이로드에만 실리고 로그와 리포트에는
//! 절대 나타나지 않습니다.

use std::time::Duration;

use terraprobe_core::engine::{JobHandle, JobStatus, RemoteRunner, SubmitRequest};
use terraprobe_core::error::{EngineError, ExecuteError};
use terraprobe_core::identity::RunIdentity;
use terraprobe_core::metrics as m;
use terraprobe_core::vars::VariableSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ExecutionOutput, TestOutcome, with_cancel};
use crate::bundle::SourceBundle;
use crate::scenario::Scenario;
use crate::session::SessionContext;

pub(super) async fn run<R: RemoteRunner>(
    remote: Option<&R>,
    session: &SessionContext,
    scenario: &Scenario,
    identity: &RunIdentity,
    vars: &VariableSet,
    cancel: &CancellationToken,
) -> ExecutionOutput {
    let outcome = drive(remote, session, scenario, identity, vars, cancel).await;
    // 원격 실행은 로컬 리소스를 만들지 않음
    ExecutionOutput {
        outcome,
        workdir: None,
    }
}

async fn drive<R: RemoteRunner>(
    remote: Option<&R>,
    session: &SessionContext,
    scenario: &Scenario,
    identity: &RunIdentity,
    vars: &VariableSet,
    cancel: &CancellationToken,
) -> TestOutcome {
    let Some(remote) = remote else {
        return TestOutcome::failed(ExecuteError::Remote {
            reason: "remote runner not configured (set [schematics] helper)".to_owned(),
        });
    };

    let bundle = match SourceBundle::collect(
        &scenario.template_dir,
        &scenario.include,
        &scenario.exclude,
    ) {
        Ok(bundle) => bundle,
        Err(e) => {
            return TestOutcome::failed(ExecuteError::Stage {
                reason: e.to_string(),
            });
        }
    };
    if bundle.is_empty() {
        return TestOutcome::failed(ExecuteError::Stage {
            reason: format!(
                "source bundle is empty for '{}'",
                scenario.template_dir.display()
            ),
        });
    }

    let (base_dir, files) = bundle.into_parts();
    let request = SubmitRequest {
        name: identity.resource_name("job"),
        region: identity.region.clone(),
        base_dir,
        files,
        vars: vars.flatten(&scenario.secure_vars),
    };
    debug!(
        job = %request.name,
        files = request.files.len(),
        "submitting remote job"
    );

    let handle = match with_cancel(cancel, remote.submit(&request)).await {
        Ok(handle) => handle,
        Err(e) => return TestOutcome::failed(flatten_remote(e)),
    };
    info!(job_id = %handle.id, job = %request.name, "remote job submitted");

    poll_until_done(remote, session, &handle, cancel).await
}

/// 종료 상태가 나올 때까지 폴링합니다.
///
/// 한도 검사는 매 폴링 전에 수행되므로 한도를 넘긴 뒤 추가 폴링은 없습니다.
async fn poll_until_done<R: RemoteRunner>(
    remote: &R,
    session: &SessionContext,
    handle: &JobHandle,
    cancel: &CancellationToken,
) -> TestOutcome {
    let interval = Duration::from_secs(session.config().schematics.poll_interval_secs);
    let limit = Duration::from_secs(session.config().schematics.timeout_mins * 60);
    let started = Instant::now();

    loop {
        if started.elapsed() >= limit {
            return TestOutcome::failed(ExecuteError::Timeout {
                waited_secs: started.elapsed().as_secs(),
                limit_secs: limit.as_secs(),
            });
        }

        metrics::counter!(m::SCHEMATICS_POLLS_TOTAL).increment(1);
        match with_cancel(cancel, remote.poll(handle)).await {
            Ok(JobStatus::Running) => {
                debug!(
                    job_id = %handle.id,
                    waited_secs = started.elapsed().as_secs(),
                    "remote job still running"
                );
            }
            Ok(JobStatus::Succeeded(output)) => return TestOutcome::passed(Some(output)),
            Ok(JobStatus::Failed(reason)) => {
                return TestOutcome::failed(ExecuteError::Remote { reason });
            }
            Err(e) => return TestOutcome::failed(flatten_remote(e)),
        }

        tokio::select! {
            () = cancel.cancelled() => return TestOutcome::failed(ExecuteError::Cancelled),
            () = tokio::time::sleep(interval) => {}
        }
    }
}

/// 원격 API 실패를 리포트용 remote 종류로 끌어올립니다.
fn flatten_remote(error: ExecuteError) -> ExecuteError {
    match error {
        ExecuteError::Engine(EngineError::RemoteApi { reason }) => {
            ExecuteError::Remote { reason }
        }
        other => other,
    }
}
