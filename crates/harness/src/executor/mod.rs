//! 테스트 프로토콜 실행기
//!
//! 바인딩이 끝난 변수 집합으로 대상 템플릿을 검증합니다. 프로토콜은 세 가지이며
//! 전부 앞으로만 진행하는 상태 기계로, 결과는 [`TestOutcome`] 하나로 수렴합니다:
//!
//! - [`consistency`]: apply 직후 plan이 비어 있는지 (멱등성)
//! - [`upgrade`]: 기준 버전 → 현재 버전 plan이 리소스를 파괴하지 않는지
//! - [`schematics`]: 원격 관리형 러너 제출 후 폴링
//!
//! 실행 실패는 에러 전파로 시나리오를 중단시키지 않습니다. 실패를 담은
//! outcome이 정리 단계까지 흘러가야 정리 정책이 동작할 수 있습니다.

pub mod consistency;
pub mod schematics;
pub mod upgrade;

use std::future::Future;
use std::time::Instant;

use terraprobe_core::engine::{Engine, RemoteRunner};
use terraprobe_core::error::{EngineError, ExecuteError};
use terraprobe_core::identity::RunIdentity;
use terraprobe_core::metrics as m;
use terraprobe_core::vars::VariableSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::scenario::{Protocol, Scenario};
use crate::session::SessionContext;
use crate::workdir::StagedWorkdir;

/// 프로토콜 실행의 최종 결과
///
/// `succeeded`/`error`/`skipped`의 정합성은 생성자가 보장합니다.
#[derive(Debug)]
pub struct TestOutcome {
    /// 프로토콜이 통과했는지
    pub succeeded: bool,
    /// 통과 시 스택/작업의 출력 문서
    pub output: Option<serde_json::Value>,
    /// 실패 시 원인
    pub error: Option<ExecuteError>,
    /// 실행 자체가 생략되었는지
    pub skipped: bool,
}

impl TestOutcome {
    /// 통과 — 출력 문서를 동반할 수 있습니다.
    pub fn passed(output: Option<serde_json::Value>) -> Self {
        Self {
            succeeded: true,
            output,
            error: None,
            skipped: false,
        }
    }

    /// 실패 — 원인을 담습니다.
    pub fn failed(error: ExecuteError) -> Self {
        Self {
            succeeded: false,
            output: None,
            error: Some(error),
            skipped: false,
        }
    }

    /// 생략 — 실패가 아니며 어떤 단언도 발화하지 않습니다.
    pub fn skipped() -> Self {
        Self {
            succeeded: true,
            output: None,
            error: None,
            skipped: true,
        }
    }
}

/// 실행 결과와 함께 정리 단계로 넘어갈 작업 디렉터리
///
/// 원격 프로토콜은 로컬 리소스를 만들지 않으므로 `workdir`가 없습니다.
/// 스테이징 자체가 실패한 경우에도 없습니다.
#[derive(Debug)]
pub struct ExecutionOutput {
    /// 프로토콜 결과
    pub outcome: TestOutcome,
    /// 테스트가 리소스를 만든 작업 디렉터리
    pub workdir: Option<StagedWorkdir>,
}

/// 시나리오의 프로토콜을 실행합니다.
pub async fn execute<E: Engine, R: RemoteRunner>(
    session: &SessionContext,
    engine: &E,
    remote: Option<&R>,
    scenario: &Scenario,
    identity: &RunIdentity,
    vars: &VariableSet,
    cancel: &CancellationToken,
) -> ExecutionOutput {
    let start = Instant::now();
    let output = match scenario.protocol {
        Protocol::Consistency => consistency::run(engine, scenario, identity, vars, cancel).await,
        Protocol::Upgrade => upgrade::run(engine, scenario, identity, vars, cancel).await,
        Protocol::Schematics => {
            schematics::run(remote, session, scenario, identity, vars, cancel).await
        }
    };

    let elapsed = start.elapsed().as_secs_f64();
    metrics::histogram!(
        m::EXECUTE_DURATION_SECONDS,
        m::LABEL_PROTOCOL => scenario.protocol.as_str()
    )
    .record(elapsed);

    match &output.outcome.error {
        None => {
            info!(
                scenario = %scenario.name,
                protocol = %scenario.protocol,
                elapsed_secs = start.elapsed().as_secs(),
                "protocol passed"
            );
        }
        Some(error) => {
            metrics::counter!(
                m::EXECUTE_FAILURES_TOTAL,
                m::LABEL_KIND => error.kind()
            )
            .increment(1);
            warn!(
                scenario = %scenario.name,
                protocol = %scenario.protocol,
                kind = error.kind(),
                error = %error,
                "protocol failed"
            );
        }
    }
    output
}

/// 취소 신호와 엔진 호출을 경쟁시킵니다.
///
/// 취소가 이기면 진행 중인 future는 드롭됩니다. 엔진 어댑터가 자식
/// 프로세스를 kill-on-drop으로 띄우므로 드롭이 곧 중단입니다.
pub(crate) async fn with_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, ExecuteError> {
    // 이미 취소된 경우 엔진 호출을 시작조차 하지 않는다
    if cancel.is_cancelled() {
        return Err(ExecuteError::Cancelled);
    }
    tokio::select! {
        () = cancel.cancelled() => Err(ExecuteError::Cancelled),
        result = fut => result.map_err(ExecuteError::Engine),
    }
}
