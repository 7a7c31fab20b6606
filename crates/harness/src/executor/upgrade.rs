//! 업그레이드 프로토콜
//!
//! 이미 배포된 기준 버전 위에 현재 버전을 얹었을 때 리소스가 파괴되지
//! 않아야 합니다. 파괴가 동반되는 업그레이드는 운영 환경에서 서비스 중단을
//! 의미하므로, plan의 destroy 카운트가 0이 아니면 파괴 대상 주소를 담아
//! 실패로 처리합니다.
//!
//! 흐름: stage(기준) → init → apply → restage(현재, 상태 보존) → init →
//! plan → (destroy 0이면) apply → outputs.
//!
//! 전역 생략 플래그는 파이프라인이 프로비저닝 이전에 처리하므로 여기서는
//! 다루지 않습니다.

use terraprobe_core::engine::Engine;
use terraprobe_core::error::ExecuteError;
use terraprobe_core::identity::RunIdentity;
use terraprobe_core::vars::VariableSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ExecutionOutput, TestOutcome, with_cancel};
use crate::scenario::Scenario;
use crate::workdir::StagedWorkdir;

pub(super) async fn run<E: Engine>(
    engine: &E,
    scenario: &Scenario,
    identity: &RunIdentity,
    vars: &VariableSet,
    cancel: &CancellationToken,
) -> ExecutionOutput {
    // 시나리오 검증이 먼저 걸러내지만, 여기서도 없는 채로 진행하지 않는다
    let Some(upgrade) = scenario.upgrade.as_ref() else {
        return ExecutionOutput {
            outcome: TestOutcome::failed(ExecuteError::Stage {
                reason: "upgrade protocol requires an [scenario.upgrade] section".to_owned(),
            }),
            workdir: None,
        };
    };

    if let Some(version) = &upgrade.base_version {
        info!(scenario = %scenario.name, base_version = %version, "upgrade base pinned");
    }

    let workdir = match StagedWorkdir::stage(&upgrade.base_dir, &identity.prefix) {
        Ok(workdir) => workdir,
        Err(e) => {
            return ExecutionOutput {
                outcome: TestOutcome::failed(ExecuteError::Stage {
                    reason: e.to_string(),
                }),
                workdir: None,
            };
        }
    };

    let outcome = drive(engine, scenario, &workdir, vars, cancel).await;
    ExecutionOutput {
        outcome,
        workdir: Some(workdir),
    }
}

async fn drive<E: Engine>(
    engine: &E,
    scenario: &Scenario,
    workdir: &StagedWorkdir,
    vars: &VariableSet,
    cancel: &CancellationToken,
) -> TestOutcome {
    let dir = workdir.path();

    // 기준 버전 배포
    if let Err(e) = with_cancel(cancel, engine.init(dir)).await {
        return TestOutcome::failed(e);
    }
    if let Err(e) = with_cancel(cancel, engine.apply(dir, vars)).await {
        return TestOutcome::failed(e);
    }

    // 상태를 남긴 채 현재 버전 코드로 교체
    if let Err(e) = workdir.restage(&scenario.template_dir) {
        return TestOutcome::failed(ExecuteError::Stage {
            reason: e.to_string(),
        });
    }
    debug!(workdir = %dir.display(), "restaged current template over base state");

    // 프로바이더 요구사항이 바뀌었을 수 있으므로 다시 init
    if let Err(e) = with_cancel(cancel, engine.init(dir)).await {
        return TestOutcome::failed(e);
    }

    let summary = match with_cancel(cancel, engine.plan(dir, vars)).await {
        Ok(summary) => summary,
        Err(e) => return TestOutcome::failed(e),
    };
    if summary.destroy > 0 {
        let destroyed = if summary.destroyed_addresses.is_empty() {
            vec![format!(
                "<{} resource(s), addresses unavailable>",
                summary.destroy
            )]
        } else {
            summary.destroyed_addresses
        };
        return TestOutcome::failed(ExecuteError::Upgrade { destroyed });
    }

    // 파괴 없는 업그레이드 — 실제로 적용해 마무리
    if let Err(e) = with_cancel(cancel, engine.apply(dir, vars)).await {
        return TestOutcome::failed(e);
    }
    match with_cancel(cancel, engine.outputs(dir)).await {
        Ok(outputs) => TestOutcome::passed(serde_json::to_value(&outputs).ok()),
        Err(e) => TestOutcome::failed(e),
    }
}
