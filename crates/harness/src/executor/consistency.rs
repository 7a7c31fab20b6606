//! 멱등성 프로토콜
//!
//! apply 직후의 plan은 비어 있어야 합니다. 변경이 남아 있다는 것은 모듈이
//! 자기 출력과 일치하지 않는 상태를 만든다는 뜻이므로, plan 요약을 담아
//! 실패로 처리합니다. 실패는 크래시가 아니라 outcome이며 정리는 계속됩니다.
//!
//! 흐름: stage → init → apply → plan → (비어 있으면) outputs.

use terraprobe_core::engine::Engine;
use terraprobe_core::error::ExecuteError;
use terraprobe_core::identity::RunIdentity;
use terraprobe_core::vars::VariableSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

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
    let workdir = match StagedWorkdir::stage(&scenario.template_dir, &identity.prefix) {
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

    let outcome = drive(engine, &workdir, vars, cancel).await;
    ExecutionOutput {
        outcome,
        workdir: Some(workdir),
    }
}

async fn drive<E: Engine>(
    engine: &E,
    workdir: &StagedWorkdir,
    vars: &VariableSet,
    cancel: &CancellationToken,
) -> TestOutcome {
    let dir = workdir.path();

    if let Err(e) = with_cancel(cancel, engine.init(dir)).await {
        return TestOutcome::failed(e);
    }
    if let Err(e) = with_cancel(cancel, engine.apply(dir, vars)).await {
        return TestOutcome::failed(e);
    }

    let summary = match with_cancel(cancel, engine.plan(dir, vars)).await {
        Ok(summary) => summary,
        Err(e) => return TestOutcome::failed(e),
    };
    if summary.has_changes() {
        return TestOutcome::failed(ExecuteError::Consistency { summary });
    }
    debug!(workdir = %dir.display(), "plan clean after apply");

    match with_cancel(cancel, engine.outputs(dir)).await {
        Ok(outputs) => TestOutcome::passed(serde_json::to_value(&outputs).ok()),
        Err(e) => TestOutcome::failed(e),
    }
}
