//! 결과 기반 정리 정책
//!
//! 어떤 실행을 지울지는 표 하나로 결정됩니다:
//!
//! | 결과 | preserve_on_failure | 조치                      |
//! |------|---------------------|---------------------------|
//! | 성공 | 무관                | destroy (성공은 보존 불가) |
//! | 실패 | false               | destroy                   |
//! | 실패 | true                | preserve + 경로 공지       |
//!
//! destroy는 테스트 디렉터리부터, 그 다음 선행 스택 순서(생성의 역순)로
//! 수행됩니다. 어느 쪽이 실패해도 나머지는 계속 시도하며, 실패는 리포트에
//! 쌓일 뿐 테스트 결과를 덮어쓰지 않습니다.

use serde::{Deserialize, Serialize};
use terraprobe_core::engine::Engine;
use terraprobe_core::error::TeardownError;
use terraprobe_core::metrics as m;
use tracing::{error, info, warn};

use crate::workdir::StagedWorkdir;

/// 정리 방식 — 순수하게 `(성공 여부, 보존 플래그)`만으로 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownDecision {
    /// 리소스를 제거
    Destroy,
    /// 진단을 위해 리소스와 디렉터리를 남김
    Preserve,
}

impl TeardownDecision {
    /// 정책 표를 평가합니다. 성공한 실행은 플래그와 무관하게 제거됩니다.
    pub fn decide(succeeded: bool, preserve_on_failure: bool) -> Self {
        if succeeded || !preserve_on_failure {
            TeardownDecision::Destroy
        } else {
            TeardownDecision::Preserve
        }
    }
}

/// 정리 단계의 결과
///
/// `errors`는 렌더링된 [`TeardownError`] 목록입니다. 테스트 결과와 분리된
/// 필드이므로 정리 실패가 성패를 바꾸지 못합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeardownReport {
    /// 적용된 결정
    pub decision: TeardownDecision,
    /// destroy에 성공한 대상 이름
    pub destroyed: Vec<String>,
    /// 보존되어 디스크에 남은 경로
    pub preserved: Vec<String>,
    /// destroy 실패 목록
    pub errors: Vec<String>,
}

impl TeardownReport {
    /// 대상이 없었던 (또는 아직 아무 일도 안 한) 빈 리포트
    pub fn empty(decision: TeardownDecision) -> Self {
        Self {
            decision,
            destroyed: Vec::new(),
            preserved: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// 결정을 집행합니다.
///
/// 테스트 디렉터리와 선행 스택 디렉터리를 넘기면 소유권을 가져가며,
/// destroy 경로에서는 반환 시점에 임시 디렉터리가 함께 삭제됩니다.
pub async fn run<E: Engine>(
    engine: &E,
    decision: TeardownDecision,
    test_workdir: Option<StagedWorkdir>,
    prereq_workdir: Option<StagedWorkdir>,
    prefix: &str,
) -> TeardownReport {
    let mut report = TeardownReport::empty(decision);

    match decision {
        TeardownDecision::Destroy => {
            // 생성의 역순: 테스트 스택 먼저, 선행 스택 나중
            let targets = [("test", test_workdir), ("prerequisite", prereq_workdir)];
            for (target, workdir) in targets {
                let Some(workdir) = workdir else { continue };
                match engine.destroy(workdir.path()).await {
                    Ok(()) => {
                        metrics::counter!(
                            m::TEARDOWN_DESTROYS_TOTAL,
                            m::LABEL_RESULT => "ok"
                        )
                        .increment(1);
                        info!(prefix = %prefix, target, "resources destroyed");
                        report.destroyed.push(target.to_owned());
                    }
                    Err(e) => {
                        metrics::counter!(
                            m::TEARDOWN_DESTROYS_TOTAL,
                            m::LABEL_RESULT => "error"
                        )
                        .increment(1);
                        let err = TeardownError::Destroy {
                            target: target.to_owned(),
                            source: e,
                        };
                        error!(
                            prefix = %prefix,
                            target,
                            error = %err,
                            "destroy failed, resources may remain in the account"
                        );
                        report.errors.push(err.to_string());
                    }
                }
                // 드롭되면서 작업 디렉터리도 제거됨
            }
        }
        TeardownDecision::Preserve => {
            metrics::counter!(m::TEARDOWN_PRESERVED_TOTAL).increment(1);
            for workdir in [test_workdir, prereq_workdir].into_iter().flatten() {
                let path = workdir.keep();
                report.preserved.push(path.display().to_string());
            }
            warn!(
                prefix = %prefix,
                paths = ?report.preserved,
                "run preserved for diagnosis, clean up manually when done"
            );
        }
    }
    report
}
