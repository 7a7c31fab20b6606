//! 선행 스택 프로비저너
//!
//! 일부 시나리오는 본 테스트가 참조할 기반 스택(공유 VPC, 시크릿 매니저
//! 인스턴스 등)을 먼저 세워야 합니다. 프로비저너는 init → apply → outputs를
//! 한 번만 수행하고, 성공한 apply는 절대 반복하지 않습니다.
//!
//! # 실패 시 정리
//!
//! - init 실패: 리소스가 만들어지지 않았으므로 destroy 없이 종료합니다.
//! - apply/outputs 실패: 부분 생성된 리소스를 best-effort destroy로
//!   제거하고, destroy 실패는 로그로만 남깁니다. 호출자에게 전달되는
//!   에러는 항상 원래 단계의 실패입니다.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use terraprobe_core::engine::Engine;
use terraprobe_core::error::ProvisionError;
use terraprobe_core::identity::RunIdentity;
use terraprobe_core::metrics as m;
use terraprobe_core::vars::VariableSet;
use tracing::{error, info, warn};

use crate::workdir::StagedWorkdir;

/// 살아 있는 선행 스택의 핸들
///
/// 출력값과 작업 디렉터리를 함께 들고 있습니다. 스택의 수명은 이 핸들이
/// 아니라 정리 단계가 관리합니다.
#[derive(Debug)]
pub struct StackHandle {
    workdir: StagedWorkdir,
    outputs: IndexMap<String, serde_json::Value>,
}

impl StackHandle {
    /// 스택의 출력값 (선언 순서 유지)
    pub fn outputs(&self) -> &IndexMap<String, serde_json::Value> {
        &self.outputs
    }

    /// 스택의 작업 디렉터리 경로
    pub fn path(&self) -> &Path {
        self.workdir.path()
    }

    /// 정리 단계로 넘기기 위해 작업 디렉터리를 꺼냅니다.
    pub fn into_workdir(self) -> StagedWorkdir {
        self.workdir
    }
}

/// 선행 스택 프로비저너
///
/// 엔진을 공유하는 얇은 래퍼이며 실행 간 상태를 갖지 않습니다.
#[derive(Debug)]
pub struct Provisioner<E: Engine> {
    engine: Arc<E>,
}

impl<E: Engine> Provisioner<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    /// 스택 하나를 올립니다: 스테이징 → init → apply(1회) → outputs.
    pub async fn provision(
        &self,
        template_dir: &Path,
        identity: &RunIdentity,
        vars: &VariableSet,
    ) -> Result<StackHandle, ProvisionError> {
        let label = stack_label(template_dir);
        let start = std::time::Instant::now();

        // 디렉터리 이름은 prefix에서 파생되어야 크래시 후 잔여물을 찾을 수 있음
        let workdir = StagedWorkdir::stage(template_dir, &format!("{}-prereq", identity.prefix))
            .map_err(|e| ProvisionError::Stage {
                template: template_dir.display().to_string(),
                source: e,
            })?;

        info!(
            stack = %label,
            prefix = %identity.prefix,
            workdir = %workdir.path().display(),
            "provisioning prerequisite stack"
        );

        if let Err(e) = self.engine.init(workdir.path()).await {
            metrics::counter!(m::PROVISION_FAILURES_TOTAL).increment(1);
            // init은 리소스를 만들지 않으므로 destroy 없이 종료
            return Err(ProvisionError::Init {
                stack: label,
                source: e,
            });
        }

        if let Err(e) = self.engine.apply(workdir.path(), vars).await {
            metrics::counter!(m::PROVISION_FAILURES_TOTAL).increment(1);
            self.rollback(&workdir, &label).await;
            return Err(ProvisionError::Apply {
                stack: label,
                source: e,
            });
        }

        let outputs = match self.engine.outputs(workdir.path()).await {
            Ok(outputs) => outputs,
            Err(e) => {
                metrics::counter!(m::PROVISION_FAILURES_TOTAL).increment(1);
                self.rollback(&workdir, &label).await;
                return Err(ProvisionError::Outputs {
                    stack: label,
                    source: e,
                });
            }
        };

        metrics::histogram!(m::PROVISION_DURATION_SECONDS).record(start.elapsed().as_secs_f64());
        info!(
            stack = %label,
            outputs = outputs.len(),
            elapsed_secs = start.elapsed().as_secs(),
            "prerequisite stack ready"
        );
        Ok(StackHandle { workdir, outputs })
    }

    /// 부분 생성된 리소스를 best-effort로 제거합니다.
    async fn rollback(&self, workdir: &StagedWorkdir, label: &str) {
        warn!(stack = %label, "provisioning failed, destroying partial resources");
        if let Err(e) = self.engine.destroy(workdir.path()).await {
            error!(
                stack = %label,
                workdir = %workdir.path().display(),
                error = %e,
                "rollback destroy failed, resources may remain in the account"
            );
        }
    }
}

/// 템플릿 디렉터리 이름을 스택 라벨로 사용합니다.
fn stack_label(template_dir: &Path) -> String {
    template_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stack".to_owned())
}
