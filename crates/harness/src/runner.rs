//! 동시 실행 코디네이터
//!
//! 시나리오마다 tokio 태스크 하나를 띄우고, 동시 실행 수는
//! `runner.max_concurrent` 크기의 [`Semaphore`]로 묶습니다. 파이프라인은
//! 서로 가변 상태를 공유하지 않으므로(각자의 식별자·작업 디렉터리·변수
//! 집합) 조율에 필요한 것은 이 한도뿐입니다.
//!
//! 리포트는 완료 순서와 무관하게 입력 순서로 돌아옵니다. 취소 신호는
//! 모든 태스크에 전파되며, 아직 시작하지 않은 시나리오는 엔진 호출 없이
//! 취소로 기록됩니다.

use std::sync::Arc;

use terraprobe_core::engine::{Engine, RemoteRunner};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::pipeline;
use crate::report::{self, ScenarioReport};
use crate::scenario::Scenario;
use crate::session::SessionContext;

/// 시나리오 묶음의 동시 실행을 조율합니다.
///
/// 엔진과 세션은 모든 파이프라인이 공유하는 불변 상태이므로 `Arc`로
/// 들고, 시나리오별 상태는 전부 파이프라인 안에서 만들어집니다.
pub struct Coordinator<E: Engine, R: RemoteRunner> {
    session: Arc<SessionContext>,
    engine: Arc<E>,
    remote: Option<Arc<R>>,
}

impl<E: Engine, R: RemoteRunner> Coordinator<E, R> {
    /// 세션·엔진·(선택) 원격 러너로 코디네이터를 만듭니다.
    pub fn new(session: SessionContext, engine: Arc<E>, remote: Option<Arc<R>>) -> Self {
        Self {
            session: Arc::new(session),
            engine,
            remote,
        }
    }

    /// 시나리오 전부를 동시 실행 한도 안에서 실행합니다.
    ///
    /// 입력 순서를 보존한 리포트 목록을 돌려줍니다. 파이프라인은 실패를
    /// 값으로 돌려주므로 태스크 조인이 실패하는 경우는 패닉뿐이며, 그때는
    /// 해당 시나리오의 리포트가 빠지고 경고가 남습니다.
    pub async fn run_all(
        &self,
        scenarios: Vec<Scenario>,
        cancel: &CancellationToken,
    ) -> Vec<ScenarioReport> {
        let limit = self.session.config().runner.max_concurrent;
        let semaphore = Arc::new(Semaphore::new(limit));
        info!(
            scenarios = scenarios.len(),
            max_concurrent = limit,
            "starting scenario batch"
        );

        let mut handles = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let name = scenario.name.clone();
            let session = Arc::clone(&self.session);
            let engine = Arc::clone(&self.engine);
            let remote = self.remote.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                // 세마포어는 닫히지 않으므로 acquire는 항상 성공한다
                let _permit = semaphore.acquire_owned().await.ok();
                pipeline::run_scenario(&session, &engine, remote.as_deref(), &scenario, &cancel)
                    .await
            });
            handles.push((name, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(scenario = %name, error = %e, "scenario task panicked, report missing");
                }
            }
        }

        let summary = report::summarize(&reports);
        info!(%summary, "scenario batch finished");
        reports
    }
}
