//! 하네스 단위 테스트용 mock 구현
//!
//! [`MockEngine`]과 [`MockRemoteRunner`]는 스크립트된 응답을 돌려주면서
//! 모든 호출을 기록합니다. 실패 빌더는 해당 연산만 실패시키고 나머지는
//! 계속 성공하므로, 단계별 실패 경로를 하나씩 떼어 검증할 수 있습니다.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use indexmap::IndexMap;
use terraprobe_core::engine::{
    Engine, JobHandle, JobStatus, PlanSummary, RemoteRunner, SubmitRequest,
};
use terraprobe_core::error::EngineError;
use terraprobe_core::vars::VariableSet;

/// 실패 빌더가 만드는 공통 엔진 에러 (비정상 종료 형태)
fn scripted_failure(op: &'static str, stderr: &str) -> EngineError {
    EngineError::Failed {
        op,
        code: 1,
        stderr: stderr.to_owned(),
    }
}

/// 스크립트 가능한 테스트용 엔진
///
/// 연산 이름을 호출 순서대로 기록하고, apply에 전달된 변수와 destroy 대상
/// 디렉터리를 보관합니다. `Arc`로 감싸 여러 파이프라인이 공유해도 기록은
/// 하나로 모입니다.
#[derive(Debug, Default)]
pub(crate) struct MockEngine {
    plan: PlanSummary,
    outputs: IndexMap<String, serde_json::Value>,
    fail_init: Option<String>,
    fail_apply: Option<String>,
    fail_outputs: Option<String>,
    fail_destroy: Option<String>,
    apply_delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    last_apply_vars: Mutex<Option<VariableSet>>,
    destroy_dirs: Mutex<Vec<PathBuf>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockEngine {
    /// 모든 연산이 성공하고 plan이 깨끗한 엔진을 만듭니다.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// plan 호출이 돌려줄 요약을 지정합니다.
    pub(crate) fn with_plan(mut self, plan: PlanSummary) -> Self {
        self.plan = plan;
        self
    }

    /// outputs 호출이 돌려줄 출력값을 추가합니다.
    pub(crate) fn with_output(mut self, name: &str, value: serde_json::Value) -> Self {
        self.outputs.insert(name.to_owned(), value);
        self
    }

    /// apply가 지정한 시간만큼 대기하도록 합니다 (동시성 테스트용).
    pub(crate) fn with_apply_delay(mut self, delay: Duration) -> Self {
        self.apply_delay = Some(delay);
        self
    }

    pub(crate) fn fail_init(mut self, stderr: &str) -> Self {
        self.fail_init = Some(stderr.to_owned());
        self
    }

    pub(crate) fn fail_apply(mut self, stderr: &str) -> Self {
        self.fail_apply = Some(stderr.to_owned());
        self
    }

    pub(crate) fn fail_outputs(mut self, stderr: &str) -> Self {
        self.fail_outputs = Some(stderr.to_owned());
        self
    }

    pub(crate) fn fail_destroy(mut self, stderr: &str) -> Self {
        self.fail_destroy = Some(stderr.to_owned());
        self
    }

    /// 지금까지 기록된 연산 이름 (호출 순서대로)
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// 마지막 apply에 전달된 변수 집합
    pub(crate) fn last_apply_vars(&self) -> Option<VariableSet> {
        self.last_apply_vars.lock().unwrap().clone()
    }

    /// destroy가 호출된 디렉터리 (호출 순서대로)
    pub(crate) fn destroy_dirs(&self) -> Vec<PathBuf> {
        self.destroy_dirs.lock().unwrap().clone()
    }

    /// 동시에 apply 안에 머문 호출 수의 최고치
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, op: &str) {
        self.calls.lock().unwrap().push(op.to_owned());
    }
}

impl Engine for MockEngine {
    async fn init(&self, _dir: &Path) -> Result<(), EngineError> {
        self.record("init");
        match &self.fail_init {
            Some(stderr) => Err(scripted_failure("init", stderr)),
            None => Ok(()),
        }
    }

    async fn apply(&self, _dir: &Path, vars: &VariableSet) -> Result<(), EngineError> {
        self.record("apply");
        *self.last_apply_vars.lock().unwrap() = Some(vars.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.apply_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.fail_apply {
            Some(stderr) => Err(scripted_failure("apply", stderr)),
            None => Ok(()),
        }
    }

    async fn plan(&self, _dir: &Path, _vars: &VariableSet) -> Result<PlanSummary, EngineError> {
        self.record("plan");
        Ok(self.plan.clone())
    }

    async fn outputs(
        &self,
        _dir: &Path,
    ) -> Result<IndexMap<String, serde_json::Value>, EngineError> {
        self.record("outputs");
        match &self.fail_outputs {
            Some(stderr) => Err(scripted_failure("outputs", stderr)),
            None => Ok(self.outputs.clone()),
        }
    }

    async fn destroy(&self, dir: &Path) -> Result<(), EngineError> {
        self.record("destroy");
        self.destroy_dirs.lock().unwrap().push(dir.to_path_buf());
        match &self.fail_destroy {
            Some(stderr) => Err(scripted_failure("destroy", stderr)),
            None => Ok(()),
        }
    }
}

/// 스크립트 가능한 테스트용 원격 러너
///
/// `with_status`로 쌓은 상태를 폴링 순서대로 돌려주고, 스크립트가 소진되면
/// `Running`을 반복합니다. 제출된 요청은 전부 보관되어 페이로드 검증에
/// 쓰입니다.
#[derive(Debug, Default)]
pub(crate) struct MockRemoteRunner {
    statuses: Mutex<Vec<JobStatus>>,
    fail_submit: Option<String>,
    submitted: Mutex<Vec<SubmitRequest>>,
    polls: AtomicUsize,
}

impl MockRemoteRunner {
    /// 제출은 성공하고 폴링마다 `Running`을 돌려주는 러너를 만듭니다.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 다음 폴링이 돌려줄 상태를 뒤에 추가합니다.
    pub(crate) fn with_status(self, status: JobStatus) -> Self {
        self.statuses.lock().unwrap().push(status);
        self
    }

    /// submit 호출이 원격 API 에러로 실패하도록 합니다.
    pub(crate) fn fail_submit(mut self, reason: &str) -> Self {
        self.fail_submit = Some(reason.to_owned());
        self
    }

    /// 지금까지 제출된 요청 전부
    pub(crate) fn submitted(&self) -> Vec<SubmitRequest> {
        self.submitted.lock().unwrap().clone()
    }

    /// 폴링 횟수
    pub(crate) fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl RemoteRunner for MockRemoteRunner {
    async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, EngineError> {
        if let Some(reason) = &self.fail_submit {
            return Err(EngineError::RemoteApi {
                reason: reason.clone(),
            });
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request.clone());
        Ok(JobHandle {
            id: format!("mock-job-{}", submitted.len()),
        })
    }

    async fn poll(&self, _job: &JobHandle) -> Result<JobStatus, EngineError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.is_empty() {
            Ok(JobStatus::Running)
        } else {
            Ok(statuses.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn engine_records_calls_in_order() {
        let engine = MockEngine::new().with_output("id", serde_json::json!("x"));
        let dir = Path::new("/tmp/mock");

        engine.init(dir).await.unwrap();
        engine.apply(dir, &VariableSet::new()).await.unwrap();
        let outputs = engine.outputs(dir).await.unwrap();

        assert_eq!(engine.calls(), ["init", "apply", "outputs"]);
        assert_eq!(outputs["id"], serde_json::json!("x"));
    }

    #[tokio::test]
    async fn engine_failure_does_not_stop_recording() {
        let engine = MockEngine::new().fail_apply("boom");
        let dir = Path::new("/tmp/mock");

        let err = engine.apply(dir, &VariableSet::new()).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(engine.calls(), ["apply"]);
    }

    #[tokio::test]
    async fn runner_script_is_consumed_then_running_repeats() {
        let runner = MockRemoteRunner::new()
            .with_status(JobStatus::Failed("bad".to_owned()));
        let job = JobHandle {
            id: "mock-job-1".to_owned(),
        };

        assert_eq!(
            runner.poll(&job).await.unwrap(),
            JobStatus::Failed("bad".to_owned())
        );
        assert_eq!(runner.poll(&job).await.unwrap(), JobStatus::Running);
        assert_eq!(runner.poll(&job).await.unwrap(), JobStatus::Running);
        assert_eq!(runner.poll_count(), 3);
    }
}
