//! 시나리오 실행 리포트
//!
//! 파이프라인 한 건의 전말을 구조화해 담습니다. 테스트 결과와 정리 결과는
//! 별도 필드로 분리되어 있어, 정리 실패가 테스트 성패를 가리는 일이 없습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::teardown::TeardownReport;

/// 시나리오 실행의 최종 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunResult {
    /// 프로토콜이 끝까지 통과
    Passed,
    /// 어느 단계에서든 실패
    Failed,
    /// 실행 전에 생략됨 (엔진 호출 없음)
    Skipped,
    /// 취소 신호로 중단됨
    Cancelled,
}

impl RunResult {
    /// 소문자 라벨 (로그·메트릭 라벨용)
    pub fn as_str(&self) -> &'static str {
        match self {
            RunResult::Passed => "passed",
            RunResult::Failed => "failed",
            RunResult::Skipped => "skipped",
            RunResult::Cancelled => "cancelled",
        }
    }

    /// 실패로 집계되는 결과인지 (취소 포함)
    pub fn is_failure(&self) -> bool {
        matches!(self, RunResult::Failed | RunResult::Cancelled)
    }
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 시나리오 한 건의 실행 리포트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// 실행 고유 ID
    pub run_id: Uuid,
    /// 시나리오 이름
    pub scenario: String,
    /// 이 실행의 리소스 prefix
    pub prefix: String,
    /// 대상 리전
    pub region: String,
    /// 실행된 프로토콜
    pub protocol: String,
    /// 업그레이드 프로토콜의 기준 버전 (고정된 경우)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<semver::Version>,
    /// 최종 결과
    pub result: RunResult,
    /// 실패 시 에러 메시지
    pub error: Option<String>,
    /// 실패 단계 분류 (provision, config, consistency, upgrade, timeout, ...)
    pub error_kind: Option<String>,
    /// 테스트가 통과했을 때의 스택 출력
    pub output: Option<serde_json::Value>,
    /// 정리 단계 결과 — 테스트 결과와 독립
    pub teardown: TeardownReport,
    /// 실행 시작 시각
    pub started_at: DateTime<Utc>,
    /// 전체 소요 시간 (초)
    pub duration_secs: f64,
}

impl ScenarioReport {
    /// 실패로 집계되는지 (정리 실패는 여기 포함되지 않음)
    pub fn is_failure(&self) -> bool {
        self.result.is_failure()
    }

    /// 정리 단계에서 에러가 있었는지
    pub fn has_teardown_errors(&self) -> bool {
        !self.teardown.errors.is_empty()
    }
}

/// 실행 묶음의 결과 집계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// 통과한 시나리오 수
    pub passed: usize,
    /// 실패한 시나리오 수
    pub failed: usize,
    /// 생략된 시나리오 수
    pub skipped: usize,
    /// 취소된 시나리오 수
    pub cancelled: usize,
    /// 정리 에러가 있었던 시나리오 수
    pub teardown_errors: usize,
}

impl RunSummary {
    /// 하나라도 실패·취소가 있었는지
    pub fn any_failure(&self) -> bool {
        self.failed > 0 || self.cancelled > 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} skipped, {} cancelled",
            self.passed, self.failed, self.skipped, self.cancelled
        )?;
        if self.teardown_errors > 0 {
            write!(f, " ({} with teardown errors)", self.teardown_errors)?;
        }
        Ok(())
    }
}

/// 리포트 목록을 집계합니다.
pub fn summarize(reports: &[ScenarioReport]) -> RunSummary {
    let mut summary = RunSummary::default();
    for report in reports {
        match report.result {
            RunResult::Passed => summary.passed += 1,
            RunResult::Failed => summary.failed += 1,
            RunResult::Skipped => summary.skipped += 1,
            RunResult::Cancelled => summary.cancelled += 1,
        }
        if report.has_teardown_errors() {
            summary.teardown_errors += 1;
        }
    }
    summary
}
