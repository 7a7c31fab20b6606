//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 단계는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `terraprobe_`
//! - 단계명: `runner_`, `provision_`, `execute_`, `engine_`, `teardown_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use terraprobe_core::metrics;
//! use metrics::counter;
//!
//! counter!(terraprobe_core::metrics::RUNS_STARTED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 시나리오 이름 레이블 키
pub const LABEL_SCENARIO: &str = "scenario";

/// 프로토콜 레이블 키 (consistency, upgrade, schematics)
pub const LABEL_PROTOCOL: &str = "protocol";

/// 결과 레이블 키 (succeeded, failed, skipped, cancelled)
pub const LABEL_RESULT: &str = "result";

/// 엔진 작업 레이블 키 (init, apply, plan, output, destroy)
pub const LABEL_OPERATION: &str = "operation";

/// 실행 실패 종류 레이블 키 (consistency, upgrade, timeout, remote, engine)
pub const LABEL_KIND: &str = "kind";

// ─── Runner 메트릭 ──────────────────────────────────────────────────

/// Runner: 시작된 실행 수 (counter, label: scenario, protocol)
pub const RUNS_STARTED_TOTAL: &str = "terraprobe_runner_runs_started_total";

/// Runner: 종료된 실행 수 (counter, label: result)
pub const RUNS_COMPLETED_TOTAL: &str = "terraprobe_runner_runs_completed_total";

/// Runner: 현재 진행 중인 실행 수 (gauge)
pub const RUNS_ACTIVE: &str = "terraprobe_runner_runs_active";

// ─── Provision 메트릭 ───────────────────────────────────────────────

/// Provision: 선행 스택 생성 실패 수 (counter)
pub const PROVISION_FAILURES_TOTAL: &str = "terraprobe_provision_failures_total";

/// Provision: 선행 스택 생성 소요 시간 (histogram, 초)
pub const PROVISION_DURATION_SECONDS: &str = "terraprobe_provision_duration_seconds";

// ─── Execute 메트릭 ─────────────────────────────────────────────────

/// Execute: 프로토콜 실행 실패 수 (counter, label: kind)
pub const EXECUTE_FAILURES_TOTAL: &str = "terraprobe_execute_failures_total";

/// Execute: 프로토콜 실행 소요 시간 (histogram, 초)
pub const EXECUTE_DURATION_SECONDS: &str = "terraprobe_execute_duration_seconds";

/// Execute: 원격 작업 상태 폴링 수 (counter)
pub const SCHEMATICS_POLLS_TOTAL: &str = "terraprobe_execute_schematics_polls_total";

// ─── Engine 메트릭 ──────────────────────────────────────────────────

/// Engine: 실행된 엔진 명령 수 (counter, label: operation, result)
pub const ENGINE_COMMANDS_TOTAL: &str = "terraprobe_engine_commands_total";

/// Engine: 일시적 오류 재시도 수 (counter, label: operation)
pub const ENGINE_RETRIES_TOTAL: &str = "terraprobe_engine_retries_total";

/// Engine: 엔진 명령 소요 시간 (histogram, 초)
pub const ENGINE_COMMAND_DURATION_SECONDS: &str = "terraprobe_engine_command_duration_seconds";

// ─── Teardown 메트릭 ────────────────────────────────────────────────

/// Teardown: destroy 호출 수 (counter, label: result)
pub const TEARDOWN_DESTROYS_TOTAL: &str = "terraprobe_teardown_destroys_total";

/// Teardown: 보존된 실행 수 (counter)
pub const TEARDOWN_PRESERVED_TOTAL: &str = "terraprobe_teardown_preserved_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 엔진 명령 소요 시간 히스토그램 버킷 (초)
///
/// 100ms ~ 30분 범위 (apply/destroy는 수 분 단위가 일반적)
pub const ENGINE_DURATION_BUCKETS: [f64; 9] =
    [0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 180.0, 600.0, 1800.0];

/// 단계(provision/execute) 소요 시간 히스토그램 버킷 (초)
///
/// 10초 ~ 2시간 범위 (원격 프로토콜은 1시간 제한까지 허용)
pub const STAGE_DURATION_BUCKETS: [f64; 8] =
    [10.0, 30.0, 60.0, 180.0, 600.0, 1800.0, 3600.0, 7200.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// `metrics::describe_counter!()`, `describe_gauge!()`, `describe_histogram!()`을
/// 호출하여 메트릭 HELP 텍스트를 설정합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Runner
    describe_counter!(RUNS_STARTED_TOTAL, "Total number of scenario runs started");
    describe_counter!(
        RUNS_COMPLETED_TOTAL,
        "Total number of scenario runs finished, by result"
    );
    describe_gauge!(RUNS_ACTIVE, "Number of scenario runs currently in flight");

    // Provision
    describe_counter!(
        PROVISION_FAILURES_TOTAL,
        "Total number of failed prerequisite stack provisions"
    );
    describe_histogram!(
        PROVISION_DURATION_SECONDS,
        "Time to provision a prerequisite stack in seconds"
    );

    // Execute
    describe_counter!(
        EXECUTE_FAILURES_TOTAL,
        "Total number of failed protocol executions, by failure kind"
    );
    describe_histogram!(
        EXECUTE_DURATION_SECONDS,
        "Time to execute a test protocol in seconds"
    );
    describe_counter!(
        SCHEMATICS_POLLS_TOTAL,
        "Total number of remote job status polls"
    );

    // Engine
    describe_counter!(
        ENGINE_COMMANDS_TOTAL,
        "Total number of engine commands executed, by operation and result"
    );
    describe_counter!(
        ENGINE_RETRIES_TOTAL,
        "Total number of engine retries after transient errors"
    );
    describe_histogram!(
        ENGINE_COMMAND_DURATION_SECONDS,
        "Engine command duration in seconds"
    );

    // Teardown
    describe_counter!(
        TEARDOWN_DESTROYS_TOTAL,
        "Total number of teardown destroy calls, by result"
    );
    describe_counter!(
        TEARDOWN_PRESERVED_TOTAL,
        "Total number of runs whose resources were preserved for diagnosis"
    );
}
