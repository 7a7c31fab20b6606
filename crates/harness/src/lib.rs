#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`scenario`]: 선언적 시나리오 디스크립터 (TOML 로딩, 검증)
//! - [`session`]: 불변 세션 컨텍스트 (설정 + 자격 증명 + 영구 리소스)
//! - [`workdir`]: 실행별 격리 작업 디렉터리 (스테이징, 보존)
//! - [`provision`]: 선행 스택 프로비저너 (init → apply 1회 → outputs)
//! - [`binder`]: 4계층 변수 바인딩 (순수 함수)
//! - [`executor`]: 테스트 프로토콜 실행 (consistency / upgrade / schematics)
//! - [`bundle`]: 원격 제출용 소스 번들 수집 (글롭 매칭)
//! - [`teardown`]: 결과 기반 정리 정책 (destroy / preserve)
//! - [`pipeline`]: 시나리오 1건의 전체 흐름 (provision → bind → execute → teardown)
//! - [`runner`]: 동시 실행 코디네이터 (Semaphore 기반)
//! - [`report`]: 시나리오 실행 리포트
//!
//! # 아키텍처
//!
//! ```text
//! Coordinator ──spawn──> pipeline ──> Provisioner ──> binder ──> executor ──> teardown
//!      │                    │              │                        │
//!  Semaphore           RunIdentity    StagedWorkdir          Engine / RemoteRunner
//! ```

pub mod binder;
pub mod bundle;
pub mod executor;
pub mod pipeline;
pub mod provision;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod teardown;
pub mod workdir;

#[cfg(test)]
pub(crate) mod testutil;

// --- 주요 타입 re-export ---

// 파이프라인 / 코디네이터
pub use pipeline::run_scenario;
pub use runner::Coordinator;

// 시나리오
pub use scenario::{Protocol, Scenario, ScenarioFile};

// 세션
pub use session::{ApiKey, SessionContext};

// 프로비저닝
pub use provision::{Provisioner, StackHandle};
pub use workdir::StagedWorkdir;

// 바인딩
pub use binder::bind;

// 실행
pub use executor::{ExecutionOutput, TestOutcome};

// 번들
pub use bundle::SourceBundle;

// 정리
pub use teardown::{TeardownDecision, TeardownReport};

// 리포트
pub use report::{summarize, RunResult, RunSummary, ScenarioReport};
