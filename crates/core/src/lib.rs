#![doc = include_str!("../README.md")]

pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod registry;
pub mod vars;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{
    ConfigError, EngineError, ExecuteError, ProvisionError, TeardownError, TerraprobeError,
};

// 설정
pub use config::TerraprobeConfig;

// 엔진 추상화
pub use engine::{Engine, JobHandle, JobStatus, PlanSummary, RemoteRunner, SubmitRequest};

// 실행 식별자
pub use identity::RunIdentity;

// 영구 리소스 레지스트리
pub use registry::PermanentResources;

// 변수 집합
pub use vars::{FlatVar, VarValue, VariableSet};
