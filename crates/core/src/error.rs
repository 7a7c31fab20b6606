//! 에러 타입 — 도메인별 에러 정의

use crate::engine::PlanSummary;

/// Terraprobe 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TerraprobeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 실행 엔진 에러
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// 선행 스택 프로비저닝 에러
    #[error("provision error: {0}")]
    Provision(#[from] ProvisionError),

    /// 테스트 프로토콜 실행 에러
    #[error("execute error: {0}")]
    Execute(#[from] ExecuteError),

    /// 리소스 정리 에러
    #[error("teardown error: {0}")]
    Teardown(#[from] TeardownError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// 필수 자격 증명 환경변수 미설정
    ///
    /// 프로비저닝 이전에 검사되며 재시도 불가능한 치명적 에러입니다.
    #[error("required credential not set: {env_key}")]
    MissingCredential { env_key: String },

    /// 병합 후에도 누락된 필수 변수
    #[error("required variables missing after merge: {}", names.join(", "))]
    MissingVariables { names: Vec<String> },

    /// 영구 리소스 레지스트리에 없는 키 참조
    #[error("permanent resource key not found: {key}")]
    RegistryKeyMissing { key: String },
}

/// 실행 엔진 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 엔진 바이너리 실행 실패
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// 엔진 명령이 0이 아닌 종료 코드로 실패
    #[error("{op} failed with exit code {code}: {stderr}")]
    Failed {
        op: &'static str,
        code: i32,
        stderr: String,
    },

    /// 엔진 출력 파싱 실패
    #[error("failed to parse engine output: {reason}")]
    OutputParse { reason: String },

    /// 변수 파일 스테이징 실패
    #[error("failed to stage variables file: {reason}")]
    VarsFile { reason: String },

    /// 원격 테스트 러너 API 호출 실패
    #[error("remote runner api error: {reason}")]
    RemoteApi { reason: String },
}

/// 선행 스택 프로비저닝 에러
///
/// 어느 단계에서 실패했는지 구분합니다. 부분 적용 상태의 정리는
/// 프로비저너 내부에서 best-effort로 수행되며 이 에러에는 포함되지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// 템플릿 복사(스테이징) 실패
    #[error("failed to stage template '{template}': {source}")]
    Stage {
        template: String,
        #[source]
        source: std::io::Error,
    },

    /// init 단계 실패
    #[error("init failed for stack '{stack}': {source}")]
    Init {
        stack: String,
        #[source]
        source: EngineError,
    },

    /// apply 단계 실패
    #[error("apply failed for stack '{stack}': {source}")]
    Apply {
        stack: String,
        #[source]
        source: EngineError,
    },

    /// 출력값 조회 실패
    #[error("failed to read outputs for stack '{stack}': {source}")]
    Outputs {
        stack: String,
        #[source]
        source: EngineError,
    },
}

/// 테스트 프로토콜 실행 에러
///
/// 실행 단계의 실패는 시나리오를 중단시키지 않고 [`crate::vars`] 병합 결과와
/// 함께 정리 단계로 전달됩니다. 정리 여부는 정리 정책이 결정합니다.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// 테스트 템플릿 스테이징/재스테이징 실패
    #[error("failed to stage template: {reason}")]
    Stage { reason: String },

    /// apply 직후 plan에 변경이 남아 있음 (멱등성 위반)
    #[error("infrastructure drifted after apply: {summary}")]
    Consistency { summary: PlanSummary },

    /// 업그레이드 plan이 기존 리소스를 파괴함
    #[error("upgrade would destroy {} resource(s): {}", destroyed.len(), destroyed.join(", "))]
    Upgrade { destroyed: Vec<String> },

    /// 원격 작업이 시간 제한을 초과함
    #[error("remote job timed out after {waited_secs}s (limit: {limit_secs}s)")]
    Timeout { waited_secs: u64, limit_secs: u64 },

    /// 원격 작업이 실패로 종료됨
    #[error("remote job failed: {reason}")]
    Remote { reason: String },

    /// 엔진 호출 실패
    #[error("engine call failed: {0}")]
    Engine(#[from] EngineError),

    /// 실행 도중 취소됨
    #[error("run cancelled")]
    Cancelled,
}

impl ExecuteError {
    /// 메트릭 레이블과 리포트에 쓰는 짧은 식별자
    pub fn kind(&self) -> &'static str {
        match self {
            ExecuteError::Stage { .. } => "stage",
            ExecuteError::Consistency { .. } => "consistency",
            ExecuteError::Upgrade { .. } => "upgrade",
            ExecuteError::Timeout { .. } => "timeout",
            ExecuteError::Remote { .. } => "remote",
            ExecuteError::Engine(_) => "engine",
            ExecuteError::Cancelled => "cancelled",
        }
    }
}

/// 리소스 정리 에러
///
/// 정리 실패는 테스트 결과를 덮어쓰지 않습니다. 호출자는 실패 목록을
/// 리포트에 누적하고 원래의 테스트 결과를 그대로 보존해야 합니다.
#[derive(Debug, thiserror::Error)]
pub enum TeardownError {
    /// destroy 호출 실패
    #[error("destroy failed for '{target}': {source}")]
    Destroy {
        target: String,
        #[source]
        source: EngineError,
    },
}
