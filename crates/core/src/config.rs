//! 설정 관리 — terraprobe.toml 파싱 및 런타임 설정
//!
//! [`TerraprobeConfig`]는 하네스 전체의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TERRAPROBE_RUNNER_MAX_CONCURRENT=8` 형식)
//! 3. 설정 파일 (`terraprobe.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), terraprobe_core::error::TerraprobeError> {
//! use terraprobe_core::config::TerraprobeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TerraprobeConfig::load("terraprobe.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TerraprobeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TerraprobeError};

/// Terraprobe 통합 설정
///
/// `terraprobe.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 단계는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TerraprobeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 실행 엔진 설정
    #[serde(default)]
    pub engine: EngineConfig,
    /// 실행 조율기 설정
    #[serde(default)]
    pub runner: RunnerConfig,
    /// 원격 테스트 러너 설정
    #[serde(default)]
    pub schematics: SchematicsConfig,
    /// 영구 리소스 레지스트리 설정
    #[serde(default)]
    pub registry: RegistryConfig,
    /// 자격 증명 설정
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl TerraprobeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TerraprobeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TerraprobeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TerraprobeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TerraprobeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TerraprobeError> {
        toml::from_str(toml_str).map_err(|e| {
            TerraprobeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TERRAPROBE_{SECTION}_{FIELD}`
    /// 예: `TERRAPROBE_RUNNER_PRESERVE_ON_FAILURE=true`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TERRAPROBE_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "TERRAPROBE_GENERAL_LOG_FORMAT",
        );

        // Engine
        override_string(&mut self.engine.program, "TERRAPROBE_ENGINE_PROGRAM");
        override_u32(
            &mut self.engine.retry_attempts,
            "TERRAPROBE_ENGINE_RETRY_ATTEMPTS",
        );
        override_u64(
            &mut self.engine.retry_backoff_secs,
            "TERRAPROBE_ENGINE_RETRY_BACKOFF_SECS",
        );
        override_csv(
            &mut self.engine.retryable_patterns,
            "TERRAPROBE_ENGINE_RETRYABLE_PATTERNS",
        );

        // Runner
        override_usize(
            &mut self.runner.max_concurrent,
            "TERRAPROBE_RUNNER_MAX_CONCURRENT",
        );
        override_bool(
            &mut self.runner.preserve_on_failure,
            "TERRAPROBE_RUNNER_PRESERVE_ON_FAILURE",
        );
        override_bool(
            &mut self.runner.skip_upgrade_test,
            "TERRAPROBE_RUNNER_SKIP_UPGRADE_TEST",
        );

        // Schematics
        override_string(&mut self.schematics.helper, "TERRAPROBE_SCHEMATICS_HELPER");
        override_u64(
            &mut self.schematics.poll_interval_secs,
            "TERRAPROBE_SCHEMATICS_POLL_INTERVAL_SECS",
        );
        override_u64(
            &mut self.schematics.timeout_mins,
            "TERRAPROBE_SCHEMATICS_TIMEOUT_MINS",
        );

        // Registry
        override_string(&mut self.registry.path, "TERRAPROBE_REGISTRY_PATH");

        // Credentials
        override_string(
            &mut self.credentials.api_key_env,
            "TERRAPROBE_CREDENTIALS_API_KEY_ENV",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TerraprobeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 엔진 바이너리 검증
        if self.engine.program.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine.program".to_owned(),
                reason: "engine program must not be empty".to_owned(),
            }
            .into());
        }

        // 동시 실행 수 검증
        if self.runner.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                field: "runner.max_concurrent".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        // 원격 폴링 간격 검증
        if self.schematics.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "schematics.poll_interval_secs".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        // 원격 시간 제한 검증
        if self.schematics.timeout_mins == 0 {
            return Err(ConfigError::InvalidValue {
                field: "schematics.timeout_mins".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        // 자격 증명 환경변수 이름 검증
        if self.credentials.api_key_env.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "credentials.api_key_env".to_owned(),
                reason: "credential env var name must not be empty".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 실행 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 엔진 바이너리 이름 또는 경로
    pub program: String,
    /// 일시적 오류 재시도 횟수 (init/apply에만 적용)
    pub retry_attempts: u32,
    /// 재시도 간 대기 시간 (초)
    pub retry_backoff_secs: u64,
    /// 기본 목록에 더해 일시적 오류로 취급할 정규식 패턴
    ///
    /// 패턴 문법 검증은 엔진 어댑터가 재시도 정책을 만들 때 수행합니다.
    pub retryable_patterns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "terraform".to_owned(),
            retry_attempts: 3,
            retry_backoff_secs: 10,
            retryable_patterns: vec![],
        }
    }
}

/// 실행 조율기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// 동시에 실행할 최대 시나리오 수
    pub max_concurrent: usize,
    /// 실패한 실행의 리소스를 보존할지 여부 (진단용)
    pub preserve_on_failure: bool,
    /// 업그레이드 프로토콜을 전부 건너뛸지 여부
    pub skip_upgrade_test: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            preserve_on_failure: false,
            skip_upgrade_test: false,
        }
    }
}

/// 원격 테스트 러너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchematicsConfig {
    /// 제출/폴링을 담당하는 헬퍼 명령 (빈 값 = 원격 프로토콜 비활성)
    pub helper: String,
    /// 작업 상태 폴링 간격 (초)
    pub poll_interval_secs: u64,
    /// 원격 작업 전체 시간 제한 (분)
    pub timeout_mins: u64,
}

impl Default for SchematicsConfig {
    fn default() -> Self {
        Self {
            helper: String::new(),
            poll_interval_secs: 30,
            timeout_mins: 60,
        }
    }
}

/// 영구 리소스 레지스트리 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 레지스트리 YAML 파일 경로 (빈 값 = 레지스트리 없음)
    pub path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
        }
    }
}

/// 자격 증명 설정
///
/// 키 값 자체는 설정 파일에 두지 않고 환경변수로만 전달합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// API 키를 담는 환경변수 이름
    pub api_key_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            api_key_env: "TERRAPROBE_API_KEY".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}
