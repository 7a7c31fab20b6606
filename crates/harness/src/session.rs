//! 불변 세션 컨텍스트
//!
//! 실행 전체가 공유하는 읽기 전용 상태를 한 번 조립합니다: 검증된 설정,
//! 자격 증명, 영구 리소스 레지스트리. 조립 이후에는 어떤 경로로도 변경되지
//! 않으므로 동시 파이프라인 간 잠금 없이 공유됩니다.
//!
//! 자격 증명은 세션 조립 시점에 가장 먼저 검사합니다. 환경변수가 없거나
//! 비어 있으면 [`ConfigError::MissingCredential`]로 즉시 실패하며, 이때까지
//! 엔진 호출은 단 한 번도 일어나지 않습니다.

use terraprobe_core::config::TerraprobeConfig;
use terraprobe_core::error::{ConfigError, TerraprobeError};
use terraprobe_core::registry::PermanentResources;
use tracing::{debug, info};

/// 클라우드 API 키
///
/// `Debug` 출력은 항상 마스킹됩니다. 실제 값은 [`ApiKey::expose`]로만
/// 꺼낼 수 있으며, 로그로 흘러가서는 안 됩니다.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// 환경변수에서 키를 읽습니다. 없거나 비어 있으면 치명적 설정 에러입니다.
    pub fn from_env(env_key: &str) -> Result<Self, ConfigError> {
        match std::env::var(env_key) {
            Ok(value) if !value.trim().is_empty() => Ok(Self(value)),
            _ => Err(ConfigError::MissingCredential {
                env_key: env_key.to_owned(),
            }),
        }
    }

    /// 실제 키 값을 반환합니다.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// 세션 컨텍스트 — 모든 파이프라인이 공유하는 불변 상태
#[derive(Debug)]
pub struct SessionContext {
    config: TerraprobeConfig,
    api_key: ApiKey,
    registry: PermanentResources,
}

impl SessionContext {
    /// 세션을 조립합니다.
    ///
    /// 순서가 중요합니다: 자격 증명 검사가 레지스트리 로딩보다, 레지스트리
    /// 로딩이 어떤 프로비저닝보다 먼저입니다.
    pub async fn initialize(config: TerraprobeConfig) -> Result<Self, TerraprobeError> {
        config.validate()?;

        let api_key = ApiKey::from_env(&config.credentials.api_key_env)?;
        debug!(env_key = %config.credentials.api_key_env, "credential present");

        let registry = if config.registry.path.is_empty() {
            PermanentResources::empty()
        } else {
            let registry = PermanentResources::load(&config.registry.path).await?;
            info!(
                path = %config.registry.path,
                entries = registry.len(),
                "permanent resource registry loaded"
            );
            registry
        };

        Ok(Self {
            config,
            api_key,
            registry,
        })
    }

    /// 검증된 설정
    pub fn config(&self) -> &TerraprobeConfig {
        &self.config
    }

    /// 클라우드 API 키
    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// 영구 리소스 레지스트리
    pub fn registry(&self) -> &PermanentResources {
        &self.registry
    }

    /// 실패한 실행의 리소스를 보존할지 여부
    pub fn preserve_on_failure(&self) -> bool {
        self.config.runner.preserve_on_failure
    }

    /// 업그레이드 프로토콜 전역 생략 여부
    pub fn skip_upgrade_test(&self) -> bool {
        self.config.runner.skip_upgrade_test
    }
}

#[cfg(test)]
impl SessionContext {
    /// 단위 테스트 전용 — 환경변수를 건드리지 않고 세션을 조립합니다.
    pub(crate) fn for_tests(config: TerraprobeConfig, registry: PermanentResources) -> Self {
        Self {
            config,
            api_key: ApiKey("test-api-key".to_owned()),
            registry,
        }
    }
}
