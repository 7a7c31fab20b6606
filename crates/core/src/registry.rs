//! 영구 리소스 레지스트리 — 계정에 상주하는 공유 자원 식별자 문서
//!
//! 비용이 크거나 생성이 느린 자원(인증서 관리 서비스, 공용 VPC 등)은 실행마다
//! 만들지 않고 계정에 상주시킨 채 식별자만 참조합니다. 이 문서는 그런 자원의
//! 키→값 목록을 담은 읽기 전용 YAML 파일이며 세션 시작 시 한 번 로드됩니다.
//!
//! ```yaml
//! secretsManagerGuid: 79c6d41d-2c18-289d-b51f-0e39377b9826
//! secretsManagerRegion: us-south
//! privateCertTemplateName: cert-template
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TerraprobeError};
use crate::vars::VarValue;

/// 읽기 전용 영구 리소스 문서
///
/// 쓰기 경로는 없습니다. 바인딩 단계가 시나리오의 매핑을 통해
/// 여기서 값을 조회합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermanentResources {
    values: IndexMap<String, VarValue>,
}

impl PermanentResources {
    /// 빈 문서 — 레지스트리 파일이 설정되지 않은 세션용
    pub fn empty() -> Self {
        Self::default()
    }

    /// YAML 파일에서 문서를 로드합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TerraprobeError> {
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
        Self::parse(&content)
    }

    /// YAML 문자열에서 문서를 파싱합니다.
    ///
    /// 빈 문서는 빈 레지스트리로 취급합니다.
    pub fn parse(yaml: &str) -> Result<Self, TerraprobeError> {
        if yaml.trim().is_empty() {
            return Ok(Self::empty());
        }
        serde_yaml::from_str(yaml).map_err(|e| {
            TerraprobeError::Config(ConfigError::ParseFailed {
                reason: format!("permanent resources: {e}"),
            })
        })
    }

    /// 키로 값을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&VarValue> {
        self.values.get(key)
    }

    /// 키로 값을 조회하되, 없으면 에러를 반환합니다.
    ///
    /// 시나리오가 존재하지 않는 키를 참조하면 프로비저닝 전에
    /// [`ConfigError::RegistryKeyMissing`]으로 중단됩니다.
    pub fn resolve(&self, key: &str) -> Result<&VarValue, ConfigError> {
        self.values
            .get(key)
            .ok_or_else(|| ConfigError::RegistryKeyMissing {
                key: key.to_owned(),
            })
    }

    /// 등록된 키 개수
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 키 순회 (문서 순서 유지)
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }
}
