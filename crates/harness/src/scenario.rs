//! 선언적 시나리오 디스크립터
//!
//! 모든 시나리오는 동일한 파이프라인을 데이터로만 구동합니다. 디스크립터는
//! TOML 파일(`[[scenario]]` 배열)로 기술되며, 어떤 템플릿을(`template_dir`)
//! 어떤 프로토콜로(`protocol`) 어떤 변수 요구사항(`required_vars`) 아래
//! 실행할지를 선언합니다.
//!
//! # 시나리오 파일 예시
//!
//! ```toml
//! [[scenario]]
//! name = "cts-ha"
//! template_dir = "templates/solutions/ha"
//! protocol = "consistency"
//! region = "us-south"
//! required_vars = ["prefix", "region", "existing_vpc_id"]
//!
//! [scenario.defaults]
//! zone_count = 2
//!
//! [scenario.permanent_vars]
//! secrets_manager_guid = "secretsManagerGuid"
//!
//! [scenario.output_vars]
//! existing_vpc_id = "vpc_id"
//!
//! [scenario.prerequisite]
//! template_dir = "templates/prereqs/slz-vpc"
//! ```

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use terraprobe_core::error::{ConfigError, TerraprobeError};
use terraprobe_core::vars::VariableSet;

/// 테스트 프로토콜 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// apply 후 plan이 비어 있어야 함 (멱등성 검증)
    Consistency,
    /// 이전 버전 → 현재 버전 업그레이드가 리소스를 파괴하지 않아야 함
    Upgrade,
    /// 원격 관리형 러너로 제출 후 폴링
    Schematics,
}

impl Protocol {
    /// 리포트/메트릭 레이블용 식별자
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Consistency => "consistency",
            Protocol::Upgrade => "upgrade",
            Protocol::Schematics => "schematics",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 선행 스택 명세
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrereqSpec {
    /// 선행 스택 템플릿 디렉터리
    pub template_dir: PathBuf,
    /// 선행 스택 apply에 전달할 변수 (prefix/region은 자동 주입)
    #[serde(default)]
    pub vars: VariableSet,
}

/// 업그레이드 프로토콜 명세
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeSpec {
    /// 이전에 배포된(기준) 버전의 템플릿 디렉터리
    pub base_dir: PathBuf,
    /// 기준 버전 표기 (리포트 기록용)
    #[serde(default)]
    pub base_version: Option<semver::Version>,
}

/// 시나리오 디스크립터 — 파이프라인을 구동하는 데이터
///
/// 시나리오 간 차이는 오직 이 데이터뿐이며, 제어 흐름은 공유합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// 시나리오 이름 — 실행 접두사의 태그로 쓰이므로 소문자/숫자/하이픈만 허용
    pub name: String,
    /// 검증 대상 모듈 템플릿 디렉터리
    pub template_dir: PathBuf,
    /// 실행 프로토콜
    pub protocol: Protocol,
    /// 실행 리전
    #[serde(default = "default_region")]
    pub region: String,
    /// 병합 후 반드시 존재해야 하는 변수 이름
    #[serde(default)]
    pub required_vars: Vec<String>,
    /// 1계층: 시나리오 기본값
    #[serde(default)]
    pub defaults: VariableSet,
    /// 4계층: 명시적 재정의 (항상 우선)
    #[serde(default)]
    pub overrides: VariableSet,
    /// 2계층 매핑: 모듈 변수 이름 → 영구 리소스 레지스트리 키
    #[serde(default)]
    pub permanent_vars: IndexMap<String, String>,
    /// 3계층 매핑: 모듈 변수 이름 → 선행 스택 출력 이름
    ///
    /// 비어 있으면 선행 스택 출력을 이름 그대로 병합합니다.
    #[serde(default)]
    pub output_vars: IndexMap<String, String>,
    /// 원격 제출 시 secure로 표시할 변수 이름
    #[serde(default)]
    pub secure_vars: Vec<String>,
    /// 원격 번들 포함 패턴 (비어 있으면 전체 포함)
    #[serde(default)]
    pub include: Vec<String>,
    /// 원격 번들 추가 제외 패턴 (기본 제외 목록에 더해짐)
    #[serde(default)]
    pub exclude: Vec<String>,
    /// 선행 스택 (없으면 선행 프로비저닝 생략)
    #[serde(default)]
    pub prerequisite: Option<PrereqSpec>,
    /// 업그레이드 프로토콜 명세 (protocol = "upgrade"일 때 필수)
    #[serde(default)]
    pub upgrade: Option<UpgradeSpec>,
}

fn default_region() -> String {
    "us-south".to_owned()
}

/// 시나리오 파일 — `[[scenario]]` 배열
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// 선언된 시나리오 목록 (입력 순서 유지)
    #[serde(default, rename = "scenario")]
    pub scenarios: Vec<Scenario>,
}

impl ScenarioFile {
    /// 파일에서 시나리오를 로드합니다.
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self, TerraprobeError> {
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

    /// TOML 문자열을 파싱합니다.
    pub fn parse(content: &str) -> Result<Self, TerraprobeError> {
        toml::from_str(content).map_err(|e| {
            TerraprobeError::Config(ConfigError::ParseFailed {
                reason: format!("scenario file: {e}"),
            })
        })
    }

    /// 시나리오 목록의 정합성을 검증합니다.
    ///
    /// 파일 시스템이나 네트워크는 건드리지 않습니다. 템플릿 디렉터리의
    /// 존재 여부는 실행 시점에 확인됩니다.
    pub fn validate(&self) -> Result<(), TerraprobeError> {
        if self.scenarios.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scenario".to_owned(),
                reason: "at least one scenario must be defined".to_owned(),
            }
            .into());
        }

        let mut seen = std::collections::HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !seen.insert(scenario.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "scenario.name".to_owned(),
                    reason: format!("duplicate scenario name: {}", scenario.name),
                }
                .into());
            }
        }
        Ok(())
    }

    /// 이름으로 시나리오를 찾습니다.
    pub fn find(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }
}

impl Scenario {
    /// 단일 시나리오의 정합성을 검증합니다.
    pub fn validate(&self) -> Result<(), TerraprobeError> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scenario.name".to_owned(),
                reason: "name must not be empty".to_owned(),
            }
            .into());
        }

        // 접두사 태그는 클라우드 리소스 이름에 들어가므로 문자 제한이 있음
        let name_ok = self
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !name_ok {
            return Err(ConfigError::InvalidValue {
                field: "scenario.name".to_owned(),
                reason: format!(
                    "'{}' may only contain lowercase letters, digits and '-'",
                    self.name
                ),
            }
            .into());
        }

        if self.template_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scenario.template_dir".to_owned(),
                reason: format!("scenario '{}' has an empty template_dir", self.name),
            }
            .into());
        }

        if self.region.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scenario.region".to_owned(),
                reason: format!("scenario '{}' has an empty region", self.name),
            }
            .into());
        }

        if self.protocol == Protocol::Upgrade && self.upgrade.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "scenario.upgrade".to_owned(),
                reason: format!(
                    "scenario '{}' uses the upgrade protocol but has no [scenario.upgrade] section",
                    self.name
                ),
            }
            .into());
        }

        Ok(())
    }
}
