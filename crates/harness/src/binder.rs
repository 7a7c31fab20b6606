//! 4계층 변수 바인딩
//!
//! 시나리오 하나의 변수는 네 계층을 순서대로 병합해 만듭니다:
//!
//! 1. 시나리오 기본값 + 실행 식별자 (`prefix`, `region`)
//! 2. 영구 리소스 값 — 시나리오의 `permanent_vars` 매핑으로 해석
//! 3. 선행 스택 출력 — `output_vars` 매핑이 있으면 이름을 바꿔서, 없으면 그대로
//! 4. 명시적 재정의
//!
//! 레지스트리 키는 camelCase 서비스 이름, 모듈 입력은 snake_case라서
//! 이름이 일치하지 않습니다. 매핑을 선언으로 끌어올려 손으로 옮겨 적는
//! 코드를 없앱니다.
//!
//! 바인딩은 순수 함수입니다. 네트워크도 디스크도 건드리지 않으며, 같은
//! 입력은 항상 같은 결과(값과 순서 모두)를 냅니다.

use indexmap::IndexMap;
use terraprobe_core::error::ConfigError;
use terraprobe_core::identity::RunIdentity;
use terraprobe_core::registry::PermanentResources;
use terraprobe_core::vars::{VarValue, VariableSet};

use crate::scenario::Scenario;

/// 네 계층을 병합해 실행 변수 집합을 만듭니다.
///
/// 나중 계층이 키 단위로 이기고, 어떤 키도 버려지지 않습니다. 병합이 끝난
/// 뒤 `required_vars`가 전부 있는지 검사하며, 누락 이름은 한 번에 모아
/// [`ConfigError::MissingVariables`]로 보고합니다.
pub fn bind(
    scenario: &Scenario,
    identity: &RunIdentity,
    registry: &PermanentResources,
    prereq_outputs: Option<&IndexMap<String, serde_json::Value>>,
) -> Result<VariableSet, ConfigError> {
    // 1계층: 기본값 위에 실행 식별자를 얹는다. 시나리오 기본값이 prefix를
    // 들고 있어도 실행 식별자가 이긴다. 상위 계층(재정의)은 여전히 이긴다.
    let mut defaults = scenario.defaults.clone();
    defaults.insert("prefix", identity.prefix.as_str());
    defaults.insert("region", identity.region.as_str());

    // 2계층: 영구 리소스 매핑 해석
    let mut permanent = VariableSet::new();
    for (var_name, registry_key) in &scenario.permanent_vars {
        let value = registry.resolve(registry_key)?;
        permanent.insert(var_name.clone(), value.clone());
    }

    // 3계층: 선행 스택 출력
    let outputs = bind_outputs(scenario, prereq_outputs)?;

    let merged = VariableSet::merged([&defaults, &permanent, &outputs, &scenario.overrides]);
    merged.require(&scenario.required_vars)?;
    Ok(merged)
}

fn bind_outputs(
    scenario: &Scenario,
    prereq_outputs: Option<&IndexMap<String, serde_json::Value>>,
) -> Result<VariableSet, ConfigError> {
    let mut layer = VariableSet::new();

    let Some(outputs) = prereq_outputs else {
        // 출력 매핑을 선언했는데 선행 스택이 없으면 조용히 무시하지 않는다
        if !scenario.output_vars.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("scenario.{}.output_vars", scenario.name),
                reason: "output mapping declared but the scenario has no prerequisite".to_owned(),
            });
        }
        return Ok(layer);
    };

    if scenario.output_vars.is_empty() {
        // 매핑이 없으면 출력 이름 그대로 병합. null 출력은 값이 아니므로 버린다.
        for (name, value) in outputs {
            if let Some(value) = VarValue::from_json(value.clone()) {
                layer.insert(name.clone(), value);
            }
        }
        return Ok(layer);
    }

    for (var_name, output_name) in &scenario.output_vars {
        let raw = outputs
            .get(output_name)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: format!("scenario.{}.output_vars.{var_name}", scenario.name),
                reason: format!("prerequisite stack has no output '{output_name}'"),
            })?;
        let value =
            VarValue::from_json(raw.clone()).ok_or_else(|| ConfigError::InvalidValue {
                field: format!("scenario.{}.output_vars.{var_name}", scenario.name),
                reason: format!("prerequisite output '{output_name}' is null"),
            })?;
        layer.insert(var_name.clone(), value);
    }
    Ok(layer)
}
