//! 변수 집합 — 계층 병합과 평탄화
//!
//! [`VariableSet`]은 삽입 순서를 보존하는 이름→값 매핑입니다.
//! 바인딩 단계는 네 계층(기본값 < 영구 리소스 < 선행 스택 출력 < 오버라이드)을
//! [`VariableSet::merged`]로 합치고, 병합 결과는 순수 함수처럼 입력에만 의존합니다.
//!
//! # 병합 규칙
//!
//! - 키의 합집합을 만들고, 같은 키는 나중 계층의 값이 이깁니다.
//! - 이미 있던 키는 원래 위치를 유지한 채 값만 교체되므로
//!   동일 입력에 대해 항상 동일한 순서가 나옵니다.
//!
//! # 사용 예시
//! ```
//! use terraprobe_core::vars::{VarValue, VariableSet};
//!
//! let mut defaults = VariableSet::new();
//! defaults.insert("region", "us-south");
//! defaults.insert("prefix", "abc123");
//!
//! let mut overrides = VariableSet::new();
//! overrides.insert("region", "eu-de");
//!
//! let merged = VariableSet::merged([&defaults, &overrides]);
//! assert_eq!(merged.get("region"), Some(&VarValue::from("eu-de")));
//! assert_eq!(merged.get("prefix"), Some(&VarValue::from("abc123")));
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 변수 값
///
/// 시나리오 파일(TOML), 레지스트리 문서(YAML), 엔진 출력(JSON) 어디에서 오든
/// 동일한 타입으로 다룹니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    /// 불리언
    Bool(bool),
    /// 정수
    Int(i64),
    /// 실수
    Float(f64),
    /// 문자열
    String(String),
    /// 리스트
    List(Vec<VarValue>),
    /// 중첩 객체
    Object(IndexMap<String, VarValue>),
}

impl VarValue {
    /// 원격 제출용 타입 이름 (string, bool, number, list, object)
    pub fn type_name(&self) -> &'static str {
        match self {
            VarValue::Bool(_) => "bool",
            VarValue::Int(_) | VarValue::Float(_) => "number",
            VarValue::String(_) => "string",
            VarValue::List(_) => "list",
            VarValue::Object(_) => "object",
        }
    }

    /// JSON 값에서 변환합니다.
    ///
    /// 최상위 `null`은 `None`을 반환합니다. 리스트/객체 내부의 `null` 요소는
    /// 버려집니다 (엔진 출력에 의미 있는 null이 없다는 전제).
    pub fn from_json(value: serde_json::Value) -> Option<VarValue> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(VarValue::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(VarValue::Int(i))
                } else {
                    n.as_f64().map(VarValue::Float)
                }
            }
            serde_json::Value::String(s) => Some(VarValue::String(s)),
            serde_json::Value::Array(items) => Some(VarValue::List(
                items.into_iter().filter_map(VarValue::from_json).collect(),
            )),
            serde_json::Value::Object(map) => Some(VarValue::Object(
                map.into_iter()
                    .filter_map(|(k, v)| VarValue::from_json(v).map(|v| (k, v)))
                    .collect(),
            )),
        }
    }
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        VarValue::String(value.to_owned())
    }
}

impl From<String> for VarValue {
    fn from(value: String) -> Self {
        VarValue::String(value)
    }
}

impl From<bool> for VarValue {
    fn from(value: bool) -> Self {
        VarValue::Bool(value)
    }
}

impl From<i64> for VarValue {
    fn from(value: i64) -> Self {
        VarValue::Int(value)
    }
}

impl From<i32> for VarValue {
    fn from(value: i32) -> Self {
        VarValue::Int(i64::from(value))
    }
}

impl From<f64> for VarValue {
    fn from(value: f64) -> Self {
        VarValue::Float(value)
    }
}

impl From<Vec<VarValue>> for VarValue {
    fn from(value: Vec<VarValue>) -> Self {
        VarValue::List(value)
    }
}

/// 삽입 순서를 보존하는 변수 집합
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableSet {
    vars: IndexMap<String, VarValue>,
}

impl VariableSet {
    /// 빈 변수 집합을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 변수를 추가하거나 교체합니다.
    ///
    /// 기존 키는 위치를 유지한 채 값만 바뀝니다.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<VarValue>) {
        self.vars.insert(name.into(), value.into());
    }

    /// 이름으로 값을 조회합니다.
    pub fn get(&self, name: &str) -> Option<&VarValue> {
        self.vars.get(name)
    }

    /// 해당 이름의 변수가 있는지 확인합니다.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// 변수 개수
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// (이름, 값) 순회
    pub fn iter(&self) -> impl Iterator<Item = (&String, &VarValue)> {
        self.vars.iter()
    }

    /// 변수 이름 순회
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.vars.keys()
    }

    /// 다른 집합의 모든 변수를 이 집합에 덮어씁니다.
    pub fn merge_from(&mut self, other: &VariableSet) {
        for (name, value) in &other.vars {
            self.vars.insert(name.clone(), value.clone());
        }
    }

    /// 낮은 우선순위부터 나열된 계층들을 하나로 병합합니다.
    ///
    /// 네트워크나 디스크를 건드리지 않는 순수 연산입니다.
    pub fn merged<'a>(layers: impl IntoIterator<Item = &'a VariableSet>) -> VariableSet {
        let mut result = VariableSet::new();
        for layer in layers {
            result.merge_from(layer);
        }
        result
    }

    /// 필수 변수가 모두 존재하는지 검증합니다.
    ///
    /// 누락된 이름을 전부 모아 한 번에 보고합니다.
    pub fn require(&self, required: &[String]) -> Result<(), ConfigError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| !self.contains(name))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingVariables { names: missing })
        }
    }

    /// 원격 제출용 타입 지정 변수 목록으로 평탄화합니다.
    ///
    /// `secure_names`에 포함된 변수는 secure로 표시되며, [`FlatVar`]의
    /// `Debug` 출력에서 값이 가려집니다.
    pub fn flatten(&self, secure_names: &[String]) -> Vec<FlatVar> {
        self.vars
            .iter()
            .map(|(name, value)| FlatVar {
                name: name.clone(),
                data_type: value.type_name().to_owned(),
                secure: secure_names.iter().any(|s| s == name),
                value: value.clone(),
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a VariableSet {
    type Item = (&'a String, &'a VarValue);
    type IntoIter = indexmap::map::Iter<'a, String, VarValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}

/// 원격 제출용 평탄화 변수
///
/// 직렬화 결과는 제출 페이로드이므로 실제 값을 담습니다. 로그에는 반드시
/// `Debug` 표현만 사용해야 하며, secure 변수의 값은 거기서 가려집니다.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatVar {
    /// 변수 이름
    pub name: String,
    /// 변수 값
    pub value: VarValue,
    /// 타입 이름 (string, bool, number, list, object)
    #[serde(rename = "type")]
    pub data_type: String,
    /// 로그·리포트에서 값을 가릴지 여부
    pub secure: bool,
}

impl fmt::Debug for FlatVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("FlatVar");
        debug.field("name", &self.name);
        if self.secure {
            debug.field("value", &"<redacted>");
        } else {
            debug.field("value", &self.value);
        }
        debug
            .field("type", &self.data_type)
            .field("secure", &self.secure)
            .finish()
    }
}
