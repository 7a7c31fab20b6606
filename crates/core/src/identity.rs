//! 실행 식별자 — 충돌 없는 사람이 읽을 수 있는 prefix
//!
//! 같은 클라우드 계정을 공유하는 동시 실행들이 리소스 이름으로 서로를
//! 구분하는 유일한 수단이 prefix입니다. 모든 리소스 이름은 prefix에서
//! 파생되므로, 크래시 후에도 prefix만 알면 잔여 리소스를 찾을 수 있습니다.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// 무작위 접미사 길이
pub const SUFFIX_LEN: usize = 6;

/// 접미사 문자 집합 — 소문자 영숫자 36종
///
/// 36^6 ≈ 2.2 * 10^9 가지. 클라우드 리소스 이름 제약(소문자) 안에서
/// 충돌 가능성을 무시할 수 있는 수준으로 유지합니다.
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// 실행 하나를 식별하는 불변 값
///
/// [`RunIdentity::generate`]로 만들어진 뒤에는 변하지 않으며,
/// 파이프라인의 모든 단계가 같은 값을 참조합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// 사람이 읽을 수 있는 실행 prefix (`<태그>-<접미사>`)
    pub prefix: String,
    /// 대상 리전
    pub region: String,
}

impl RunIdentity {
    /// 태그에 무작위 접미사를 붙여 새 식별자를 생성합니다.
    ///
    /// 태그 형식 검증은 시나리오 검증 단계의 책임이며 여기서는 하지 않습니다.
    pub fn generate(tag: &str, region: &str) -> Self {
        Self {
            prefix: format!("{tag}-{}", random_suffix()),
            region: region.to_owned(),
        }
    }

    /// 이 실행에 속한 리소스의 이름을 만듭니다.
    ///
    /// 예: prefix가 `cts-vpn-x1y2z3`이면 `resource_name("rg")`는
    /// `cts-vpn-x1y2z3-rg`입니다.
    pub fn resource_name(&self, kind: &str) -> String {
        format!("{}-{kind}", self.prefix)
    }
}

impl std::fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.prefix, self.region)
    }
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SUFFIX_CHARSET.len());
            SUFFIX_CHARSET[idx] as char
        })
        .collect()
}
