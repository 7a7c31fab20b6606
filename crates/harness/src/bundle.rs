//! 원격 제출용 소스 번들
//!
//! 원격 관리형 러너는 템플릿 파일 묶음을 업로드받아 실행합니다. 번들 수집은
//! 시나리오의 include/exclude 글롭 패턴으로 파일을 고르며, 버전 관리 잔재와
//! 로컬 상태 파일은 기본 제외 목록이 항상 걸러 냅니다.
//!
//! 패턴 문법은 `*`(세그먼트 안 임의 길이), `?`(한 글자), `**`(0개 이상의
//! 경로 세그먼트) 세 가지만 지원합니다.

use std::io;
use std::path::{Path, PathBuf};

/// 항상 적용되는 제외 패턴
///
/// 시나리오의 exclude는 이 목록에 더해질 뿐, 여기서 뺄 수는 없습니다.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/.terraform/**",
    "**/*.tfstate",
    "**/*.tfstate.backup",
    "**/terraprobe.auto.tfvars.json",
];

/// 수집이 끝난 소스 번들
///
/// 파일 목록은 기준 디렉터리에 대한 상대 경로이며 정렬되어 있어
/// 같은 입력에서 항상 같은 번들이 나옵니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBundle {
    base_dir: PathBuf,
    files: Vec<PathBuf>,
}

impl SourceBundle {
    /// 디렉터리를 걸어 패턴에 맞는 파일을 수집합니다.
    ///
    /// `include`가 비어 있으면 제외되지 않은 모든 파일이 포함됩니다.
    pub fn collect(
        base: impl AsRef<Path>,
        include: &[String],
        exclude: &[String],
    ) -> io::Result<SourceBundle> {
        let base = base.as_ref();
        let mut files = Vec::new();
        walk(base, base, &mut files)?;

        files.retain(|rel| {
            let rel_str = slash_path(rel);
            if DEFAULT_EXCLUDES
                .iter()
                .any(|p| matches_pattern(p, &rel_str))
            {
                return false;
            }
            if exclude.iter().any(|p| matches_pattern(p, &rel_str)) {
                return false;
            }
            include.is_empty() || include.iter().any(|p| matches_pattern(p, &rel_str))
        });
        files.sort();

        Ok(SourceBundle {
            base_dir: base.to_path_buf(),
            files,
        })
    }

    /// 기준 디렉터리
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// 상대 경로 파일 목록 (정렬됨)
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 제출 요청 조립용으로 분해합니다.
    pub fn into_parts(self) -> (PathBuf, Vec<PathBuf>) {
        (self.base_dir, self.files)
    }
}

/// 파일만 재귀 수집합니다. `.git`/`.terraform`은 내려가지 않습니다.
///
/// 디렉터리 가지치기는 순회 비용 절감일 뿐이고, 실제 포함 여부는 항상
/// 패턴 필터가 결정합니다.
fn walk(base: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            let name = entry.file_name();
            if name == ".git" || name == ".terraform" {
                continue;
            }
            walk(base, &path, files)?;
        } else if let Ok(rel) = path.strip_prefix(base) {
            files.push(rel.to_path_buf());
        }
    }
    Ok(())
}

/// 경로를 '/' 구분자 문자열로 바꿉니다 (패턴 매칭용).
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// 글롭 패턴이 상대 경로와 일치하는지 판정합니다.
pub fn matches_pattern(pattern: &str, path: &str) -> bool {
    let pat: Vec<&str> = pattern.split('/').collect();
    let segs: Vec<&str> = path.split('/').collect();
    match_segments(&pat, &segs)
}

fn match_segments(pat: &[&str], segs: &[&str]) -> bool {
    match pat.split_first() {
        None => segs.is_empty(),
        // `**`는 0개 이상의 세그먼트를 삼킨다
        Some((&"**", rest)) => (0..=segs.len()).any(|skip| match_segments(rest, &segs[skip..])),
        Some((first, rest)) => match segs.split_first() {
            Some((seg, seg_rest)) => match_one(first, seg) && match_segments(rest, seg_rest),
            None => false,
        },
    }
}

/// 세그먼트 하나에 대한 `*`/`?` 매칭 (그리디 + 역추적, 선형 시간)
fn match_one(pattern: &str, segment: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = segment.chars().collect();
    let (mut pi, mut si) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while si < s.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == s[si]) {
            pi += 1;
            si += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, si));
            pi += 1;
        } else if let Some((star_pi, star_si)) = star {
            // 마지막 '*'가 한 글자 더 삼키도록 되돌린다
            pi = star_pi + 1;
            si = star_si + 1;
            star = Some((star_pi, star_si + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
