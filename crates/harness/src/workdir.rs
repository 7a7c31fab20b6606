//! 격리된 실행 디렉터리
//!
//! 템플릿 원본은 절대 직접 건드리지 않습니다. 실행마다 템플릿을 임시
//! 디렉터리로 복사해 상태 파일이 서로 섞이지 않게 하고, 디렉터리는
//! [`StagedWorkdir`]가 드롭될 때 함께 제거됩니다. 보존이 결정된 실행만
//! [`StagedWorkdir::keep`]으로 디렉터리를 남깁니다.
//!
//! 복사 대상은 작은 템플릿 트리(수 개의 .tf 파일)라는 전제이며, 원본의
//! `.git`/`.terraform` 디렉터리와 로컬 상태 파일은 복사하지 않습니다.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

/// 재스테이징 시 실행 디렉터리에 남겨 두는 항목
///
/// 업그레이드 프로토콜은 기반 버전의 상태 위에 대상 버전 코드를 올려야
/// 하므로, 상태와 프로바이더 캐시는 교체 대상에서 제외합니다.
const PRESERVED_ON_RESTAGE: &[&str] = &[
    ".terraform",
    ".terraform.lock.hcl",
    "terraform.tfstate",
    "terraform.tfstate.backup",
    "terraprobe.auto.tfvars.json",
];

/// 실행 하나에 귀속된 격리 작업 디렉터리
///
/// 드롭 시 디렉터리 전체가 삭제됩니다.
#[derive(Debug)]
pub struct StagedWorkdir {
    dir: TempDir,
    label: String,
}

impl StagedWorkdir {
    /// 템플릿을 새 임시 디렉터리로 복사합니다.
    ///
    /// 디렉터리 이름은 `terraprobe-{label}-` 접두사를 가지므로 크래시 후에도
    /// 어느 실행의 잔여물인지 식별할 수 있습니다.
    pub fn stage(template: impl AsRef<Path>, label: &str) -> io::Result<Self> {
        let template = template.as_ref();
        let dir = tempfile::Builder::new()
            .prefix(&format!("terraprobe-{label}-"))
            .tempdir()?;
        copy_tree(template, dir.path())?;
        debug!(
            template = %template.display(),
            workdir = %dir.path().display(),
            "template staged"
        );
        Ok(Self {
            dir,
            label: label.to_owned(),
        })
    }

    /// 작업 디렉터리 경로
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// 스테이징 시 지정한 라벨
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 상태 파일을 남긴 채 코드를 다른 템플릿으로 교체합니다.
    ///
    /// 기존 템플릿에만 있던 파일은 제거되고, [`PRESERVED_ON_RESTAGE`]에
    /// 해당하는 항목은 그대로 유지됩니다.
    pub fn restage(&self, template: impl AsRef<Path>) -> io::Result<()> {
        let template = template.as_ref();
        for entry in std::fs::read_dir(self.path())? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if PRESERVED_ON_RESTAGE.iter().any(|keep| *keep == name) {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        copy_tree(template, self.path())?;
        debug!(
            template = %template.display(),
            workdir = %self.path().display(),
            "workdir restaged"
        );
        Ok(())
    }

    /// 디렉터리를 디스크에 남기고 경로를 반환합니다.
    ///
    /// 이후 정리는 호출자(대개 운영자)의 몫입니다.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

/// 템플릿 트리를 재귀 복사합니다.
///
/// `.git`/`.terraform` 디렉터리와 `*.tfstate*` 파일은 건너뜁니다.
/// 버전 고정 의도를 담은 `.terraform.lock.hcl`은 복사 대상입니다.
fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let target = dst.join(&name);
        let name = name.to_string_lossy();

        if entry.file_type()?.is_dir() {
            if name == ".git" || name == ".terraform" {
                continue;
            }
            std::fs::create_dir_all(&target)?;
            copy_tree(&entry.path(), &target)?;
        } else {
            if name.contains(".tfstate") {
                continue;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
