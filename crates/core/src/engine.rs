//! Execution-engine abstraction for testability.
//!
//! The [`Engine`] trait abstracts the infrastructure-as-code CLI (init, apply,
//! plan, destroy), so the orchestration pipelines never shell out directly.
//! The [`RemoteRunner`] trait does the same for the managed test-runner
//! service used by remote-managed scenarios.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │ harness pipelines │
//! └───────┬─────┬─────┘
//!         │     │
//!         ▼     ▼
//!  ┌────────┐ ┌──────────────┐
//!  │ Engine │ │ RemoteRunner │  (traits)
//!  └───┬────┘ └──────┬───────┘
//!      │             │
//!      ▼             ▼
//!  ProcessEngine  helper process / mock
//! ```
//!
//! Production implementations live in `terraprobe-engine`; tests use mock
//! implementations with scripted responses.
//!
//! # Destroy idempotency
//!
//! `destroy` must be safe to call on a directory whose resources were never
//! created or were already destroyed. The teardown path relies on this to stay
//! best-effort: it never checks state before destroying.

use std::future::Future;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::vars::{FlatVar, VariableSet};

/// Parsed result of a `plan` run.
///
/// `destroyed_addresses` carries the resource addresses the plan would
/// destroy; it is only populated when `destroy > 0` and the engine adapter
/// could extract addresses from the plan output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Resources the plan would create.
    pub add: u32,
    /// Resources the plan would modify in place.
    pub change: u32,
    /// Resources the plan would destroy.
    pub destroy: u32,
    /// Addresses of resources the plan would destroy.
    pub destroyed_addresses: Vec<String>,
}

impl PlanSummary {
    /// A plan with no pending changes.
    pub fn clean() -> Self {
        Self::default()
    }

    /// Returns `true` when the plan proposes no changes at all.
    pub fn is_clean(&self) -> bool {
        self.add == 0 && self.change == 0 && self.destroy == 0
    }

    /// Returns `true` when the plan proposes any change.
    pub fn has_changes(&self) -> bool {
        !self.is_clean()
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to add, {} to change, {} to destroy",
            self.add, self.change, self.destroy
        )
    }
}

/// Trait abstracting the infrastructure execution engine.
///
/// All engine operations take the working directory explicitly; the engine
/// itself holds no per-run state, so one instance can serve many concurrent
/// pipelines.
///
/// # Implementations
///
/// - `ProcessEngine` (in `terraprobe-engine`): spawns the configured CLI
/// - `MockEngine`: test implementation with scripted responses
///
/// # Errors
///
/// Every method returns [`EngineError`]: `Spawn` when the binary cannot be
/// started, `Failed` for a non-zero exit, `OutputParse` when stdout cannot be
/// interpreted.
pub trait Engine: Send + Sync + 'static {
    /// Prepares the working directory (provider/plugin setup).
    fn init(&self, dir: &Path) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Applies the configuration, creating or updating resources.
    ///
    /// `vars` is the fully merged variable set for the run; how it reaches
    /// the engine (files, arguments, environment) is the implementation's
    /// concern.
    fn apply(
        &self,
        dir: &Path,
        vars: &VariableSet,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Computes the pending-change summary without applying anything.
    fn plan(
        &self,
        dir: &Path,
        vars: &VariableSet,
    ) -> impl Future<Output = Result<PlanSummary, EngineError>> + Send;

    /// Reads the declared output values of an applied directory.
    fn outputs(
        &self,
        dir: &Path,
    ) -> impl Future<Output = Result<IndexMap<String, serde_json::Value>, EngineError>> + Send;

    /// Destroys every resource recorded in the directory's state.
    ///
    /// Must be idempotent: succeeding on an empty or never-applied state.
    fn destroy(&self, dir: &Path) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// Submission payload for a remote-managed test job.
///
/// The serialized form is the submission wire format and therefore carries
/// real variable values, secure ones included. Never log the serialized
/// request; the `Debug` form (which redacts secure values) is the only
/// representation safe for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Job name, derived from the run prefix.
    pub name: String,
    /// Region the remote runner should execute in.
    pub region: String,
    /// Directory the bundle file list is relative to.
    pub base_dir: PathBuf,
    /// Files to package, relative to `base_dir`.
    pub files: Vec<PathBuf>,
    /// Flattened typed variables, with secure markers.
    pub vars: Vec<FlatVar>,
}

/// Opaque reference to a submitted remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Runner-assigned job identifier.
    pub id: String,
}

/// Observed state of a remote job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum JobStatus {
    /// Still executing; poll again later.
    Running,
    /// Finished successfully with the job's output document.
    Succeeded(serde_json::Value),
    /// Finished unsuccessfully with the runner's reason.
    Failed(String),
}

impl JobStatus {
    /// Returns `true` while the job has not reached a terminal state.
    pub fn is_running(&self) -> bool {
        matches!(self, JobStatus::Running)
    }
}

/// Trait abstracting the managed remote test-runner service.
///
/// The deadline loop (poll interval, overall ceiling) lives in the harness
/// executor, not here: implementations only submit and report status, which
/// keeps any timing behavior scriptable in tests.
pub trait RemoteRunner: Send + Sync + 'static {
    /// Submits a packaged job for remote execution.
    fn submit(
        &self,
        request: &SubmitRequest,
    ) -> impl Future<Output = Result<JobHandle, EngineError>> + Send;

    /// Reports the current status of a submitted job.
    fn poll(&self, job: &JobHandle) -> impl Future<Output = Result<JobStatus, EngineError>> + Send;
}
