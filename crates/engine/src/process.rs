//! Subprocess adapters for the execution traits.
//!
//! [`ProcessEngine`] shells out to the configured engine binary with one
//! invocation per operation:
//!
//! ```text
//! init    -> <program> init -input=false -no-color
//! apply   -> <program> apply -input=false -auto-approve -no-color
//! plan    -> <program> plan -input=false -detailed-exitcode -no-color
//! outputs -> <program> output -json
//! destroy -> <program> destroy -input=false -auto-approve -no-color
//! ```
//!
//! Variables reach the binary through a `terraprobe.auto.tfvars.json` file
//! written into the working directory before `apply` and `plan`. The engine
//! picks `*.auto.tfvars.json` up automatically, and because the file stays in
//! the directory, a later `destroy` sees the same values without the caller
//! re-supplying them.
//!
//! [`ProcessRemoteRunner`] adapts the remote-runner trait onto a helper
//! command configured via `[schematics].helper`. The helper owns transport
//! and authentication for the managed runner service; this side only
//! serializes submit requests onto its stdin and parses status documents from
//! its stdout, which keeps the whole remote protocol scriptable with a
//! shell-script fake.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use indexmap::IndexMap;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use terraprobe_core::config::{EngineConfig, SchematicsConfig};
use terraprobe_core::engine::{
    Engine, JobHandle, JobStatus, PlanSummary, RemoteRunner, SubmitRequest,
};
use terraprobe_core::error::{ConfigError, EngineError, TerraprobeError};
use terraprobe_core::metrics as m;
use terraprobe_core::vars::VariableSet;

use crate::plan::parse_plan;
use crate::retry::RetryPolicy;

/// Variables file staged next to the configuration before apply/plan.
///
/// The `.auto.tfvars.json` suffix makes the engine load it without an
/// explicit `-var-file` argument.
const VARS_FILE: &str = "terraprobe.auto.tfvars.json";

/// Exit code the engine uses for "plan succeeded, changes pending" when
/// `-detailed-exitcode` is set.
const PLAN_CHANGES_EXIT: i32 = 2;

/// One `output -json` entry; only the value matters to the harness.
#[derive(Debug, Deserialize)]
struct OutputEntry {
    value: serde_json::Value,
}

/// Engine implementation that spawns the configured binary per operation.
///
/// Holds no per-run state; the working directory is passed into every call,
/// so a single instance serves any number of concurrent pipelines.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: String,
    policy: RetryPolicy,
}

impl ProcessEngine {
    /// Creates an engine from configuration.
    ///
    /// The retry allow-list is compiled here so malformed operator patterns
    /// are rejected before the first run starts.
    pub fn new(config: &EngineConfig) -> Result<Self, TerraprobeError> {
        Ok(Self {
            program: config.program.clone(),
            policy: RetryPolicy::from_config(config)?,
        })
    }

    /// Runs one engine command and captures its output.
    ///
    /// Exit-status interpretation is left to the caller; `plan` treats exit
    /// code 2 as success-with-changes.
    async fn run_command(
        &self,
        op: &'static str,
        dir: &Path,
        args: &[&str],
    ) -> Result<std::process::Output, EngineError> {
        debug!(program = %self.program, operation = op, dir = %dir.display(), "running engine command");
        let started = Instant::now();

        let result = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .env("TF_IN_AUTOMATION", "1")
            .kill_on_drop(true)
            .output()
            .await;

        match result {
            Ok(output) => {
                metrics::histogram!(m::ENGINE_COMMAND_DURATION_SECONDS, m::LABEL_OPERATION => op)
                    .record(started.elapsed().as_secs_f64());
                let result_label = if output.status.success() { "ok" } else { "error" };
                metrics::counter!(
                    m::ENGINE_COMMANDS_TOTAL,
                    m::LABEL_OPERATION => op,
                    m::LABEL_RESULT => result_label
                )
                .increment(1);
                Ok(output)
            }
            Err(e) => {
                metrics::counter!(
                    m::ENGINE_COMMANDS_TOTAL,
                    m::LABEL_OPERATION => op,
                    m::LABEL_RESULT => "spawn_error"
                )
                .increment(1);
                Err(EngineError::Spawn {
                    program: self.program.clone(),
                    source: e,
                })
            }
        }
    }

    /// Runs a command and converts any non-zero exit into `EngineError::Failed`.
    async fn run_checked(
        &self,
        op: &'static str,
        dir: &Path,
        args: &[&str],
    ) -> Result<std::process::Output, EngineError> {
        let output = self.run_command(op, dir, args).await?;
        ensure_success(op, output)
    }

    /// Runs a command under the transient-failure retry policy.
    ///
    /// Only `init` and `apply` come through here.
    async fn run_retried(
        &self,
        op: &'static str,
        dir: &Path,
        args: &[&str],
    ) -> Result<std::process::Output, EngineError> {
        let mut retries = 0;
        loop {
            match self.run_checked(op, dir, args).await {
                Ok(output) => return Ok(output),
                Err(err) => {
                    let transient = match &err {
                        EngineError::Failed { stderr, .. } => self.policy.is_transient(stderr),
                        _ => false,
                    };
                    if !transient || retries >= self.policy.max_retries() {
                        return Err(err);
                    }
                    retries += 1;
                    metrics::counter!(m::ENGINE_RETRIES_TOTAL, m::LABEL_OPERATION => op)
                        .increment(1);
                    warn!(
                        operation = op,
                        retry = retries,
                        max_retries = self.policy.max_retries(),
                        error = %err,
                        "transient engine failure, retrying after backoff"
                    );
                    tokio::time::sleep(self.policy.backoff()).await;
                }
            }
        }
    }

    /// Writes the merged variable set as an auto-loaded tfvars file.
    async fn stage_vars(&self, dir: &Path, vars: &VariableSet) -> Result<(), EngineError> {
        let json = serde_json::to_vec_pretty(vars).map_err(|e| EngineError::VarsFile {
            reason: format!("serialize variables: {e}"),
        })?;
        tokio::fs::write(dir.join(VARS_FILE), json)
            .await
            .map_err(|e| EngineError::VarsFile {
                reason: format!("write {VARS_FILE}: {e}"),
            })
    }
}

impl Engine for ProcessEngine {
    async fn init(&self, dir: &Path) -> Result<(), EngineError> {
        self.run_retried("init", dir, &["init", "-input=false", "-no-color"])
            .await?;
        Ok(())
    }

    async fn apply(&self, dir: &Path, vars: &VariableSet) -> Result<(), EngineError> {
        self.stage_vars(dir, vars).await?;
        self.run_retried(
            "apply",
            dir,
            &["apply", "-input=false", "-auto-approve", "-no-color"],
        )
        .await?;
        Ok(())
    }

    async fn plan(&self, dir: &Path, vars: &VariableSet) -> Result<PlanSummary, EngineError> {
        self.stage_vars(dir, vars).await?;
        let output = self
            .run_command(
                "plan",
                dir,
                &["plan", "-input=false", "-detailed-exitcode", "-no-color"],
            )
            .await?;

        match output.status.code() {
            Some(0) => Ok(PlanSummary::clean()),
            Some(PLAN_CHANGES_EXIT) => parse_plan(&String::from_utf8_lossy(&output.stdout)),
            _ => Err(failure("plan", &output)),
        }
    }

    async fn outputs(&self, dir: &Path) -> Result<IndexMap<String, serde_json::Value>, EngineError> {
        let output = self.run_checked("output", dir, &["output", "-json"]).await?;
        let entries: IndexMap<String, OutputEntry> = serde_json::from_slice(&output.stdout)
            .map_err(|e| EngineError::OutputParse {
                reason: format!("output -json: {e}"),
            })?;
        Ok(entries.into_iter().map(|(k, v)| (k, v.value)).collect())
    }

    async fn destroy(&self, dir: &Path) -> Result<(), EngineError> {
        self.run_checked(
            "destroy",
            dir,
            &["destroy", "-input=false", "-auto-approve", "-no-color"],
        )
        .await?;
        Ok(())
    }
}

/// Converts a non-zero exit into `EngineError::Failed`.
fn ensure_success(
    op: &'static str,
    output: std::process::Output,
) -> Result<std::process::Output, EngineError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(failure(op, &output))
    }
}

fn failure(op: &'static str, output: &std::process::Output) -> EngineError {
    EngineError::Failed {
        op,
        code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    }
}

/// Remote runner that delegates submission and polling to a helper command.
///
/// Contract with the helper:
///
/// ```text
/// <helper> submit          reads a submit-request JSON document on stdin,
///                          prints the assigned job id on stdout
/// <helper> poll <job-id>   prints a status JSON document on stdout
/// ```
///
/// A non-zero helper exit is reported as a remote API error with the
/// helper's stderr as the reason.
#[derive(Debug, Clone)]
pub struct ProcessRemoteRunner {
    helper: String,
}

impl ProcessRemoteRunner {
    /// Creates a runner from schematics configuration.
    ///
    /// An empty helper means remote execution is not configured; scenarios
    /// using the remote protocol cannot run without one.
    pub fn new(config: &SchematicsConfig) -> Result<Self, TerraprobeError> {
        if config.helper.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "schematics.helper".to_owned(),
                reason: "remote protocol requires a helper command".to_owned(),
            }
            .into());
        }
        Ok(Self {
            helper: config.helper.clone(),
        })
    }
}

impl RemoteRunner for ProcessRemoteRunner {
    async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, EngineError> {
        // Serialized form carries real secure values. It goes to the helper's
        // stdin only and must never hit the log stream.
        let payload = serde_json::to_vec(request).map_err(|e| EngineError::RemoteApi {
            reason: format!("encode submit request: {e}"),
        })?;

        let mut child = Command::new(&self.helper)
            .arg("submit")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Spawn {
                program: self.helper.clone(),
                source: e,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| EngineError::RemoteApi {
            reason: "helper stdin unavailable".to_owned(),
        })?;
        // A helper that exits before reading leaves a broken pipe here; its
        // exit status and stderr are the more useful diagnostic, so the write
        // error is only reported when the helper claims success.
        let write_result = stdin.write_all(&payload).await;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| EngineError::RemoteApi {
                reason: format!("helper did not finish: {e}"),
            })?;
        if !output.status.success() {
            return Err(EngineError::RemoteApi {
                reason: format!(
                    "helper submit failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        if let Err(e) = write_result {
            return Err(EngineError::RemoteApi {
                reason: format!("write submit request: {e}"),
            });
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if id.is_empty() {
            return Err(EngineError::RemoteApi {
                reason: "helper submit returned no job id".to_owned(),
            });
        }
        debug!(job_id = %id, name = %request.name, "remote job submitted");
        Ok(JobHandle { id })
    }

    async fn poll(&self, job: &JobHandle) -> Result<JobStatus, EngineError> {
        let output = Command::new(&self.helper)
            .arg("poll")
            .arg(&job.id)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EngineError::Spawn {
                program: self.helper.clone(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(EngineError::RemoteApi {
                reason: format!(
                    "helper poll failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        serde_json::from_slice(&output.stdout).map_err(|e| EngineError::RemoteApi {
            reason: format!("parse poll status: {e}"),
        })
    }
}
