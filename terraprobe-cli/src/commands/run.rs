//! `terraprobe run` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use terraprobe_core::config::TerraprobeConfig;
use terraprobe_engine::{ProcessEngine, ProcessRemoteRunner};
use terraprobe_harness::scenario::Scenario;
use terraprobe_harness::{
    Coordinator, RunResult, RunSummary, ScenarioFile, ScenarioReport, SessionContext, summarize,
};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::logging;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
///
/// Loads configuration and scenarios, initializes the session (credential
/// lookup, registry), wires the subprocess engine and the optional remote
/// runner, then hands the batch to the coordinator. A Ctrl-C cancels all
/// in-flight scenarios; resources created so far are still torn down.
///
/// # Errors
///
/// Returns `CliError::Config` / `CliError::Scenario` for input problems and
/// `CliError::RunFailed` when any scenario fails or is cancelled.
pub async fn execute(
    args: RunArgs,
    config_path: &Path,
    log_level: Option<&str>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = TerraprobeConfig::load(config_path)
        .await
        .map_err(|e| CliError::Config(e.to_string()))?;

    // Command-line flags beat both the file and TERRAPROBE_* env overrides
    if args.preserve_on_failure {
        config.runner.preserve_on_failure = true;
    }
    if let Some(limit) = args.max_concurrent {
        if limit == 0 {
            return Err(CliError::Config(
                "--max-concurrent must be at least 1".to_owned(),
            ));
        }
        config.runner.max_concurrent = limit;
    }

    logging::init_tracing(&config.general, log_level)?;
    info!(
        config = %config_path.display(),
        scenarios = %args.scenarios.display(),
        "terraprobe starting"
    );

    let file = ScenarioFile::load(&args.scenarios)
        .await
        .map_err(|e| CliError::Scenario(e.to_string()))?;
    file.validate()
        .map_err(|e| CliError::Scenario(e.to_string()))?;
    let scenarios = select_scenarios(&file, &args.names)?;

    let session = SessionContext::initialize(config).await?;
    let engine = Arc::new(ProcessEngine::new(&session.config().engine)?);
    let remote = if session.config().schematics.helper.trim().is_empty() {
        None
    } else {
        Some(Arc::new(ProcessRemoteRunner::new(
            &session.config().schematics,
        )?))
    };

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling scenarios");
                cancel.cancel();
            }
        }
    });

    let coordinator = Coordinator::new(session, engine, remote);
    let reports = coordinator.run_all(scenarios, &cancel).await;
    signal_task.abort();

    let report = RunCommandReport::from_reports(args.scenarios.display().to_string(), reports);
    writer.render(&report)?;

    let failed = report.summary.failed + report.summary.cancelled;
    if failed > 0 {
        return Err(CliError::RunFailed { failed });
    }
    Ok(())
}

/// Resolve the `--name` filter against the scenario file.
///
/// With no filter every declared scenario runs, in file order. Filtered
/// names keep the order they were given on the command line.
fn select_scenarios(file: &ScenarioFile, names: &[String]) -> Result<Vec<Scenario>, CliError> {
    if names.is_empty() {
        return Ok(file.scenarios.clone());
    }
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let scenario = file
            .find(name)
            .ok_or_else(|| CliError::Scenario(format!("no scenario named '{name}' in the file")))?;
        selected.push(scenario.clone());
    }
    Ok(selected)
}

/// Aggregated output of one `run` invocation.
#[derive(Serialize)]
pub struct RunCommandReport {
    /// Scenario file the batch came from
    pub source: String,
    /// Result counts across the batch
    pub summary: RunSummary,
    /// Per-scenario reports, in input order
    pub reports: Vec<ScenarioReport>,
}

impl RunCommandReport {
    fn from_reports(source: String, reports: Vec<ScenarioReport>) -> Self {
        let summary = summarize(&reports);
        Self {
            source,
            summary,
            reports,
        }
    }
}

impl Render for RunCommandReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Run: {}", self.source.bold())?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<24} {:<12} {:<10} {:>9}  Error",
            "Scenario", "Protocol", "Result", "Duration"
        )?;
        writeln!(w, "{}", "-".repeat(80))?;

        for report in &self.reports {
            let result_colored = match report.result {
                RunResult::Passed => report.result.as_str().green(),
                RunResult::Failed => report.result.as_str().red().bold(),
                RunResult::Skipped => report.result.as_str().yellow(),
                RunResult::Cancelled => report.result.as_str().red(),
            };
            writeln!(
                w,
                "{:<24} {:<12} {:<10} {:>8.1}s  {}",
                report.scenario,
                report.protocol,
                result_colored,
                report.duration_secs,
                report.error.as_deref().unwrap_or("-")
            )?;
        }

        writeln!(w)?;
        let summary_line = self.summary.to_string();
        if self.summary.any_failure() {
            writeln!(w, "Summary: {}", summary_line.red().bold())?;
        } else {
            writeln!(w, "Summary: {}", summary_line.green().bold())?;
        }
        if self.summary.teardown_errors > 0 {
            writeln!(
                w,
                "{}",
                format!(
                    "warning: {} scenario(s) reported teardown errors; check for leaked resources",
                    self.summary.teardown_errors
                )
                .yellow()
            )?;
        }

        Ok(())
    }
}
