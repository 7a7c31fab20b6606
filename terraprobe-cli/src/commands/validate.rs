//! `terraprobe validate` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use terraprobe_core::config::TerraprobeConfig;
use terraprobe_harness::ScenarioFile;

use crate::cli::ValidateArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `validate` command.
///
/// Checks the configuration file and, when given, a scenario file. Neither
/// check touches the cloud, the credential variable, or the engine binary;
/// this is safe to run anywhere, including CI lint stages.
///
/// # Errors
///
/// Returns `CliError::Config` when the configuration is invalid and
/// `CliError::Scenario` when the scenario file is.
pub async fn execute(
    args: ValidateArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = build_report(config_path, args.scenarios.as_deref()).await;
    writer.render(&report)?;

    if !report.config_valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    if !report.scenarios_valid {
        return Err(CliError::Scenario("scenario file is invalid".to_owned()));
    }
    Ok(())
}

async fn build_report(config_path: &Path, scenario_path: Option<&Path>) -> ValidationReport {
    info!(path = %config_path.display(), "validating configuration");
    let (config_valid, config_errors) = match TerraprobeConfig::load(config_path).await {
        Ok(_) => (true, Vec::new()),
        Err(e) => (false, vec![e.to_string()]),
    };

    let mut scenario_source = None;
    let mut scenarios_valid = true;
    let mut scenario_errors = Vec::new();
    let mut scenario_count = 0;

    if let Some(path) = scenario_path {
        info!(path = %path.display(), "validating scenario file");
        scenario_source = Some(path.display().to_string());
        match ScenarioFile::load(path).await {
            Ok(file) => {
                scenario_count = file.scenarios.len();
                if let Err(e) = file.validate() {
                    scenarios_valid = false;
                    scenario_errors.push(e.to_string());
                }
            }
            Err(e) => {
                scenarios_valid = false;
                scenario_errors.push(e.to_string());
            }
        }
    }

    ValidationReport {
        config_source: config_path.display().to_string(),
        config_valid,
        config_errors,
        scenario_source,
        scenarios_valid,
        scenario_errors,
        scenario_count,
    }
}

/// Validation result for config and scenario files.
#[derive(Serialize)]
pub struct ValidationReport {
    /// Configuration file path
    pub config_source: String,
    /// Whether the configuration loaded and validated
    pub config_valid: bool,
    /// Configuration error messages (empty if valid)
    pub config_errors: Vec<String>,
    /// Scenario file path (absent when only the config was checked)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_source: Option<String>,
    /// Whether the scenario file loaded and validated
    pub scenarios_valid: bool,
    /// Scenario error messages (empty if valid)
    pub scenario_errors: Vec<String>,
    /// Number of scenarios declared in the file
    pub scenario_count: usize,
}

impl Render for ValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.config_source.bold())?;
        if self.config_valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.config_errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        if let Some(ref source) = self.scenario_source {
            writeln!(w)?;
            writeln!(
                w,
                "Scenario Validation: {} ({} scenario(s))",
                source.bold(),
                self.scenario_count
            )?;
            if self.scenarios_valid {
                writeln!(w, "  Result: {}", "VALID".green().bold())?;
            } else {
                writeln!(w, "  Result: {}", "INVALID".red().bold())?;
                for err in &self.scenario_errors {
                    writeln!(w, "  Error: {}", err.red())?;
                }
            }
        }

        Ok(())
    }
}
