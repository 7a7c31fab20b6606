//! `terraprobe list` command handler

use std::io::Write;

use serde::Serialize;

use terraprobe_harness::ScenarioFile;

use crate::cli::ListArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `list` command.
///
/// Prints every scenario declared in the file without running anything.
/// The file still has to validate; a broken file fails here the same way
/// it would fail a `run`.
///
/// # Errors
///
/// Returns `CliError::Scenario` when the file cannot be loaded or is invalid.
pub async fn execute(
    args: ListArgs,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let file = ScenarioFile::load(&args.scenarios)
        .await
        .map_err(|e| CliError::Scenario(e.to_string()))?;
    file.validate()
        .map_err(|e| CliError::Scenario(e.to_string()))?;

    let report = ScenarioListReport::from_file(args.scenarios.display().to_string(), &file);
    writer.render(&report)?;
    Ok(())
}

/// Scenario inventory of one file.
#[derive(Serialize)]
pub struct ScenarioListReport {
    /// Scenario file path
    pub source: String,
    /// Declared scenarios, in file order
    pub scenarios: Vec<ScenarioEntry>,
}

/// One row of the inventory.
#[derive(Serialize)]
pub struct ScenarioEntry {
    /// Scenario name
    pub name: String,
    /// Test protocol
    pub protocol: String,
    /// Target region
    pub region: String,
    /// Whether a prerequisite stack is provisioned first
    pub prerequisite: bool,
    /// Pinned base version for upgrade scenarios
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_version: Option<String>,
}

impl ScenarioListReport {
    fn from_file(source: String, file: &ScenarioFile) -> Self {
        let scenarios = file
            .scenarios
            .iter()
            .map(|s| ScenarioEntry {
                name: s.name.clone(),
                protocol: s.protocol.to_string(),
                region: s.region.clone(),
                prerequisite: s.prerequisite.is_some(),
                base_version: s
                    .upgrade
                    .as_ref()
                    .and_then(|u| u.base_version.as_ref())
                    .map(ToString::to_string),
            })
            .collect();
        Self { source, scenarios }
    }
}

impl Render for ScenarioListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Scenarios: {}", self.source.bold())?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<24} {:<12} {:<10} {:<7} Base",
            "Name", "Protocol", "Region", "Prereq"
        )?;
        writeln!(w, "{}", "-".repeat(64))?;

        for entry in &self.scenarios {
            writeln!(
                w,
                "{:<24} {:<12} {:<10} {:<7} {}",
                entry.name,
                entry.protocol,
                entry.region,
                if entry.prerequisite { "yes" } else { "-" },
                entry.base_version.as_deref().unwrap_or("-")
            )?;
        }

        writeln!(w)?;
        writeln!(w, "{} scenario(s)", self.scenarios.len())?;
        Ok(())
    }
}
