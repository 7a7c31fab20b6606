//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's
//! derive macros. It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Terraprobe -- scenario runner for cloud module tests.
///
/// Use `terraprobe <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "terraprobe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the terraprobe.toml configuration file.
    #[arg(short, long, default_value = "terraprobe.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios from a scenario file against real infrastructure.
    Run(RunArgs),

    /// Validate the configuration and a scenario file without cloud calls.
    Validate(ValidateArgs),

    /// List the scenarios declared in a scenario file.
    List(ListArgs),
}

// ---- run ----

/// Run scenarios from a TOML scenario file.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the TOML scenario file.
    pub scenarios: PathBuf,

    /// Run only the named scenario (repeatable; default: all).
    #[arg(short, long = "name")]
    pub names: Vec<String>,

    /// Keep working directories on disk when a scenario fails.
    #[arg(long)]
    pub preserve_on_failure: bool,

    /// Override the concurrent scenario limit from the config.
    #[arg(long)]
    pub max_concurrent: Option<usize>,
}

// ---- validate ----

/// Validate configuration and scenario files.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the TOML scenario file (omit to check only the config).
    pub scenarios: Option<PathBuf>,
}

// ---- list ----

/// List scenarios with their protocols and targets.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Path to the TOML scenario file.
    pub scenarios: PathBuf,
}
