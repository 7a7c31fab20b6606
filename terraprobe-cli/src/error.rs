//! CLI-specific error types and exit code mapping

use terraprobe_core::error::TerraprobeError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// Scenario file loading or validation failure.
    #[error("scenario error: {0}")]
    Scenario(String),

    /// One or more scenarios did not pass.
    #[error("{failed} scenario(s) failed")]
    RunFailed { failed: usize },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from terraprobe-core.
    #[error("{0}")]
    Core(#[from] TerraprobeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                |
    /// |------|----------------------------------------|
    /// | 0    | Success                                |
    /// | 1    | Scenario failures / general error      |
    /// | 2    | Configuration error                    |
    /// | 3    | Scenario file error                    |
    /// | 10   | IO error                               |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Scenario(_) => 3,
            Self::Io(_) => 10,
            Self::RunFailed { .. } | Self::JsonSerialize(_) | Self::Core(_) => 1,
        }
    }
}
