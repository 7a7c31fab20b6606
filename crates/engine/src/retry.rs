//! Transient-failure classification for engine commands.
//!
//! `init` and `apply` talk to provider registries and cloud APIs, both of
//! which fail sporadically under load. A small allow-list of stderr patterns
//! decides which failures are worth retrying; everything else aborts on the
//! first attempt so genuine configuration mistakes surface immediately.

use std::time::Duration;

use regex::Regex;

use terraprobe_core::config::EngineConfig;
use terraprobe_core::error::{ConfigError, TerraprobeError};

/// Stderr patterns always treated as transient.
///
/// Covers the failure modes seen most often against real provider registries
/// and cloud endpoints. Patterns from `engine.retryable_patterns` are
/// appended on top of these.
const DEFAULT_TRANSIENT_PATTERNS: &[&str] = &[
    "(?i)connection reset by peer",
    "(?i)TLS handshake timeout",
    "(?i)timeout while waiting",
    "(?i)429 too many requests",
    "(?i)temporary failure in name resolution",
    "(?i)could not connect to the server",
];

/// Retry policy for `init` and `apply`.
///
/// Compiled once when the engine is constructed. `retry_attempts` counts
/// additional attempts after the first failure, so `0` disables retrying
/// entirely.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
    patterns: Vec<Regex>,
}

impl RetryPolicy {
    /// Builds the policy from engine configuration.
    ///
    /// Built-in patterns are compiled first, then operator-supplied ones.
    /// An invalid operator pattern is rejected here, before any command runs.
    pub fn from_config(config: &EngineConfig) -> Result<Self, TerraprobeError> {
        let mut patterns =
            Vec::with_capacity(DEFAULT_TRANSIENT_PATTERNS.len() + config.retryable_patterns.len());
        for pattern in DEFAULT_TRANSIENT_PATTERNS
            .iter()
            .copied()
            .chain(config.retryable_patterns.iter().map(String::as_str))
        {
            let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
                field: "engine.retryable_patterns".to_owned(),
                reason: format!("pattern {pattern:?}: {e}"),
            })?;
            patterns.push(regex);
        }

        Ok(Self {
            max_retries: config.retry_attempts,
            backoff: Duration::from_secs(config.retry_backoff_secs),
            patterns,
        })
    }

    /// Maximum number of retries after the first failed attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Fixed delay between attempts.
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Returns `true` when stderr matches any transient pattern.
    pub fn is_transient(&self, stderr: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(stderr))
    }
}
