//! Session construction helpers for E2E tests.
//!
//! Sessions are always built through the public [`SessionContext::initialize`]
//! path so that credential lookup, config validation, and registry loading
//! are exercised exactly as the CLI exercises them. Because that path reads
//! process environment variables, **every test that calls
//! [`SessionBuilder::build`] must be annotated with `#[serial]`**.

use std::path::{Path, PathBuf};

use terraprobe_core::config::TerraprobeConfig;
use terraprobe_harness::session::SessionContext;

/// Builder producing a fully initialized [`SessionContext`].
///
/// Each builder owns a dedicated credential environment variable name so
/// that concurrent test binaries cannot observe each other's keys.
pub struct SessionBuilder {
    config: TerraprobeConfig,
    env_key: &'static str,
}

#[allow(dead_code)]
impl SessionBuilder {
    /// Create a builder whose session reads its API key from `env_key`.
    pub fn new(env_key: &'static str) -> Self {
        let mut config = TerraprobeConfig::default();
        config.credentials.api_key_env = env_key.to_owned();
        Self { config, env_key }
    }

    /// Set the scenario concurrency limit.
    pub fn max_concurrent(mut self, limit: usize) -> Self {
        self.config.runner.max_concurrent = limit;
        self
    }

    /// Keep workdirs on disk when a scenario fails.
    pub fn preserve_on_failure(mut self, preserve: bool) -> Self {
        self.config.runner.preserve_on_failure = preserve;
        self
    }

    /// Skip upgrade-protocol scenarios without contacting the engine.
    pub fn skip_upgrade_test(mut self, skip: bool) -> Self {
        self.config.runner.skip_upgrade_test = skip;
        self
    }

    /// Point the session at a permanent-resource registry file.
    pub fn registry_path(mut self, path: &Path) -> Self {
        self.config.registry.path = path.display().to_string();
        self
    }

    /// Set the remote job poll interval.
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.schematics.poll_interval_secs = secs;
        self
    }

    /// Set the remote job wait limit.
    pub fn timeout_mins(mut self, mins: u64) -> Self {
        self.config.schematics.timeout_mins = mins;
        self
    }

    /// Mutable access to the underlying config for uncommon tweaks.
    pub fn config_mut(&mut self) -> &mut TerraprobeConfig {
        &mut self.config
    }

    /// Initialize the session through the public construction path.
    ///
    /// Sets the credential variable for the duration of the call and removes
    /// it again before returning, so later tests start from a clean
    /// environment.
    pub async fn build(self) -> SessionContext {
        // SAFETY: tests that build sessions run under #[serial], so no other
        // thread reads or writes the environment concurrently.
        unsafe { std::env::set_var(self.env_key, "e2e-test-key") };
        let session = SessionContext::initialize(self.config)
            .await
            .expect("failed to initialize e2e session");
        // SAFETY: same #[serial] guarantee as above.
        unsafe { std::env::remove_var(self.env_key) };
        session
    }
}

/// Write registry YAML to a temp file and return it with its path.
///
/// The caller must keep the `NamedTempFile` alive for the duration of the
/// test.
#[allow(dead_code)]
pub fn registry_file(yaml: &str) -> (tempfile::NamedTempFile, PathBuf) {
    let file = tempfile::NamedTempFile::new().expect("failed to create registry file");
    std::fs::write(file.path(), yaml).expect("failed to write registry yaml");
    let path = file.path().to_path_buf();
    (file, path)
}
