//! Scenario and template fixtures for E2E tests.
//!
//! Provides [`ScenarioBuilder`] for constructing test scenarios with
//! fine-grained control over protocols, variable layers, and prerequisites,
//! plus on-disk template directory factories.

use std::path::Path;

use terraprobe_core::vars::{VarValue, VariableSet};
use terraprobe_harness::scenario::{PrereqSpec, Protocol, Scenario, UpgradeSpec};

/// Write a minimal template directory containing a single `main.tf`.
///
/// The caller must keep the returned `TempDir` alive for the duration of
/// the test.
pub fn template_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("failed to create template dir");
    std::fs::write(
        dir.path().join("main.tf"),
        "resource \"ibm_is_vpc\" \"vpc\" {}\n",
    )
    .expect("failed to write main.tf");
    dir
}

/// Write a template tree with nested module files plus artifacts the remote
/// bundle collector must skip (a `.terraform/` cache and a state file).
#[allow(dead_code)]
pub fn bundled_template_dir() -> tempfile::TempDir {
    let dir = template_dir();
    std::fs::write(dir.path().join("variables.tf"), "variable \"prefix\" {}\n")
        .expect("failed to write variables.tf");

    let modules = dir.path().join("modules/vpc");
    std::fs::create_dir_all(&modules).expect("failed to create module dir");
    std::fs::write(modules.join("main.tf"), "resource \"ibm_is_subnet\" \"s\" {}\n")
        .expect("failed to write module main.tf");

    // Local artifacts that must never reach the remote runner
    let cache = dir.path().join(".terraform/providers");
    std::fs::create_dir_all(&cache).expect("failed to create provider cache");
    std::fs::write(cache.join("provider.bin"), "binary").expect("failed to write provider");
    std::fs::write(dir.path().join("terraform.tfstate"), "{}")
        .expect("failed to write state file");
    dir
}

/// Builder for constructing test-friendly [`Scenario`] values.
///
/// By default the scenario is a consistency run in `us-south` with no
/// variable requirements, no prerequisite, and no upgrade section.
pub struct ScenarioBuilder {
    scenario: Scenario,
}

#[allow(dead_code)]
impl ScenarioBuilder {
    /// Create a new builder for the named scenario over the given template.
    pub fn new(name: &str, template_dir: &Path) -> Self {
        Self {
            scenario: Scenario {
                name: name.to_owned(),
                template_dir: template_dir.to_path_buf(),
                protocol: Protocol::Consistency,
                region: "us-south".to_owned(),
                required_vars: vec![],
                defaults: VariableSet::new(),
                overrides: VariableSet::new(),
                permanent_vars: indexmap::IndexMap::new(),
                output_vars: indexmap::IndexMap::new(),
                secure_vars: vec![],
                include: vec![],
                exclude: vec![],
                prerequisite: None,
                upgrade: None,
            },
        }
    }

    /// Set the execution protocol.
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.scenario.protocol = protocol;
        self
    }

    /// Set the names that must exist after the four-layer merge.
    pub fn required(mut self, names: &[&str]) -> Self {
        self.scenario.required_vars = names.iter().map(|n| (*n).to_owned()).collect();
        self
    }

    /// Add a layer-1 default variable.
    pub fn default_var(mut self, name: &str, value: impl Into<VarValue>) -> Self {
        self.scenario.defaults.insert(name, value);
        self
    }

    /// Add a layer-4 override variable.
    pub fn override_var(mut self, name: &str, value: impl Into<VarValue>) -> Self {
        self.scenario.overrides.insert(name, value);
        self
    }

    /// Map a module variable to a permanent-resource registry key (layer 2).
    pub fn permanent_var(mut self, var: &str, registry_key: &str) -> Self {
        self.scenario
            .permanent_vars
            .insert(var.to_owned(), registry_key.to_owned());
        self
    }

    /// Map a module variable to a prerequisite output name (layer 3).
    pub fn output_var(mut self, var: &str, output: &str) -> Self {
        self.scenario
            .output_vars
            .insert(var.to_owned(), output.to_owned());
        self
    }

    /// Mark variable names as secure for remote submission.
    pub fn secure(mut self, names: &[&str]) -> Self {
        self.scenario.secure_vars = names.iter().map(|n| (*n).to_owned()).collect();
        self
    }

    /// Restrict the remote bundle to the given include patterns.
    pub fn include(mut self, patterns: &[&str]) -> Self {
        self.scenario.include = patterns.iter().map(|p| (*p).to_owned()).collect();
        self
    }

    /// Attach a prerequisite stack with no extra variables.
    pub fn prereq(self, dir: &Path) -> Self {
        self.prereq_with_vars(dir, VariableSet::new())
    }

    /// Attach a prerequisite stack with the given extra variables.
    pub fn prereq_with_vars(mut self, dir: &Path, vars: VariableSet) -> Self {
        self.scenario.prerequisite = Some(PrereqSpec {
            template_dir: dir.to_path_buf(),
            vars,
        });
        self
    }

    /// Make this an upgrade scenario with the given base template and version.
    pub fn upgrade_from(mut self, base_dir: &Path, base_version: &str) -> Self {
        self.scenario.protocol = Protocol::Upgrade;
        self.scenario.upgrade = Some(UpgradeSpec {
            base_dir: base_dir.to_path_buf(),
            base_version: Some(
                base_version
                    .parse()
                    .expect("invalid semver in test scenario"),
            ),
        });
        self
    }

    /// Build and validate the scenario.
    ///
    /// # Panics
    ///
    /// Panics if the scenario fails its own validation -- test scenarios are
    /// expected to be well-formed unless a test constructs one by hand.
    pub fn build(self) -> Scenario {
        self.scenario
            .validate()
            .expect("ScenarioBuilder produced an invalid scenario");
        self.scenario
    }
}
