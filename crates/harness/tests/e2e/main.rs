//! E2E integration tests for the terraprobe harness.
//!
//! These tests drive complete scenario pipelines through the crate's public
//! surface -- session assembly, prerequisite provisioning, variable binding,
//! protocol execution, teardown, and concurrent batches -- using scripted
//! engine and remote-runner implementations.
//!
//! # Test Structure
//!
//! - `helpers/` -- Shared test utilities (scripted engine/remote, scenario
//!   and session builders)
//! - `scenarios/` -- Test files organized by flow (S1-S6)
//!
//! # Running
//!
//! ```bash
//! cargo test -p terraprobe-harness --test e2e
//! ```

mod helpers;
