//! Shared E2E test helpers.
//!
//! Provides scripted engine and remote-runner implementations, scenario and
//! template fixtures, and a session builder that goes through the public
//! `SessionContext::initialize` path.

pub mod scenarios;
pub mod sessions;
