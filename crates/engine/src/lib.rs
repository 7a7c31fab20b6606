#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`plan`]: Rendered plan output parsing (`parse_plan`)
//! - [`process`]: Subprocess adapters (`ProcessEngine`, `ProcessRemoteRunner`)
//! - [`retry`]: Transient-failure classification (`RetryPolicy`)

pub mod plan;
pub mod process;
pub mod retry;

pub use plan::parse_plan;
pub use process::{ProcessEngine, ProcessRemoteRunner};
pub use retry::RetryPolicy;
