//! Rendered plan output parsing.
//!
//! The engine binary renders a human-readable plan; only two shapes matter
//! to the harness. A plan with nothing to do:
//!
//! ```text
//! No changes. Your infrastructure matches the configuration.
//! ```
//!
//! And a plan with pending changes, where the per-resource action lines and
//! the count trailer carry everything the protocols need:
//!
//! ```text
//!   # module.db.ibm_database.main will be destroyed
//!   # module.cos.ibm_cos_bucket.bucket must be replaced
//! Plan: 1 to add, 0 to change, 2 to destroy.
//! ```
//!
//! Replacement destroys the existing instance before recreating it, so
//! `must be replaced` lines count as destructive for the upgrade protocol.

use terraprobe_core::engine::PlanSummary;
use terraprobe_core::error::EngineError;

/// Marker emitted when a plan produces no changes.
const NO_CHANGES_MARKER: &str = "No changes.";

/// Prefix of the trailer line carrying the change counts.
const TRAILER_PREFIX: &str = "Plan:";

/// Suffix of an action line for a resource the plan would destroy.
const DESTROYED_SUFFIX: &str = " will be destroyed";

/// Suffix of an action line for a resource the plan would replace.
const REPLACED_SUFFIX: &str = " must be replaced";

/// Parses rendered plan output into a [`PlanSummary`].
///
/// Returns [`EngineError::OutputParse`] when the output carries neither the
/// no-changes marker nor a readable `Plan:` trailer.
pub fn parse_plan(output: &str) -> Result<PlanSummary, EngineError> {
    if output.contains(NO_CHANGES_MARKER) {
        return Ok(PlanSummary::clean());
    }

    let mut destroyed = Vec::new();
    let mut trailer = None;

    for line in output.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("# ") {
            if let Some(address) = rest.strip_suffix(DESTROYED_SUFFIX) {
                destroyed.push(address.to_owned());
            } else if let Some(address) = rest.strip_suffix(REPLACED_SUFFIX) {
                destroyed.push(address.to_owned());
            }
        } else if trimmed.starts_with(TRAILER_PREFIX) {
            trailer = parse_trailer(trimmed);
        }
    }

    match trailer {
        Some(mut summary) => {
            summary.destroyed_addresses = destroyed;
            Ok(summary)
        }
        None => Err(EngineError::OutputParse {
            reason: "plan output carries neither a no-changes marker nor a Plan: trailer"
                .to_owned(),
        }),
    }
}

/// Parses `Plan: N to add, M to change, K to destroy.` into counts.
///
/// All three actions must be present; the trailer format is stable across
/// engine versions the harness supports.
fn parse_trailer(line: &str) -> Option<PlanSummary> {
    let rest = line.strip_prefix(TRAILER_PREFIX)?.trim();

    let mut add = None;
    let mut change = None;
    let mut destroy = None;

    for part in rest.trim_end_matches('.').split(',') {
        let (count, action) = part.trim().split_once(" to ")?;
        let count: u32 = count.parse().ok()?;
        match action {
            "add" => add = Some(count),
            "change" => change = Some(count),
            "destroy" => destroy = Some(count),
            _ => return None,
        }
    }

    Some(PlanSummary {
        add: add?,
        change: change?,
        destroy: destroy?,
        destroyed_addresses: Vec::new(),
    })
}
