//! Drives the regeneration of the selected tag set and decides the
//! partial-failure semantics.

use std::collections::BTreeSet;

use tracing::info;

use crate::error::{RegencronError, Result};

/// Seam between the orchestrator and the hub client, so the drain logic can
/// be exercised without spawning processes.
pub trait Regenerator {
    /// Returns `Ok(false)` when the regeneration reported failure; `Err` is
    /// reserved for being unable to invoke the client at all.
    fn regen_tag(&self, tag: &str, wait: bool) -> Result<bool>;
}

/// Drain the working set smallest-first (any order would satisfy the hub;
/// sorted keeps a single run deterministic) and regenerate each tag.
///
/// Without `continue_on_failure` the first failure aborts with the failed
/// tag and the not-yet-attempted remainder. With it, every tag is attempted
/// and the accumulated failed set is returned — the caller decides whether
/// a non-empty set fails the run.
pub fn regen_all(
    backend: &dyn Regenerator,
    mut tags: BTreeSet<String>,
    wait: bool,
    continue_on_failure: bool,
) -> Result<BTreeSet<String>> {
    let mut failed = BTreeSet::new();
    while let Some(tag) = tags.pop_first() {
        if backend.regen_tag(&tag, wait)? {
            continue;
        }
        if !continue_on_failure {
            return Err(RegencronError::RegenAborted {
                tag,
                remaining: tags.into_iter().collect(),
            });
        }
        info!("continuing with the remaining tags");
        failed.insert(tag);
    }
    Ok(failed)
}
