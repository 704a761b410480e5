//! Decides whether a link mutation changes what the rendered sitemap shows.
//!
//! Regenerating every chunk is expensive while checking one row is cheap, so
//! every store mutation asks the detector first and the regeneration flag is
//! raised only when a visible URL appears, disappears or changes.

use crate::link::{LinkConditions, LinkRecord, LinkUpdate};
use crate::state::StateStore;
use crate::store::LinkBackend;
use crate::Result;
use std::sync::Arc;
use tracing::debug;

/// Whether saving `new` over `old` changes the rendered output.
///
/// - No prior row: changed when the new link is visible.
/// - Prior row not visible: changed when the new link becomes visible.
/// - Prior row visible: changed when any rendered field differs, which
///   includes the link turning invisible.
pub fn changed(new: &LinkRecord, old: Option<&LinkRecord>) -> bool {
    match old {
        None => new.is_visible(),
        Some(old) if !old.is_visible() => new.is_visible(),
        Some(old) => rendered_fields_differ(new, old),
    }
}

fn rendered_fields_differ(a: &LinkRecord, b: &LinkRecord) -> bool {
    a.loc != b.loc
        || a.access != b.access
        || a.status != b.status
        || a.lastmod != b.lastmod
        || a.priority.to_bits() != b.priority.to_bits()
        || a.changefreq != b.changefreq
        || a.changecount != b.changecount
        || a.language != b.language
}

/// Rewrite bulk conditions into the query that answers "would this change
/// anything visible".
///
/// When the update switches `status` (or `access`) on and the conditions do
/// not already require it on, the rows that matter are the ones where it is
/// currently off. Otherwise only currently visible rows matter. The check is
/// coarse and errs towards flagging.
pub fn bulk_probe(conditions: &LinkConditions, updates: &LinkUpdate) -> LinkConditions {
    let mut probe = conditions.clone();
    let turns_on = |update: Option<bool>, cond: Option<bool>| update == Some(true) && cond != Some(true);

    probe.status = Some(!turns_on(updates.status, conditions.status));
    probe.access = Some(!turns_on(updates.access, conditions.access));
    probe
}

/// Bulk variant of [`changed`] answered against the backend without loading rows.
pub fn changed_bulk(
    backend: &dyn LinkBackend,
    conditions: &LinkConditions,
    updates: &LinkUpdate,
) -> Result<bool> {
    backend.exists(&bulk_probe(conditions, updates))
}

/// Runs change detection and raises the regeneration flag at most once.
#[derive(Clone)]
pub struct ChangeDetector {
    state: Arc<dyn StateStore>,
}

impl ChangeDetector {
    /// Create a detector writing to `state`.
    pub fn new(state: Arc<dyn StateStore>) -> Self {
        Self { state }
    }

    /// State store the detector flags.
    pub fn state(&self) -> &Arc<dyn StateStore> {
        &self.state
    }

    /// Check a single-row mutation and flag regeneration if needed.
    ///
    /// When the flag is already raised nothing is compared.
    pub fn check_link(&self, new: &LinkRecord, old: Option<&LinkRecord>) -> Result<bool> {
        if self.state.regenerate_needed()? {
            return Ok(false);
        }
        let is_changed = changed(new, old);
        if is_changed {
            debug!(kind = %new.kind, id = %new.id, "visible link changed, regeneration needed");
            self.state.set_regenerate_needed(true)?;
        }
        Ok(is_changed)
    }

    /// Check a bulk mutation and flag regeneration if needed.
    pub fn check_bulk(
        &self,
        backend: &dyn LinkBackend,
        conditions: &LinkConditions,
        updates: &LinkUpdate,
    ) -> Result<bool> {
        if self.state.regenerate_needed()? {
            return Ok(false);
        }
        let is_changed = changed_bulk(backend, conditions, updates)?;
        if is_changed {
            debug!(?conditions, "bulk mutation touches visible links, regeneration needed");
            self.state.set_regenerate_needed(true)?;
        }
        Ok(is_changed)
    }
}

impl std::fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDetector").finish_non_exhaustive()
    }
}
