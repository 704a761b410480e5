//! Re-scanning content into the link store.
//!
//! A rebuild clears the links of an entity type and then walks its items with
//! an id cursor, `batch_limit` items per step. The cursor (rather than page
//! offsets) keeps rows from being skipped or repeated when items are created
//! while a long rebuild is running. Each step stores its links with one write.

use crate::content::ContentRepository;
use crate::link::LinkConditions;
use crate::store::LinkStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Resumable progress of a rebuild of one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildSandbox {
    /// Highest item id processed so far.
    pub last_id: u64,
    /// Items processed so far.
    pub processed: u64,
    /// Items to process, counted on the first fetch.
    pub total: u64,
    /// Bundles included in the rebuild.
    pub bundles: Vec<String>,
    /// Fetch steps taken.
    pub fetches: u32,
    /// Whether `total` and `bundles` have been looked up.
    pub initialized: bool,
    /// Whether the type is fully processed.
    pub finished: bool,
}

impl RebuildSandbox {
    /// Fresh rebuild progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.finished || self.total == 0 {
            return 1.0;
        }
        (self.processed as f64 / self.total as f64).min(1.0)
    }
}

/// Rebuilds links from the content repository.
pub struct Rebuilder {
    store: Arc<LinkStore>,
    content: Arc<dyn ContentRepository>,
    batch_limit: usize,
}

impl Rebuilder {
    /// Rebuilder fetching `batch_limit` items per step.
    pub fn new(store: Arc<LinkStore>, content: Arc<dyn ContentRepository>, batch_limit: usize) -> Self {
        Self {
            store,
            content,
            batch_limit: batch_limit.max(1),
        }
    }

    /// Delete the links of `entity_types`.
    ///
    /// With `save_custom` rows carrying a status or priority override survive.
    pub fn clear(&self, entity_types: &[String], save_custom: bool) -> Result<usize> {
        let mut removed = 0;
        for entity_type in entity_types {
            let mut conditions = LinkConditions::new().kind(entity_type.as_str());
            if save_custom {
                conditions = conditions.status_override(false).priority_override(false);
            }
            removed += self.store.delete_multiple(&conditions)?;
        }
        info!(?entity_types, removed, save_custom, "cleared links for rebuild");
        Ok(removed)
    }

    /// Process the next batch of `entity_type` and return the progress fraction.
    #[instrument(skip(self, sandbox), fields(last_id = sandbox.last_id))]
    pub fn fetch(&self, entity_type: &str, sandbox: &mut RebuildSandbox) -> Result<f64> {
        if sandbox.finished {
            return Ok(1.0);
        }
        if !sandbox.initialized {
            sandbox.bundles = self.content.enabled_bundles(entity_type);
            sandbox.total = if sandbox.bundles.is_empty() {
                0
            } else {
                self.content.count(entity_type, &sandbox.bundles)?
            };
            sandbox.initialized = true;
        }
        if sandbox.bundles.is_empty() || sandbox.total == 0 {
            sandbox.finished = true;
            return Ok(1.0);
        }

        let items = self.content.enumerate(
            entity_type,
            &sandbox.bundles,
            sandbox.last_id,
            self.batch_limit,
        )?;
        let links = items
            .iter()
            .map(|item| self.store.create(item, self.content.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.store.save_multiple(links)?;
        for item in &items {
            sandbox.last_id = sandbox.last_id.max(item.id);
            sandbox.processed += 1;
        }
        sandbox.fetches += 1;

        // An exhausted cursor ends the phase even if the count was stale
        if items.is_empty() || sandbox.processed >= sandbox.total {
            sandbox.finished = true;
        }
        debug!(
            entity_type,
            processed = sandbox.processed,
            total = sandbox.total,
            "rebuild batch done"
        );
        Ok(sandbox.fraction())
    }

    /// Rebuild one entity type to completion.
    pub fn run(&self, entity_type: &str) -> Result<RebuildSandbox> {
        let mut sandbox = RebuildSandbox::new();
        while !sandbox.finished {
            self.fetch(entity_type, &mut sandbox)?;
        }
        Ok(sandbox)
    }
}

impl std::fmt::Debug for Rebuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rebuilder")
            .field("batch_limit", &self.batch_limit)
            .finish_non_exhaustive()
    }
}
