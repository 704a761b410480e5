//! Scheduler-facing entry points: explicit regeneration, rebuilds and the
//! cron trigger.
//!
//! The orchestrator owns the regeneration flag protocol. A run remembers and
//! clears the flag before generating so that changes arriving during the run
//! raise it again; on failure the remembered value is put back.

use crate::budget::MemoryCeiling;
use crate::config::Config;
use crate::content::ContentRepository;
use crate::generator::{ElementFilter, GenerateSandbox, Generator};
use crate::rebuild::{RebuildSandbox, Rebuilder};
use crate::sitemap::{SitemapLayout, SitemapRepository};
use crate::state::StateStore;
use crate::store::LinkStore;
use crate::url::{AliasCache, UrlResolver};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

/// Result reported to whoever triggered a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Whether every step succeeded.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
}

impl BatchOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Why a cron run did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Rendered files are up to date.
    NotNeeded,
    /// Cron regeneration is switched off.
    Disabled,
    /// The last run is younger than the minimum lifetime.
    TooSoon {
        /// Seconds until regeneration is allowed.
        remaining: i64,
    },
}

/// What a cron trigger did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CronOutcome {
    /// Nothing was regenerated.
    Skipped(SkipReason),
    /// A regeneration ran.
    Regenerated(BatchOutcome),
}

/// Drives generation and rebuilds over the shared stores.
pub struct Orchestrator {
    store: Arc<LinkStore>,
    sitemaps: Arc<SitemapRepository>,
    generator: Generator,
    rebuilder: Rebuilder,
    aliases: Option<Arc<AliasCache>>,
    config: Config,
}

impl Orchestrator {
    /// Orchestrator writing under `config.paths.files_dir()`.
    pub fn new(
        config: Config,
        store: Arc<LinkStore>,
        content: Arc<dyn ContentRepository>,
        sitemaps: Arc<SitemapRepository>,
        resolver: Arc<dyn UrlResolver>,
    ) -> Self {
        let layout = SitemapLayout::new(config.paths.files_dir());
        let generator = Generator::new(
            Arc::clone(&store),
            Arc::clone(&sitemaps),
            layout,
            resolver,
            config.generation.clone(),
        )
        .with_language_selection(config.site.language_selection);
        let rebuilder = Rebuilder::new(Arc::clone(&store), content, config.rebuild.batch_limit);

        Self {
            store,
            sitemaps,
            generator,
            rebuilder,
            aliases: None,
            config,
        }
    }

    /// Substitute path aliases during generation.
    #[must_use]
    pub fn with_aliases(mut self, aliases: Arc<AliasCache>) -> Self {
        self.generator = self.generator.with_aliases(Arc::clone(&aliases));
        self.aliases = Some(aliases);
        self
    }

    /// Append an element filter.
    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn ElementFilter>) -> Self {
        self.generator = self.generator.with_filter(filter);
        self
    }

    /// Use a specific memory ceiling for generation runs.
    #[must_use]
    pub fn with_ceiling(mut self, ceiling: Arc<dyn MemoryCeiling>) -> Self {
        self.generator = self.generator.with_ceiling(ceiling);
        self
    }

    /// The link store.
    pub fn store(&self) -> &Arc<LinkStore> {
        &self.store
    }

    /// The sitemap repository.
    pub fn sitemaps(&self) -> &Arc<SitemapRepository> {
        &self.sitemaps
    }

    /// Layout of generated files.
    pub fn layout(&self) -> &SitemapLayout {
        self.generator.layout()
    }

    fn state(&self) -> &Arc<dyn StateStore> {
        self.store.state()
    }

    /// Generate the next chunk of a run.
    pub fn generate_chunk(&self, sandbox: &mut GenerateSandbox) -> Result<usize> {
        self.generator.generate_chunk(sandbox)
    }

    /// Process the next rebuild batch of an entity type.
    pub fn rebuild_fetch(&self, entity_type: &str, sandbox: &mut RebuildSandbox) -> Result<f64> {
        self.rebuilder.fetch(entity_type, sandbox)
    }

    /// Regenerate the given sitemaps (all when `None`) now.
    pub fn regenerate(&self, smids: Option<&[String]>) -> BatchOutcome {
        self.regenerate_at(smids, Utc::now().timestamp())
    }

    /// Regenerate treating `now` as the current time.
    pub fn regenerate_at(&self, smids: Option<&[String]>, now: i64) -> BatchOutcome {
        let remembered = match self.state().regenerate_needed() {
            Ok(flag) => flag,
            Err(e) => return BatchOutcome::failed(format!("Cannot read state: {e}")),
        };

        match self.run_regeneration(smids, now) {
            Ok(count) => {
                let message = format!("Sitemap files regenerated for {count} sitemap(s)");
                info!(count, "{}", message);
                BatchOutcome::ok(message)
            },
            Err(e) => {
                error!(error = %e, category = e.category(), "sitemap regeneration failed");
                // A change during the run may have raised the flag already
                if remembered {
                    if let Err(restore) = self.state().set_regenerate_needed(true) {
                        error!(error = %restore, "cannot restore regeneration flag");
                    }
                }
                BatchOutcome::failed(format!("Sitemap regeneration failed: {e}"))
            },
        }
    }

    fn run_regeneration(&self, smids: Option<&[String]>, now: i64) -> Result<usize> {
        let targets = self.sitemaps.load_multiple(smids)?;
        self.state().set_regenerate_needed(false)?;

        for sitemap in &targets {
            self.generator.generate(&sitemap.smid, now)?;
        }

        if self.state().regenerate_needed()? {
            info!("links changed during regeneration, keeping previous timestamp");
        } else {
            self.state().set_generated_last(now)?;
        }
        Ok(targets.len())
    }

    /// Rebuild the links of `entity_types`, then regenerate every sitemap.
    pub fn rebuild(&self, entity_types: &[String], save_custom: bool) -> BatchOutcome {
        self.rebuild_at(entity_types, save_custom, Utc::now().timestamp())
    }

    /// [`Orchestrator::rebuild`] treating `now` as the current time.
    pub fn rebuild_at(&self, entity_types: &[String], save_custom: bool, now: i64) -> BatchOutcome {
        match self.run_rebuild(entity_types, save_custom) {
            Ok(processed) => {
                info!(processed, ?entity_types, "link rebuild finished");
                let outcome = self.regenerate_at(None, now);
                if outcome.success {
                    BatchOutcome::ok(format!(
                        "Rebuilt {processed} link(s). {}",
                        outcome.message
                    ))
                } else {
                    outcome
                }
            },
            Err(e) => {
                error!(error = %e, "link rebuild failed");
                BatchOutcome::failed(format!("Link rebuild failed: {e}"))
            },
        }
    }

    fn run_rebuild(&self, entity_types: &[String], save_custom: bool) -> Result<u64> {
        self.state().set_rebuild_needed(true)?;
        self.rebuilder.clear(entity_types, save_custom)?;

        let mut processed = 0;
        for entity_type in entity_types {
            processed += self.rebuilder.run(entity_type)?.processed;
        }
        self.state().set_rebuild_needed(false)?;
        Ok(processed)
    }

    /// Regenerate if needed and allowed.
    pub fn cron(&self, now: i64) -> Result<CronOutcome> {
        let generation = &self.config.generation;
        if generation.disable_cron_regeneration {
            return Ok(CronOutcome::Skipped(SkipReason::Disabled));
        }
        if !self.state().regenerate_needed()? {
            return Ok(CronOutcome::Skipped(SkipReason::NotNeeded));
        }

        let elapsed = now - self.state().generated_last()?;
        if elapsed < generation.minimum_lifetime {
            let remaining = generation.minimum_lifetime - elapsed;
            info!(remaining, "sitemap is stale but younger than the minimum lifetime");
            return Ok(CronOutcome::Skipped(SkipReason::TooSoon { remaining }));
        }

        Ok(CronOutcome::Regenerated(self.regenerate_at(None, now)))
    }

    /// Forward cache tag invalidations to the alias cache.
    pub fn invalidate_aliases(&self, tags: &[&str]) -> Result<()> {
        match &self.aliases {
            Some(aliases) => aliases.invalidate(tags),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("generator", &self.generator)
            .field("rebuilder", &self.rebuilder)
            .finish_non_exhaustive()
    }
}
