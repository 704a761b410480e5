//! # xmlsitemap-core
//!
//! Link registry, change detection and chunked XML sitemap generation.
//!
//! Content items are projected into [`LinkRecord`]s kept in a [`LinkStore`].
//! Every mutation runs through the change detector, which raises the
//! regeneration flag only when the rendered output would change. The
//! [`Orchestrator`] then regenerates sitemaps chunk by chunk, writes an index
//! when there is more than one chunk and clears the flag.
//!
//! ## Architecture
//!
//! - **Links**: records, conditions and bulk updates ([`link`]), the store
//!   and its backend ([`store`]), change detection ([`detector`]) and
//!   changefreq estimation ([`changefreq`])
//! - **Generation**: sitemap entities and file layout ([`sitemap`]), the
//!   chunked generator ([`generator`]), XML writers ([`writer`]), URL
//!   resolution and aliases ([`url`]) and the memory budget ([`budget`])
//! - **Batches**: rebuild scanning ([`rebuild`]) and the scheduler-facing
//!   orchestrator ([`batch`])
//! - **Ambient**: configuration ([`config`]), process state ([`state`]) and
//!   errors ([`error`])
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use xmlsitemap_core::{
//!     BaseUrlResolver, Config, LinkRecord, LinkStore, LinkTable, MemoryContent, MemoryState,
//!     Orchestrator, Sitemap, SitemapRepository, StateStore,
//! };
//!
//! let root = tempfile::tempdir()?;
//! let mut config = Config::default();
//! config.paths.root = root.path().to_path_buf();
//!
//! let state = Arc::new(MemoryState::new());
//! let store = Arc::new(LinkStore::new(Arc::new(LinkTable::in_memory()), state.clone()));
//! let sitemaps = Arc::new(SitemapRepository::in_memory());
//! sitemaps.save(&Sitemap::default())?;
//!
//! store.save(LinkRecord::new("node", "9", "/node/9").with_priority(0.6))?;
//! assert!(state.regenerate_needed()?);
//!
//! let orchestrator = Orchestrator::new(
//!     config,
//!     store,
//!     Arc::new(MemoryContent::new()),
//!     sitemaps,
//!     Arc::new(BaseUrlResolver::new("https://example.com")?),
//! );
//! let outcome = orchestrator.regenerate(None);
//! assert!(outcome.success);
//! assert!(!state.regenerate_needed()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`]. Batch entry points
//! report a [`BatchOutcome`] instead, with the error logged:
//!
//! ```rust
//! use xmlsitemap_core::{Error, LinkRecord, LinkStore, LinkTable, MemoryState};
//! use std::sync::Arc;
//!
//! let store = LinkStore::new(Arc::new(LinkTable::in_memory()), Arc::new(MemoryState::new()));
//! match store.save(LinkRecord::new("node", "1", "node/1")) {
//!     Err(Error::InvalidLink { reason, .. }) => assert!(reason.contains("must start with '/'")),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

/// Scheduler-facing regeneration, rebuild and cron entry points
pub mod batch;
/// Memory budget for generation runs
pub mod budget;
/// Changefreq estimation and buckets
pub mod changefreq;
/// Configuration loading and validation
pub mod config;
/// Content repository interface and link projections
pub mod content;
/// Regeneration change detection
pub mod detector;
/// Error types and result aliases
pub mod error;
/// Chunked sitemap generation
pub mod generator;
/// Link records and bulk query shapes
pub mod link;
mod persist;
/// Link store rebuild from content
pub mod rebuild;
/// Sitemap entities, repository and file layout
pub mod sitemap;
/// Process-wide flags and counters
pub mod state;
/// Link store and storage backend
pub mod store;
/// URL resolution and path alias cache
pub mod url;
/// Streaming XML writers
pub mod writer;

// Re-export commonly used types
pub use batch::{BatchOutcome, CronOutcome, Orchestrator, SkipReason};
pub use budget::{MemoryBudget, MemoryCeiling, MemoryLimit, ProcessCeiling};
pub use changefreq::{ChangeFrequency, calculate_changefreq, effective_changefreq, record_modification};
pub use config::{
    ChunkSize, Config, FrontpageConfig, GenerationConfig, LanguageSelection, LastmodFormat,
    PathsConfig, RebuildConfig, SiteConfig,
};
pub use content::{BundleSettings, ContentItem, ContentRepository, LinkTypeRegistry, MemoryContent};
pub use detector::{ChangeDetector, changed};
pub use error::{Error, Result};
pub use generator::{ElementFilter, GeneratePhase, GenerateSandbox, Generator};
pub use link::{LANGUAGE_NONE, LinkConditions, LinkKey, LinkRecord, LinkSelection, LinkUpdate, PRIORITY_DEFAULT};
pub use rebuild::{RebuildSandbox, Rebuilder};
pub use sitemap::{Sitemap, SitemapLayout, SitemapRepository};
pub use state::{FileState, MemoryState, StateSnapshot, StateStore};
pub use store::{LinkBackend, LinkStore, LinkTable};
pub use self::url::{AliasCache, AliasSource, BaseUrlResolver, MemoryAliases, UrlResolver};
pub use writer::{IndexWriter, SitemapElement, SitemapWriter, WriterOptions};
