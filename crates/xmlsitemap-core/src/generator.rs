//! Chunked sitemap generation.
//!
//! A run walks one sitemap through `BeforeRun -> PerChunk(n) -> Done`, writing
//! one chunk per [`Generator::generate_chunk`] call so a scheduler can spread
//! the work over several invocations. Files go to a staging directory that
//! replaces the published one only when the run reaches `Done`.

use crate::budget::{MemoryBudget, MemoryCeiling, ProcessCeiling, resident_memory, system_memory};
use crate::changefreq::{ChangeFrequency, effective_changefreq};
use crate::config::{GenerationConfig, LanguageSelection};
use crate::link::LinkRecord;
use crate::sitemap::{Sitemap, SitemapLayout, SitemapRepository};
use crate::store::LinkStore;
use crate::url::{AliasCache, UrlResolver};
use crate::writer::{DocumentKind, IndexWriter, SitemapElement, SitemapWriter, WriterOptions};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Caller-supplied hook run on every element before it is written.
///
/// Returning `false` drops the element.
pub trait ElementFilter: Send + Sync {
    /// Inspect or alter `element`, built from `link`, for `sitemap`.
    fn filter(&self, element: &mut SitemapElement, link: &LinkRecord, sitemap: &Sitemap) -> bool;
}

impl<F> ElementFilter for F
where
    F: Fn(&mut SitemapElement, &LinkRecord, &Sitemap) -> bool + Send + Sync,
{
    fn filter(&self, element: &mut SitemapElement, link: &LinkRecord, sitemap: &Sitemap) -> bool {
        self(element, link, sitemap)
    }
}

/// Position of a run in the generation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratePhase {
    /// Nothing done yet.
    BeforeRun,
    /// Next chunk to write.
    PerChunk(u32),
    /// Files published and the sitemap updated.
    Done,
}

/// Resumable progress of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateSandbox {
    /// Sitemap being generated.
    pub smid: String,
    /// Current phase.
    pub phase: GeneratePhase,
    /// Unix time the run treats as "now".
    pub now: i64,
    /// Links per chunk, fixed when the run starts.
    pub chunk_size: usize,
    /// Links written so far.
    pub links: u64,
    /// Largest chunk written so far.
    pub max_filesize: u64,
    /// Chunks in the finished run.
    pub chunks: u32,
}

impl GenerateSandbox {
    /// Fresh run for a sitemap.
    pub fn new(smid: impl Into<String>, now: i64) -> Self {
        Self {
            smid: smid.into(),
            phase: GeneratePhase::BeforeRun,
            now,
            chunk_size: 0,
            links: 0,
            max_filesize: 0,
            chunks: 0,
        }
    }

    /// Whether the run reached `Done`.
    pub fn is_done(&self) -> bool {
        self.phase == GeneratePhase::Done
    }
}

/// Location of chunk `n` as listed in the index.
pub fn chunk_loc(chunk: u32) -> String {
    format!("/sitemap.xml?page={chunk}")
}

/// Generates chunk and index files for sitemaps.
pub struct Generator {
    store: Arc<LinkStore>,
    sitemaps: Arc<SitemapRepository>,
    layout: SitemapLayout,
    resolver: Arc<dyn UrlResolver>,
    aliases: Option<Arc<AliasCache>>,
    filters: Vec<Arc<dyn ElementFilter>>,
    ceiling: Arc<dyn MemoryCeiling>,
    config: GenerationConfig,
    language_selection: LanguageSelection,
}

impl Generator {
    /// Generator over the given stores with default hooks.
    pub fn new(
        store: Arc<LinkStore>,
        sitemaps: Arc<SitemapRepository>,
        layout: SitemapLayout,
        resolver: Arc<dyn UrlResolver>,
        config: GenerationConfig,
    ) -> Self {
        let ceiling = Arc::new(ProcessCeiling::new(config.memory_limit));
        Self {
            store,
            sitemaps,
            layout,
            resolver,
            aliases: None,
            filters: Vec::new(),
            ceiling,
            config,
            language_selection: LanguageSelection::Off,
        }
    }

    /// Substitute path aliases before resolving URLs.
    #[must_use]
    pub fn with_aliases(mut self, aliases: Arc<AliasCache>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    /// Append an element filter. Filters run in the order they were added.
    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn ElementFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Use a specific memory ceiling.
    #[must_use]
    pub fn with_ceiling(mut self, ceiling: Arc<dyn MemoryCeiling>) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// How per-language sitemaps pick their links.
    #[must_use]
    pub const fn with_language_selection(mut self, mode: LanguageSelection) -> Self {
        self.language_selection = mode;
        self
    }

    /// File layout the generator writes to.
    pub fn layout(&self) -> &SitemapLayout {
        &self.layout
    }

    /// Advance a run by one chunk and return the number of elements written.
    ///
    /// The first call also performs the `BeforeRun` work. Calling it on a
    /// finished run does nothing.
    #[instrument(skip(self, sandbox), fields(smid = %sandbox.smid))]
    pub fn generate_chunk(&self, sandbox: &mut GenerateSandbox) -> Result<usize> {
        let sitemap = self
            .sitemaps
            .load(&sandbox.smid)?
            .ok_or_else(|| Error::NotFound(format!("sitemap '{}'", sandbox.smid)))?;

        if sandbox.phase == GeneratePhase::BeforeRun {
            self.before_run(&sitemap, sandbox)?;
        }
        let GeneratePhase::PerChunk(chunk) = sandbox.phase else {
            return Ok(0);
        };

        let written = self.write_chunk(&sitemap, sandbox, chunk)?;
        if written == 0 {
            let chunks = if chunk > 1 {
                let staging = self.layout.staging_directory(&sitemap.smid);
                remove_chunk(&SitemapLayout::chunk_file(&staging, chunk))?;
                chunk - 1
            } else {
                1
            };
            self.finish(sitemap, sandbox, chunks)?;
        } else {
            sandbox.links += written as u64;
            if chunk < self.config.max_chunks {
                sandbox.phase = GeneratePhase::PerChunk(chunk + 1);
            } else {
                self.finish(sitemap, sandbox, chunk)?;
            }
        }
        Ok(written)
    }

    /// Run a sitemap to completion.
    pub fn generate(&self, smid: &str, now: i64) -> Result<GenerateSandbox> {
        let mut sandbox = GenerateSandbox::new(smid, now);
        while !sandbox.is_done() {
            self.generate_chunk(&mut sandbox)?;
        }
        Ok(sandbox)
    }

    fn before_run(&self, sitemap: &Sitemap, sandbox: &mut GenerateSandbox) -> Result<()> {
        let selection = sitemap.selection(self.language_selection);
        let visible = self.store.visible_count(&selection)?;
        sandbox.chunk_size = self.config.chunk_size.resolve(visible);

        let alias_rows = match &self.aliases {
            Some(aliases) if self.config.prefetch_aliases => aliases.alias_count()?,
            _ => 0,
        };
        MemoryBudget::new(
            sandbox.chunk_size,
            alias_rows,
            self.config.prefetch_aliases,
            system_memory(),
        )
        .apply(self.ceiling.as_ref())?;

        self.layout.prepare_staging(&sitemap.smid)?;
        info!(
            smid = %sitemap.smid,
            visible,
            chunk_size = sandbox.chunk_size,
            resident = resident_memory().unwrap_or(0),
            "sitemap generation started"
        );
        sandbox.phase = GeneratePhase::PerChunk(1);
        Ok(())
    }

    fn write_chunk(&self, sitemap: &Sitemap, sandbox: &mut GenerateSandbox, chunk: u32) -> Result<usize> {
        let selection = sitemap.selection(self.language_selection);
        let offset = (chunk as usize - 1) * sandbox.chunk_size;
        let links = self
            .store
            .select_visible(&selection, offset, sandbox.chunk_size)?;

        let staging = self.layout.staging_directory(&sitemap.smid);
        let path = SitemapLayout::chunk_file(&staging, chunk);
        let options = WriterOptions::from_config(&self.config);
        let mut writer = SitemapWriter::create(&path, DocumentKind::UrlSet, &options)?;

        let mut previous: Option<String> = None;
        for link in &links {
            let loc = match &self.aliases {
                Some(aliases) => aliases.substitute(&link.loc, &link.language)?,
                None => link.loc.clone(),
            };
            let url = self.resolver.resolve(&loc, &link.language, sitemap)?;
            if previous.as_deref() == Some(url.as_str()) {
                debug!(url = %url, "skipping duplicate url");
                continue;
            }
            previous = Some(url.clone());

            let mut element = SitemapElement {
                loc: url,
                lastmod: self.config.lastmod_format.render(link.lastmod),
                changefreq: ChangeFrequency::from_interval(effective_changefreq(link, sandbox.now)),
                priority: Some(link.priority),
            };
            if self
                .filters
                .iter()
                .all(|f| f.filter(&mut element, link, sitemap))
            {
                writer.write_element(&element)?;
            }
        }

        let summary = writer.close()?;
        sandbox.max_filesize = sandbox.max_filesize.max(summary.bytes);
        debug!(chunk, elements = summary.elements, bytes = summary.bytes, "wrote chunk");
        Ok(summary.elements)
    }

    fn finish(&self, mut sitemap: Sitemap, sandbox: &mut GenerateSandbox, chunks: u32) -> Result<()> {
        let staging = self.layout.staging_directory(&sitemap.smid);

        if chunks > 1 {
            let language = sitemap.language().unwrap_or(crate::link::LANGUAGE_NONE).to_string();
            let lastmod = self.config.lastmod_format.render(sandbox.now);
            let entries = (1..=chunks)
                .map(|n| {
                    Ok(SitemapElement {
                        lastmod: lastmod.clone(),
                        ..SitemapElement::new(self.resolver.resolve(&chunk_loc(n), &language, &sitemap)?)
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            IndexWriter::new(WriterOptions::from_config(&self.config))
                .write(&SitemapLayout::index_file(&staging), &entries)?;
        }

        self.layout.publish(&sitemap.smid)?;

        sitemap.chunks = chunks;
        sitemap.links = sandbox.links;
        sitemap.max_filesize = sandbox.max_filesize;
        sitemap.updated = sandbox.now;
        self.sitemaps.save(&sitemap)?;

        sandbox.chunks = chunks;
        sandbox.phase = GeneratePhase::Done;
        info!(smid = %sitemap.smid, chunks, links = sandbox.links, "sitemap generation finished");
        Ok(())
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("layout", &self.layout)
            .field("filters", &self.filters.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn remove_chunk(path: &std::path::Path) -> Result<()> {
    let gzip: PathBuf = SitemapLayout::gzip_file(path);
    for file in [path, gzip.as_path()] {
        if file.exists() {
            fs::remove_file(file)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ChunkSize;
    use crate::state::MemoryState;
    use crate::store::LinkTable;
    use crate::url::{BaseUrlResolver, MemoryAliases};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: Arc<LinkStore>,
        sitemaps: Arc<SitemapRepository>,
        layout: SitemapLayout,
        sitemap: Sitemap,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LinkStore::new(
            Arc::new(LinkTable::in_memory()),
            Arc::new(MemoryState::new()),
        ));
        let sitemaps = Arc::new(SitemapRepository::in_memory());
        let sitemap = Sitemap::default();
        sitemaps.save(&sitemap).unwrap();
        let layout = SitemapLayout::new(dir.path().join("files"));
        Fixture {
            _dir: dir,
            store,
            sitemaps,
            layout,
            sitemap,
        }
    }

    fn generator(fx: &Fixture, chunk_size: usize) -> Generator {
        let config = GenerationConfig {
            chunk_size: ChunkSize::Fixed(chunk_size),
            xsl: false,
            ..GenerationConfig::default()
        };
        Generator::new(
            Arc::clone(&fx.store),
            Arc::clone(&fx.sitemaps),
            fx.layout.clone(),
            Arc::new(BaseUrlResolver::new("https://example.com").unwrap()),
            config,
        )
    }

    fn add_links(store: &LinkStore, count: usize) {
        for n in 0..count {
            store
                .save(LinkRecord::new("node", n.to_string(), format!("/node/{n:04}")))
                .unwrap();
        }
    }

    #[test]
    fn test_step_by_step_run() {
        let fx = fixture();
        add_links(&fx.store, 3);
        let generator = generator(&fx, 2);

        let mut sandbox = GenerateSandbox::new(&fx.sitemap.smid, 1_000);
        assert_eq!(generator.generate_chunk(&mut sandbox).unwrap(), 2);
        assert_eq!(sandbox.phase, GeneratePhase::PerChunk(2));
        assert_eq!(generator.generate_chunk(&mut sandbox).unwrap(), 1);
        assert_eq!(generator.generate_chunk(&mut sandbox).unwrap(), 0);
        assert!(sandbox.is_done());
        assert_eq!(sandbox.chunks, 2);

        let sitemap = fx.sitemaps.load(&fx.sitemap.smid).unwrap().unwrap();
        assert_eq!(sitemap.chunks, 2);
        assert_eq!(sitemap.links, 3);
        assert_eq!(sitemap.updated, 1_000);
        assert!(sitemap.max_filesize > 0);

        let dir = fx.layout.directory(&fx.sitemap.smid);
        assert!(SitemapLayout::chunk_file(&dir, 1).exists());
        assert!(SitemapLayout::chunk_file(&dir, 2).exists());
        assert!(!SitemapLayout::chunk_file(&dir, 3).exists());
        let index = fs::read_to_string(SitemapLayout::index_file(&dir)).unwrap();
        assert!(index.contains("https://example.com/sitemap.xml?page=2"));

        // Finished runs stay finished
        assert_eq!(generator.generate_chunk(&mut sandbox).unwrap(), 0);
    }

    #[test]
    fn test_aliases_and_duplicate_collapse() {
        let fx = fixture();
        fx.store.save(LinkRecord::new("node", "1", "/node/1")).unwrap();
        fx.store.save(LinkRecord::new("node", "2", "/node/2")).unwrap();
        fx.store.save(LinkRecord::new("node", "3", "/node/3")).unwrap();

        let mut aliases = MemoryAliases::new();
        aliases.insert("und", "/node/1", "/same");
        aliases.insert("und", "/node/2", "/same");
        let generator = generator(&fx, 10).with_aliases(Arc::new(AliasCache::new(Arc::new(aliases), true)));

        let sandbox = generator.generate(&fx.sitemap.smid, 1_000).unwrap();
        assert_eq!(sandbox.links, 2);

        let dir = fx.layout.directory(&fx.sitemap.smid);
        let xml = fs::read_to_string(SitemapLayout::chunk_file(&dir, 1)).unwrap();
        assert_eq!(xml.matches("https://example.com/same").count(), 1);
        assert!(xml.contains("https://example.com/node/3"));
    }

    #[test]
    fn test_filters_run_in_order_and_can_drop() {
        let fx = fixture();
        add_links(&fx.store, 3);

        let rewrite = |element: &mut SitemapElement, _: &LinkRecord, _: &Sitemap| {
            element.loc.push_str("?v=1");
            true
        };
        let drop_first = |element: &mut SitemapElement, link: &LinkRecord, _: &Sitemap| {
            assert!(element.loc.ends_with("?v=1"));
            link.id != "0"
        };
        let generator = generator(&fx, 10)
            .with_filter(Arc::new(rewrite))
            .with_filter(Arc::new(drop_first));

        let sandbox = generator.generate(&fx.sitemap.smid, 1_000).unwrap();
        assert_eq!(sandbox.links, 2);

        let dir = fx.layout.directory(&fx.sitemap.smid);
        let xml = fs::read_to_string(SitemapLayout::chunk_file(&dir, 1)).unwrap();
        assert!(!xml.contains("/node/0000"));
        assert!(xml.contains("/node/0001?v=1"));
    }

    #[test]
    fn test_max_chunks_stops_run() {
        let fx = fixture();
        add_links(&fx.store, 5);
        let mut generator = generator(&fx, 1);
        generator.config.max_chunks = 2;

        let sandbox = generator.generate(&fx.sitemap.smid, 1_000).unwrap();
        assert_eq!(sandbox.chunks, 2);
        assert_eq!(sandbox.links, 2);
    }

    #[test]
    fn test_missing_sitemap_is_not_found() {
        let fx = fixture();
        let generator = generator(&fx, 10);
        let mut sandbox = GenerateSandbox::new("nope", 0);
        let err = generator.generate_chunk(&mut sandbox).unwrap_err();
        assert_eq!(err.category(), "not_found");
    }

    #[test]
    fn test_memory_ceiling_raised_before_run() {
        let fx = fixture();
        add_links(&fx.store, 1);
        let ceiling = Arc::new(ProcessCeiling::new(Some(1)));
        let generator = generator(&fx, 10).with_ceiling(ceiling.clone());

        generator.generate(&fx.sitemap.smid, 1_000).unwrap();
        assert!(matches!(
            ceiling.current(),
            crate::budget::MemoryLimit::Bytes(bytes) if bytes > 1
        ));
    }
}
