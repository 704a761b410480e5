//! Opening the persisted stores described by the configuration.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use xmlsitemap_core::{
    AliasCache, BaseUrlResolver, Config, ContentRepository, FileState, LanguageSelection,
    LinkConditions, LinkStore, LinkTable, MemoryContent, Orchestrator, Sitemap,
    SitemapRepository, LANGUAGE_NONE,
};

use super::content::{load_aliases, load_content, ALIASES_FILE, CONTENT_FILE};

/// The configuration plus every store it points at.
#[derive(Debug)]
pub struct Workspace {
    pub config: Config,
    pub state: Arc<FileState>,
    pub store: Arc<LinkStore>,
    pub sitemaps: Arc<SitemapRepository>,
}

impl Workspace {
    /// Load the configuration and open the stores under its root.
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
        .context("Failed to load configuration")?;

        let paths = &config.paths;
        debug!(root = %paths.root.display(), "opening stores");
        let state = Arc::new(FileState::open(paths.state_file())?);
        let table = LinkTable::open(paths.links_file())?;
        let store = Arc::new(LinkStore::new(Arc::new(table), state.clone()));
        let sitemaps = Arc::new(SitemapRepository::open(paths.sitemaps_file())?);

        Ok(Self {
            config,
            state,
            store,
            sitemaps,
        })
    }

    /// Root directory of persisted data.
    pub fn root(&self) -> &Path {
        &self.config.paths.root
    }

    /// Register the sitemaps implied by the language settings when none exist.
    ///
    /// With language selection off a single sitemap covers every link.
    /// Otherwise each language present in the store gets its own sitemap.
    pub fn ensure_sitemaps(&self) -> Result<usize> {
        if !self.sitemaps.all()?.is_empty() {
            return Ok(0);
        }

        let sitemaps = if self.config.site.language_selection == LanguageSelection::Off {
            vec![Sitemap::default()]
        } else {
            self.languages()?
                .iter()
                .map(|language| Sitemap::for_language(language))
                .collect()
        };

        for sitemap in &sitemaps {
            self.sitemaps.save(sitemap)?;
        }
        info!(count = sitemaps.len(), "registered default sitemaps");
        Ok(sitemaps.len())
    }

    fn languages(&self) -> Result<Vec<String>> {
        let mut languages: Vec<String> = self
            .store
            .load_multiple(&LinkConditions::new())?
            .into_iter()
            .map(|link| link.language)
            .filter(|language| language != LANGUAGE_NONE)
            .collect();
        let default_language = &self.config.site.default_language;
        if default_language != LANGUAGE_NONE {
            languages.push(default_language.clone());
        }
        languages.sort();
        languages.dedup();
        if languages.is_empty() {
            languages.push(LANGUAGE_NONE.to_string());
        }
        Ok(languages)
    }

    /// Default location of the content export.
    pub fn content_file(&self) -> PathBuf {
        self.root().join(CONTENT_FILE)
    }

    /// Build an orchestrator over the workspace stores.
    ///
    /// Path aliases are picked up from `aliases.json` under the root when it
    /// exists.
    pub fn orchestrator(&self, content: Option<&Path>) -> Result<Orchestrator> {
        let content: Arc<dyn ContentRepository> = match content {
            Some(path) => Arc::new(load_content(path)?),
            None if self.content_file().exists() => Arc::new(load_content(&self.content_file())?),
            None => Arc::new(MemoryContent::new()),
        };
        let resolver = Arc::new(BaseUrlResolver::from_site(&self.config.site)?);

        let mut orchestrator = Orchestrator::new(
            self.config.clone(),
            Arc::clone(&self.store),
            content,
            Arc::clone(&self.sitemaps),
            resolver,
        );
        if let Some(aliases) = load_aliases(&self.root().join(ALIASES_FILE))? {
            let cache = AliasCache::new(Arc::new(aliases), self.config.generation.prefetch_aliases);
            orchestrator = orchestrator.with_aliases(Arc::new(cache));
        }
        Ok(orchestrator)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use xmlsitemap_core::LinkRecord;

    fn workspace(dir: &TempDir, selection: LanguageSelection) -> Workspace {
        let mut config = Config::default();
        config.paths.root = dir.path().join("data");
        config.site.language_selection = selection;
        let path = dir.path().join("config.toml");
        config.save_to(&path).unwrap();
        Workspace::open(Some(&path)).unwrap()
    }

    #[test]
    fn test_single_sitemap_without_language_selection() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace(&dir, LanguageSelection::Off);

        assert_eq!(workspace.ensure_sitemaps().unwrap(), 1);
        assert_eq!(workspace.ensure_sitemaps().unwrap(), 0);
        assert_eq!(workspace.sitemaps.all().unwrap()[0].smid, Sitemap::default().smid);
    }

    #[test]
    fn test_sitemap_per_language() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace(&dir, LanguageSelection::Simple);
        for (id, language) in [("1", "en"), ("2", "fr"), ("3", "en")] {
            workspace
                .store
                .save(LinkRecord::new("node", id, format!("/node/{id}")).with_language(language))
                .unwrap();
        }

        assert_eq!(workspace.ensure_sitemaps().unwrap(), 2);
        let languages: Vec<_> = workspace
            .sitemaps
            .all()
            .unwrap()
            .iter()
            .filter_map(|s| s.language().map(String::from))
            .collect();
        assert!(languages.contains(&"en".to_string()));
        assert!(languages.contains(&"fr".to_string()));
    }
}
