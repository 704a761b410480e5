//! Turning stored internal paths into the absolute URLs written to sitemaps.
//!
//! Generation substitutes path aliases first (through an [`AliasCache`]) and
//! then hands the result to a [`UrlResolver`].

use crate::config::SiteConfig;
use crate::link::LANGUAGE_NONE;
use crate::sitemap::Sitemap;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;
use ::url::Url;

/// Cache tag invalidating every language's aliases.
pub const ALIAS_TAG: &str = "path_alias";

/// Resolves an internal path to an absolute URL.
pub trait UrlResolver: Send + Sync {
    /// Absolute URL of `loc` for a link in `language` listed in `sitemap`.
    fn resolve(&self, loc: &str, language: &str, sitemap: &Sitemap) -> Result<String>;
}

/// Joins paths onto a base URL, prefixing non-default languages.
#[derive(Debug, Clone)]
pub struct BaseUrlResolver {
    base: Url,
    default_language: String,
    language_prefix: bool,
}

impl BaseUrlResolver {
    /// Resolver for `base_url` without language prefixes.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{base_url}': {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            default_language: LANGUAGE_NONE.to_string(),
            language_prefix: false,
        })
    }

    /// Resolver configured from the site settings.
    ///
    /// Languages other than the default one get a `/<language>` prefix unless
    /// language selection is off.
    pub fn from_site(site: &SiteConfig) -> Result<Self> {
        let mut resolver = Self::new(&site.base_url)?;
        resolver.default_language.clone_from(&site.default_language);
        resolver.language_prefix = site.language_selection != crate::config::LanguageSelection::Off;
        Ok(resolver)
    }

    /// Enable `/<language>` prefixes for languages other than `default_language`.
    #[must_use]
    pub fn with_language_prefix(mut self, default_language: impl Into<String>) -> Self {
        self.default_language = default_language.into();
        self.language_prefix = true;
        self
    }

    /// The normalized base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }
}

impl UrlResolver for BaseUrlResolver {
    fn resolve(&self, loc: &str, language: &str, _sitemap: &Sitemap) -> Result<String> {
        // A leading "./" keeps a colon in the first segment from reading as a scheme
        let mut relative = String::from("./");
        if self.language_prefix && language != LANGUAGE_NONE && language != self.default_language {
            relative.push_str(language);
            relative.push('/');
        }
        relative.push_str(loc.trim_start_matches('/'));

        self.base
            .join(&relative)
            .map(String::from)
            .map_err(|e| Error::Generation(format!("Cannot resolve '{loc}': {e}")))
    }
}

/// Source of path aliases (`/node/9` to `/about-us`).
pub trait AliasSource: Send + Sync {
    /// Every alias of a language as `(internal path, alias)` pairs.
    fn aliases(&self, language: &str) -> Result<Vec<(String, String)>>;

    /// Alias of a single path.
    fn alias_for(&self, path: &str, language: &str) -> Result<Option<String>>;

    /// Total number of alias rows, used for memory budgeting.
    fn count(&self) -> Result<usize>;
}

/// Alias source backed by a map, keyed by `(language, path)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryAliases {
    aliases: HashMap<(String, String), String>,
}

impl MemoryAliases {
    /// Empty alias source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alias.
    pub fn insert(&mut self, language: &str, path: &str, alias: &str) {
        self.aliases
            .insert((language.to_string(), path.to_string()), alias.to_string());
    }
}

impl AliasSource for MemoryAliases {
    fn aliases(&self, language: &str) -> Result<Vec<(String, String)>> {
        Ok(self
            .aliases
            .iter()
            .filter(|((lang, _), _)| lang == language)
            .map(|((_, path), alias)| (path.clone(), alias.clone()))
            .collect())
    }

    fn alias_for(&self, path: &str, language: &str) -> Result<Option<String>> {
        Ok(self
            .aliases
            .get(&(language.to_string(), path.to_string()))
            .cloned())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.aliases.len())
    }
}

type AliasMap = Arc<HashMap<String, String>>;

/// Per-language alias lookups, optionally prefetched one language at a time.
///
/// A language-specific alias wins over a language-neutral one. Cached maps
/// are dropped by [`AliasCache::invalidate`].
pub struct AliasCache {
    source: Arc<dyn AliasSource>,
    prefetch: bool,
    languages: RwLock<HashMap<String, AliasMap>>,
}

impl AliasCache {
    /// Cache over `source`. Without prefetch every lookup goes to the source.
    pub fn new(source: Arc<dyn AliasSource>, prefetch: bool) -> Self {
        Self {
            source,
            prefetch,
            languages: RwLock::new(HashMap::new()),
        }
    }

    /// Whether whole languages are loaded up front.
    pub const fn prefetch(&self) -> bool {
        self.prefetch
    }

    /// Number of alias rows in the source.
    pub fn alias_count(&self) -> Result<usize> {
        self.source.count()
    }

    /// Alias of `path` in `language`, falling back to the language-neutral alias.
    pub fn lookup(&self, path: &str, language: &str) -> Result<Option<String>> {
        if !self.prefetch {
            if let Some(alias) = self.source.alias_for(path, language)? {
                return Ok(Some(alias));
            }
            if language == LANGUAGE_NONE {
                return Ok(None);
            }
            return self.source.alias_for(path, LANGUAGE_NONE);
        }

        if let Some(alias) = self.language_map(language)?.get(path) {
            return Ok(Some(alias.clone()));
        }
        if language == LANGUAGE_NONE {
            return Ok(None);
        }
        Ok(self.language_map(LANGUAGE_NONE)?.get(path).cloned())
    }

    /// Alias of `path`, or `path` itself.
    pub fn substitute(&self, path: &str, language: &str) -> Result<String> {
        Ok(self
            .lookup(path, language)?
            .unwrap_or_else(|| path.to_string()))
    }

    /// Drop cached maps for invalidated tags.
    ///
    /// [`ALIAS_TAG`] clears everything and `path_alias:<language>` clears one
    /// language. Other tags are ignored.
    pub fn invalidate(&self, tags: &[&str]) -> Result<()> {
        let mut languages = self
            .languages
            .write()
            .map_err(|_| Error::Storage("Alias cache lock poisoned".into()))?;
        for tag in tags {
            if *tag == ALIAS_TAG {
                languages.clear();
            } else if let Some(language) = tag.strip_prefix("path_alias:") {
                languages.remove(language);
            }
        }
        debug!(?tags, cached = languages.len(), "alias cache invalidated");
        Ok(())
    }

    /// Languages currently held in memory.
    pub fn cached_languages(&self) -> Result<Vec<String>> {
        let languages = self
            .languages
            .read()
            .map_err(|_| Error::Storage("Alias cache lock poisoned".into()))?;
        let mut cached: Vec<String> = languages.keys().cloned().collect();
        cached.sort();
        Ok(cached)
    }

    fn language_map(&self, language: &str) -> Result<AliasMap> {
        {
            let languages = self
                .languages
                .read()
                .map_err(|_| Error::Storage("Alias cache lock poisoned".into()))?;
            if let Some(map) = languages.get(language) {
                return Ok(Arc::clone(map));
            }
        }

        let map: AliasMap = Arc::new(self.source.aliases(language)?.into_iter().collect());
        debug!(language, aliases = map.len(), "prefetched path aliases");
        self.languages
            .write()
            .map_err(|_| Error::Storage("Alias cache lock poisoned".into()))?
            .insert(language.to_string(), Arc::clone(&map));
        Ok(map)
    }
}

impl std::fmt::Debug for AliasCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasCache")
            .field("prefetch", &self.prefetch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::LanguageSelection;

    fn sitemap() -> Sitemap {
        Sitemap::default()
    }

    #[test]
    fn test_base_resolver_joins_paths() {
        let resolver = BaseUrlResolver::new("https://example.com").unwrap();
        assert_eq!(
            resolver.resolve("/node/9", "en", &sitemap()).unwrap(),
            "https://example.com/node/9"
        );
        assert_eq!(resolver.resolve("/", "und", &sitemap()).unwrap(), "https://example.com/");
    }

    #[test]
    fn test_base_resolver_keeps_base_path() {
        let resolver = BaseUrlResolver::new("https://example.com/site").unwrap();
        assert_eq!(
            resolver.resolve("/about", "und", &sitemap()).unwrap(),
            "https://example.com/site/about"
        );
    }

    #[test]
    fn test_colon_in_first_segment_stays_on_site() {
        let resolver = BaseUrlResolver::new("https://example.com").unwrap();
        assert_eq!(
            resolver.resolve("/about:us", "und", &sitemap()).unwrap(),
            "https://example.com/about:us"
        );
        assert_eq!(
            resolver.resolve("/mailto:team", "und", &sitemap()).unwrap(),
            "https://example.com/mailto:team"
        );
    }

    #[test]
    fn test_language_prefix_skips_default_and_neutral() {
        let site = SiteConfig {
            base_url: "https://example.com".into(),
            default_language: "en".into(),
            language_selection: LanguageSelection::Simple,
        };
        let resolver = BaseUrlResolver::from_site(&site).unwrap();

        assert_eq!(
            resolver.resolve("/about", "fr", &sitemap()).unwrap(),
            "https://example.com/fr/about"
        );
        assert_eq!(
            resolver.resolve("/about", "en", &sitemap()).unwrap(),
            "https://example.com/about"
        );
        assert_eq!(
            resolver.resolve("/about", LANGUAGE_NONE, &sitemap()).unwrap(),
            "https://example.com/about"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(BaseUrlResolver::new("nope"), Err(Error::Config(_))));
    }

    fn aliases() -> Arc<MemoryAliases> {
        let mut aliases = MemoryAliases::new();
        aliases.insert("en", "/node/1", "/hello");
        aliases.insert(LANGUAGE_NONE, "/node/2", "/neutral");
        Arc::new(aliases)
    }

    #[test]
    fn test_lookup_falls_back_to_neutral_language() {
        for prefetch in [true, false] {
            let cache = AliasCache::new(aliases(), prefetch);
            assert_eq!(cache.lookup("/node/1", "en").unwrap().as_deref(), Some("/hello"));
            assert_eq!(cache.lookup("/node/2", "en").unwrap().as_deref(), Some("/neutral"));
            assert_eq!(cache.lookup("/node/1", "fr").unwrap(), None);
            assert_eq!(cache.substitute("/node/3", "en").unwrap(), "/node/3");
        }
    }

    #[test]
    fn test_prefetch_caches_and_invalidates_by_tag() {
        let cache = AliasCache::new(aliases(), true);
        cache.lookup("/node/1", "en").unwrap();
        cache.lookup("/node/1", "fr").unwrap();
        assert_eq!(cache.cached_languages().unwrap(), vec!["en", "fr", "und"]);

        cache.invalidate(&["path_alias:fr", "node_list"]).unwrap();
        assert_eq!(cache.cached_languages().unwrap(), vec!["en", "und"]);

        cache.invalidate(&[ALIAS_TAG]).unwrap();
        assert!(cache.cached_languages().unwrap().is_empty());
        assert_eq!(cache.alias_count().unwrap(), 2);
    }
}
