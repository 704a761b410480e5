//! Configuration management for sitemap generation.
//!
//! Configuration is stored in TOML format and layered as follows:
//!
//! 1. **Defaults**: built into [`Config::default`]
//! 2. **Config file**: platform config directory (`xmlsitemap/config.toml`) or
//!    an explicit path
//! 3. **Environment variables**: `XMLSITEMAP_*` prefix
//!
//! ## Example Configuration File
//!
//! ```toml
//! [generation]
//! chunk_size = "auto"
//! flush_every = 500
//! minimum_lifetime = 3600
//! gzip = true
//! lastmod_format = "medium"
//!
//! [rebuild]
//! batch_limit = 100
//!
//! [site]
//! base_url = "https://example.com"
//! default_language = "en"
//! language_selection = "simple"
//!
//! [paths]
//! root = "/var/lib/xmlsitemap"
//! ```
//!
//! ## Loading
//!
//! ```rust
//! use xmlsitemap_core::Config;
//!
//! let config = Config::from_toml_str("[generation]\nchunk_size = 2000\n")?;
//! assert_eq!(config.generation.chunk_size.resolve(123_456), 2000);
//! # Ok::<(), xmlsitemap_core::Error>(())
//! ```

use crate::link::LANGUAGE_NONE;
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Upper bound on links per chunk imposed by the sitemap protocol.
pub const MAX_CHUNK_SIZE: usize = 50_000;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "XMLSITEMAP_";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Sitemap generation settings
    pub generation: GenerationConfig,
    /// Link rebuild settings
    pub rebuild: RebuildConfig,
    /// Public site settings
    pub site: SiteConfig,
    /// Front page link settings
    pub frontpage: FrontpageConfig,
    /// File system paths
    pub paths: PathsConfig,
}

/// Settings controlling chunked generation and regeneration scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Links per chunk, or `auto` to derive it from the visible link count.
    pub chunk_size: ChunkSize,

    /// Writer flushes its buffer after this many elements.
    pub flush_every: usize,

    /// Hard stop on the number of chunks per sitemap.
    pub max_chunks: u32,

    /// Minimum seconds between two cron-triggered regenerations.
    ///
    /// Changes that arrive sooner are picked up by a later cron run.
    pub minimum_lifetime: i64,

    /// Write a gzip-compressed sibling next to each generated file.
    pub gzip: bool,

    /// Load each language's path aliases in one query before generating.
    pub prefetch_aliases: bool,

    /// Formatting of `lastmod` values.
    pub lastmod_format: LastmodFormat,

    /// Reference the XSL stylesheet from generated files.
    pub xsl: bool,

    /// Stylesheet location used when `xsl` is on.
    pub xsl_href: String,

    /// Only regenerate when asked to explicitly.
    pub disable_cron_regeneration: bool,

    /// Soft memory ceiling in bytes for generation runs. Unset means unlimited.
    pub memory_limit: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            chunk_size: ChunkSize::Auto,
            flush_every: 500,
            max_chunks: 50_000,
            minimum_lifetime: 0,
            gzip: false,
            prefetch_aliases: true,
            lastmod_format: LastmodFormat::Medium,
            xsl: true,
            xsl_href: "/sitemap.xsl".to_string(),
            disable_cron_regeneration: false,
            memory_limit: None,
        }
    }
}

/// Number of links written per chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkSize {
    /// Derived from the number of visible links.
    #[default]
    Auto,
    /// Fixed size.
    Fixed(usize),
}

impl ChunkSize {
    /// Concrete chunk size for a sitemap with `visible_links` links.
    ///
    /// `auto` grows in steps of 5000 per 10000 links, capped at
    /// [`MAX_CHUNK_SIZE`].
    ///
    /// ```rust
    /// use xmlsitemap_core::ChunkSize;
    ///
    /// assert_eq!(ChunkSize::Auto.resolve(0), 5000);
    /// assert_eq!(ChunkSize::Auto.resolve(25_000), 15_000);
    /// assert_eq!(ChunkSize::Auto.resolve(10_000_000), 50_000);
    /// assert_eq!(ChunkSize::Fixed(100).resolve(10_000_000), 100);
    /// ```
    pub fn resolve(self, visible_links: usize) -> usize {
        match self {
            Self::Fixed(size) => size.clamp(1, MAX_CHUNK_SIZE),
            Self::Auto => (visible_links.max(1).div_ceil(10_000) * 5_000).min(MAX_CHUNK_SIZE),
        }
    }
}

impl Serialize for ChunkSize {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Fixed(size) => serializer.serialize_u64(*size as u64),
        }
    }
}

impl<'de> Deserialize<'de> for ChunkSize {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(usize),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(size) => Ok(Self::Fixed(size)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl FromStr for ChunkSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.trim()
            .parse()
            .map(Self::Fixed)
            .map_err(|_| Error::Config(format!("Invalid chunk size '{s}': expected 'auto' or a number")))
    }
}

/// How `lastmod` timestamps are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LastmodFormat {
    /// `2024-01-15`
    Short,
    /// `2024-01-15T10:30Z`
    #[default]
    Medium,
    /// `2024-01-15T10:30:00+00:00`
    Long,
}

impl LastmodFormat {
    /// Render a unix timestamp, `None` for unknown (non-positive) values.
    pub fn render(self, timestamp: i64) -> Option<String> {
        if timestamp <= 0 {
            return None;
        }
        let at = DateTime::<Utc>::from_timestamp(timestamp, 0)?;
        Some(match self {
            Self::Short => at.format("%Y-%m-%d").to_string(),
            Self::Medium => at.format("%Y-%m-%dT%H:%MZ").to_string(),
            Self::Long => at.to_rfc3339_opts(SecondsFormat::Secs, false),
        })
    }
}

/// Settings for rebuilding the link store from content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebuildConfig {
    /// Items fetched per rebuild step.
    pub batch_limit: usize,
}

impl Default for RebuildConfig {
    fn default() -> Self {
        Self { batch_limit: 100 }
    }
}

/// Public site settings used to build absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Absolute base URL every `loc` is resolved against.
    pub base_url: String,
    /// Language served without a path prefix.
    pub default_language: String,
    /// Which links of other languages a per-language sitemap includes.
    pub language_selection: LanguageSelection,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            default_language: LANGUAGE_NONE.to_string(),
            language_selection: LanguageSelection::Off,
        }
    }
}

/// Language partitioning of links into sitemaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LanguageSelection {
    /// Every sitemap lists every language.
    #[default]
    Off,
    /// A sitemap lists its language plus language-neutral links.
    Simple,
    /// A sitemap lists only its own language.
    Strict,
}

/// The front page link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontpageConfig {
    /// Priority of `/`.
    pub priority: f32,
    /// Changefreq of `/` in seconds.
    pub changefreq: i64,
}

impl Default for FrontpageConfig {
    fn default() -> Self {
        Self {
            priority: 1.0,
            changefreq: 86_400,
        }
    }
}

/// File system paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root directory for generated files and persisted state.
    ///
    /// Generated sitemaps land in `root/<smid>/`.
    ///
    /// Default locations:
    /// - Linux: `~/.local/share/xmlsitemap`
    /// - macOS: `~/Library/Application Support/org.xmlsitemap.xmlsitemap`
    /// - Windows: `%APPDATA%\xmlsitemap\xmlsitemap\data`
    pub root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: directories::ProjectDirs::from("org", "xmlsitemap", "xmlsitemap").map_or_else(
                || {
                    directories::BaseDirs::new().map_or_else(
                        || PathBuf::from(".xmlsitemap"),
                        |base| base.home_dir().join(".xmlsitemap"),
                    )
                },
                |dirs| dirs.data_dir().to_path_buf(),
            ),
        }
    }
}

impl PathsConfig {
    /// Persisted link table.
    pub fn links_file(&self) -> PathBuf {
        self.root.join("links.json")
    }

    /// Persisted sitemap entities.
    pub fn sitemaps_file(&self) -> PathBuf {
        self.root.join("sitemaps.json")
    }

    /// Persisted process state.
    pub fn state_file(&self) -> PathBuf {
        self.root.join("state.json")
    }

    /// Directory holding generated sitemap files.
    pub fn files_dir(&self) -> PathBuf {
        self.root.join("files")
    }
}

impl Config {
    /// Load configuration from the default location with environment
    /// overrides applied.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config directory cannot be determined (unsupported platform)
    /// - The config file exists but cannot be read or parsed
    /// - An environment override has an invalid value
    /// - The resulting configuration fails [`Config::validate`]
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path with environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text without environment overrides.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Save the configuration as TOML to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content).map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;
        Ok(())
    }

    /// Path of the configuration file in the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined,
    /// which may happen on unsupported platforms or in sandboxed environments.
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = directories::ProjectDirs::from("org", "xmlsitemap", "xmlsitemap")
            .ok_or_else(|| Error::Config("Failed to determine project directories".into()))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// Apply `XMLSITEMAP_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(root) = var("ROOT") {
            self.paths.root = PathBuf::from(root);
        }
        if let Some(base_url) = var("BASE_URL") {
            self.site.base_url = base_url;
        }
        if let Some(chunk_size) = var("CHUNK_SIZE") {
            self.generation.chunk_size = chunk_size.parse()?;
        }
        if let Some(lifetime) = var("MINIMUM_LIFETIME") {
            self.generation.minimum_lifetime = lifetime.trim().parse().map_err(|_| {
                Error::Config(format!("Invalid {ENV_PREFIX}MINIMUM_LIFETIME '{lifetime}'"))
            })?;
        }
        Ok(())
    }

    /// Reject settings the generator cannot work with.
    pub fn validate(&self) -> Result<()> {
        let generation = &self.generation;
        if let ChunkSize::Fixed(size) = generation.chunk_size {
            if size == 0 || size > MAX_CHUNK_SIZE {
                return Err(Error::Config(format!(
                    "chunk_size must be between 1 and {MAX_CHUNK_SIZE}, got {size}"
                )));
            }
        }
        if generation.flush_every == 0 {
            return Err(Error::Config("flush_every must be positive".into()));
        }
        if generation.max_chunks == 0 {
            return Err(Error::Config("max_chunks must be positive".into()));
        }
        if generation.minimum_lifetime < 0 {
            return Err(Error::Config("minimum_lifetime must not be negative".into()));
        }
        if self.rebuild.batch_limit == 0 {
            return Err(Error::Config("batch_limit must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.frontpage.priority) {
            return Err(Error::Config(format!(
                "frontpage priority {} outside 0.0..=1.0",
                self.frontpage.priority
            )));
        }
        ::url::Url::parse(&self.site.base_url)
            .map_err(|e| Error::Config(format!("Invalid base_url '{}': {e}", self.site.base_url)))?;
        Ok(())
    }
}
