//! Sitemap entities, their persistence and the on-disk file layout.
//!
//! A sitemap is one generation context (usually a language). Its `smid` is
//! derived from the context, so the same context always maps to the same
//! directory:
//!
//! ```text
//! <root>/<smid>/1.xml
//! <root>/<smid>/2.xml
//! <root>/<smid>/index.xml        (only when there is more than one chunk)
//! <root>/<smid>/1.xml.gz         (optional gzip siblings)
//! ```

use crate::config::LanguageSelection;
use crate::link::{LANGUAGE_NONE, LinkSelection};
use crate::persist::{read_json, write_json_atomic};
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Context key holding the sitemap language.
pub const CONTEXT_LANGUAGE: &str = "language";

/// One generated sitemap document set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sitemap {
    /// Identifier derived from `context`.
    pub smid: String,
    /// Values selecting which links belong to this sitemap.
    pub context: BTreeMap<String, String>,
    /// Chunk files written by the last successful generation.
    pub chunks: u32,
    /// Visible links written by the last successful generation.
    pub links: u64,
    /// Size in bytes of the largest generated chunk.
    pub max_filesize: u64,
    /// Unix time of the last successful generation, 0 when never.
    pub updated: i64,
}

impl Default for Sitemap {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl Sitemap {
    /// New, never generated sitemap for a context.
    pub fn new(context: BTreeMap<String, String>) -> Self {
        Self {
            smid: smid_for(&context),
            context,
            chunks: 0,
            links: 0,
            max_filesize: 0,
            updated: 0,
        }
    }

    /// Sitemap for a single language.
    pub fn for_language(language: &str) -> Self {
        let mut context = BTreeMap::new();
        context.insert(CONTEXT_LANGUAGE.to_string(), language.to_string());
        Self::new(context)
    }

    /// Language of the context, if any.
    pub fn language(&self) -> Option<&str> {
        self.context.get(CONTEXT_LANGUAGE).map(String::as_str)
    }

    /// Links belonging to this sitemap under the given language mode.
    pub fn selection(&self, mode: LanguageSelection) -> LinkSelection {
        match (mode, self.language()) {
            (LanguageSelection::Off, _) | (_, None) => LinkSelection::all(),
            (LanguageSelection::Simple, Some(language)) => {
                LinkSelection::languages([language, LANGUAGE_NONE])
            },
            (LanguageSelection::Strict, Some(language)) => LinkSelection::languages([language]),
        }
    }

    /// Whether generation has ever completed.
    pub const fn is_generated(&self) -> bool {
        self.updated > 0
    }
}

/// Derive the identifier of a context.
///
/// The canonical form is `key=value` lines in key order, hashed with SHA-256
/// and encoded as URL-safe base64 without padding.
///
/// ```rust
/// use std::collections::BTreeMap;
/// use xmlsitemap_core::sitemap::smid_for;
///
/// let mut context = BTreeMap::new();
/// context.insert("language".to_string(), "en".to_string());
/// assert_eq!(smid_for(&context), smid_for(&context.clone()));
/// assert_ne!(smid_for(&context), smid_for(&BTreeMap::new()));
/// ```
pub fn smid_for(context: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in context {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Where generated files live.
#[derive(Debug, Clone)]
pub struct SitemapLayout {
    root: PathBuf,
}

impl SitemapLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Published directory of a sitemap.
    pub fn directory(&self, smid: &str) -> PathBuf {
        self.root.join(smid)
    }

    /// Directory a generation run writes into before publishing.
    pub fn staging_directory(&self, smid: &str) -> PathBuf {
        self.root.join(format!(".{smid}.staging"))
    }

    /// Chunk file inside a sitemap directory.
    pub fn chunk_file(directory: &Path, chunk: u32) -> PathBuf {
        directory.join(format!("{chunk}.xml"))
    }

    /// Index file inside a sitemap directory.
    pub fn index_file(directory: &Path) -> PathBuf {
        directory.join("index.xml")
    }

    /// Compressed sibling of a generated file.
    pub fn gzip_file(file: &Path) -> PathBuf {
        let mut name = file.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    }

    /// Start a clean staging directory, discarding leftovers of a failed run.
    pub fn prepare_staging(&self, smid: &str) -> Result<PathBuf> {
        let staging = self.staging_directory(smid);
        if staging.exists() {
            warn!(path = %staging.display(), "discarding staging directory of an unfinished run");
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;
        Ok(staging)
    }

    /// Replace the published directory with the staging directory.
    ///
    /// The old directory is moved aside before the rename and removed after,
    /// so readers see either the old or the new set of files.
    pub fn publish(&self, smid: &str) -> Result<PathBuf> {
        let staging = self.staging_directory(smid);
        let published = self.directory(smid);
        let retired = self.root.join(format!(".{smid}.old"));

        if retired.exists() {
            fs::remove_dir_all(&retired)?;
        }
        if published.exists() {
            fs::rename(&published, &retired)?;
        }
        fs::rename(&staging, &published)?;
        if retired.exists() {
            fs::remove_dir_all(&retired)?;
        }
        debug!(path = %published.display(), "published sitemap files");
        Ok(published)
    }

    /// Remove every file of a sitemap.
    pub fn remove(&self, smid: &str) -> Result<()> {
        for dir in [self.directory(smid), self.staging_directory(smid)] {
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}

/// Sitemap entities persisted to a JSON file.
#[derive(Debug)]
pub struct SitemapRepository {
    path: Option<PathBuf>,
    sitemaps: RwLock<BTreeMap<String, Sitemap>>,
}

impl SitemapRepository {
    /// Repository that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            sitemaps: RwLock::new(BTreeMap::new()),
        }
    }

    /// Open (or start) a repository persisted at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let sitemaps: Vec<Sitemap> = read_json(&path)?.unwrap_or_default();
        Ok(Self {
            sitemaps: RwLock::new(sitemaps.into_iter().map(|s| (s.smid.clone(), s)).collect()),
            path: Some(path),
        })
    }

    /// Every sitemap, ordered by smid.
    pub fn all(&self) -> Result<Vec<Sitemap>> {
        Ok(self.read()?.values().cloned().collect())
    }

    /// Load one sitemap.
    pub fn load(&self, smid: &str) -> Result<Option<Sitemap>> {
        Ok(self.read()?.get(smid).cloned())
    }

    /// Load the given sitemaps, or all of them when `smids` is `None`.
    ///
    /// Unknown identifiers are an error.
    pub fn load_multiple(&self, smids: Option<&[String]>) -> Result<Vec<Sitemap>> {
        let Some(smids) = smids else {
            return self.all();
        };
        let sitemaps = self.read()?;
        smids
            .iter()
            .map(|smid| {
                sitemaps
                    .get(smid)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(format!("sitemap '{smid}'")))
            })
            .collect()
    }

    /// Insert or replace a sitemap.
    pub fn save(&self, sitemap: &Sitemap) -> Result<()> {
        let mut sitemaps = self.write()?;
        let mut next = sitemaps.clone();
        next.insert(sitemap.smid.clone(), sitemap.clone());
        self.persist(&next)?;
        *sitemaps = next;
        Ok(())
    }

    /// Delete a sitemap together with its generated files.
    pub fn delete(&self, smid: &str, layout: &SitemapLayout) -> Result<bool> {
        let mut sitemaps = self.write()?;
        if !sitemaps.contains_key(smid) {
            return Ok(false);
        }
        let mut next = sitemaps.clone();
        next.remove(smid);
        self.persist(&next)?;
        *sitemaps = next;
        drop(sitemaps);

        layout.remove(smid)?;
        debug!(smid, "deleted sitemap");
        Ok(true)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Sitemap>>> {
        self.sitemaps
            .read()
            .map_err(|_| Error::Storage("Sitemap repository lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Sitemap>>> {
        self.sitemaps
            .write()
            .map_err(|_| Error::Storage("Sitemap repository lock poisoned".into()))
    }

    fn persist(&self, sitemaps: &BTreeMap<String, Sitemap>) -> Result<()> {
        if let Some(path) = &self.path {
            let list: Vec<&Sitemap> = sitemaps.values().collect();
            write_json_atomic(path, &list)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_smid_is_stable_and_url_safe() {
        let a = Sitemap::for_language("en");
        let b = Sitemap::for_language("en");
        let c = Sitemap::for_language("fr");

        assert_eq!(a.smid, b.smid);
        assert_ne!(a.smid, c.smid);
        assert!(
            a.smid
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        );
    }

    #[test]
    fn test_selection_per_language_mode() {
        let en = Sitemap::for_language("en");

        assert_eq!(en.selection(LanguageSelection::Off), LinkSelection::all());
        assert_eq!(
            en.selection(LanguageSelection::Simple),
            LinkSelection::languages(["en", "und"])
        );
        assert_eq!(
            en.selection(LanguageSelection::Strict),
            LinkSelection::languages(["en"])
        );
        assert_eq!(
            Sitemap::default().selection(LanguageSelection::Strict),
            LinkSelection::all()
        );
    }

    #[test]
    fn test_repository_persists_and_deletes_files() {
        let dir = TempDir::new().unwrap();
        let layout = SitemapLayout::new(dir.path().join("files"));
        let path = dir.path().join("sitemaps.json");

        let mut sitemap = Sitemap::for_language("en");
        {
            let repo = SitemapRepository::open(&path).unwrap();
            repo.save(&sitemap).unwrap();
            sitemap.chunks = 2;
            repo.save(&sitemap).unwrap();
        }

        let repo = SitemapRepository::open(&path).unwrap();
        assert_eq!(repo.load(&sitemap.smid).unwrap().unwrap().chunks, 2);

        fs::create_dir_all(layout.directory(&sitemap.smid)).unwrap();
        fs::write(SitemapLayout::chunk_file(&layout.directory(&sitemap.smid), 1), "x").unwrap();

        assert!(repo.delete(&sitemap.smid, &layout).unwrap());
        assert!(!layout.directory(&sitemap.smid).exists());
        assert!(repo.all().unwrap().is_empty());
        assert!(!repo.delete(&sitemap.smid, &layout).unwrap());
    }

    #[test]
    fn test_load_multiple_rejects_unknown() {
        let repo = SitemapRepository::in_memory();
        repo.save(&Sitemap::default()).unwrap();

        assert_eq!(repo.load_multiple(None).unwrap().len(), 1);
        let err = repo
            .load_multiple(Some(&["missing".to_string()]))
            .unwrap_err();
        assert_eq!(err.category(), "not_found");
    }

    #[test]
    fn test_publish_replaces_directory() {
        let dir = TempDir::new().unwrap();
        let layout = SitemapLayout::new(dir.path());

        let published = layout.directory("abc");
        fs::create_dir_all(&published).unwrap();
        fs::write(published.join("stale.xml"), "old").unwrap();

        let staging = layout.prepare_staging("abc").unwrap();
        fs::write(staging.join("1.xml"), "new").unwrap();
        layout.publish("abc").unwrap();

        assert!(published.join("1.xml").exists());
        assert!(!published.join("stale.xml").exists());
        assert!(!staging.exists());
    }

    #[test]
    fn test_gzip_sibling_name() {
        assert_eq!(
            SitemapLayout::gzip_file(Path::new("/x/1.xml")),
            PathBuf::from("/x/1.xml.gz")
        );
    }
}
