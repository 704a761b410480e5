//! Streaming XML writers for chunk and index documents.
//!
//! A [`SitemapWriter`] is opened on a file, receives elements one at a time and
//! is consumed by [`SitemapWriter::close`], which ends the root element,
//! flushes and writes the optional gzip sibling. Nothing is buffered beyond
//! `flush_every` elements.

use crate::changefreq::ChangeFrequency;
use crate::config::GenerationConfig;
use crate::link::PRIORITY_DEFAULT;
use crate::sitemap::SitemapLayout;
use crate::{Error, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Namespace of the sitemap protocol.
pub const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Root element of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `<urlset>` of `<url>` elements.
    UrlSet,
    /// `<sitemapindex>` of `<sitemap>` elements.
    SitemapIndex,
}

impl DocumentKind {
    const fn root(self) -> &'static str {
        match self {
            Self::UrlSet => "urlset",
            Self::SitemapIndex => "sitemapindex",
        }
    }

    const fn element(self) -> &'static str {
        match self {
            Self::UrlSet => "url",
            Self::SitemapIndex => "sitemap",
        }
    }
}

/// Output settings shared by chunk and index writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Flush the buffer after this many elements.
    pub flush_every: usize,
    /// Write a `.gz` sibling after closing.
    pub gzip: bool,
    /// Stylesheet referenced by an `xml-stylesheet` instruction.
    pub stylesheet: Option<String>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            flush_every: 500,
            gzip: false,
            stylesheet: None,
        }
    }
}

impl WriterOptions {
    /// Options from the generation settings.
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            flush_every: config.flush_every.max(1),
            gzip: config.gzip,
            stylesheet: config.xsl.then(|| config.xsl_href.clone()),
        }
    }
}

/// One `<url>` or `<sitemap>` entry, ready to be written.
///
/// Element filters receive it mutably before it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapElement {
    /// Absolute URL.
    pub loc: String,
    /// Rendered modification time.
    pub lastmod: Option<String>,
    /// Change frequency bucket.
    pub changefreq: Option<ChangeFrequency>,
    /// Priority; omitted when it equals the protocol default.
    pub priority: Option<f32>,
}

impl SitemapElement {
    /// Element with only a location.
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            lastmod: None,
            changefreq: None,
            priority: None,
        }
    }

    /// Rendered priority, `None` at the default of 0.5.
    pub fn priority_text(&self) -> Option<String> {
        self.priority
            .filter(|p| (p - PRIORITY_DEFAULT).abs() > f32::EPSILON)
            .map(|p| format!("{p:.1}"))
    }
}

/// Result of closing a writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// File that was written.
    pub path: PathBuf,
    /// Elements written.
    pub elements: usize,
    /// Size of the uncompressed file.
    pub bytes: u64,
    /// Compressed sibling, when enabled.
    pub gzip_path: Option<PathBuf>,
}

/// Streaming writer for one sitemap document.
pub struct SitemapWriter {
    xml: Writer<BufWriter<File>>,
    path: PathBuf,
    kind: DocumentKind,
    options: WriterOptions,
    elements: usize,
    since_flush: usize,
}

fn xml_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Generation(format!("Failed writing {}: {err}", path.display()))
}

impl SitemapWriter {
    /// Create the file and write the prologue and the opening root element.
    pub fn create(path: &Path, kind: DocumentKind, options: &WriterOptions) -> Result<Self> {
        let file = File::create(path)
            .map_err(|e| Error::Generation(format!("Cannot open {}: {e}", path.display())))?;
        let mut xml = Writer::new_with_indent(BufWriter::new(file), b' ', 2);

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| xml_error(path, e))?;
        if let Some(href) = &options.stylesheet {
            let instruction = format!(
                r#"xml-stylesheet type="text/xsl" href="{}""#,
                escape(href.as_str())
            );
            xml.write_event(Event::PI(BytesPI::new(instruction.as_str())))
                .map_err(|e| xml_error(path, e))?;
        }
        let root = BytesStart::new(kind.root()).with_attributes([("xmlns", SITEMAP_NS)]);
        xml.write_event(Event::Start(root))
            .map_err(|e| xml_error(path, e))?;

        Ok(Self {
            xml,
            path: path.to_path_buf(),
            kind,
            options: options.clone(),
            elements: 0,
            since_flush: 0,
        })
    }

    /// Elements written so far.
    pub const fn elements(&self) -> usize {
        self.elements
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one element.
    pub fn write_element(&mut self, element: &SitemapElement) -> Result<()> {
        let name = self.kind.element();
        self.start(name)?;
        self.text_element("loc", &element.loc)?;
        if let Some(lastmod) = &element.lastmod {
            self.text_element("lastmod", lastmod)?;
        }
        if let Some(changefreq) = element.changefreq {
            self.text_element("changefreq", changefreq.as_str())?;
        }
        if let Some(priority) = element.priority_text() {
            self.text_element("priority", &priority)?;
        }
        self.end(name)?;

        self.elements += 1;
        self.since_flush += 1;
        if self.since_flush >= self.options.flush_every {
            self.xml
                .get_mut()
                .flush()
                .map_err(|e| xml_error(&self.path, e))?;
            self.since_flush = 0;
        }
        Ok(())
    }

    /// End the document and flush it to disk.
    pub fn close(mut self) -> Result<WriteSummary> {
        self.end(self.kind.root())?;
        let mut inner = self.xml.into_inner();
        inner.flush().map_err(|e| xml_error(&self.path, e))?;
        drop(inner);

        let bytes = fs::metadata(&self.path)?.len();
        let gzip_path = if self.options.gzip {
            Some(compress(&self.path)?)
        } else {
            None
        };
        debug!(path = %self.path.display(), elements = self.elements, bytes, "closed sitemap file");

        Ok(WriteSummary {
            path: self.path,
            elements: self.elements,
            bytes,
            gzip_path,
        })
    }

    fn start(&mut self, name: &str) -> Result<()> {
        self.xml
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(|e| xml_error(&self.path, e))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.xml
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| xml_error(&self.path, e))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(name)?;
        self.xml
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| xml_error(&self.path, e))?;
        self.end(name)
    }
}

impl std::fmt::Debug for SitemapWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SitemapWriter")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("elements", &self.elements)
            .finish_non_exhaustive()
    }
}

/// Gzip `path` at maximum compression into its `.gz` sibling.
fn compress(path: &Path) -> Result<PathBuf> {
    let target = SitemapLayout::gzip_file(path);
    let mut input = BufReader::new(File::open(path)?);
    let output = BufWriter::new(File::create(&target)?);
    let mut encoder = GzEncoder::new(output, Compression::best());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.flush()?;
    Ok(target)
}

/// Writes the `<sitemapindex>` document listing every chunk.
#[derive(Debug, Clone, Default)]
pub struct IndexWriter {
    options: WriterOptions,
}

impl IndexWriter {
    /// Index writer with the given output options.
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    /// Write one `<sitemap>` entry per chunk to `path`.
    pub fn write(&self, path: &Path, entries: &[SitemapElement]) -> Result<WriteSummary> {
        let mut writer = SitemapWriter::create(path, DocumentKind::SitemapIndex, &self.options)?;
        for entry in entries {
            writer.write_element(entry)?;
        }
        writer.close()
    }
}
