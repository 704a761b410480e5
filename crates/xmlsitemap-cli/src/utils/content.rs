//! Loading content and path alias exports.
//!
//! The CLI has no live content store, so rebuilds read a JSON export shaped
//! like [`MemoryContent`]:
//!
//! ```json
//! {
//!   "bundles": { "node.page": { "status": true, "priority": 0.5, "changefreq": 0 } },
//!   "items": [
//!     { "entity_type": "node", "bundle": "page", "id": 1, "path": "/node/1", "timestamps": [1700000000] }
//!   ]
//! }
//! ```
//!
//! Aliases are a flat list of `{ "language", "path", "alias" }` objects.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;
use xmlsitemap_core::{MemoryAliases, MemoryContent};

/// File name of the content export under the root directory.
pub const CONTENT_FILE: &str = "content.json";

/// File name of the alias export under the root directory.
pub const ALIASES_FILE: &str = "aliases.json";

#[derive(Debug, Deserialize)]
struct AliasEntry {
    #[serde(default = "default_language")]
    language: String,
    path: String,
    alias: String,
}

fn default_language() -> String {
    xmlsitemap_core::LANGUAGE_NONE.to_string()
}

/// Read a content export. A missing file is an empty repository.
pub fn load_content(path: &Path) -> Result<MemoryContent> {
    if !path.exists() {
        debug!(path = %path.display(), "no content export, using an empty repository");
        return Ok(MemoryContent::new());
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read content export {}", path.display()))?;
    let content: MemoryContent = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse content export {}", path.display()))?;
    debug!(items = content.items.len(), "loaded content export");
    Ok(content)
}

/// Read an alias export, `None` when the file does not exist.
pub fn load_aliases(path: &Path) -> Result<Option<MemoryAliases>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read alias export {}", path.display()))?;
    let entries: Vec<AliasEntry> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse alias export {}", path.display()))?;

    let mut aliases = MemoryAliases::new();
    for entry in &entries {
        aliases.insert(&entry.language, &entry.path, &entry.alias);
    }
    debug!(aliases = entries.len(), "loaded alias export");
    Ok(Some(aliases))
}
