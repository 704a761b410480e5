//! Interfaces to the content repository that owns indexable items, and the
//! registry of per-type projections turning an item into a link record.

use crate::Result;
use crate::changefreq::calculate_changefreq;
use crate::link::{LANGUAGE_NONE, LinkRecord, PRIORITY_DEFAULT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An indexable item as exposed by the content repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Entity type (`node`, `taxonomy_term`, `user`, ...).
    pub entity_type: String,
    /// Bundle within the entity type.
    pub bundle: String,
    /// Monotonic primary key.
    pub id: u64,
    /// Language code, `None` when not language specific.
    #[serde(default)]
    pub language: Option<String>,
    /// Known modification instants (creation, revisions, last change).
    #[serde(default)]
    pub timestamps: Vec<i64>,
    /// Routed path or external URL, `None` when the item has no page.
    #[serde(default)]
    pub path: Option<String>,
    /// Whether the item is published to anonymous visitors.
    #[serde(default = "default_true")]
    pub published: bool,
}

const fn default_true() -> bool {
    true
}

/// Sitemap defaults configured for one bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleSettings {
    /// Whether links of this bundle are included.
    pub status: bool,
    /// Default priority.
    pub priority: f32,
    /// Default changefreq in seconds, 0 for unknown.
    pub changefreq: i64,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            status: false,
            priority: PRIORITY_DEFAULT,
            changefreq: 0,
        }
    }
}

/// The content store that owns every indexable item.
pub trait ContentRepository: Send + Sync {
    /// Internal path of the item, or `None` when it has no routable page.
    fn resolve_internal_path(&self, item: &ContentItem) -> Option<String>;

    /// Whether an anonymous visitor may view the item.
    fn is_publicly_viewable(&self, item: &ContentItem) -> bool;

    /// Sitemap settings of a bundle.
    fn bundle_settings(&self, entity_type: &str, bundle: &str) -> BundleSettings;

    /// Bundles of `entity_type` whose links are included.
    fn enabled_bundles(&self, entity_type: &str) -> Vec<String>;

    /// Up to `limit` items with `id > after_id` in ascending id order.
    fn enumerate(
        &self,
        entity_type: &str,
        bundles: &[String],
        after_id: u64,
        limit: usize,
    ) -> Result<Vec<ContentItem>>;

    /// Number of items of the given bundles.
    fn count(&self, entity_type: &str, bundles: &[String]) -> Result<u64>;
}

/// Whether `path` is an internal path the sitemap may store.
pub fn is_internal_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}

/// Project an item into a link using its bundle settings.
///
/// External or unroutable items get an empty `loc` and are never emitted.
pub fn default_projection(item: &ContentItem, content: &dyn ContentRepository) -> LinkRecord {
    let settings = content.bundle_settings(&item.entity_type, &item.bundle);
    let loc = content
        .resolve_internal_path(item)
        .filter(|p| is_internal_path(p))
        .unwrap_or_default();

    let changefreq = match calculate_changefreq(&item.timestamps) {
        0 => settings.changefreq,
        estimate => estimate,
    };
    let changecount = i64::try_from(item.timestamps.len().saturating_sub(1)).unwrap_or(i64::MAX);

    LinkRecord {
        kind: item.entity_type.clone(),
        subtype: item.bundle.clone(),
        id: item.id.to_string(),
        loc,
        access: content.is_publicly_viewable(item),
        status: settings.status,
        status_override: false,
        priority: settings.priority,
        priority_override: false,
        changefreq,
        changecount,
        lastmod: item.timestamps.iter().copied().max().unwrap_or(0),
        language: item
            .language
            .clone()
            .unwrap_or_else(|| LANGUAGE_NONE.to_string()),
    }
}

/// Function turning an item into a link record.
pub type Projection = Box<dyn Fn(&ContentItem, &dyn ContentRepository) -> LinkRecord + Send + Sync>;

/// Named link projections, resolved by entity type.
///
/// Types without a registered projection use [`default_projection`].
#[derive(Default)]
pub struct LinkTypeRegistry {
    projections: HashMap<String, Projection>,
}

impl LinkTypeRegistry {
    /// Registry with only the default projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a projection for an entity type, replacing any previous one.
    #[must_use]
    pub fn register<F>(mut self, entity_type: impl Into<String>, projection: F) -> Self
    where
        F: Fn(&ContentItem, &dyn ContentRepository) -> LinkRecord + Send + Sync + 'static,
    {
        self.projections
            .insert(entity_type.into(), Box::new(projection));
        self
    }

    /// Whether a custom projection exists for the type.
    pub fn contains(&self, entity_type: &str) -> bool {
        self.projections.contains_key(entity_type)
    }

    /// Project an item with the projection registered for its type.
    pub fn project(&self, item: &ContentItem, content: &dyn ContentRepository) -> LinkRecord {
        self.projections
            .get(&item.entity_type)
            .map_or_else(|| default_projection(item, content), |f| f(item, content))
    }
}

impl std::fmt::Debug for LinkTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.projections.keys().collect();
        types.sort();
        f.debug_struct("LinkTypeRegistry").field("types", &types).finish()
    }
}

/// In-memory content repository, mostly for tests and small exports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryContent {
    /// Every item, in any order.
    pub items: Vec<ContentItem>,
    /// Settings keyed by `"<entity_type>.<bundle>"`.
    pub bundles: HashMap<String, BundleSettings>,
}

impl MemoryContent {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a bundle.
    #[must_use]
    pub fn with_bundle(mut self, entity_type: &str, bundle: &str, settings: BundleSettings) -> Self {
        self.bundles
            .insert(format!("{entity_type}.{bundle}"), settings);
        self
    }

    /// Add an item.
    pub fn push(&mut self, item: ContentItem) {
        self.items.push(item);
    }

    fn selected<'a>(
        &'a self,
        entity_type: &'a str,
        bundles: &'a [String],
    ) -> impl Iterator<Item = &'a ContentItem> + 'a {
        self.items
            .iter()
            .filter(move |i| i.entity_type == entity_type && bundles.contains(&i.bundle))
    }
}

impl ContentRepository for MemoryContent {
    fn resolve_internal_path(&self, item: &ContentItem) -> Option<String> {
        item.path.clone()
    }

    fn is_publicly_viewable(&self, item: &ContentItem) -> bool {
        item.published
    }

    fn bundle_settings(&self, entity_type: &str, bundle: &str) -> BundleSettings {
        self.bundles
            .get(&format!("{entity_type}.{bundle}"))
            .copied()
            .unwrap_or_default()
    }

    fn enabled_bundles(&self, entity_type: &str) -> Vec<String> {
        let prefix = format!("{entity_type}.");
        let mut bundles: Vec<String> = self
            .bundles
            .iter()
            .filter(|(key, settings)| settings.status && key.starts_with(&prefix))
            .map(|(key, _)| key[prefix.len()..].to_string())
            .collect();
        bundles.sort();
        bundles
    }

    fn enumerate(
        &self,
        entity_type: &str,
        bundles: &[String],
        after_id: u64,
        limit: usize,
    ) -> Result<Vec<ContentItem>> {
        let mut items: Vec<ContentItem> = self
            .selected(entity_type, bundles)
            .filter(|i| i.id > after_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id);
        items.truncate(limit);
        Ok(items)
    }

    fn count(&self, entity_type: &str, bundles: &[String]) -> Result<u64> {
        Ok(self.selected(entity_type, bundles).count() as u64)
    }
}
