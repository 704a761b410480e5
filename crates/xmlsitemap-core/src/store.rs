use crate::changefreq::record_modification;
use crate::config::FrontpageConfig;
use crate::content::{ContentItem, ContentRepository, LinkTypeRegistry};
use crate::detector::ChangeDetector;
use crate::link::{LANGUAGE_NONE, LinkConditions, LinkKey, LinkRecord, LinkSelection, LinkUpdate};
use crate::persist::{read_json, write_json_atomic};
use crate::state::StateStore;
use crate::{Error, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error};

/// Storage operations the link store needs. Each call must be atomic.
pub trait LinkBackend: Send + Sync {
    /// Load one record by key.
    fn load(&self, key: &LinkKey) -> Result<Option<LinkRecord>>;
    /// Load every record matching the conditions.
    fn load_where(&self, conditions: &LinkConditions) -> Result<Vec<LinkRecord>>;
    /// Insert or replace a record, returning the replaced one.
    fn upsert(&self, link: LinkRecord) -> Result<Option<LinkRecord>>;
    /// Insert or replace several records as one write, returning how many
    /// replaced an existing row.
    fn upsert_many(&self, links: Vec<LinkRecord>) -> Result<usize>;
    /// Delete matching records, returning how many were removed.
    fn delete_where(&self, conditions: &LinkConditions) -> Result<usize>;
    /// Patch matching records, returning how many were touched.
    fn update_where(&self, updates: &LinkUpdate, conditions: &LinkConditions) -> Result<usize>;
    /// Whether at least one record matches.
    fn exists(&self, conditions: &LinkConditions) -> Result<bool>;
    /// Number of matching records.
    fn count(&self, conditions: &LinkConditions) -> Result<usize>;
    /// Emittable records of a selection ordered by `language DESC, loc ASC`.
    fn select_visible(
        &self,
        selection: &LinkSelection,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<LinkRecord>>;
    /// Number of emittable records of a selection.
    fn count_visible(&self, selection: &LinkSelection) -> Result<usize>;
}

/// Generation order: languages grouped in descending order, paths ascending.
///
/// Ties on `(language, loc)` fall back to `(type, id)` so paging is stable.
pub fn generation_order(a: &LinkRecord, b: &LinkRecord) -> Ordering {
    b.language
        .cmp(&a.language)
        .then_with(|| a.loc.cmp(&b.loc))
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.id.cmp(&b.id))
}

/// Ordered link table behind a lock, optionally mirrored to a JSON file.
///
/// Every mutation holds the write lock for its whole duration and rewrites the
/// file with an atomic rename, so concurrent callers never see a torn row.
/// Rows are changed in place; when the file write fails the touched rows are
/// put back before the error is returned.
#[derive(Debug)]
pub struct LinkTable {
    rows: RwLock<BTreeMap<LinkKey, LinkRecord>>,
    path: Option<PathBuf>,
}

impl LinkTable {
    /// Table that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            path: None,
        }
    }

    /// Open (or start) a table persisted at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let links: Vec<LinkRecord> = read_json(&path)?.unwrap_or_default();
        let rows = links.into_iter().map(|l| (l.key(), l)).collect();
        debug!(path = %path.display(), "opened link table");
        Ok(Self {
            rows: RwLock::new(rows),
            path: Some(path),
        })
    }

    /// File backing the table, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<LinkKey, LinkRecord>>> {
        self.rows
            .read()
            .map_err(|_| Error::Storage("Link table lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<LinkKey, LinkRecord>>> {
        self.rows
            .write()
            .map_err(|_| Error::Storage("Link table lock poisoned".into()))
    }

    fn persist(&self, rows: &BTreeMap<LinkKey, LinkRecord>) -> Result<()> {
        if let Some(path) = &self.path {
            let links: Vec<&LinkRecord> = rows.values().collect();
            write_json_atomic(path, &links)?;
        }
        Ok(())
    }
}

impl LinkBackend for LinkTable {
    fn load(&self, key: &LinkKey) -> Result<Option<LinkRecord>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn load_where(&self, conditions: &LinkConditions) -> Result<Vec<LinkRecord>> {
        Ok(self
            .read()?
            .values()
            .filter(|l| conditions.matches(l))
            .cloned()
            .collect())
    }

    fn upsert(&self, link: LinkRecord) -> Result<Option<LinkRecord>> {
        let mut rows = self.write()?;
        let key = link.key();
        let previous = rows.insert(key.clone(), link);
        if let Err(e) = self.persist(&rows) {
            restore(&mut rows, key, previous);
            return Err(e);
        }
        Ok(previous)
    }

    fn upsert_many(&self, links: Vec<LinkRecord>) -> Result<usize> {
        if links.is_empty() {
            return Ok(0);
        }
        let mut rows = self.write()?;
        let mut undo = Vec::with_capacity(links.len());
        for link in links {
            let key = link.key();
            let previous = rows.insert(key.clone(), link);
            undo.push((key, previous));
        }
        let replaced = undo.iter().filter(|(_, previous)| previous.is_some()).count();
        if let Err(e) = self.persist(&rows) {
            // Reverse order so a key written twice ends at its original row
            for (key, previous) in undo.into_iter().rev() {
                restore(&mut rows, key, previous);
            }
            return Err(e);
        }
        Ok(replaced)
    }

    fn delete_where(&self, conditions: &LinkConditions) -> Result<usize> {
        let mut rows = self.write()?;
        let keys: Vec<LinkKey> = rows
            .iter()
            .filter(|(_, l)| conditions.matches(l))
            .map(|(k, _)| k.clone())
            .collect();
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: Vec<LinkRecord> = keys.iter().filter_map(|k| rows.remove(k)).collect();
        if let Err(e) = self.persist(&rows) {
            rows.extend(removed.into_iter().map(|l| (l.key(), l)));
            return Err(e);
        }
        Ok(removed.len())
    }

    fn update_where(&self, updates: &LinkUpdate, conditions: &LinkConditions) -> Result<usize> {
        let mut rows = self.write()?;
        let mut originals = Vec::new();
        for link in rows.values_mut().filter(|l| conditions.matches(l)) {
            originals.push(link.clone());
            updates.apply(link);
        }
        if originals.is_empty() {
            return Ok(0);
        }
        if let Err(e) = self.persist(&rows) {
            for original in originals {
                rows.insert(original.key(), original);
            }
            return Err(e);
        }
        Ok(originals.len())
    }

    fn exists(&self, conditions: &LinkConditions) -> Result<bool> {
        Ok(self.read()?.values().any(|l| conditions.matches(l)))
    }

    fn count(&self, conditions: &LinkConditions) -> Result<usize> {
        Ok(self.read()?.values().filter(|l| conditions.matches(l)).count())
    }

    fn select_visible(
        &self,
        selection: &LinkSelection,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<LinkRecord>> {
        let rows = self.read()?;
        let mut visible: Vec<&LinkRecord> = rows.values().filter(|l| selection.matches(l)).collect();
        visible.sort_by(|a, b| generation_order(a, b));
        Ok(visible
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count_visible(&self, selection: &LinkSelection) -> Result<usize> {
        Ok(self.read()?.values().filter(|l| selection.matches(l)).count())
    }
}

/// Put `previous` back under `key`, or drop the key when it was new.
fn restore(rows: &mut BTreeMap<LinkKey, LinkRecord>, key: LinkKey, previous: Option<LinkRecord>) {
    match previous {
        Some(link) => {
            rows.insert(key, link);
        },
        None => {
            rows.remove(&key);
        },
    }
}

/// Link registry: CRUD over link records with change detection on every
/// mutation.
pub struct LinkStore {
    backend: Arc<dyn LinkBackend>,
    detector: ChangeDetector,
    registry: LinkTypeRegistry,
}

impl LinkStore {
    /// Create a store over `backend`, flagging regeneration in `state`.
    pub fn new(backend: Arc<dyn LinkBackend>, state: Arc<dyn StateStore>) -> Self {
        Self {
            backend,
            detector: ChangeDetector::new(state),
            registry: LinkTypeRegistry::new(),
        }
    }

    /// Use a custom projection registry for [`LinkStore::create`].
    #[must_use]
    pub fn with_registry(mut self, registry: LinkTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Underlying storage backend.
    pub fn backend(&self) -> &dyn LinkBackend {
        self.backend.as_ref()
    }

    /// State store flagged by this store's detector.
    pub fn state(&self) -> &Arc<dyn StateStore> {
        self.detector.state()
    }

    /// Derive the link for a content item.
    ///
    /// Status and priority set explicitly on the stored link (override flags)
    /// win over the bundle defaults the projection fills in.
    ///
    /// A stored link keeps its `(lastmod, changefreq, changecount)` history.
    /// When the item was modified after the stored `lastmod`, that edit is
    /// folded in with [`record_modification`].
    pub fn create(&self, item: &ContentItem, content: &dyn ContentRepository) -> Result<LinkRecord> {
        let mut link = self.registry.project(item, content);
        if let Some(existing) = self.backend.load(&link.key())? {
            if existing.status_override {
                link.status = existing.status;
                link.status_override = true;
            }
            if existing.priority_override {
                link.priority = existing.priority;
                link.priority_override = true;
            }
            if existing.lastmod > 0 {
                let modified = link.lastmod;
                link.lastmod = existing.lastmod;
                link.changefreq = existing.changefreq;
                link.changecount = existing.changecount;
                if modified > existing.lastmod {
                    record_modification(&mut link, modified);
                }
            }
        }
        Ok(link)
    }

    /// Validate and upsert a link, raising the regeneration flag when the
    /// rendered output changes.
    pub fn save(&self, link: LinkRecord) -> Result<LinkRecord> {
        if let Err(e) = validate(&link) {
            error!(error = %e, "rejected sitemap link");
            return Err(e);
        }

        let existing = self.backend.load(&link.key())?;
        self.detector.check_link(&link, existing.as_ref())?;

        let previous = self.backend.upsert(link.clone())?;
        debug!(
            kind = %link.kind,
            id = %link.id,
            language = %link.language,
            inserted = previous.is_none(),
            "saved sitemap link"
        );
        Ok(link)
    }

    /// Validate and upsert several links with a single storage write.
    ///
    /// Nothing is stored when any link is invalid.
    pub fn save_multiple(&self, links: Vec<LinkRecord>) -> Result<usize> {
        for link in &links {
            if let Err(e) = validate(link) {
                error!(error = %e, "rejected sitemap link");
                return Err(e);
            }
        }
        for link in &links {
            let existing = self.backend.load(&link.key())?;
            if self.detector.check_link(link, existing.as_ref())? {
                break;
            }
        }

        let saved = links.len();
        let replaced = self.backend.upsert_many(links)?;
        debug!(saved, inserted = saved - replaced, "saved sitemap links");
        Ok(saved)
    }

    /// Load a link. Without a language the first language variant is returned.
    pub fn load(&self, kind: &str, id: &str, language: Option<&str>) -> Result<Option<LinkRecord>> {
        if let Some(language) = language {
            return self.backend.load(&LinkKey::new(kind, id, language));
        }
        Ok(self
            .backend
            .load_where(&LinkConditions::new().kind(kind).id(id))?
            .into_iter()
            .next())
    }

    /// Load every link matching the conditions.
    pub fn load_multiple(&self, conditions: &LinkConditions) -> Result<Vec<LinkRecord>> {
        self.backend.load_where(conditions)
    }

    /// Delete a link, or every language variant of it when `language` is `None`.
    pub fn delete(&self, kind: &str, id: &str, language: Option<&str>) -> Result<usize> {
        let mut conditions = LinkConditions::new().kind(kind).id(id);
        conditions.language = language.map(String::from);
        self.delete_multiple(&conditions)
    }

    /// Delete every link matching the conditions.
    pub fn delete_multiple(&self, conditions: &LinkConditions) -> Result<usize> {
        self.detector
            .check_bulk(self.backend.as_ref(), conditions, &LinkUpdate::new())?;
        let removed = self.backend.delete_where(conditions)?;
        debug!(removed, ?conditions, "deleted sitemap links");
        Ok(removed)
    }

    /// Patch every link matching the conditions.
    pub fn update_multiple(&self, updates: &LinkUpdate, conditions: &LinkConditions) -> Result<usize> {
        if let Some(priority) = updates.priority {
            if !(0.0..=1.0).contains(&priority) {
                return Err(Error::invalid_link(
                    conditions.kind.as_deref().unwrap_or("*"),
                    conditions.id.as_deref().unwrap_or("*"),
                    format!("priority {priority} outside 0.0..=1.0"),
                ));
            }
        }
        if let Some(loc) = &updates.loc {
            if !loc.is_empty() && !crate::content::is_internal_path(loc) {
                return Err(Error::invalid_link(
                    conditions.kind.as_deref().unwrap_or("*"),
                    conditions.id.as_deref().unwrap_or("*"),
                    format!("loc '{loc}' must start with '/'"),
                ));
            }
        }

        self.detector
            .check_bulk(self.backend.as_ref(), conditions, updates)?;
        let touched = self.backend.update_where(updates, conditions)?;
        debug!(touched, ?conditions, "updated sitemap links");
        Ok(touched)
    }

    /// Number of links matching the conditions.
    pub fn count(&self, conditions: &LinkConditions) -> Result<usize> {
        self.backend.count(conditions)
    }

    /// Number of emittable links in a selection.
    pub fn visible_count(&self, selection: &LinkSelection) -> Result<usize> {
        self.backend.count_visible(selection)
    }

    /// One page of emittable links in generation order.
    pub fn select_visible(
        &self,
        selection: &LinkSelection,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<LinkRecord>> {
        self.backend.select_visible(selection, offset, limit)
    }

    /// Save the front page link with the configured metadata.
    pub fn save_frontpage(&self, frontpage: &FrontpageConfig) -> Result<LinkRecord> {
        let mut link = LinkRecord::new("frontpage", "0", "/");
        link.subtype = "frontpage".into();
        link.priority = frontpage.priority;
        link.changefreq = frontpage.changefreq;
        link.language = LANGUAGE_NONE.to_string();
        self.save(link)
    }
}

impl std::fmt::Debug for LinkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStore")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Check the link invariants. Violations indicate a projection bug.
pub fn validate(link: &LinkRecord) -> Result<()> {
    if !link.loc.is_empty() && !crate::content::is_internal_path(&link.loc) {
        return Err(Error::invalid_link(
            &link.kind,
            &link.id,
            format!("loc '{}' must start with '/'", link.loc),
        ));
    }
    if !(0.0..=1.0).contains(&link.priority) {
        return Err(Error::invalid_link(
            &link.kind,
            &link.id,
            format!("priority {} outside 0.0..=1.0", link.priority),
        ));
    }
    if link.changecount < 0 {
        return Err(Error::invalid_link(
            &link.kind,
            &link.id,
            format!("changecount {} is negative", link.changecount),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::content::{BundleSettings, MemoryContent};
    use crate::state::MemoryState;
    use tempfile::TempDir;

    fn store() -> (LinkStore, Arc<MemoryState>) {
        let state = Arc::new(MemoryState::new());
        let store = LinkStore::new(Arc::new(LinkTable::in_memory()), state.clone());
        (store, state)
    }

    fn node(id: &str) -> LinkRecord {
        LinkRecord::new("node", id, format!("/node/{id}")).with_language("en")
    }

    #[test]
    fn test_saving_identical_link_twice_leaves_flag_unset() {
        let (store, state) = store();
        let link = node("9").with_priority(0.6);

        store.save(link.clone()).unwrap();
        assert!(state.regenerate_needed().unwrap());

        // Cleared by a successful generation
        state.set_regenerate_needed(false).unwrap();

        store.save(link).unwrap();
        assert!(!state.regenerate_needed().unwrap());
    }

    #[test]
    fn test_save_rejects_invariant_violations() {
        let (store, _) = store();

        let err = store.save(LinkRecord::new("node", "1", "node/1")).unwrap_err();
        assert_eq!(err.category(), "invalid_link");

        let err = store
            .save(LinkRecord::new("node", "1", "https://example.com/x"))
            .unwrap_err();
        assert_eq!(err.category(), "invalid_link");

        let err = store.save(node("1").with_priority(1.5)).unwrap_err();
        assert!(err.to_string().contains("priority"));

        let mut negative = node("1");
        negative.changecount = -1;
        assert!(store.save(negative).is_err());

        assert_eq!(store.count(&LinkConditions::new()).unwrap(), 0);
    }

    #[test]
    fn test_upsert_keyed_by_type_id_language() {
        let (store, _) = store();
        store.save(node("1")).unwrap();
        store.save(node("1").with_language("fr")).unwrap();
        store.save(node("1").with_priority(0.9)).unwrap();

        assert_eq!(store.count(&LinkConditions::new()).unwrap(), 2);
        let en = store.load("node", "1", Some("en")).unwrap().unwrap();
        assert!((en.priority - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_delete_visible_link_flags_regeneration() {
        let (store, state) = store();
        store.save(node("1")).unwrap();
        state.set_regenerate_needed(false).unwrap();

        assert_eq!(store.delete("node", "1", None).unwrap(), 1);
        assert!(state.regenerate_needed().unwrap());
    }

    #[test]
    fn test_delete_invisible_link_does_not_flag() {
        let (store, state) = store();
        let mut hidden = node("1");
        hidden.access = false;
        store.save(hidden).unwrap();
        assert!(!state.regenerate_needed().unwrap());

        assert_eq!(store.delete("node", "1", Some("en")).unwrap(), 1);
        assert!(!state.regenerate_needed().unwrap());
    }

    #[test]
    fn test_update_multiple_flags_when_hiding_visible_links() {
        let (store, state) = store();
        store.save(node("1")).unwrap();
        store.save(node("2")).unwrap();
        state.set_regenerate_needed(false).unwrap();

        let touched = store
            .update_multiple(&LinkUpdate::new().status(false), &LinkConditions::new().kind("node"))
            .unwrap();
        assert_eq!(touched, 2);
        assert!(state.regenerate_needed().unwrap());
        assert_eq!(store.visible_count(&LinkSelection::all()).unwrap(), 0);
    }

    #[test]
    fn test_update_multiple_rejects_bad_priority() {
        let (store, _) = store();
        store.save(node("1")).unwrap();
        let result = store.update_multiple(&LinkUpdate::new().priority(2.0), &LinkConditions::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_create_keeps_overrides() {
        let (store, _) = store();
        let content = MemoryContent::new().with_bundle(
            "node",
            "page",
            BundleSettings {
                status: true,
                priority: 0.5,
                changefreq: 0,
            },
        );
        let item = ContentItem {
            entity_type: "node".into(),
            bundle: "page".into(),
            id: 4,
            language: None,
            timestamps: vec![100],
            path: Some("/node/4".into()),
            published: true,
        };

        let mut link = store.create(&item, &content).unwrap();
        link.status = false;
        link.status_override = true;
        link.priority = 0.9;
        link.priority_override = true;
        store.save(link).unwrap();

        let recreated = store.create(&item, &content).unwrap();
        assert!(!recreated.status);
        assert!(recreated.status_override);
        assert!((recreated.priority - 0.9).abs() < f32::EPSILON);
    }

    fn page_item(timestamps: Vec<i64>) -> ContentItem {
        ContentItem {
            entity_type: "node".into(),
            bundle: "page".into(),
            id: 4,
            language: None,
            timestamps,
            path: Some("/node/4".into()),
            published: true,
        }
    }

    #[test]
    fn test_create_folds_new_edit_into_stored_history() {
        let (store, _) = store();
        let content = MemoryContent::new().with_bundle("node", "page", BundleSettings::default());

        let first = store.create(&page_item(vec![100]), &content).unwrap();
        assert_eq!((first.lastmod, first.changefreq, first.changecount), (100, 0, 0));
        store.save(first).unwrap();

        let edited = store.create(&page_item(vec![500]), &content).unwrap();
        assert_eq!(edited.lastmod, 500);
        assert_eq!(edited.changefreq, 200);
        assert_eq!(edited.changecount, 1);
        store.save(edited).unwrap();

        let again = store.create(&page_item(vec![900]), &content).unwrap();
        assert_eq!(again.changefreq, 300);
        assert_eq!(again.changecount, 2);
    }

    #[test]
    fn test_create_without_new_edit_keeps_stored_history() {
        let (store, _) = store();
        let content = MemoryContent::new().with_bundle("node", "page", BundleSettings::default());
        let mut stored = store.create(&page_item(vec![500]), &content).unwrap();
        stored.changefreq = 3_600;
        stored.changecount = 7;
        store.save(stored).unwrap();

        let recreated = store.create(&page_item(vec![500]), &content).unwrap();
        assert_eq!(
            (recreated.lastmod, recreated.changefreq, recreated.changecount),
            (500, 3_600, 7)
        );
    }

    #[test]
    fn test_save_multiple_is_all_or_nothing() {
        let (store, state) = store();
        let saved = store.save_multiple(vec![node("1"), node("2")]).unwrap();
        assert_eq!(saved, 2);
        assert!(state.regenerate_needed().unwrap());

        let bad = node("3").with_priority(4.0);
        assert!(store.save_multiple(vec![node("4"), bad]).is_err());
        assert_eq!(store.count(&LinkConditions::new()).unwrap(), 2);
    }

    #[test]
    fn test_failed_write_rolls_back_rows() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        let table = LinkTable::open(data.join("links.json")).unwrap();
        table.upsert(node("1")).unwrap();

        // A plain file where the directory should be makes every write fail
        std::fs::remove_dir_all(&data).unwrap();
        std::fs::write(&data, b"").unwrap();

        assert!(table.upsert(node("2")).is_err());
        assert!(table.upsert(node("1").with_priority(0.9)).is_err());
        assert!(table.upsert_many(vec![node("3"), node("1").with_priority(0.1)]).is_err());
        assert!(table.delete_where(&LinkConditions::new()).is_err());
        assert!(
            table
                .update_where(&LinkUpdate::new().status(false), &LinkConditions::new())
                .is_err()
        );

        let rows = table.load_where(&LinkConditions::new()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].priority - node("1").priority).abs() < f32::EPSILON);
        assert!(rows[0].status);
    }

    #[test]
    fn test_select_visible_orders_language_desc_loc_asc() {
        let (store, _) = store();
        store.save(LinkRecord::new("node", "1", "/b").with_language("en")).unwrap();
        store.save(LinkRecord::new("node", "2", "/a").with_language("en")).unwrap();
        store.save(LinkRecord::new("node", "3", "/a").with_language("fr")).unwrap();
        store.save(LinkRecord::new("node", "4", "/c")).unwrap();
        store.save(LinkRecord::new("node", "5", "")).unwrap();

        let page = store.select_visible(&LinkSelection::all(), 0, 10).unwrap();
        let order: Vec<(&str, &str)> = page
            .iter()
            .map(|l| (l.language.as_str(), l.loc.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("und", "/c"), ("fr", "/a"), ("en", "/a"), ("en", "/b")]
        );

        let second = store.select_visible(&LinkSelection::all(), 2, 2).unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].loc, "/a");
        assert_eq!(second[0].language, "en");
    }

    #[test]
    fn test_persisted_table_reopens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.json");
        {
            let table = LinkTable::open(&path).unwrap();
            table.upsert(node("1")).unwrap();
            table.upsert(node("2")).unwrap();
            table.delete_where(&LinkConditions::new().id("2")).unwrap();
        }
        let table = LinkTable::open(&path).unwrap();
        assert_eq!(table.count(&LinkConditions::new()).unwrap(), 1);
        assert!(table.load(&LinkKey::new("node", "1", "en")).unwrap().is_some());
    }

    #[test]
    fn test_frontpage_link() {
        let (store, _) = store();
        let link = store.save_frontpage(&FrontpageConfig::default()).unwrap();
        assert_eq!(link.loc, "/");
        assert!((link.priority - 1.0).abs() < f32::EPSILON);
        assert_eq!(link.changefreq, 86_400);
    }
}
