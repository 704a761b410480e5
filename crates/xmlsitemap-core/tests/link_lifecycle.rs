//! Link mutations, the regeneration flag and rebuilds over the public API.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use tempfile::TempDir;
use xmlsitemap_core::{
    BaseUrlResolver, BundleSettings, Config, ContentItem, FileState, LinkConditions, LinkRecord,
    LinkStore, LinkTable, LinkUpdate, MemoryContent, MemoryState, Orchestrator, RebuildSandbox,
    Sitemap, SitemapRepository, StateStore,
};

fn store() -> (Arc<LinkStore>, Arc<MemoryState>) {
    let state = Arc::new(MemoryState::new());
    let store = Arc::new(LinkStore::new(Arc::new(LinkTable::in_memory()), state.clone()));
    (store, state)
}

fn hidden(id: &str) -> LinkRecord {
    let mut link = LinkRecord::new("node", id, format!("/node/{id}"));
    link.status = false;
    link
}

#[test]
fn deleting_hidden_links_does_not_flag() {
    let (store, state) = store();
    store.save(hidden("1")).unwrap();
    assert!(!state.regenerate_needed().unwrap());

    assert_eq!(store.delete("node", "1", None).unwrap(), 1);
    assert!(!state.regenerate_needed().unwrap());
}

#[test]
fn deleting_visible_links_flags() {
    let (store, state) = store();
    store.save(LinkRecord::new("node", "1", "/node/1")).unwrap();
    state.set_regenerate_needed(false).unwrap();

    assert_eq!(store.delete("node", "1", None).unwrap(), 1);
    assert!(state.regenerate_needed().unwrap());
}

#[test]
fn bulk_hide_flags_only_when_something_was_visible() {
    let (store, state) = store();
    store.save(hidden("1")).unwrap();
    store.save(hidden("2")).unwrap();

    let hide = LinkUpdate::new().status(false);
    assert_eq!(store.update_multiple(&hide, &LinkConditions::new().kind("node")).unwrap(), 2);
    assert!(!state.regenerate_needed().unwrap());

    let show = LinkUpdate::new().status(true);
    store.update_multiple(&show, &LinkConditions::new().id("1")).unwrap();
    assert!(state.regenerate_needed().unwrap());
}

#[test]
fn rejected_save_leaves_store_and_flag_untouched() {
    let (store, state) = store();
    let err = store
        .save(LinkRecord::new("node", "1", "/node/1").with_priority(1.5))
        .unwrap_err();
    assert_eq!(err.category(), "invalid_link");
    assert!(!state.regenerate_needed().unwrap());
    assert_eq!(store.count(&LinkConditions::new()).unwrap(), 0);
}

#[test]
fn file_backed_stores_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let links = dir.path().join("links.json");
    let state_file = dir.path().join("state.json");

    {
        let state = Arc::new(FileState::open(&state_file).unwrap());
        let store = LinkStore::new(Arc::new(LinkTable::open(&links).unwrap()), state);
        store.save(LinkRecord::new("node", "5", "/node/5")).unwrap();
    }

    let state = Arc::new(FileState::open(&state_file).unwrap());
    assert!(state.regenerate_needed().unwrap());
    let store = LinkStore::new(Arc::new(LinkTable::open(&links).unwrap()), state);
    let link = store.load("node", "5", None).unwrap().unwrap();
    assert_eq!(link.loc, "/node/5");
}

fn pages(count: u64) -> MemoryContent {
    let mut content = MemoryContent::new().with_bundle(
        "node",
        "page",
        BundleSettings {
            status: true,
            priority: 0.5,
            changefreq: 0,
        },
    );
    for id in 1..=count {
        content.push(ContentItem {
            entity_type: "node".into(),
            bundle: "page".into(),
            id,
            language: None,
            timestamps: vec![1_000, 1_000 + 3_600 * i64::try_from(id).unwrap()],
            path: Some(format!("/node/{id}")),
            published: true,
        });
    }
    content
}

fn orchestrator(dir: &TempDir, content: MemoryContent) -> (Orchestrator, Arc<MemoryState>) {
    let mut config = Config::default();
    config.paths.root = dir.path().to_path_buf();
    config.rebuild.batch_limit = 5;

    let (store, state) = store();
    let sitemaps = Arc::new(SitemapRepository::in_memory());
    sitemaps.save(&Sitemap::default()).unwrap();
    let orchestrator = Orchestrator::new(
        config,
        store,
        Arc::new(content),
        sitemaps,
        Arc::new(BaseUrlResolver::new("https://example.com").unwrap()),
    );
    (orchestrator, state)
}

#[test]
fn rebuild_walks_content_in_batches() {
    let dir = TempDir::new().unwrap();
    let (orchestrator, _) = orchestrator(&dir, pages(11));

    let mut sandbox = RebuildSandbox::new();
    let mut cursors = Vec::new();
    while !sandbox.finished {
        orchestrator.rebuild_fetch("node", &mut sandbox).unwrap();
        cursors.push(sandbox.last_id);
    }

    assert_eq!(sandbox.fetches, 3);
    assert_eq!(cursors, vec![5, 10, 11]);
    assert!(cursors.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(orchestrator.store().count(&LinkConditions::new()).unwrap(), 11);
}

#[test]
fn full_rebuild_regenerates_and_clears_flags() {
    let dir = TempDir::new().unwrap();
    let (orchestrator, state) = orchestrator(&dir, pages(3));
    orchestrator.store().save(LinkRecord::new("node", "99", "/gone")).unwrap();

    let outcome = orchestrator.rebuild_at(&["node".to_string()], false, 4_000);
    assert!(outcome.success, "{}", outcome.message);
    assert!(!state.rebuild_needed().unwrap());
    assert!(!state.regenerate_needed().unwrap());
    assert_eq!(state.generated_last().unwrap(), 4_000);

    assert!(orchestrator.store().load("node", "99", None).unwrap().is_none());
    let link = orchestrator.store().load("node", "2", None).unwrap().unwrap();
    assert_eq!(link.lastmod, 1_000 + 7_200);
    assert_eq!(link.changefreq, 7_200);
}
