use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use std::time::{Duration, Instant};

use term_dock::persist::{LayoutStore, SAVE_DEBOUNCE, SCHEMA_VERSION, decode_record};
use term_dock::{DockManager, DropZone, LayoutNode, LayoutRecord, WindowKey};

struct NullPane;

impl term_dock::PaneContent for NullPane {
    fn render(
        &mut self,
        _frame: &mut ratatui::Frame<'_>,
        _area: ratatui::prelude::Rect,
        _focused: bool,
    ) {
    }
}

fn manager_with_defaults() -> DockManager {
    let mut manager = DockManager::new("map");
    for key in ["map", "sidebar", "datatable"] {
        manager.register(key, Box::new(NullPane));
    }
    manager.mount_default(&[WindowKey::from("sidebar"), WindowKey::from("datatable")]);
    manager
}

fn leaf_of(manager: &DockManager, key: &str) -> term_dock::LeafId {
    let layout = manager.layout().expect("mounted");
    let path = layout
        .find_leaf_containing(&WindowKey::from(key))
        .unwrap_or_else(|| panic!("{key} not in tree"));
    match layout.node_at_path(&path) {
        Some(LayoutNode::Leaf { id, .. }) => *id,
        _ => panic!("path did not resolve to a leaf"),
    }
}

#[test]
fn serialized_layouts_round_trip_through_a_fresh_manager() {
    let mut manager = manager_with_defaults();
    // Mutate away from the default so the round trip proves something.
    let source = leaf_of(&manager, "sidebar");
    let target = leaf_of(&manager, "map");
    manager.dock(&WindowKey::from("sidebar"), source, target, DropZone::Top);

    let record = manager.serialize().expect("mounted");
    let json = serde_json::to_string(&record).expect("encode");
    let decoded = decode_record(&json).expect("decode");

    let mut restored = DockManager::new("map");
    restored.mount(decoded.layout);
    assert_eq!(restored.layout(), manager.layout());
    assert_eq!(restored.open_windows(), manager.open_windows());
}

#[test]
fn layout_changes_reach_the_store_and_survive_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Rc::new(RefCell::new(LayoutStore::new(dir.path().join("layout.json"))));

    let mut manager = manager_with_defaults();
    {
        let store = Rc::clone(&store);
        manager.set_on_layout_change(move |record: &LayoutRecord| {
            store.borrow_mut().schedule(record.clone(), Instant::now());
        });
    }

    let source = leaf_of(&manager, "datatable");
    let target = leaf_of(&manager, "map");
    manager.dock(&WindowKey::from("datatable"), source, target, DropZone::Bottom);
    assert!(store.borrow().has_pending());

    // Nothing hits the disk until the quiet period elapses.
    store.borrow_mut().tick(Instant::now()).expect("tick");
    assert!(!store.borrow().path().exists());
    store
        .borrow_mut()
        .tick(Instant::now() + SAVE_DEBOUNCE + Duration::from_millis(1))
        .expect("tick");
    assert!(store.borrow().path().exists());

    let record = store.borrow().load().expect("persisted record");
    assert_eq!(record.version, SCHEMA_VERSION);
    let mut restored = manager_with_defaults();
    restored.set_layout(record.layout);
    assert_eq!(restored.layout(), manager.layout());
}

#[test]
fn version_mismatch_falls_back_to_the_default_arrangement() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = LayoutStore::new(dir.path().join("layout.json"));

    let manager = manager_with_defaults();
    let mut record = manager.serialize().expect("mounted");
    record.version = SCHEMA_VERSION + 1;
    fs::write(store.path(), serde_json::to_string(&record).expect("encode")).expect("write");

    // The stale record is discarded, so startup mounts the default.
    assert!(store.load().is_none());
    let fallback = manager_with_defaults();
    assert_eq!(fallback.layout().unwrap().leaf_count(), 3);
}

#[test]
fn corrupted_records_are_discarded_silently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = LayoutStore::new(dir.path().join("layout.json"));

    fs::write(store.path(), "{\"version\":1,\"layout\":42}").expect("write");
    assert!(store.load().is_none());

    // Structurally invalid trees are rejected too: a window in two leaves.
    let manager = manager_with_defaults();
    let mut record = manager.serialize().expect("mounted");
    record.layout = LayoutNode::split(
        term_dock::SplitDirection::Row,
        0.5,
        record.layout.clone(),
        record.layout.clone(),
    );
    fs::write(store.path(), serde_json::to_string(&record).expect("encode")).expect("write");
    assert!(store.load().is_none());
}

#[test]
fn every_committed_change_emits_a_self_consistent_record() {
    let mut manager = manager_with_defaults();
    let saved: Rc<RefCell<Vec<LayoutRecord>>> = Rc::new(RefCell::new(Vec::new()));
    {
        let saved = Rc::clone(&saved);
        manager.set_on_layout_change(move |record: &LayoutRecord| {
            saved.borrow_mut().push(record.clone());
        });
    }

    let source = leaf_of(&manager, "sidebar");
    let target = leaf_of(&manager, "map");
    manager.dock(&WindowKey::from("sidebar"), source, target, DropZone::Center);
    manager.remove_window(&WindowKey::from("sidebar"));

    let records = saved.borrow();
    assert_eq!(records.len(), 2);
    // Every record is self-consistent: openWindows mirrors the tree.
    for record in records.iter() {
        let keys: Vec<WindowKey> = record.layout.collect_window_keys().into_iter().collect();
        assert_eq!(record.open_windows, keys);
        assert!(term_dock::is_valid_layout(&record.layout));
    }
    assert!(!records[1].open_windows.contains(&WindowKey::from("sidebar")));
}
