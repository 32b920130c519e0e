use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::collections::BTreeSet;
use crate::common::config::Config;
use crate::layout_engine::{ConfigChange, NodeConfigEngine};
use crate::model::{GridItem, LayoutMode, SizeOverride, TabGroup};
use crate::presets::PresetCatalog;
use crate::registry::BlockRegistry;
use crate::storage::testing::stored_json;
use crate::storage::{MemoryStore, NODE_LAYOUTS_KEY, StorageHandle};

const FS: LayoutMode = LayoutMode::Fullscreen;

fn ids(list: &[&str]) -> Vec<String> { list.iter().map(|s| s.to_string()).collect() }

fn memory() -> StorageHandle { StorageHandle::new(MemoryStore::new()) }

fn engine_with(storage: StorageHandle) -> NodeConfigEngine {
    NodeConfigEngine::new(Arc::new(BlockRegistry::builtin()), storage, &Config::default())
}

fn engine() -> NodeConfigEngine { engine_with(memory()) }

fn assert_no_overlap(items: &[GridItem]) {
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            let (r, o) = (&a.rect, &b.rect);
            let hit = r.x < o.x + o.w && o.x < r.x + r.w && r.y < o.y + o.h && o.y < r.y + r.h;
            assert!(!hit, "{} {:?} overlaps {} {:?}", a.id, r, b.id, o);
        }
    }
}

/// A findz node whose fullscreen layout is just `path` and `filter`.
fn findz_pair(engine: &mut NodeConfigEngine, node_id: &str) {
    engine.get_or_create(
        node_id,
        "findz",
        vec![GridItem::new("path", 0, 0, 2, 2), GridItem::new("filter", 2, 0, 2, 2)],
        Vec::new(),
    );
}

mod get_or_create {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn seeds_from_registry_when_defaults_are_empty() {
        let mut engine = engine();
        let config = engine.get_or_create("n1", "findz", Vec::new(), Vec::new()).clone();
        let registry = BlockRegistry::builtin();
        assert_eq!(config.node_type(), "findz");
        assert_eq!(config.mode(FS).layout(), registry.default_grid_layout_for("findz"));
        assert_eq!(
            config.mode(LayoutMode::Normal).layout(),
            registry.default_normal_layout_for("findz")
        );
    }

    #[test]
    fn is_idempotent() {
        let mut engine = engine();
        let defaults = vec![GridItem::new("path", 0, 0, 2, 2)];
        let first = engine.get_or_create("n1", "findz", defaults.clone(), Vec::new()).clone();
        let second = engine
            .get_or_create("n1", "findz", vec![GridItem::new("log", 5, 5, 1, 1)], Vec::new())
            .clone();
        assert_eq!(first, second);
        assert_eq!(engine.node_ids().count(), 1);
    }

    #[test]
    fn new_node_type_means_new_config() {
        let mut engine = engine();
        findz_pair(&mut engine, "n1");
        engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        let config = engine.get_or_create("n1", "trename", Vec::new(), Vec::new());
        assert_eq!(config.node_type(), "trename");
        assert_eq!(config.mode(FS).tab_groups().count(), 0);
    }
}

mod tab_groups {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn create_replaces_members_with_group() {
        let mut engine = engine();
        findz_pair(&mut engine, "n1");
        let group_id = engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();

        let state = engine.get("n1").unwrap().mode(FS);
        assert_eq!(state.layout(), vec![GridItem::new(group_id.as_str(), 0, 0, 2, 2)]);
        let groups: Vec<_> = state.tab_groups().collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].block_ids(), ids(&["path", "filter"]).as_slice());
        assert_eq!(groups[0].active_index(), 0);
    }

    #[test]
    fn dissolve_restores_members() {
        let mut engine = engine();
        findz_pair(&mut engine, "n1");
        let group_id = engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        assert!(engine.dissolve_tab_group("n1", FS, &group_id));

        let state = engine.get("n1").unwrap().mode(FS);
        assert_eq!(state.tab_groups().count(), 0);
        assert_eq!(
            state.layout(),
            vec![GridItem::new("path", 0, 0, 2, 2), GridItem::new("filter", 0, 2, 2, 2)]
        );
        assert!(!engine.dissolve_tab_group("n1", FS, &group_id));
    }

    #[test]
    fn dissolve_on_registry_layout_leaves_no_overlap() {
        let mut engine = engine();
        engine.get_or_create("n1", "findz", Vec::new(), Vec::new());
        let group_id = engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        assert!(engine.dissolve_tab_group("n1", FS, &group_id));
        assert_no_overlap(&engine.get("n1").unwrap().mode(FS).layout());

        let group_id = engine.create_tab_group("n1", FS, &ids(&["results", "log"])).unwrap();
        assert!(engine.remove_block_from_tab_group("n1", FS, &group_id, "log"));
        assert_no_overlap(&engine.get("n1").unwrap().mode(FS).layout());
    }

    #[test]
    fn switch_active_clamps() {
        let mut engine = engine();
        findz_pair(&mut engine, "n1");
        let group_id = engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        assert_eq!(engine.switch_tab_group_active("n1", FS, &group_id, 5), Some(1));
        let group = engine.get("n1").unwrap().mode(FS).tab_group(&group_id).unwrap().clone();
        assert_eq!(group.active_block(), Some("filter"));
        assert_eq!(engine.switch_tab_group_active("n1", FS, "missing", 0), None);
    }

    #[test]
    fn removing_down_to_one_member_dissolves() {
        let mut engine = engine();
        findz_pair(&mut engine, "n1");
        let group_id = engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        assert!(engine.remove_block_from_tab_group("n1", FS, &group_id, "filter"));

        let state = engine.get("n1").unwrap().mode(FS);
        assert_eq!(state.tab_groups().count(), 0);
        assert_eq!(
            state.layout(),
            vec![GridItem::new("path", 0, 0, 2, 2), GridItem::new("filter", 0, 2, 2, 2)]
        );
    }

    #[test]
    fn grouping_rejects_bad_input() {
        let mut engine = engine();
        findz_pair(&mut engine, "n1");
        assert_eq!(engine.create_tab_group("n1", FS, &ids(&["path"])), None);
        assert_eq!(engine.create_tab_group("missing", FS, &ids(&["path", "filter"])), None);
        assert_eq!(engine.create_tab_group("n1", FS, &ids(&["ghost", "path"])), None);
        assert_eq!(engine.create_tab_group("n1", FS, &ids(&["path", "ghost"])), None);
        engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        assert_eq!(engine.create_tab_group("n1", FS, &ids(&["filter", "log"])), None);
    }

    #[test]
    fn modes_group_independently() {
        let mut engine = engine();
        engine.get_or_create("n1", "findz", Vec::new(), Vec::new());
        engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        assert_eq!(
            engine.get_used_block_ids("n1", FS),
            BTreeSet::from(["filter", "path"].map(String::from))
        );
        assert!(engine.get_used_block_ids("n1", LayoutMode::Normal).is_empty());
        let normal = engine.create_tab_group("n1", LayoutMode::Normal, &ids(&["path", "filter"]));
        assert!(normal.is_some());
    }

    #[test]
    fn reorder_requires_permutation() {
        let mut engine = engine();
        engine.get_or_create("n1", "findz", Vec::new(), Vec::new());
        let group_id =
            engine.create_tab_group("n1", FS, &ids(&["path", "filter", "options"])).unwrap();
        engine.switch_tab_group_active("n1", FS, &group_id, 1);

        let mut reorder =
            |order: &[&str]| engine.reorder_tab_group_blocks("n1", FS, &group_id, &ids(order));
        assert!(!reorder(&["path", "filter"]));
        assert!(!reorder(&["path", "path", "x"]));
        assert!(reorder(&["options", "filter", "path"]));

        let group = engine.get("n1").unwrap().mode(FS).tab_group(&group_id).unwrap().clone();
        assert_eq!(group.block_ids(), ids(&["options", "filter", "path"]).as_slice());
        assert_eq!(group.active_block(), Some("filter"));
    }

    #[test]
    fn available_blocks_exclude_grouped_ones() {
        let mut engine = engine();
        engine.get_or_create("n1", "findz", Vec::new(), Vec::new());
        let group_id = engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        let available: Vec<&str> =
            engine.available_blocks("n1", FS).iter().map(|b| b.id.as_str()).collect();
        assert_eq!(available, vec!["options", "results", "log"]);

        assert!(engine.add_block_to_tab_group("n1", FS, &group_id, "log"));
        assert!(!engine.add_block_to_tab_group("n1", FS, &group_id, "log"));
        assert!(engine.get_used_block_ids("n1", FS).contains("log"));
        assert!(engine.available_blocks("missing", FS).is_empty());
    }
}

mod layout_updates {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn update_replaces_layout() {
        let mut engine = engine();
        findz_pair(&mut engine, "n1");
        let layout = vec![GridItem::new("filter", 0, 0, 4, 1), GridItem::new("path", 0, 1, 4, 1)];
        assert!(engine.update_grid_layout("n1", FS, layout.clone()));
        assert_eq!(engine.get("n1").unwrap().mode(FS).layout(), layout);
        assert!(!engine.update_grid_layout("missing", FS, layout));
    }

    #[test]
    fn effective_items_follow_layout_order() {
        let mut engine = engine();
        engine.get_or_create("n1", "findz", Vec::new(), Vec::new());
        let group_id = engine.create_tab_group("n1", FS, &ids(&["options", "log"])).unwrap();
        let items = engine.effective_items("n1", FS);
        let layout = engine.get("n1").unwrap().mode(FS).layout();
        assert_eq!(items.len(), layout.len());
        for (item, grid_item) in items.iter().zip(&layout) {
            assert_eq!(item.grid_item(), grid_item);
            assert_eq!(item.is_tab_group(), grid_item.id == group_id);
        }
        assert!(engine.effective_items("missing", FS).is_empty());
    }

    #[test]
    fn size_overrides_merge_with_registry_limits() {
        let mut engine = engine();
        engine.get_or_create("n1", "findz", Vec::new(), Vec::new());
        assert_eq!(
            engine.effective_constraints("n1", FS, "results"),
            Some(SizeOverride { min_w: Some(2), min_h: Some(2), ..Default::default() })
        );

        let user = SizeOverride { min_w: Some(3), max_h: Some(6), ..Default::default() };
        assert!(engine.set_size_override("n1", FS, "results", user));
        assert_eq!(
            engine.effective_constraints("n1", FS, "results"),
            Some(SizeOverride { min_w: Some(3), min_h: Some(2), max_w: None, max_h: Some(6) })
        );
        let normal = engine.get("n1").unwrap().mode(LayoutMode::Normal);
        assert!(normal.size_override("results").is_none());

        assert!(engine.clear_size_override("n1", FS, "results"));
        assert!(!engine.clear_size_override("n1", FS, "results"));
        assert_eq!(engine.effective_constraints("n1", FS, "unknown"), None);
    }

    #[test]
    fn reset_mode_drops_groups_and_overrides() {
        let mut engine = engine();
        engine.get_or_create("n1", "findz", Vec::new(), Vec::new());
        engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        let size = SizeOverride { min_w: Some(3), ..Default::default() };
        engine.set_size_override("n1", FS, "log", size);

        assert!(engine.reset_mode("n1", FS));
        let state = engine.get("n1").unwrap().mode(FS);
        assert_eq!(state.layout(), BlockRegistry::builtin().default_grid_layout_for("findz"));
        assert!(state.size_overrides().is_empty());
    }

    #[test]
    fn apply_preset_checks_node_type() {
        let storage = memory();
        let mut engine = engine_with(storage.clone());
        let mut catalog =
            PresetCatalog::from_registry(storage, engine.registry(), &Config::default().storage);
        engine.get_or_create("n1", "findz", Vec::new(), Vec::new());
        let group_id = engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        let state = engine.get("n1").unwrap().mode(FS).clone();
        let groups: Vec<TabGroup> = state.tab_groups().cloned().collect();
        let preset =
            catalog.save_preset("Grouped", "findz", &state.layout(), Some(groups.as_slice()));

        assert!(engine.reset_mode("n1", FS));
        assert!(engine.apply_preset("n1", FS, &preset));
        assert_eq!(engine.get("n1").unwrap().mode(FS), &state);
        assert!(engine.get_used_block_ids("n1", FS).contains("path"));
        assert!(engine.get("n1").unwrap().mode(FS).tab_group(&group_id).is_some());

        let other = catalog.get_preset("builtin-trename-default").unwrap().clone();
        assert!(!engine.apply_preset("n1", FS, &other));
    }
}

mod persistence {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn mutations_are_saved_and_hydrated() {
        let storage = memory();
        let mut engine = engine_with(storage.clone());
        findz_pair(&mut engine, "n1");
        let group_id = engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();

        let stored = stored_json(&storage, NODE_LAYOUTS_KEY).unwrap();
        assert_eq!(stored["n1"]["fullscreen"]["tabGroups"][0]["id"], group_id.as_str());

        let mut reloaded = engine_with(storage);
        assert!(!reloaded.hydrate());
        assert_eq!(reloaded.get("n1"), engine.get("n1"));
    }

    #[test]
    fn unavailable_storage_still_works_in_memory() {
        let mut engine = engine_with(StorageHandle::unavailable());
        findz_pair(&mut engine, "n1");
        assert!(engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).is_some());
        assert!(!engine.hydrate());
    }

    #[test]
    fn corrupt_store_starts_empty() {
        let storage = memory();
        storage.write(NODE_LAYOUTS_KEY, "{{{").unwrap();
        let engine = engine_with(storage);
        assert_eq!(engine.node_ids().count(), 0);
    }

    #[test]
    fn export_import_round_trip() {
        let mut engine = engine();
        engine.get_or_create("n1", "findz", Vec::new(), Vec::new());
        let group_id = engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        engine.switch_tab_group_active("n1", FS, &group_id, 1);
        let size = SizeOverride { max_h: Some(4), ..Default::default() };
        engine.set_size_override("n1", LayoutMode::Normal, "log", size);
        let original = engine.get("n1").unwrap().clone();

        let json = engine.export_node_config("n1").unwrap();
        assert!(engine.import_node_config("n1", &json));
        assert!(engine.get("n1").unwrap().same_content(&original));

        assert!(engine.import_node_config("n2", &json));
        assert!(engine.get("n2").unwrap().same_content(&original));
    }

    #[test]
    fn invalid_import_leaves_config_untouched() {
        let mut engine = engine();
        findz_pair(&mut engine, "n1");
        let before = engine.get("n1").unwrap().clone();
        assert!(!engine.import_node_config("n1", "not json"));
        assert!(!engine.import_node_config("n1", r#"{"nodeType": "findz"}"#));
        assert_eq!(engine.get("n1"), Some(&before));
        assert_eq!(engine.export_node_config("missing"), None);
    }

    #[test]
    fn delete_removes_persisted_entry() {
        let storage = memory();
        let mut engine = engine_with(storage.clone());
        findz_pair(&mut engine, "n1");
        assert!(engine.delete("n1"));
        assert!(!engine.delete("n1"));
        assert_eq!(stored_json(&storage, NODE_LAYOUTS_KEY), Some(serde_json::json!({})));
    }
}

mod notifications {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn every_mutation_notifies_before_returning() {
        let mut engine = engine();
        findz_pair(&mut engine, "n1");
        let seen: Arc<Mutex<Vec<ConfigChange>>> = Arc::default();
        let sink = seen.clone();
        engine.subscribe("n1", move |change| sink.lock().push(change.clone()));

        let group_id = engine.create_tab_group("n1", FS, &ids(&["path", "filter"])).unwrap();
        {
            let seen = seen.lock();
            assert_eq!(seen.len(), 1);
            let config = seen[0].config.as_ref().unwrap();
            assert!(config.mode(FS).tab_group(&group_id).is_some());
        }

        engine.switch_tab_group_active("n1", FS, &group_id, 1);
        engine.dissolve_tab_group("n1", FS, &group_id);
        assert_eq!(seen.lock().len(), 3);
    }

    #[test]
    fn rejected_mutations_do_not_notify() {
        let mut engine = engine();
        findz_pair(&mut engine, "n1");
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        engine.subscribe_all(move |_| *sink.lock() += 1);

        assert!(!engine.dissolve_tab_group("n1", FS, "missing"));
        assert!(engine.create_tab_group("n1", FS, &ids(&["path"])).is_none());
        assert!(!engine.update_grid_layout("other", FS, Vec::new()));
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn channel_subscribers_see_deletes() {
        let mut engine = engine();
        findz_pair(&mut engine, "n1");
        findz_pair(&mut engine, "n2");
        let (id, rx) = engine.subscribe_channel("n1");

        engine.delete("n2");
        engine.delete("n1");
        let change = rx.try_recv().unwrap();
        assert_eq!(change.node_id, "n1");
        assert_eq!(change.config, None);
        assert!(rx.try_recv().is_err());

        assert!(engine.unsubscribe(id));
        assert!(!engine.unsubscribe(id));
    }
}
