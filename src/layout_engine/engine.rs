use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::{debug, info, trace, warn};

use super::effective::{EffectiveItem, effective_items_for};
use super::subscriptions::{ConfigChange, SubscriptionId, Subscribers};
use crate::common::collections::{BTreeMap, BTreeSet};
use crate::common::config::{Config, LayoutSettings};
use crate::common::util::new_id;
use crate::model::{GridItem, LayoutMode, ModeState, NodeConfig, SizeOverride};
use crate::presets::LayoutPreset;
use crate::registry::{BlockDefinition, BlockRegistry};
use crate::storage::{NodeLayoutStore, StorageHandle};

/// Owns every node's layout configuration.
///
/// All changes go through this type. Each committed change is written to
/// storage and then announced to subscribers before the call returns.
/// Operations on unknown nodes and invalid input are ignored and reported
/// through the return value only.
#[derive(Debug)]
pub struct NodeConfigEngine {
    registry: Arc<BlockRegistry>,
    store: NodeLayoutStore,
    settings: LayoutSettings,
    configs: BTreeMap<String, NodeConfig>,
    hydrated: bool,
    subscribers: Subscribers,
}

impl NodeConfigEngine {
    /// Creates the engine and hydrates it from `storage`.
    pub fn new(registry: Arc<BlockRegistry>, storage: StorageHandle, config: &Config) -> Self {
        let mut engine = Self {
            registry,
            store: NodeLayoutStore::new(storage, config.storage.node_retention_steps.clone()),
            settings: config.layout.clone(),
            configs: BTreeMap::new(),
            hydrated: false,
            subscribers: Subscribers::default(),
        };
        engine.hydrate();
        engine
    }

    /// Loads persisted configs. Only the first call does anything, and only
    /// when a storage medium exists. Returns whether this call loaded.
    pub fn hydrate(&mut self) -> bool {
        if self.hydrated {
            return false;
        }
        self.hydrated = true;
        if !self.store.storage().is_available() {
            debug!("no storage available; starting empty");
            return false;
        }
        self.configs = self.store.load();
        info!(nodes = self.configs.len(), "hydrated node layouts");
        true
    }

    pub fn registry(&self) -> &BlockRegistry { &self.registry }

    pub fn get(&self, node_id: &str) -> Option<&NodeConfig> { self.configs.get(node_id) }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.configs.keys().map(String::as_str)
    }

    /// Returns the node's config, creating it if needed. Empty defaults fall
    /// back to the registry. An existing config of another node type is
    /// replaced by a fresh one.
    pub fn get_or_create(
        &mut self,
        node_id: &str,
        node_type: &str,
        default_fullscreen: Vec<GridItem>,
        default_normal: Vec<GridItem>,
    ) -> &NodeConfig {
        let existing = self.configs.get(node_id).map(|c| c.node_type() == node_type);
        if existing != Some(true) {
            if existing == Some(false) {
                warn!(node = node_id, node_type, "node type changed; replacing its layout config");
            }
            let fullscreen = if default_fullscreen.is_empty() {
                self.registry.default_grid_layout_for(node_type)
            } else {
                default_fullscreen
            };
            let normal = if default_normal.is_empty() {
                self.registry.default_normal_layout_for(node_type)
            } else {
                default_normal
            };
            let config = NodeConfig::new(
                node_type,
                ModeState::from_layout(fullscreen),
                ModeState::from_layout(normal),
            );
            debug!(node = node_id, node_type, "created layout config");
            self.configs.insert(node_id.to_owned(), config);
            self.commit(node_id);
        }
        &self.configs[node_id]
    }

    /// Replaces the layout of one mode wholesale.
    pub fn update_grid_layout(
        &mut self,
        node_id: &str,
        mode: LayoutMode,
        layout: Vec<GridItem>,
    ) -> bool {
        self.mutate(node_id, "update_grid_layout", |config, _| {
            config.mode_mut(mode).replace_layout(layout);
            Some(())
        })
        .is_some()
    }

    /// Groups `block_ids` into a new tab group and returns its id.
    pub fn create_tab_group(
        &mut self,
        node_id: &str,
        mode: LayoutMode,
        block_ids: &[String],
    ) -> Option<String> {
        self.mutate(node_id, "create_tab_group", |config, _| {
            let group_id = new_id("tab-group");
            config
                .mode_mut(mode)
                .create_tab_group(group_id.clone(), block_ids)
                .then_some(group_id)
        })
    }

    pub fn dissolve_tab_group(&mut self, node_id: &str, mode: LayoutMode, group_id: &str) -> bool {
        self.mutate(node_id, "dissolve_tab_group", |config, settings| {
            config
                .mode_mut(mode)
                .dissolve_tab_group(group_id, settings.dissolve_row_step)
                .then_some(())
        })
        .is_some()
    }

    /// Returns the active index after clamping.
    pub fn switch_tab_group_active(
        &mut self,
        node_id: &str,
        mode: LayoutMode,
        group_id: &str,
        index: usize,
    ) -> Option<usize> {
        self.mutate(node_id, "switch_tab_group_active", |config, _| {
            config.mode_mut(mode).switch_tab_group_active(group_id, index)
        })
    }

    pub fn remove_block_from_tab_group(
        &mut self,
        node_id: &str,
        mode: LayoutMode,
        group_id: &str,
        block_id: &str,
    ) -> bool {
        self.mutate(node_id, "remove_block_from_tab_group", |config, settings| {
            config
                .mode_mut(mode)
                .remove_block_from_tab_group(group_id, block_id, settings.dissolve_row_step)
                .then_some(())
        })
        .is_some()
    }

    pub fn reorder_tab_group_blocks(
        &mut self,
        node_id: &str,
        mode: LayoutMode,
        group_id: &str,
        new_order: &[String],
    ) -> bool {
        self.mutate(node_id, "reorder_tab_group_blocks", |config, _| {
            config.mode_mut(mode).reorder_tab_group_blocks(group_id, new_order).then_some(())
        })
        .is_some()
    }

    pub fn add_block_to_tab_group(
        &mut self,
        node_id: &str,
        mode: LayoutMode,
        group_id: &str,
        block_id: &str,
    ) -> bool {
        self.mutate(node_id, "add_block_to_tab_group", |config, _| {
            config.mode_mut(mode).add_block_to_tab_group(group_id, block_id).then_some(())
        })
        .is_some()
    }

    /// Block ids absorbed into any tab group of `mode`.
    pub fn get_used_block_ids(&self, node_id: &str, mode: LayoutMode) -> BTreeSet<String> {
        self.get(node_id).map(|c| c.mode(mode).grouped_block_ids()).unwrap_or_default()
    }

    pub fn effective_items(&self, node_id: &str, mode: LayoutMode) -> Vec<EffectiveItem<'_>> {
        self.get(node_id).map(|c| effective_items_for(c.mode(mode))).unwrap_or_default()
    }

    /// Registry blocks of the node's type that are not in a tab group.
    pub fn available_blocks(&self, node_id: &str, mode: LayoutMode) -> Vec<&BlockDefinition> {
        let Some(config) = self.get(node_id) else { return Vec::new() };
        let used = config.mode(mode).grouped_block_ids();
        self.registry
            .blocks(config.node_type())
            .iter()
            .filter(|b| !used.contains(&b.id))
            .collect()
    }

    /// Setting an empty override clears it.
    pub fn set_size_override(
        &mut self,
        node_id: &str,
        mode: LayoutMode,
        block_id: &str,
        size: SizeOverride,
    ) -> bool {
        self.mutate(node_id, "set_size_override", |config, _| {
            config.mode_mut(mode).set_size_override(block_id, size).then_some(())
        })
        .is_some()
    }

    pub fn clear_size_override(&mut self, node_id: &str, mode: LayoutMode, block_id: &str) -> bool {
        self.mutate(node_id, "clear_size_override", |config, _| {
            config.mode_mut(mode).clear_size_override(block_id).then_some(())
        })
        .is_some()
    }

    /// Registry limits for the block with the user's override applied on top.
    pub fn effective_constraints(
        &self,
        node_id: &str,
        mode: LayoutMode,
        block_id: &str,
    ) -> Option<SizeOverride> {
        let config = self.get(node_id)?;
        let base = self.registry.get_block_definition(config.node_type(), block_id);
        let user = config.mode(mode).size_override(block_id);
        match (base, user) {
            (None, None) => None,
            (base, user) => {
                let base = base.map(BlockDefinition::size_limits).unwrap_or_default();
                Some(user.map_or(base, |user| user.merged_over(&base)))
            }
        }
    }

    /// Puts one mode back to the registry defaults, dropping its groups and
    /// size overrides.
    pub fn reset_mode(&mut self, node_id: &str, mode: LayoutMode) -> bool {
        let registry = Arc::clone(&self.registry);
        self.mutate(node_id, "reset_mode", |config, _| {
            let layout = match mode {
                LayoutMode::Fullscreen => registry.default_grid_layout_for(config.node_type()),
                LayoutMode::Normal => registry.default_normal_layout_for(config.node_type()),
            };
            *config.mode_mut(mode) = ModeState::from_layout(layout);
            Some(())
        })
        .is_some()
    }

    /// Copies the preset's layout and groups into `mode`, keeping that mode's
    /// size overrides. Presets for another node type are refused.
    pub fn apply_preset(&mut self, node_id: &str, mode: LayoutMode, preset: &LayoutPreset) -> bool {
        self.mutate(node_id, "apply_preset", |config, _| {
            if config.node_type() != preset.node_type {
                debug!(preset = %preset.id, "preset belongs to another node type");
                return None;
            }
            let state = config.mode_mut(mode);
            *state = ModeState::from_parts(
                preset.layout.clone(),
                preset.tab_groups.clone().unwrap_or_default(),
                state.size_overrides().clone(),
            );
            Some(())
        })
        .is_some()
    }

    /// Removes the node's config, e.g. when the node itself is deleted.
    pub fn delete(&mut self, node_id: &str) -> bool {
        if self.configs.remove(node_id).is_none() {
            return false;
        }
        debug!(node = node_id, "deleted layout config");
        self.commit(node_id);
        true
    }

    pub fn export_node_config(&self, node_id: &str) -> Option<String> {
        let config = self.get(node_id)?;
        match serde_json::to_string_pretty(config) {
            Ok(json) => Some(json),
            Err(err) => {
                warn!(node = node_id, error = %err, "failed to export layout config");
                None
            }
        }
    }

    /// Replaces the node's config with `json`. Anything that does not parse
    /// as a config leaves the current one untouched.
    pub fn import_node_config(&mut self, node_id: &str, json: &str) -> bool {
        let mut config = match serde_json::from_str::<NodeConfig>(json) {
            Ok(config) => config,
            Err(err) => {
                warn!(node = node_id, error = %err, "rejecting layout config import");
                return false;
            }
        };
        config.touch();
        self.configs.insert(node_id.to_owned(), config);
        debug!(node = node_id, "imported layout config");
        self.commit(node_id);
        true
    }

    /// Calls `callback` after every change to `node_id`.
    pub fn subscribe(
        &mut self,
        node_id: &str,
        callback: impl FnMut(&ConfigChange) + Send + 'static,
    ) -> SubscriptionId {
        self.subscribers.add_callback(Some(node_id), Box::new(callback))
    }

    /// Calls `callback` after every change to any node.
    pub fn subscribe_all(
        &mut self,
        callback: impl FnMut(&ConfigChange) + Send + 'static,
    ) -> SubscriptionId {
        self.subscribers.add_callback(None, Box::new(callback))
    }

    /// Like [`subscribe`](Self::subscribe), but changes arrive on a channel.
    /// Dropping the receiver ends the subscription.
    pub fn subscribe_channel(&mut self, node_id: &str) -> (SubscriptionId, Receiver<ConfigChange>) {
        self.subscribers.add_channel(Some(node_id))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool { self.subscribers.remove(id) }

    fn mutate<R>(
        &mut self,
        node_id: &str,
        op: &'static str,
        f: impl FnOnce(&mut NodeConfig, &LayoutSettings) -> Option<R>,
    ) -> Option<R> {
        let Some(config) = self.configs.get_mut(node_id) else {
            debug!(node = node_id, op, "no layout config for node; ignoring");
            return None;
        };
        let Some(result) = f(config, &self.settings) else {
            debug!(node = node_id, op, "ignored invalid layout change");
            return None;
        };
        config.touch();
        trace!(node = node_id, op, "applied layout change");
        self.commit(node_id);
        Some(result)
    }

    /// Saves the whole mapping, then tells subscribers about `node_id`.
    fn commit(&mut self, node_id: &str) {
        let outcome = self.store.save(&self.configs);
        trace!(?outcome, "saved node layouts");
        let change = ConfigChange {
            node_id: node_id.to_owned(),
            config: self.configs.get(node_id).cloned(),
        };
        self.subscribers.notify(&change);
    }
}
