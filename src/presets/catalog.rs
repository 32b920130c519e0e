use serde_json::Value;
use tracing::{debug, trace, warn};

use super::defaults::{DefaultPresetIds, DefaultPresetMap};
use super::{LayoutPreset, builtin_presets};
use crate::common::config::StorageSettings;
use crate::common::util::{Timestamp, new_id, now_millis};
use crate::model::{GridItem, LayoutMode, TabGroup};
use crate::registry::BlockRegistry;
use crate::storage::{SaveOutcome, StorageHandle, write_with_eviction};

pub const LAYOUT_PRESETS_KEY: &str = "layout-presets";
pub const DEFAULT_PRESET_KEY: &str = "default-preset";

/// Builtin presets plus the user's own, and the default-preset choices.
///
/// Builtins are never written to storage and can't be changed through this
/// API. User presets are kept oldest first, so quota eviction can drop from
/// the front.
#[derive(Debug)]
pub struct PresetCatalog {
    storage: StorageHandle,
    retention_steps: Vec<usize>,
    builtins: Vec<LayoutPreset>,
    user: Vec<LayoutPreset>,
    defaults: DefaultPresetMap,
    last_created_at: Timestamp,
}

impl PresetCatalog {
    pub fn new(
        storage: StorageHandle,
        builtins: Vec<LayoutPreset>,
        retention_steps: Vec<usize>,
    ) -> Self {
        let user = storage.read(LAYOUT_PRESETS_KEY).map(|blob| parse_user_presets(&blob));
        let user = user.unwrap_or_default();
        let defaults =
            storage.read(DEFAULT_PRESET_KEY).map(|blob| DefaultPresetMap::parse(&blob));
        let last_created_at = user.iter().map(|p| p.created_at).max().unwrap_or(0);
        debug!(builtin = builtins.len(), user = user.len(), "loaded layout presets");

        Self {
            storage,
            retention_steps,
            builtins,
            user,
            defaults: defaults.unwrap_or_default(),
            last_created_at,
        }
    }

    pub fn from_registry(
        storage: StorageHandle,
        registry: &BlockRegistry,
        settings: &StorageSettings,
    ) -> Self {
        Self::new(storage, builtin_presets(registry), settings.preset_retention_steps.clone())
    }

    /// Builtins first, then user presets from oldest to newest.
    pub fn get_all_presets(&self, node_type: Option<&str>) -> Vec<&LayoutPreset> {
        self.builtins
            .iter()
            .chain(&self.user)
            .filter(|p| node_type.is_none_or(|t| p.node_type == t))
            .collect()
    }

    pub fn user_presets(&self) -> &[LayoutPreset] { &self.user }

    pub fn get_preset(&self, id: &str) -> Option<&LayoutPreset> {
        self.builtins.iter().chain(&self.user).find(|p| p.id == id)
    }

    pub fn save_preset(
        &mut self,
        name: &str,
        node_type: &str,
        layout: &[GridItem],
        tab_groups: Option<&[TabGroup]>,
    ) -> LayoutPreset {
        let preset = LayoutPreset {
            id: new_id("preset"),
            name: name.to_owned(),
            node_type: node_type.to_owned(),
            layout: layout.to_vec(),
            tab_groups: tab_groups.map(<[TabGroup]>::to_vec),
            created_at: self.next_created_at(),
            is_builtin: false,
        };
        debug!(id = %preset.id, node_type, "saved layout preset");
        self.user.push(preset.clone());
        self.persist_user();
        preset
    }

    pub fn delete_preset(&mut self, id: &str) -> bool {
        let Some(pos) = self.user_index(id) else { return false };
        self.user.remove(pos);
        self.persist_user();
        if self.defaults.forget_preset(id) {
            self.persist_defaults();
        }
        true
    }

    pub fn rename_preset(&mut self, id: &str, name: &str) -> bool {
        let Some(pos) = self.user_index(id) else { return false };
        self.user[pos].name = name.to_owned();
        self.persist_user();
        true
    }

    pub fn update_preset(
        &mut self,
        id: &str,
        layout: &[GridItem],
        tab_groups: Option<&[TabGroup]>,
    ) -> bool {
        let Some(pos) = self.user_index(id) else { return false };
        let preset = &mut self.user[pos];
        preset.layout = layout.to_vec();
        preset.tab_groups = tab_groups.map(<[TabGroup]>::to_vec);
        self.persist_user();
        true
    }

    /// Accepts a preset exported from anywhere. It always becomes a new user
    /// preset with a fresh id and creation time.
    pub fn import_preset(&mut self, json: &str) -> Option<LayoutPreset> {
        let Some((name, node_type, layout, tab_groups)) = parse_importable(json) else {
            warn!("rejecting preset import: invalid preset JSON");
            return None;
        };
        let preset = LayoutPreset {
            id: new_id("preset"),
            name,
            node_type,
            layout,
            tab_groups,
            created_at: self.next_created_at(),
            is_builtin: false,
        };
        debug!(id = %preset.id, node_type = %preset.node_type, "imported layout preset");
        self.user.push(preset.clone());
        self.persist_user();
        Some(preset)
    }

    pub fn export_preset(&self, id: &str) -> Option<String> {
        let preset = self.get_preset(id)?;
        match serde_json::to_string_pretty(preset) {
            Ok(json) => Some(json),
            Err(err) => {
                warn!(id, error = %err, "failed to export preset");
                None
            }
        }
    }

    /// The configured default for `mode` (fullscreen when `None`), else the
    /// first builtin for the node type.
    pub fn get_default_preset(
        &self,
        node_type: &str,
        mode: Option<LayoutMode>,
    ) -> Option<&LayoutPreset> {
        let mode = mode.unwrap_or(LayoutMode::Fullscreen);
        self.defaults
            .get(node_type, mode)
            .and_then(|id| self.get_preset(id))
            .filter(|p| p.node_type == node_type)
            .or_else(|| self.builtins.iter().find(|p| p.node_type == node_type))
    }

    pub fn default_preset_ids(&self, node_type: &str) -> Option<&DefaultPresetIds> {
        self.defaults.ids(node_type)
    }

    pub fn default_presets(&self) -> &DefaultPresetMap { &self.defaults }

    /// Fails unless `preset_id` names a preset for `node_type`.
    pub fn set_default_preset(
        &mut self,
        node_type: &str,
        mode: LayoutMode,
        preset_id: &str,
    ) -> bool {
        if !self.get_preset(preset_id).is_some_and(|p| p.node_type == node_type) {
            debug!(node_type, preset_id, "refusing default preset for another node type");
            return false;
        }
        if self.defaults.set(node_type, mode, preset_id) {
            self.persist_defaults();
        }
        true
    }

    pub fn unset_default_preset(&mut self, node_type: &str, mode: LayoutMode) -> bool {
        if !self.defaults.unset(node_type, mode) {
            return false;
        }
        self.persist_defaults();
        true
    }

    fn user_index(&self, id: &str) -> Option<usize> {
        let pos = self.user.iter().position(|p| p.id == id);
        if pos.is_none() {
            debug!(id, "no user preset with this id");
        }
        pos
    }

    /// Strictly increasing within the process, so creation order is total.
    fn next_created_at(&mut self) -> Timestamp {
        self.last_created_at = now_millis().max(self.last_created_at + 1);
        self.last_created_at
    }

    fn persist_user(&mut self) {
        let outcome = write_with_eviction(
            &self.storage,
            LAYOUT_PRESETS_KEY,
            &self.user,
            &self.retention_steps,
            |kept| serde_json::to_string(kept),
        );
        trace!(?outcome, "persisted user presets");
        if let SaveOutcome::Evicted { dropped, .. } = outcome {
            let mut forgot = false;
            for preset in self.user.drain(..dropped) {
                forgot |= self.defaults.forget_preset(&preset.id);
            }
            if forgot {
                self.persist_defaults();
            }
        }
    }

    fn persist_defaults(&self) {
        if self.defaults.is_empty() {
            self.storage.remove(DEFAULT_PRESET_KEY);
            return;
        }
        match serde_json::to_string(&self.defaults) {
            Ok(blob) => {
                if let Err(err) = self.storage.write(DEFAULT_PRESET_KEY, &blob) {
                    warn!(error = %err, "failed to save default presets");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize default presets"),
        }
    }
}

fn parse_user_presets(blob: &str) -> Vec<LayoutPreset> {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(blob) else {
        warn!("stored layout presets are malformed; ignoring them");
        return Vec::new();
    };
    let mut presets: Vec<LayoutPreset> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<LayoutPreset>(item) {
            Ok(preset) => Some(LayoutPreset { is_builtin: false, ..preset }),
            Err(err) => {
                warn!(error = %err, "skipping malformed stored preset");
                None
            }
        })
        .collect();
    presets.sort_by_key(|p| p.created_at);
    presets
}

type Importable = (String, String, Vec<GridItem>, Option<Vec<TabGroup>>);

/// Needs a string `name`, a string `nodeType` and a `layout` array. Id,
/// creation time and builtin flag in the payload are ignored.
fn parse_importable(json: &str) -> Option<Importable> {
    let Value::Object(mut fields) = serde_json::from_str::<Value>(json).ok()? else {
        return None;
    };
    let Some(Value::String(name)) = fields.remove("name") else { return None };
    let Some(Value::String(node_type)) = fields.remove("nodeType") else { return None };
    let layout @ Value::Array(_) = fields.remove("layout")? else { return None };
    let layout: Vec<GridItem> = serde_json::from_value(layout).ok()?;

    let tab_groups = match fields.remove("tabGroups") {
        None | Some(Value::Null) => None,
        Some(groups) => {
            let groups: Vec<TabGroup> = serde_json::from_value(groups).ok()?;
            Some(groups.into_iter().filter_map(TabGroup::normalized).collect())
        }
    };
    Some((name, node_type, layout, tab_groups))
}
