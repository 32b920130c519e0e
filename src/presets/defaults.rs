use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::common::collections::BTreeMap;
use crate::model::LayoutMode;

/// The configured default preset for each mode of one node type.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultPresetIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullscreen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<String>,
}

impl DefaultPresetIds {
    pub fn get(&self, mode: LayoutMode) -> Option<&str> {
        match mode {
            LayoutMode::Fullscreen => self.fullscreen.as_deref(),
            LayoutMode::Normal => self.normal.as_deref(),
        }
    }

    fn slot_mut(&mut self, mode: LayoutMode) -> &mut Option<String> {
        match mode {
            LayoutMode::Fullscreen => &mut self.fullscreen,
            LayoutMode::Normal => &mut self.normal,
        }
    }

    pub fn is_empty(&self) -> bool { self.fullscreen.is_none() && self.normal.is_none() }
}

/// Older documents stored a single preset id per node type.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredIds {
    Legacy(String),
    PerMode(DefaultPresetIds),
}

impl From<StoredIds> for DefaultPresetIds {
    fn from(stored: StoredIds) -> Self {
        match stored {
            StoredIds::Legacy(id) => Self { fullscreen: Some(id.clone()), normal: Some(id) },
            StoredIds::PerMode(ids) => ids,
        }
    }
}

/// `nodeType -> {fullscreen?, normal?}`. Node types with neither mode set
/// are never kept.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct DefaultPresetMap(BTreeMap<String, DefaultPresetIds>);

impl DefaultPresetMap {
    /// Reads the stored document, skipping entries it cannot make sense of.
    pub fn parse(blob: &str) -> Self {
        let entries = match serde_json::from_str::<Value>(blob) {
            Ok(Value::Object(entries)) => entries,
            Ok(_) | Err(_) => {
                warn!("stored default presets are malformed; ignoring them");
                return Self::default();
            }
        };

        let mut map = BTreeMap::new();
        for (node_type, value) in entries {
            match serde_json::from_value::<StoredIds>(value) {
                Ok(stored) => {
                    let ids = DefaultPresetIds::from(stored);
                    if !ids.is_empty() {
                        map.insert(node_type, ids);
                    }
                }
                Err(_) => warn!(node_type = %node_type, "skipping malformed default preset entry"),
            }
        }
        Self(map)
    }

    pub fn get(&self, node_type: &str, mode: LayoutMode) -> Option<&str> {
        self.0.get(node_type).and_then(|ids| ids.get(mode))
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn ids(&self, node_type: &str) -> Option<&DefaultPresetIds> { self.0.get(node_type) }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DefaultPresetIds)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns whether anything changed.
    pub fn set(&mut self, node_type: &str, mode: LayoutMode, preset_id: &str) -> bool {
        let slot = self.0.entry(node_type.to_owned()).or_default().slot_mut(mode);
        if slot.as_deref() == Some(preset_id) {
            return false;
        }
        *slot = Some(preset_id.to_owned());
        true
    }

    pub fn unset(&mut self, node_type: &str, mode: LayoutMode) -> bool {
        let Some(ids) = self.0.get_mut(node_type) else { return false };
        let changed = ids.slot_mut(mode).take().is_some();
        if ids.is_empty() {
            self.0.remove(node_type);
        }
        changed
    }

    /// Drops every reference to `preset_id`.
    pub fn forget_preset(&mut self, preset_id: &str) -> bool {
        let mut changed = false;
        for ids in self.0.values_mut() {
            for mode in LayoutMode::ALL {
                let slot = ids.slot_mut(mode);
                if slot.as_deref() == Some(preset_id) {
                    *slot = None;
                    changed = true;
                }
            }
        }
        self.0.retain(|_, ids| !ids.is_empty());
        changed
    }
}
