//! Named layout snapshots per node type, and the per-mode default choice.

use serde::{Deserialize, Serialize};

use crate::common::util::Timestamp;
use crate::model::{GridItem, TabGroup};

mod builtin;
mod catalog;
mod defaults;

pub use builtin::builtin_presets;
pub use catalog::{DEFAULT_PRESET_KEY, LAYOUT_PRESETS_KEY, PresetCatalog};
pub use defaults::{DefaultPresetIds, DefaultPresetMap};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPreset {
    pub id: String,
    pub name: String,
    pub node_type: String,
    pub layout: Vec<GridItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_groups: Option<Vec<TabGroup>>,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub is_builtin: bool,
}
