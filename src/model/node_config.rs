use serde::{Deserialize, Serialize};

use super::grid::LayoutMode;
use super::mode_state::ModeState;
use crate::common::util::{Timestamp, now_millis};

/// Everything persisted for one canvas node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    node_type: String,
    fullscreen: ModeState,
    normal: ModeState,
    /// Only used to pick eviction victims when the store is full.
    #[serde(default)]
    created_at: Timestamp,
    #[serde(default)]
    updated_at: Timestamp,
}

impl NodeConfig {
    pub fn new(node_type: impl Into<String>, fullscreen: ModeState, normal: ModeState) -> Self {
        let now = now_millis();
        Self {
            node_type: node_type.into(),
            fullscreen,
            normal,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn node_type(&self) -> &str { &self.node_type }

    pub fn mode(&self, mode: LayoutMode) -> &ModeState {
        match mode {
            LayoutMode::Fullscreen => &self.fullscreen,
            LayoutMode::Normal => &self.normal,
        }
    }

    pub(crate) fn mode_mut(&mut self, mode: LayoutMode) -> &mut ModeState {
        match mode {
            LayoutMode::Fullscreen => &mut self.fullscreen,
            LayoutMode::Normal => &mut self.normal,
        }
    }

    pub fn created_at(&self) -> Timestamp { self.created_at }

    pub fn updated_at(&self) -> Timestamp { self.updated_at }

    pub(crate) fn touch(&mut self) { self.updated_at = now_millis().max(self.updated_at); }

    /// Equality that ignores `updated_at`.
    pub fn same_content(&self, other: &NodeConfig) -> bool {
        self.node_type == other.node_type
            && self.fullscreen == other.fullscreen
            && self.normal == other.normal
            && self.created_at == other.created_at
    }
}
