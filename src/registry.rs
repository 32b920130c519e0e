//! Static catalog of the blocks each node type is built from.
//!
//! The registry is read-only once handed to the engine; it only supplies
//! defaults and resize limits.

use serde::{Deserialize, Serialize};

use crate::common::collections::BTreeMap;
use crate::model::{GridItem, GridRect, SizeOverride};

mod builtin;

/// Placement of a block in the compact card view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NormalLayout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_span: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_span: Option<u32>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

/// Default rect of a block in the fullscreen grid.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FullscreenLayout {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockDefinition {
    pub id: String,
    pub title: String,
    pub icon: String,
    #[serde(default)]
    pub normal_layout: NormalLayout,
    pub fullscreen_layout: FullscreenLayout,
    #[serde(default)]
    pub collapsible: bool,
    #[serde(default)]
    pub default_collapsed: bool,
}

impl BlockDefinition {
    pub fn grid_item(&self) -> GridItem {
        let FullscreenLayout { x, y, w, h, min_w, min_h } = self.fullscreen_layout;
        GridItem::with_rect(
            &self.id,
            GridRect { min_w, min_h, ..GridRect::new(x, y, w, h) }.normalized(),
        )
    }

    /// The registry's resize limits, in the shape user overrides use.
    pub fn size_limits(&self) -> SizeOverride {
        SizeOverride {
            min_w: self.fullscreen_layout.min_w,
            min_h: self.fullscreen_layout.min_h,
            ..SizeOverride::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    node_types: BTreeMap<String, Vec<BlockDefinition>>,
}

impl BlockRegistry {
    pub fn new() -> Self { Self::default() }

    /// The catalog for the file-management tools shipped with the editor.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (node_type, blocks) in builtin::catalog() {
            registry.register(node_type, blocks);
        }
        registry
    }

    /// Registers or replaces the block set for `node_type`.
    pub fn register(&mut self, node_type: impl Into<String>, blocks: Vec<BlockDefinition>) {
        self.node_types.insert(node_type.into(), blocks);
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> + '_ {
        self.node_types.keys().map(String::as_str)
    }

    pub fn contains(&self, node_type: &str) -> bool { self.node_types.contains_key(node_type) }

    /// Blocks in registration order; empty for an unknown node type.
    pub fn blocks(&self, node_type: &str) -> &[BlockDefinition] {
        self.node_types.get(node_type).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn get_block_definition(
        &self,
        node_type: &str,
        block_id: &str,
    ) -> Option<&BlockDefinition> {
        self.blocks(node_type).iter().find(|b| b.id == block_id)
    }

    pub fn default_grid_layout_for(&self, node_type: &str) -> Vec<GridItem> {
        default_grid_layout(self.blocks(node_type))
    }

    pub fn default_normal_layout_for(&self, node_type: &str) -> Vec<GridItem> {
        default_normal_layout(self.blocks(node_type))
    }
}

/// Projects every definition's fullscreen rect into a grid item.
pub fn default_grid_layout(blocks: &[BlockDefinition]) -> Vec<GridItem> {
    blocks.iter().map(BlockDefinition::grid_item).collect()
}

/// Visible blocks in card order. Blocks without an explicit `order` come
/// last; ties keep registration order.
pub fn normal_mode_blocks(blocks: &[BlockDefinition]) -> Vec<&BlockDefinition> {
    let mut visible: Vec<&BlockDefinition> =
        blocks.iter().filter(|b| !b.normal_layout.hidden).collect();
    visible.sort_by_key(|b| (b.normal_layout.order.is_none(), b.normal_layout.order));
    visible
}

/// Card-view layout: `x` is the position in the list and `w` the column span.
pub fn default_normal_layout(blocks: &[BlockDefinition]) -> Vec<GridItem> {
    normal_mode_blocks(blocks)
        .into_iter()
        .enumerate()
        .map(|(i, b)| {
            let w = b.normal_layout.col_span.unwrap_or(1);
            let h = b.normal_layout.row_span.unwrap_or(1);
            GridItem::with_rect(&b.id, GridRect::new(i as u32, 0, w, h).normalized())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn def(id: &str, order: Option<i32>, hidden: bool) -> BlockDefinition {
        BlockDefinition {
            id: id.into(),
            title: id.to_uppercase(),
            icon: "box".into(),
            normal_layout: NormalLayout { order, hidden, ..Default::default() },
            fullscreen_layout: FullscreenLayout { x: 0, y: 0, w: 2, h: 2, ..Default::default() },
            collapsible: false,
            default_collapsed: false,
        }
    }

    #[test]
    fn normal_mode_sorts_by_order_with_unordered_last() {
        let blocks = vec![
            def("a", None, false),
            def("b", Some(2), false),
            def("c", Some(1), false),
            def("d", None, false),
            def("e", Some(0), true),
            def("f", Some(2), false),
        ];
        let order: Vec<&str> = normal_mode_blocks(&blocks).iter().map(|b| b.id.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "f", "a", "d"]);
    }

    #[test]
    fn normal_layout_uses_list_position_and_span() {
        let mut wide = def("wide", Some(1), false);
        wide.normal_layout.col_span = Some(2);
        let blocks = vec![wide, def("first", Some(0), false)];
        assert_eq!(
            default_normal_layout(&blocks),
            vec![GridItem::new("first", 0, 0, 1, 1), GridItem::new("wide", 1, 0, 2, 1)]
        );
    }

    #[test]
    fn grid_layout_carries_minimums() {
        let mut block = def("log", None, false);
        block.fullscreen_layout.min_w = Some(2);
        let item = &default_grid_layout(&[block])[0];
        assert_eq!(item.rect.min_w, Some(2));
        assert_eq!((item.rect.w, item.rect.h), (2, 2));
    }

    #[test]
    fn builtin_catalog_is_consistent() {
        let registry = BlockRegistry::builtin();
        let types: Vec<&str> = registry.node_types().collect();
        assert_eq!(types, vec!["bandia", "crashu", "findz", "linku", "migratef", "trename"]);

        for node_type in types {
            let blocks = registry.blocks(node_type);
            assert!(blocks.len() >= 2, "{node_type} has too few blocks");
            let mut ids: Vec<&str> = blocks.iter().map(|b| b.id.as_str()).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), blocks.len(), "{node_type} has duplicate block ids");
        }

        let path = registry.get_block_definition("findz", "path").unwrap();
        assert_eq!(path.grid_item(), GridItem::new("path", 0, 0, 2, 2));
        assert!(registry.get_block_definition("findz", "nope").is_none());
        assert!(registry.blocks("unknown").is_empty());
        assert!(registry.contains("findz"));
        assert!(!registry.contains("unknown"));
    }
}
