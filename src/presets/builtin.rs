use super::LayoutPreset;
use crate::model::{GridItem, GridRect};
use crate::registry::BlockRegistry;

/// Full grid width used by the single-column preset.
const STACKED_WIDTH: u32 = 4;

/// Two read-only presets per node type: the registry layout ("Default") and
/// every block in one full-width column ("Stacked").
pub fn builtin_presets(registry: &BlockRegistry) -> Vec<LayoutPreset> {
    let mut presets = Vec::new();
    for node_type in registry.node_types() {
        let layout = registry.default_grid_layout_for(node_type);
        let stacked = stacked_layout(&layout);
        presets.push(builtin(node_type, "default", "Default", layout));
        presets.push(builtin(node_type, "stacked", "Stacked", stacked));
    }
    presets
}

fn builtin(node_type: &str, slug: &str, name: &str, layout: Vec<GridItem>) -> LayoutPreset {
    LayoutPreset {
        id: format!("builtin-{node_type}-{slug}"),
        name: name.to_owned(),
        node_type: node_type.to_owned(),
        layout,
        tab_groups: None,
        created_at: 0,
        is_builtin: true,
    }
}

fn stacked_layout(layout: &[GridItem]) -> Vec<GridItem> {
    let mut y = 0;
    layout
        .iter()
        .map(|item| {
            let rect = GridRect { x: 0, y, w: STACKED_WIDTH, ..item.rect };
            y += rect.h;
            GridItem::with_rect(&item.id, rect)
        })
        .collect()
}
