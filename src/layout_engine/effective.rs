use serde::Serialize;

use crate::common::collections::HashMap;
use crate::model::{GridItem, LayoutSlot, ModeState, TabGroup};

/// What the renderer draws at one grid position.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum EffectiveItem<'a> {
    Block { grid_item: GridItem },
    TabGroup { grid_item: GridItem, group: &'a TabGroup },
}

impl EffectiveItem<'_> {
    pub fn grid_item(&self) -> &GridItem {
        match self {
            EffectiveItem::Block { grid_item } | EffectiveItem::TabGroup { grid_item, .. } => {
                grid_item
            }
        }
    }

    pub fn is_tab_group(&self) -> bool { matches!(self, EffectiveItem::TabGroup { .. }) }
}

/// Resolves raw layout data against tab-group membership, one item per
/// grid entry and in layout order.
pub fn compute_effective_items<'a>(
    layout: &[GridItem],
    tab_groups: &'a [TabGroup],
) -> Vec<EffectiveItem<'a>> {
    let by_id: HashMap<&str, &TabGroup> = tab_groups.iter().map(|g| (g.id(), g)).collect();
    layout
        .iter()
        .map(|item| match by_id.get(item.id.as_str()) {
            Some(group) => EffectiveItem::TabGroup { grid_item: item.clone(), group },
            None => EffectiveItem::Block { grid_item: item.clone() },
        })
        .collect()
}

/// Same as [`compute_effective_items`] for state that is already resolved.
pub fn effective_items_for(state: &ModeState) -> Vec<EffectiveItem<'_>> {
    state
        .slots()
        .iter()
        .map(|slot| match slot {
            LayoutSlot::Block { .. } => EffectiveItem::Block { grid_item: slot.grid_item() },
            LayoutSlot::TabGroup { group, .. } => {
                EffectiveItem::TabGroup { grid_item: slot.grid_item(), group }
            }
        })
        .collect()
}
