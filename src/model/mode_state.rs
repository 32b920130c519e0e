use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::grid::{GridItem, GridRect, SizeOverride, layout_bottom};
use super::tab_group::TabGroup;
use crate::common::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

mod grouping;

/// Footprint given to a tab group that was persisted without a grid item and
/// has no member position to inherit.
pub const ORPHAN_GROUP_WIDTH: u32 = 4;
pub const ORPHAN_GROUP_HEIGHT: u32 = 4;

/// One entry of a mode's layout: either a lone block or a tab group that
/// occupies a single grid slot on behalf of its members.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutSlot {
    Block { id: String, rect: GridRect },
    TabGroup { group: TabGroup, rect: GridRect },
}

impl LayoutSlot {
    pub fn id(&self) -> &str {
        match self {
            LayoutSlot::Block { id, .. } => id,
            LayoutSlot::TabGroup { group, .. } => group.id(),
        }
    }

    pub fn rect(&self) -> &GridRect {
        match self {
            LayoutSlot::Block { rect, .. } | LayoutSlot::TabGroup { rect, .. } => rect,
        }
    }

    pub fn grid_item(&self) -> GridItem { GridItem::with_rect(self.id(), *self.rect()) }

    pub fn as_tab_group(&self) -> Option<&TabGroup> {
        match self {
            LayoutSlot::TabGroup { group, .. } => Some(group),
            LayoutSlot::Block { .. } => None,
        }
    }

    fn as_tab_group_mut(&mut self) -> Option<&mut TabGroup> {
        match self {
            LayoutSlot::TabGroup { group, .. } => Some(group),
            LayoutSlot::Block { .. } => None,
        }
    }

    fn is_block(&self, block_id: &str) -> bool {
        matches!(self, LayoutSlot::Block { id, .. } if id == block_id)
    }
}

/// Layout state of one node in one mode.
///
/// Grouped blocks have no slot of their own; they are reachable only through
/// their group. Serialized as `{layout, tabGroups, sizeOverrides}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(from = "ModeStateRepr", into = "ModeStateRepr")]
pub struct ModeState {
    slots: Vec<LayoutSlot>,
    size_overrides: BTreeMap<String, SizeOverride>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ModeStateRepr {
    #[serde(default)]
    layout: Vec<GridItem>,
    #[serde(default)]
    tab_groups: Vec<TabGroup>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    size_overrides: BTreeMap<String, SizeOverride>,
}

impl From<ModeStateRepr> for ModeState {
    fn from(repr: ModeStateRepr) -> Self {
        ModeState::from_parts(repr.layout, repr.tab_groups, repr.size_overrides)
    }
}

impl From<ModeState> for ModeStateRepr {
    fn from(state: ModeState) -> Self {
        let layout = state.layout();
        let mut tab_groups = Vec::new();
        for slot in state.slots {
            if let LayoutSlot::TabGroup { group, .. } = slot {
                tab_groups.push(group);
            }
        }
        ModeStateRepr {
            layout,
            tab_groups,
            size_overrides: state.size_overrides,
        }
    }
}

impl ModeState {
    pub fn from_layout(layout: Vec<GridItem>) -> Self {
        Self::from_parts(layout, Vec::new(), BTreeMap::new())
    }

    /// Builds a consistent state from raw layout data, repairing anything
    /// that breaks the grouping invariants instead of rejecting it.
    pub fn from_parts(
        layout: Vec<GridItem>,
        tab_groups: Vec<TabGroup>,
        size_overrides: BTreeMap<String, SizeOverride>,
    ) -> Self {
        let mut claimed: HashSet<String> = HashSet::default();
        let mut group_ids: HashSet<String> = HashSet::default();
        let mut groups = Vec::with_capacity(tab_groups.len());

        for mut group in tab_groups {
            if !group_ids.insert(group.id().to_owned()) {
                warn!(group = group.id(), "dropping tab group with duplicate id");
                continue;
            }
            group.retain_members(|b| !claimed.contains(b));
            let Some(group) = group.normalized() else {
                debug!("dropping tab group with fewer than two members");
                continue;
            };
            claimed.extend(group.block_ids().iter().cloned());
            groups.push(group);
        }

        let mut pending: HashMap<String, TabGroup> =
            groups.iter().map(|g| (g.id().to_owned(), g.clone())).collect();
        let mut member_rects: HashMap<String, GridRect> = HashMap::default();
        let mut seen: HashSet<String> = HashSet::default();
        let mut slots = Vec::with_capacity(layout.len());

        for item in layout {
            if !seen.insert(item.id.clone()) {
                debug!(id = %item.id, "dropping duplicate grid item");
                continue;
            }
            let rect = item.rect.normalized();
            if let Some(group) = pending.remove(&item.id) {
                slots.push(LayoutSlot::TabGroup { group, rect });
            } else if claimed.contains(&item.id) {
                member_rects.entry(item.id).or_insert(rect);
            } else {
                slots.push(LayoutSlot::Block { id: item.id, rect });
            }
        }

        for group in &groups {
            let Some(group) = pending.remove(group.id()) else { continue };
            let rect = group
                .block_ids()
                .iter()
                .find_map(|b| member_rects.get(b).copied())
                .unwrap_or_else(|| {
                    let y = layout_bottom(slots.iter().map(LayoutSlot::rect));
                    GridRect::new(0, y, ORPHAN_GROUP_WIDTH, ORPHAN_GROUP_HEIGHT)
                });
            debug!(group = group.id(), "restoring tab group without a grid item");
            slots.push(LayoutSlot::TabGroup { group, rect });
        }

        Self { slots, size_overrides }
    }

    pub fn slots(&self) -> &[LayoutSlot] { &self.slots }

    /// The grid items in render order, blocks and groups alike.
    pub fn layout(&self) -> Vec<GridItem> { self.slots.iter().map(LayoutSlot::grid_item).collect() }

    pub fn tab_groups(&self) -> impl Iterator<Item = &TabGroup> + '_ {
        self.slots.iter().filter_map(LayoutSlot::as_tab_group)
    }

    pub fn tab_group(&self, group_id: &str) -> Option<&TabGroup> {
        self.tab_groups().find(|g| g.id() == group_id)
    }

    pub fn contains_block(&self, block_id: &str) -> bool {
        self.slots.iter().any(|s| s.is_block(block_id))
            || self.tab_groups().any(|g| g.contains(block_id))
    }

    /// Every block id currently absorbed into a tab group.
    pub fn grouped_block_ids(&self) -> BTreeSet<String> {
        self.tab_groups().flat_map(|g| g.block_ids().iter().cloned()).collect()
    }

    pub fn size_overrides(&self) -> &BTreeMap<String, SizeOverride> { &self.size_overrides }

    pub fn size_override(&self, block_id: &str) -> Option<&SizeOverride> {
        self.size_overrides.get(block_id)
    }

    pub(crate) fn set_size_override(&mut self, block_id: &str, size: SizeOverride) -> bool {
        if size.is_empty() {
            return self.clear_size_override(block_id);
        }
        if self.size_overrides.get(block_id) == Some(&size) {
            return false;
        }
        self.size_overrides.insert(block_id.to_owned(), size);
        true
    }

    pub(crate) fn clear_size_override(&mut self, block_id: &str) -> bool {
        self.size_overrides.remove(block_id).is_some()
    }

    /// Replaces every slot position with `items`.
    ///
    /// Items naming a group move that group. Items naming a grouped block are
    /// ignored, since the block is only reachable through its group. Groups
    /// missing from `items` keep their previous position.
    pub(crate) fn replace_layout(&mut self, items: Vec<GridItem>) {
        let mut groups: Vec<(TabGroup, GridRect)> = Vec::new();
        for slot in self.slots.drain(..) {
            if let LayoutSlot::TabGroup { group, rect } = slot {
                groups.push((group, rect));
            }
        }
        let grouped: HashSet<String> =
            groups.iter().flat_map(|(g, _)| g.block_ids().iter().cloned()).collect();

        let mut seen: HashSet<String> = HashSet::default();
        for item in items {
            if !seen.insert(item.id.clone()) {
                debug!(id = %item.id, "ignoring duplicate grid item");
                continue;
            }
            let rect = item.rect.normalized();
            if let Some(pos) = groups.iter().position(|(g, _)| g.id() == item.id) {
                let (group, _) = groups.remove(pos);
                self.slots.push(LayoutSlot::TabGroup { group, rect });
            } else if grouped.contains(&item.id) {
                warn!(id = %item.id, "ignoring grid item for a block inside a tab group");
            } else {
                self.slots.push(LayoutSlot::Block { id: item.id, rect });
            }
        }

        for (group, rect) in groups {
            debug!(group = group.id(), "tab group missing from new layout; keeping old position");
            self.slots.push(LayoutSlot::TabGroup { group, rect });
        }
    }

    fn group_index(&self, group_id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.as_tab_group().is_some_and(|g| g.id() == group_id))
    }

    fn block_index(&self, block_id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.is_block(block_id))
    }

    fn is_group_id(&self, id: &str) -> bool { self.tab_groups().any(|g| g.id() == id) }
}
