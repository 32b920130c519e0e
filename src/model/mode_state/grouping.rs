//! Tab-group mutations on a single mode's layout.

use tracing::debug;

use super::{LayoutSlot, ModeState};
use crate::common::collections::HashSet;
use crate::model::grid::{GridRect, layout_bottom};
use crate::model::tab_group::TabGroup;

/// Never less than the group's height, so stacked members cannot overlap.
fn row_step(rect: &GridRect, configured: Option<u32>) -> u32 {
    configured.unwrap_or(rect.h).max(rect.h).max(1)
}

impl ModeState {
    /// Folds `block_ids` into a new group that takes over the grid position
    /// of `block_ids[0]`. Every id must be a free block in this layout.
    pub(crate) fn create_tab_group(&mut self, group_id: String, block_ids: &[String]) -> bool {
        if block_ids.len() < 2 {
            debug!("refusing to group fewer than two blocks");
            return false;
        }
        let unique: HashSet<&str> = block_ids.iter().map(String::as_str).collect();
        if unique.len() != block_ids.len() {
            debug!("refusing to group duplicate block ids");
            return false;
        }
        if self.is_group_id(&group_id) {
            return false;
        }
        if let Some(missing) = block_ids.iter().find(|b| self.block_index(b).is_none()) {
            debug!(block = %missing, "block is grouped or not in the layout");
            return false;
        }

        let Some(primary_index) = self.block_index(&block_ids[0]) else { return false };
        let Some(group) = TabGroup::new(group_id, block_ids.to_vec()) else {
            return false;
        };

        let rect = *self.slots[primary_index].rect();
        self.slots[primary_index] = LayoutSlot::TabGroup { group, rect };
        self.slots.retain(|slot| match slot {
            LayoutSlot::Block { id, .. } => !unique.contains(id.as_str()),
            LayoutSlot::TabGroup { .. } => true,
        });
        true
    }

    /// Removes the group and gives every member its own slot again. The
    /// primary keeps the group's position, the rest are stacked from the
    /// first free row below the layout.
    pub(crate) fn dissolve_tab_group(
        &mut self,
        group_id: &str,
        configured_step: Option<u32>,
    ) -> bool {
        let Some(index) = self.group_index(group_id) else { return false };
        let LayoutSlot::TabGroup { group, rect } = self.slots.remove(index) else {
            return false;
        };

        let step = row_step(&rect, configured_step);
        let below = layout_bottom(self.slots.iter().map(LayoutSlot::rect)).max(rect.bottom());
        let restored: Vec<LayoutSlot> = group
            .into_block_ids()
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let rect = match i {
                    0 => rect,
                    i => rect.with_y(below.saturating_add(step.saturating_mul(i as u32 - 1))),
                };
                LayoutSlot::Block { id, rect }
            })
            .collect();
        self.slots.splice(index..index, restored);
        true
    }

    /// Returns the clamped index that is now active.
    pub(crate) fn switch_tab_group_active(
        &mut self,
        group_id: &str,
        index: usize,
    ) -> Option<usize> {
        let group = self.slots.iter_mut().find_map(|s| {
            s.as_tab_group_mut().filter(|g| g.id() == group_id)
        })?;
        Some(group.set_active(index))
    }

    /// Takes one block out of a group and places it in the first free row
    /// below the layout. A group left with a single member is dissolved.
    pub(crate) fn remove_block_from_tab_group(
        &mut self,
        group_id: &str,
        block_id: &str,
        configured_step: Option<u32>,
    ) -> bool {
        let Some(index) = self.group_index(group_id) else { return false };
        let LayoutSlot::TabGroup { group, rect } = &mut self.slots[index] else {
            return false;
        };
        if !group.remove_member(block_id) {
            return false;
        }
        let rect = *rect;
        let remaining = group.len();

        if remaining < 2 {
            self.dissolve_tab_group(group_id, configured_step);
        }
        let below = layout_bottom(self.slots.iter().map(LayoutSlot::rect));
        let removed = LayoutSlot::Block { id: block_id.to_owned(), rect: rect.with_y(below) };
        self.slots.insert((index + 1).min(self.slots.len()), removed);
        true
    }

    pub(crate) fn reorder_tab_group_blocks(
        &mut self,
        group_id: &str,
        new_order: &[String],
    ) -> bool {
        self.slots
            .iter_mut()
            .find_map(|s| s.as_tab_group_mut().filter(|g| g.id() == group_id))
            .is_some_and(|group| group.reorder(new_order))
    }

    /// Moves a free block into an existing group as its last tab.
    pub(crate) fn add_block_to_tab_group(&mut self, group_id: &str, block_id: &str) -> bool {
        if self.is_group_id(block_id) || self.grouped_block_ids().contains(block_id) {
            return false;
        }
        let Some(group) = self
            .slots
            .iter_mut()
            .find_map(|s| s.as_tab_group_mut().filter(|g| g.id() == group_id))
        else {
            return false;
        };
        if !group.add_member(block_id) {
            return false;
        }
        self.slots.retain(|s| !s.is_block(block_id));
        true
    }
}
