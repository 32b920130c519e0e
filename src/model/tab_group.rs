use serde::{Deserialize, Serialize};

use crate::common::collections::HashSet;

/// Two or more blocks sharing one grid slot behind a tab strip.
///
/// The first member is the primary: the group took over its grid position
/// when it was formed. `active_index` always points at a member.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TabGroup {
    id: String,
    block_ids: Vec<String>,
    #[serde(default)]
    active_index: usize,
}

impl TabGroup {
    /// Returns `None` unless there are at least two distinct members.
    pub fn new(id: impl Into<String>, block_ids: Vec<String>) -> Option<Self> {
        Self { id: id.into(), block_ids, active_index: 0 }.normalized()
    }

    pub fn id(&self) -> &str { &self.id }

    pub fn block_ids(&self) -> &[String] { &self.block_ids }

    pub fn len(&self) -> usize { self.block_ids.len() }

    pub fn is_empty(&self) -> bool { self.block_ids.is_empty() }

    pub fn active_index(&self) -> usize { self.active_index }

    pub fn active_block(&self) -> Option<&str> {
        self.block_ids.get(self.active_index).map(String::as_str)
    }

    pub fn primary(&self) -> Option<&str> { self.block_ids.first().map(String::as_str) }

    pub fn contains(&self, block_id: &str) -> bool { self.block_ids.iter().any(|b| b == block_id) }

    /// Sets the active tab, clamping out-of-range indices to the last member.
    pub fn set_active(&mut self, index: usize) -> usize {
        self.active_index = index.min(self.block_ids.len().saturating_sub(1));
        self.active_index
    }

    /// Removes one member, keeping the same block active where possible.
    /// The caller dissolves the group if fewer than two members remain.
    pub fn remove_member(&mut self, block_id: &str) -> bool {
        let Some(pos) = self.block_ids.iter().position(|b| b == block_id) else {
            return false;
        };
        self.block_ids.remove(pos);
        if pos < self.active_index {
            self.active_index -= 1;
        }
        self.set_active(self.active_index);
        true
    }

    pub fn add_member(&mut self, block_id: impl Into<String>) -> bool {
        let block_id = block_id.into();
        if self.contains(&block_id) {
            return false;
        }
        self.block_ids.push(block_id);
        true
    }

    /// Replaces the member order. Rejects anything that is not a permutation
    /// of the current members. The active block stays active.
    pub fn reorder(&mut self, new_order: &[String]) -> bool {
        if new_order.len() != self.block_ids.len() {
            return false;
        }
        let current: HashSet<&str> = self.block_ids.iter().map(String::as_str).collect();
        let proposed: HashSet<&str> = new_order.iter().map(String::as_str).collect();
        if proposed.len() != new_order.len() || proposed != current {
            return false;
        }

        let active = self.active_block().map(str::to_owned);
        self.block_ids = new_order.to_vec();
        if let Some(active) = active {
            self.active_index = self.block_ids.iter().position(|b| *b == active).unwrap_or(0);
        }
        true
    }

    /// Keeps the members accepted by `keep`, preserving the active block if
    /// it survives.
    pub(crate) fn retain_members(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let clamped = self.active_index.min(self.block_ids.len().saturating_sub(1));
        let active = self.block_ids.get(clamped).cloned();
        self.block_ids.retain(|b| keep(b));
        self.active_index = active
            .and_then(|active| self.block_ids.iter().position(|b| *b == active))
            .unwrap_or(0);
    }

    /// Drops duplicate members and clamps the active index. `None` if the
    /// result would have fewer than two members.
    pub(crate) fn normalized(mut self) -> Option<Self> {
        let mut seen = HashSet::default();
        self.retain_members(|b| seen.insert(b.to_owned()));
        if self.block_ids.len() < 2 {
            return None;
        }
        self.set_active(self.active_index);
        Some(self)
    }

    pub(crate) fn into_block_ids(self) -> Vec<String> { self.block_ids }
}
