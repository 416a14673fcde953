//! Registry of rate upgrade groups

use crate::types::RateUpgradeGroup;

/// Groups keyed by name, in the order they were added.
///
/// Lookups match the whole name: `find("grp")` never returns `grp0`.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: Vec<RateUpgradeGroup>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<&RateUpgradeGroup> {
        self.groups.iter().find(|g| g.name() == name)
    }

    pub(crate) fn find_mut(&mut self, name: &str) -> Option<&mut RateUpgradeGroup> {
        self.groups.iter_mut().find(|g| g.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Appends a group. The caller checks that the name is free.
    pub(crate) fn insert(&mut self, group: RateUpgradeGroup) {
        debug_assert!(!self.contains(group.name()), "duplicate group {}", group.name());
        self.groups.push(group);
    }

    /// Detaches a group and hands it to the caller.
    pub(crate) fn remove(&mut self, name: &str) -> Option<RateUpgradeGroup> {
        let pos = self.groups.iter().position(|g| g.name() == name)?;
        Some(self.groups.remove(pos))
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, RateUpgradeGroup> {
        self.groups.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RateUpgradeGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
