//! Menu and toolbar ids and the items built from action placements

use std::collections::HashMap;
use std::fmt;

use crate::keymap::ActionId;

/// Host-assigned id of a menu item or toolbar button
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuId(pub u32);

impl fmt::Display for MenuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a menu id runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MenuEntry {
    pub action: ActionId,
    /// Position within a choice group, for list-style actions
    pub index: Option<usize>,
}

/// Bidirectional map between menu ids and actions
#[derive(Debug, Default)]
pub(crate) struct MenuRegistry {
    by_id: HashMap<MenuId, MenuEntry>,
    by_action: HashMap<ActionId, MenuId>,
}

impl MenuRegistry {
    pub fn insert(&mut self, id: MenuId, entry: MenuEntry) {
        if let Some(old) = self.by_id.insert(id, entry) {
            if self.by_action.get(&old.action) == Some(&id) {
                self.by_action.remove(&old.action);
            }
        }
        // The first id registered for an action is the one advertised
        self.by_action.entry(entry.action).or_insert(id);
    }

    pub fn remove(&mut self, id: MenuId) -> Option<MenuEntry> {
        let entry = self.by_id.remove(&id)?;
        if self.by_action.get(&entry.action) == Some(&id) {
            self.by_action.remove(&entry.action);
            if let Some((&other, _)) = self
                .by_id
                .iter()
                .filter(|(_, e)| e.action == entry.action)
                .min_by_key(|(id, _)| **id)
            {
                self.by_action.insert(entry.action, other);
            }
        }
        Some(entry)
    }

    pub fn get(&self, id: MenuId) -> Option<MenuEntry> {
        self.by_id.get(&id).copied()
    }

    pub fn id_for(&self, action: ActionId) -> Option<MenuId> {
        self.by_action.get(&action).copied()
    }
}

/// One item of the menu bar as the host should build it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub path: String,
    pub label: String,
    pub action: ActionId,
    pub order: i32,
    pub separator_before: bool,
    pub icon: Option<String>,
    /// Accelerator text to show next to the label
    pub accelerator: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAVE: ActionId = ActionId(0);
    const QUIT: ActionId = ActionId(1);

    #[test]
    fn test_lookup_both_ways() {
        let mut registry = MenuRegistry::default();
        registry.insert(MenuId(100), MenuEntry { action: SAVE, index: None });
        registry.insert(MenuId(101), MenuEntry { action: QUIT, index: None });
        assert_eq!(registry.get(MenuId(100)).map(|e| e.action), Some(SAVE));
        assert_eq!(registry.id_for(QUIT), Some(MenuId(101)));
        assert_eq!(registry.get(MenuId(7)), None);
    }

    #[test]
    fn test_first_id_is_advertised() {
        let mut registry = MenuRegistry::default();
        registry.insert(MenuId(5), MenuEntry { action: SAVE, index: Some(0) });
        registry.insert(MenuId(6), MenuEntry { action: SAVE, index: Some(1) });
        assert_eq!(registry.id_for(SAVE), Some(MenuId(5)));

        registry.remove(MenuId(5));
        assert_eq!(registry.id_for(SAVE), Some(MenuId(6)));
    }

    #[test]
    fn test_reassigning_an_id() {
        let mut registry = MenuRegistry::default();
        registry.insert(MenuId(5), MenuEntry { action: SAVE, index: None });
        registry.insert(MenuId(5), MenuEntry { action: QUIT, index: None });
        assert_eq!(registry.id_for(SAVE), None);
        assert_eq!(registry.id_for(QUIT), Some(MenuId(5)));
    }
}
