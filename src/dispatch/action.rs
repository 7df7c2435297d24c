//! The action contract and the catalog the dispatcher resolves ids against

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::keymap::{ActionId, BindingSet, FocusId};

use super::event::KeyEvent;

/// Something a key sequence, menu item or toolbar button can run
///
/// Actions are owned by the host; the dispatcher only keeps shared handles.
/// The multiplier passed to either invoke method is always at least 1.
pub trait Action {
    /// Unique, human-readable name such as `save-buffer`
    fn name(&self) -> &str;

    /// Accelerators per platform label, bound when the action is registered
    fn key_bindings(&self) -> BindingSet {
        BindingSet::new()
    }

    /// Where the action appears in the menu bar, if anywhere
    fn menu_placement(&self) -> Option<MenuPlacement> {
        None
    }

    /// Whether the action may fire with this control focused
    ///
    /// Returning false lets the keystroke fall through to the host.
    fn works_with_current_focus(&self, _focus: Option<&FocusId>) -> bool {
        true
    }

    fn invoke_from_key(&self, event: &KeyEvent, multiplier: u32) -> anyhow::Result<()>;

    /// Run from a menu item; `index` selects within a choice group
    fn invoke_from_menu(&self, _index: Option<usize>, _multiplier: u32) -> anyhow::Result<()> {
        anyhow::bail!("{} cannot be run from a menu", self.name())
    }

    /// Whether macro recorders should see this action
    fn is_recordable(&self) -> bool {
        true
    }

    /// Whether consecutive identical invocations may be merged into one
    /// record with the multipliers summed
    fn can_coalesce(&self) -> bool {
        false
    }
}

/// Menu metadata: slash-separated path, ordering key and optional icon
///
/// A negative order asks for a separator before the item; items sort by the
/// absolute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuPlacement {
    pub path: String,
    pub order: i32,
    pub icon: Option<String>,
}

impl MenuPlacement {
    pub fn new(path: &str, order: i32) -> Self {
        Self {
            path: path.to_string(),
            order,
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn separator_before(&self) -> bool {
        self.order < 0
    }
}

/// Every registered action, addressable by [`ActionId`] and by name
#[derive(Default)]
pub struct ActionCatalog {
    actions: Vec<Rc<dyn Action>>,
    by_name: HashMap<String, ActionId>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action; registering the same handle twice returns its first id
    pub fn add(&mut self, action: Rc<dyn Action>) -> ActionId {
        if let Some(existing) = self
            .actions
            .iter()
            .position(|known| Rc::ptr_eq(known, &action))
        {
            return ActionId(existing as u32);
        }

        let id = ActionId(self.actions.len() as u32);
        let name = action.name().to_string();
        if let Some(previous) = self.by_name.insert(name.clone(), id) {
            tracing::warn!(
                "Action name {:?} registered twice; lookups now resolve to the newer one (was {:?})",
                name,
                previous
            );
        }
        self.actions.push(action);
        id
    }

    /// Drop every action from `len` on, restoring name lookups to the
    /// newest remaining action of each dropped name
    pub(crate) fn truncate(&mut self, len: usize) {
        if len >= self.actions.len() {
            return;
        }
        for action in self.actions.split_off(len) {
            let name = action.name();
            match self.actions.iter().rposition(|a| a.name() == name) {
                Some(index) => {
                    self.by_name.insert(name.to_string(), ActionId(index as u32));
                }
                None => {
                    self.by_name.remove(name);
                }
            }
        }
    }

    pub fn get(&self, id: ActionId) -> Option<&Rc<dyn Action>> {
        self.actions.get(id.index())
    }

    pub fn lookup(&self, name: &str) -> Option<ActionId> {
        self.by_name.get(name).copied()
    }

    /// Name of an action, or `?` for an id this catalog never issued
    pub fn name(&self, id: ActionId) -> &str {
        self.get(id).map(|action| action.name()).unwrap_or("?")
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionId, &Rc<dyn Action>)> {
        self.actions
            .iter()
            .enumerate()
            .map(|(i, action)| (ActionId(i as u32), action))
    }
}

impl fmt::Debug for ActionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.actions.iter().map(|action| action.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Action for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn invoke_from_key(&self, _event: &KeyEvent, _multiplier: u32) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_catalog_lookup() {
        let mut catalog = ActionCatalog::new();
        let save = catalog.add(Rc::new(Named("save")));
        let quit = catalog.add(Rc::new(Named("quit")));
        assert_ne!(save, quit);
        assert_eq!(catalog.lookup("save"), Some(save));
        assert_eq!(catalog.name(quit), "quit");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_same_handle_added_once() {
        let mut catalog = ActionCatalog::new();
        let action: Rc<dyn Action> = Rc::new(Named("save"));
        let first = catalog.add(action.clone());
        let second = catalog.add(action);
        assert_eq!(first, second);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_truncate_restores_shadowed_name() {
        let mut catalog = ActionCatalog::new();
        let first = catalog.add(Rc::new(Named("save")));
        catalog.add(Rc::new(Named("save")));
        catalog.add(Rc::new(Named("quit")));

        catalog.truncate(1);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup("save"), Some(first));
        assert_eq!(catalog.lookup("quit"), None);
    }

    #[test]
    fn test_default_menu_invocation_fails() {
        let action = Named("save");
        assert!(action.invoke_from_menu(None, 1).is_err());
        assert!(action.is_recordable());
        assert!(!action.can_coalesce());
    }

    #[test]
    fn test_menu_placement_separator() {
        assert!(MenuPlacement::new("File", -10).separator_before());
        assert!(!MenuPlacement::new("File", 10).separator_before());
        let placed = MenuPlacement::new("Edit/Transform", 5).with_icon("icons/upcase.png");
        assert_eq!(placed.icon.as_deref(), Some("icons/upcase.png"));
    }
}
