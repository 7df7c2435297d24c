//! Per-sequence routing from focus target to action

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Index of an action in the manager's catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub(crate) u32);

impl ActionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Opaque identity of a focusable control, compared by value
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FocusId(Arc<str>);

impl FocusId {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FocusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FocusId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// What a binding points at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Reserved sequence; a real action may replace it silently
    Placeholder,
    Action(ActionId),
}

impl Slot {
    pub fn action(self) -> Option<ActionId> {
        match self {
            Slot::Placeholder => None,
            Slot::Action(id) => Some(id),
        }
    }
}

/// Routing table at a complete binding: focus target → action, plus a
/// default slot used when the focused control has no entry of its own
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionMap {
    targets: HashMap<FocusId, Slot>,
    default: Option<Slot>,
}

impl ActionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a slot for a focus target (`None` is the default slot)
    ///
    /// Returns the conflicting action when a different real action already
    /// occupies the same target. Placeholders never conflict: a real action
    /// replaces a placeholder and a placeholder never replaces anything.
    pub fn insert(&mut self, target: Option<&FocusId>, slot: Slot) -> Result<(), ActionId> {
        let existing = match target {
            Some(focus) => self.targets.get(focus).copied(),
            None => self.default,
        };

        match (existing, slot) {
            (Some(Slot::Action(current)), Slot::Action(new)) if current != new => {
                return Err(current)
            }
            (Some(Slot::Action(_)), _) | (Some(Slot::Placeholder), Slot::Placeholder) => {
                return Ok(())
            }
            _ => {}
        }

        match target {
            Some(focus) => {
                self.targets.insert(focus.clone(), slot);
            }
            None => self.default = Some(slot),
        }
        Ok(())
    }

    /// Pick the action for the focused control, falling back to the default
    /// slot; placeholders resolve to nothing
    pub fn select(&self, focus: Option<&FocusId>) -> Option<ActionId> {
        focus
            .and_then(|f| self.targets.get(f))
            .and_then(|slot| slot.action())
            .or_else(|| self.default.and_then(Slot::action))
    }

    /// True when only placeholders live here
    pub fn is_reserved_only(&self) -> bool {
        self.default.and_then(Slot::action).is_none()
            && self.targets.values().all(|slot| slot.action().is_none())
    }

    /// All (target, action) pairs that hold a real action
    pub fn entries(&self) -> impl Iterator<Item = (Option<&FocusId>, ActionId)> {
        self.default
            .and_then(Slot::action)
            .map(|id| (None, id))
            .into_iter()
            .chain(
                self.targets
                    .iter()
                    .filter_map(|(focus, slot)| slot.action().map(|id| (Some(focus), id))),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAVE: ActionId = ActionId(1);
    const OTHER: ActionId = ActionId(2);

    #[test]
    fn test_default_slot_selected_without_focus_entry() {
        let mut map = ActionMap::new();
        map.insert(None, Slot::Action(SAVE)).unwrap();
        assert_eq!(map.select(None), Some(SAVE));
        assert_eq!(map.select(Some(&FocusId::new("editor"))), Some(SAVE));
    }

    #[test]
    fn test_focus_entry_overrides_default() {
        let chat = FocusId::new("chat");
        let mut map = ActionMap::new();
        map.insert(None, Slot::Action(SAVE)).unwrap();
        map.insert(Some(&chat), Slot::Action(OTHER)).unwrap();
        assert_eq!(map.select(Some(&chat)), Some(OTHER));
        assert_eq!(map.select(Some(&FocusId::new("editor"))), Some(SAVE));
    }

    #[test]
    fn test_targets_never_overwrite_each_other() {
        let editor = FocusId::new("editor");
        let chat = FocusId::new("chat");
        let mut map = ActionMap::new();
        map.insert(Some(&editor), Slot::Action(SAVE)).unwrap();
        map.insert(Some(&chat), Slot::Action(OTHER)).unwrap();
        assert_eq!(map.select(Some(&editor)), Some(SAVE));
        assert_eq!(map.select(Some(&chat)), Some(OTHER));
        assert_eq!(map.select(None), None);
    }

    #[test]
    fn test_same_pair_is_idempotent() {
        let mut map = ActionMap::new();
        map.insert(None, Slot::Action(SAVE)).unwrap();
        assert_eq!(map.insert(None, Slot::Action(SAVE)), Ok(()));
    }

    #[test]
    fn test_real_collision_is_rejected() {
        let mut map = ActionMap::new();
        map.insert(None, Slot::Action(SAVE)).unwrap();
        assert_eq!(map.insert(None, Slot::Action(OTHER)), Err(SAVE));
        assert_eq!(map.select(None), Some(SAVE));
    }

    #[test]
    fn test_placeholder_replaced_silently() {
        let mut map = ActionMap::new();
        map.insert(None, Slot::Placeholder).unwrap();
        assert!(map.is_reserved_only());
        assert_eq!(map.select(None), None);

        map.insert(None, Slot::Action(SAVE)).unwrap();
        assert_eq!(map.select(None), Some(SAVE));

        // A later placeholder never displaces a real action
        map.insert(None, Slot::Placeholder).unwrap();
        assert_eq!(map.select(None), Some(SAVE));
        assert!(!map.is_reserved_only());
    }
}
