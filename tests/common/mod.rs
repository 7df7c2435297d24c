//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use multikey::dispatch::{
    AcceleratorManager, Action, KeyEvent, KeyOutcome, MenuPlacement, SharedFocus, StatusLine,
};
use multikey::keymap::{parse_key_sequence, ActionId, BindingSet, FocusId, Keystroke};

/// One call into a [`ScriptedAction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub action: String,
    pub multiplier: u32,
    /// The key event, for keyboard invocations
    pub event: Option<KeyEvent>,
    /// The choice index, for menu invocations
    pub menu_index: Option<Option<usize>>,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// Configurable action that logs every invocation
pub struct ScriptedAction {
    pub name: String,
    pub bindings: BindingSet,
    pub log: CallLog,
    pub fails: bool,
    /// Only works while this control has focus
    pub only_focus: Option<FocusId>,
    pub menu_capable: bool,
    pub recordable: bool,
    pub coalesce: bool,
    pub placement: Option<MenuPlacement>,
}

impl ScriptedAction {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            bindings: BindingSet::new(),
            log: log.clone(),
            fails: false,
            only_focus: None,
            menu_capable: true,
            recordable: true,
            coalesce: false,
            placement: None,
        }
    }
}

impl Action for ScriptedAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_bindings(&self) -> BindingSet {
        self.bindings.clone()
    }

    fn menu_placement(&self) -> Option<MenuPlacement> {
        self.placement.clone()
    }

    fn works_with_current_focus(&self, focus: Option<&FocusId>) -> bool {
        match &self.only_focus {
            Some(required) => focus == Some(required),
            None => true,
        }
    }

    fn invoke_from_key(&self, event: &KeyEvent, multiplier: u32) -> anyhow::Result<()> {
        self.log.borrow_mut().push(Call {
            action: self.name.clone(),
            multiplier,
            event: Some(*event),
            menu_index: None,
        });
        if self.fails {
            anyhow::bail!("{} exploded", self.name);
        }
        Ok(())
    }

    fn invoke_from_menu(&self, index: Option<usize>, multiplier: u32) -> anyhow::Result<()> {
        if !self.menu_capable {
            anyhow::bail!("{} has no menu form", self.name);
        }
        self.log.borrow_mut().push(Call {
            action: self.name.clone(),
            multiplier,
            event: None,
            menu_index: Some(index),
        });
        Ok(())
    }

    fn is_recordable(&self) -> bool {
        self.recordable
    }

    fn can_coalesce(&self) -> bool {
        self.coalesce
    }
}

/// A manager wired to an inspectable status line and focus slot
pub struct Harness {
    pub manager: AcceleratorManager,
    pub status: StatusLine,
    pub focus: SharedFocus,
    pub log: CallLog,
}

impl Harness {
    pub fn new() -> Self {
        let status = StatusLine::new();
        let focus = SharedFocus::new(None);
        let manager = AcceleratorManager::new(Box::new(status.clone()), Box::new(focus.clone()));
        Self {
            manager,
            status,
            focus,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Register an unbound scripted action
    pub fn action(&mut self, name: &str) -> ActionId {
        let action = self.scripted(name);
        self.register(action)
    }

    /// Register a scripted action bound globally to `keys`
    pub fn bound(&mut self, name: &str, keys: &str) -> ActionId {
        let id = self.action(name);
        self.manager.bind(keys, id).unwrap();
        id
    }

    pub fn register(&mut self, action: ScriptedAction) -> ActionId {
        self.manager.register_action(Rc::new(action)).unwrap()
    }

    pub fn scripted(&self, name: &str) -> ScriptedAction {
        ScriptedAction::new(name, &self.log)
    }

    /// Feed the keystrokes of `keys` one by one, as typed
    pub fn press(&mut self, keys: &str) -> Vec<KeyOutcome> {
        let sequence = parse_key_sequence(keys).unwrap();
        sequence
            .keystrokes()
            .iter()
            .map(|&stroke| self.stroke(stroke))
            .collect()
    }

    /// Outcome of the final keystroke of `keys`
    pub fn press_last(&mut self, keys: &str) -> KeyOutcome {
        *self.press(keys).last().unwrap()
    }

    pub fn stroke(&mut self, stroke: Keystroke) -> KeyOutcome {
        self.manager
            .process_key_down(&KeyEvent::from_keystroke(stroke))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    /// Action names invoked so far, in order
    pub fn names(&self) -> Vec<String> {
        self.log.borrow().iter().map(|c| c.action.clone()).collect()
    }

    pub fn clear_calls(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn status_text(&self) -> String {
        self.status.text()
    }
}

/// Keystroke for a single accelerator token
pub fn key(token: &str) -> Keystroke {
    parse_key_sequence(token).unwrap()[0]
}
