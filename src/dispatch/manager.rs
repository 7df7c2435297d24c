//! The accelerator manager: binding registration and the key event state
//! machine
//!
//! Each keystroke passes through three stages in a fixed order:
//!
//! ```text
//! quoted insert → ESC / numeric prefix → multi-key trie walk → default / electric
//! ```
//!
//! The trie is rebuilt lazily: registration calls mark it dirty and the next
//! event (or introspection call) replays placeholders, global bindings,
//! per-control bindings and finally cancel keys into a fresh arena.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::config::DispatchConfig;
use crate::keymap::{
    current_platform_label, join_emacs, placeholder_keystrokes, ActionId,
    DuplicateBinding, FocusId, KeySequence, KeySequenceTrie, KeymapConfig, KeymapError,
    Keystroke, Modifiers, NodeId, ResolvedKeys, Slot,
};

use super::action::{Action, ActionCatalog};
use super::control::{DescribeKey, DispatchHandle, DispatchRequest, QuotedInsert};
use super::event::KeyEvent;
use super::host::{FocusProvider, StatusDisplay};
use super::menu::{MenuEntry, MenuId, MenuItem, MenuRegistry};
use super::recorder::{ActionRecorder, RecordSource, RecordedAction};
use super::state::DispatchState;

/// Status text shown when an action returns an error
pub const COMMAND_FAILED: &str = "Command failed";

/// Status text shown when a cancel key aborts a prefix
pub const CANCELLED: &str = "Cancelled";

/// Result of handing one event to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Absorbed as part of a prefix or numeric argument; waiting for more
    AwaitMore,
    /// An action ran
    Executed(ActionId),
    /// The matched action was reported to a describe callback instead
    Described(ActionId),
    /// The keystroke went to a raw capture callback
    Captured,
    /// A cancel key reset the dispatcher
    Cancelled,
    /// The typed sequence is not bound; state was reset and the key eaten
    Undefined,
    /// The action ran and returned an error
    Failed(ActionId),
    /// Handed to the popup menu callback
    Forwarded,
    /// Not handled; the host should process the event itself
    Propagate,
    /// Modifier-only event, never part of a sequence
    Ignored,
}

impl KeyOutcome {
    /// Whether the host should consider the event handled
    pub fn is_consumed(self) -> bool {
        !matches!(self, KeyOutcome::Propagate | KeyOutcome::Ignored)
    }
}

/// A bound sequence as listed by [`AcceleratorManager::describe_bindings`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BindingDescription {
    pub keys: String,
    /// `None` for the default slot
    pub focus: Option<String>,
    pub action: String,
}

/// Result of the ESC / numeric-prefix stage
enum PrefixStep {
    /// Keystroke was eaten by the sub-machine
    Consumed,
    /// Sticky meta folded ALT into the keystroke
    Meta(Keystroke),
    Continue,
}

type PopupCallback = Box<dyn FnMut(MenuId)>;

/// Public facade of the dispatch engine, one per host frame
pub struct AcceleratorManager {
    catalog: ActionCatalog,
    trie: KeySequenceTrie,
    state: DispatchState,

    platform: String,
    status_column: usize,
    universal: Option<Keystroke>,
    preallocate: bool,

    status: Box<dyn StatusDisplay>,
    status_shown: bool,
    focus: Box<dyn FocusProvider>,

    /// Bindings replayed into the default slot on every rebuild
    globals: Vec<(KeySequence, ActionId)>,
    /// Per-control bindings, replayed after the globals
    controls: Vec<(FocusId, Vec<(KeySequence, ActionId)>)>,
    /// Queued cancel keys, installed last
    cancels: Vec<(KeySequence, Option<ActionId>)>,
    dirty: bool,
    /// Something was removed since the last rebuild, so the live trie may
    /// report conflicts with bindings that no longer exist
    pruned: bool,

    /// Reverse index kept beside the trie: action → its global sequences
    action_keys: HashMap<ActionId, Vec<KeySequence>>,
    /// Actions whose binding set resolved to the `default` token
    native: HashSet<ActionId>,
    menu: MenuRegistry,

    default_key_actions: HashMap<Option<FocusId>, ActionId>,
    electric: HashMap<(Option<FocusId>, char), ActionId>,
    popup: Option<PopupCallback>,

    recorder: Option<Box<dyn ActionRecorder>>,
    last_record: Option<RecordedAction>,
    handle: DispatchHandle,
}

impl AcceleratorManager {
    /// Manager with the default configuration
    pub fn new(status: Box<dyn StatusDisplay>, focus: Box<dyn FocusProvider>) -> Self {
        let cancel = Keystroke::char_with_mods('g', Modifiers::cmd());
        Self {
            catalog: ActionCatalog::new(),
            trie: KeySequenceTrie::new(),
            state: DispatchState::new(),
            platform: current_platform_label().to_string(),
            status_column: 0,
            universal: Some(Keystroke::char_with_mods('u', Modifiers::cmd())),
            preallocate: true,
            status,
            status_shown: false,
            focus,
            globals: Vec::new(),
            controls: Vec::new(),
            cancels: vec![(KeySequence::new(vec![cancel]), None)],
            dirty: true,
            pruned: false,
            action_keys: HashMap::new(),
            native: HashSet::new(),
            menu: MenuRegistry::default(),
            default_key_actions: HashMap::new(),
            electric: HashMap::new(),
            popup: None,
            recorder: None,
            last_record: None,
            handle: DispatchHandle::new(),
        }
    }

    /// Manager configured from a [`DispatchConfig`]
    pub fn with_config(
        config: &DispatchConfig,
        status: Box<dyn StatusDisplay>,
        focus: Box<dyn FocusProvider>,
    ) -> Result<Self, KeymapError> {
        let mut manager = Self::new(status, focus);
        manager.platform = config.platform.clone();
        manager.status_column = config.status_column;
        manager.preallocate = config.preallocate;
        manager.cancels.clear();

        manager.universal = match config.universal_argument.as_deref() {
            None => None,
            Some(text) => {
                let sequence = KeySequence::parse(text)?.fold_sticky_meta();
                match sequence.keystrokes() {
                    [single] => Some(*single),
                    _ => {
                        tracing::warn!(
                            "Universal argument must be a single keystroke, got {:?}; disabled",
                            text
                        );
                        None
                    }
                }
            }
        };

        for key in &config.cancel_keys {
            manager.add_cancel_key(key, None)?;
        }
        Ok(manager)
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Add an action to the catalog and bind its declared accelerators
    ///
    /// If any declared accelerator collides with another action, nothing is
    /// registered or bound and the error is returned.
    pub fn register_action(&mut self, action: Rc<dyn Action>) -> Result<ActionId, KeymapError> {
        let bindings = action.key_bindings();
        let catalog_len = self.catalog.len();
        let id = self.catalog.add(action);
        match bindings.resolve(&self.platform) {
            ResolvedKeys::Native => {
                self.native.insert(id);
            }
            ResolvedKeys::Keys(keys) => {
                let globals = self.globals.clone();
                let action_keys = self.action_keys.get(&id).cloned();
                let was_native = self.native.contains(&id);

                for text in keys {
                    if let Err(e) = self.bind(&text, id) {
                        self.globals = globals;
                        match action_keys {
                            Some(keys) => self.action_keys.insert(id, keys),
                            None => self.action_keys.remove(&id),
                        };
                        if was_native {
                            self.native.insert(id);
                        }
                        self.catalog.truncate(catalog_len);
                        self.dirty = true;
                        self.pruned = true;
                        return Err(e);
                    }
                }
            }
        }
        Ok(id)
    }

    /// Register `quoted-insert` and `describe-key`, wired to this manager
    pub fn register_builtins(&mut self) -> Result<(), KeymapError> {
        self.register_action(Rc::new(QuotedInsert::new(self.handle.clone())))?;
        self.register_action(Rc::new(DescribeKey::new(self.handle.clone())))?;
        Ok(())
    }

    /// Bind an accelerator string globally
    pub fn bind(&mut self, accelerator: &str, action: ActionId) -> Result<(), KeymapError> {
        self.bind_sequence(KeySequence::parse(accelerator)?, action)
    }

    /// Bind a parsed sequence globally
    pub fn bind_sequence(&mut self, sequence: KeySequence, action: ActionId) -> Result<(), KeymapError> {
        let sequence = sequence.fold_sticky_meta();
        self.check_insert(&sequence, None, action)?;

        if !self.globals.contains(&(sequence.clone(), action)) {
            self.globals.push((sequence.clone(), action));
        }
        let keys = self.action_keys.entry(action).or_default();
        if !keys.contains(&sequence) {
            keys.push(sequence);
        }
        self.native.remove(&action);
        self.dirty = true;
        Ok(())
    }

    /// Bind an accelerator for one focus target only
    pub fn bind_focus(
        &mut self,
        focus: &FocusId,
        accelerator: &str,
        action: ActionId,
    ) -> Result<(), KeymapError> {
        let sequence = KeySequence::parse(accelerator)?.fold_sticky_meta();
        self.check_insert(&sequence, Some(focus), action)?;

        let index = match self.controls.iter().position(|(f, _)| f == focus) {
            Some(index) => index,
            None => {
                self.controls.push((focus.clone(), Vec::new()));
                self.controls.len() - 1
            }
        };
        let bindings = &mut self.controls[index].1;
        if !bindings.contains(&(sequence.clone(), action)) {
            bindings.push((sequence, action));
        }
        self.dirty = true;
        Ok(())
    }

    /// Register a control and its bindings, replacing any earlier set for
    /// the same focus target
    ///
    /// On a duplicate binding nothing changes and the error is returned.
    pub fn add_control(
        &mut self,
        focus: FocusId,
        bindings: &[(&str, ActionId)],
    ) -> Result<(), KeymapError> {
        let saved = self.controls.clone();
        self.controls.retain(|(f, _)| *f != focus);
        self.dirty = true;
        self.ensure_ready();

        for (accelerator, action) in bindings {
            if let Err(e) = self.bind_focus(&focus, accelerator, *action) {
                self.controls = saved;
                self.dirty = true;
                self.pruned = true;
                return Err(e);
            }
        }
        tracing::debug!("Added control {} with {} bindings", focus, bindings.len());
        Ok(())
    }

    /// Forget a control's bindings; the trie is rebuilt on next use
    pub fn remove_control(&mut self, focus: &FocusId) {
        self.controls.retain(|(f, _)| f != focus);
        self.default_key_actions.remove(&Some(focus.clone()));
        self.electric.retain(|(f, _), _| f.as_ref() != Some(focus));
        self.dirty = true;
        self.pruned = true;
    }

    /// Queue a cancel key, optionally running `action` after cancelling
    pub fn add_cancel_key(
        &mut self,
        accelerator: &str,
        action: Option<ActionId>,
    ) -> Result<(), KeymapError> {
        let sequence = KeySequence::parse(accelerator)?.fold_sticky_meta();
        self.cancels.retain(|(existing, _)| *existing != sequence);
        self.cancels.push((sequence, action));
        self.dirty = true;
        Ok(())
    }

    /// Remove every queued cancel key
    pub fn clear_cancel_keys(&mut self) {
        self.cancels.clear();
        self.dirty = true;
        self.pruned = true;
    }

    /// Action receiving unbound keystrokes; `None` is the fallback for any
    /// focus without its own
    pub fn set_default_key_action(&mut self, focus: Option<FocusId>, action: ActionId) {
        self.default_key_actions.insert(focus, action);
    }

    pub fn add_electric_char(&mut self, focus: Option<FocusId>, c: char, action: ActionId) {
        self.electric.insert((focus, c), action);
    }

    pub fn add_menu_item(&mut self, id: MenuId, action: ActionId, index: Option<usize>) {
        self.menu.insert(id, MenuEntry { action, index });
    }

    pub fn add_toolbar_item(&mut self, id: MenuId, action: ActionId) {
        self.menu.insert(id, MenuEntry { action, index: None });
    }

    pub fn remove_menu_item(&mut self, id: MenuId) {
        self.menu.remove(id);
    }

    /// Route every menu activation to `callback` while a popup is open
    pub fn set_popup_callback(&mut self, callback: impl FnMut(MenuId) + 'static) {
        self.popup = Some(Box::new(callback));
    }

    pub fn clear_popup_callback(&mut self) {
        self.popup = None;
    }

    pub fn set_recorder(&mut self, recorder: Box<dyn ActionRecorder>) {
        self.recorder = Some(recorder);
    }

    pub fn clear_recorder(&mut self) -> Option<Box<dyn ActionRecorder>> {
        self.recorder.take()
    }

    /// Reserve every common modifier combination with placeholders
    pub fn set_preallocate(&mut self, enabled: bool) {
        self.preallocate = enabled;
        self.dirty = true;
        self.pruned = true;
    }

    /// Apply a keymap file: bindings, cancel keys and electric characters
    ///
    /// Every action named must already be registered.
    pub fn apply_keymap(&mut self, config: &KeymapConfig) -> Result<(), KeymapError> {
        for entry in &config.bindings {
            let action = self.require_action(&entry.action)?;
            match entry.keys.to_binding_set().resolve(&self.platform) {
                ResolvedKeys::Native => {
                    if !self.action_keys.contains_key(&action) {
                        self.native.insert(action);
                    }
                }
                ResolvedKeys::Keys(keys) => {
                    for text in keys {
                        match entry.focus.as_deref() {
                            Some(focus) => self.bind_focus(&FocusId::new(focus), &text, action)?,
                            None => self.bind(&text, action)?,
                        }
                    }
                }
            }
        }

        for entry in &config.cancel {
            let action = match entry.action.as_deref() {
                Some(name) => Some(self.require_action(name)?),
                None => None,
            };
            self.add_cancel_key(&entry.key, action)?;
        }

        for entry in &config.electric {
            let action = self.require_action(&entry.action)?;
            self.add_electric_char(entry.focus.as_deref().map(FocusId::new), entry.char, action);
        }

        tracing::info!(
            "Applied keymap: {} bindings, {} cancel keys, {} electric chars",
            config.bindings.len(),
            config.cancel.len(),
            config.electric.len()
        );
        Ok(())
    }

    fn require_action(&self, name: &str) -> Result<ActionId, KeymapError> {
        self.catalog
            .lookup(name)
            .ok_or_else(|| KeymapError::UnknownAction(name.to_string()))
    }

    /// Insert into the live trie to catch duplicates at registration time
    fn check_insert(
        &mut self,
        sequence: &KeySequence,
        focus: Option<&FocusId>,
        action: ActionId,
    ) -> Result<(), KeymapError> {
        if self.pruned {
            self.ensure_ready();
        }
        match self.trie.insert(sequence, focus, Slot::Action(action)) {
            Ok(_) => Ok(()),
            Err(existing) => {
                let error = self.duplicate(sequence, focus, existing, action);
                tracing::warn!("{}", error);
                Err(error.into())
            }
        }
    }

    fn duplicate(
        &self,
        sequence: &KeySequence,
        focus: Option<&FocusId>,
        existing: ActionId,
        new: ActionId,
    ) -> DuplicateBinding {
        DuplicateBinding {
            sequence: sequence.to_string(),
            target: focus.map_or_else(|| "default".to_string(), |f| f.to_string()),
            existing: self.catalog.name(existing).to_string(),
            new: self.catalog.name(new).to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Trie rebuild
    // ------------------------------------------------------------------

    fn ensure_ready(&mut self) {
        if self.dirty {
            if let Err(conflict) = self.rebuild() {
                tracing::warn!("Rebuild kept the first binding: {}", conflict);
            }
        }
    }

    /// Replay everything into a fresh trie; reports the first conflict
    fn rebuild(&mut self) -> Result<(), DuplicateBinding> {
        self.trie.clear();
        let mut conflicts = Vec::new();

        if self.preallocate {
            for stroke in placeholder_keystrokes() {
                // Placeholders never conflict
                let _ = self.trie.insert(&[stroke], None, Slot::Placeholder);
            }
        }

        for (sequence, action) in &self.globals {
            if let Err(existing) = self.trie.insert(sequence, None, Slot::Action(*action)) {
                conflicts.push((sequence.clone(), None, existing, *action));
            }
        }

        for (focus, bindings) in &self.controls {
            for (sequence, action) in bindings {
                if let Err(existing) = self.trie.insert(sequence, Some(focus), Slot::Action(*action)) {
                    conflicts.push((sequence.clone(), Some(focus.clone()), existing, *action));
                }
            }
        }

        // Multi-keystroke cancels can create new prefix levels, so they go
        // in before the single-keystroke ones
        let mut cancels: Vec<_> = self.cancels.iter().collect();
        cancels.sort_by_key(|(sequence, _)| std::cmp::Reverse(sequence.len()));
        for (sequence, action) in cancels {
            self.trie.install_cancel(sequence, *action);
        }

        self.state.reset();
        self.dirty = false;
        self.pruned = false;
        tracing::debug!(
            "Rebuilt key trie: {} nodes, {} global bindings, {} controls, {} cancel keys",
            self.trie.len(),
            self.globals.len(),
            self.controls.len(),
            self.cancels.len()
        );

        match conflicts.into_iter().next() {
            Some((sequence, focus, existing, new)) => {
                Err(self.duplicate(&sequence, focus.as_ref(), existing, new))
            }
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Event entry points
    // ------------------------------------------------------------------

    /// Handle a key-down event
    pub fn process_key_down(&mut self, event: &KeyEvent) -> KeyOutcome {
        self.ensure_ready();
        self.apply_requests();
        let outcome = self.key_down(event);
        self.apply_requests();
        tracing::trace!("{} -> {:?}", event.keystroke(), outcome);
        outcome
    }

    /// Handle a character from the host's text-input path
    ///
    /// Electric characters are matched here and only here.
    pub fn process_char(&mut self, c: char) -> KeyOutcome {
        self.ensure_ready();
        self.apply_requests();
        let focus = self.focus.current_focus();
        let multiplier = self.state.multiplier();
        self.reset_state();
        let outcome = self.dispatch_character(&KeyEvent::typed(c), multiplier, focus.as_ref());
        self.apply_requests();
        outcome
    }

    /// Handle a menu activation
    pub fn process_menu(&mut self, id: MenuId) -> KeyOutcome {
        self.ensure_ready();
        self.apply_requests();
        let outcome = self.menu_activated(id);
        self.apply_requests();
        outcome
    }

    /// Handle a toolbar button; any prefix in progress is dropped silently
    pub fn process_toolbar(&mut self, id: MenuId) -> KeyOutcome {
        self.ensure_ready();
        self.apply_requests();
        if !self.state.is_initial() {
            tracing::debug!("Toolbar {} cancelled pending prefix", id);
            self.reset_state();
        }
        let outcome = self.invoke_menu_entry(id);
        self.apply_requests();
        outcome
    }

    /// The host closed a menu without choosing anything
    pub fn menu_closed(&mut self) {
        if !self.state.is_initial() {
            self.reset_state();
        }
    }

    /// Run a recorded action again, without recording it
    pub fn replay(&mut self, record: &RecordedAction) -> KeyOutcome {
        self.ensure_ready();
        let Some(action) = self.catalog.get(record.action).cloned() else {
            tracing::warn!("Cannot replay unknown action {:?}", record.action);
            return KeyOutcome::Undefined;
        };
        let outcome = self.invoke(record.action, &action, record.source, record.multiplier, false);
        self.apply_requests();
        outcome
    }

    /// Replay the most recent dispatched action
    pub fn repeat_last(&mut self) -> Option<KeyOutcome> {
        let record = self.last_record.clone()?;
        Some(self.replay(&record))
    }

    fn key_down(&mut self, event: &KeyEvent) -> KeyOutcome {
        if event.is_modifier_only() {
            return KeyOutcome::Ignored;
        }
        let stroke = event.keystroke();

        if let Some(multiplier) = self.state.quoted_next {
            return self.quoted(stroke, multiplier);
        }

        self.process_stroke(event, stroke)
    }

    /// Numeric prefix stage followed by the trie walk
    fn process_stroke(&mut self, event: &KeyEvent, stroke: Keystroke) -> KeyOutcome {
        match self.numeric_prefix(stroke) {
            PrefixStep::Consumed => {
                self.show_pending();
                KeyOutcome::AwaitMore
            }
            // From here on `ESC x` is indistinguishable from `M-x`
            PrefixStep::Meta(folded) => {
                let meta = KeyEvent {
                    key: folded.key,
                    mods: folded.mods,
                    ..*event
                };
                self.multi_key(&meta, folded)
            }
            PrefixStep::Continue => self.multi_key(event, stroke),
        }
    }

    fn quoted(&mut self, stroke: Keystroke, multiplier: u32) -> KeyOutcome {
        let callback = self.state.quoted_raw_callback.take();
        self.reset_state();

        if let Some(callback) = callback {
            tracing::debug!("Captured raw keystroke {}", stroke);
            callback(stroke);
            return KeyOutcome::Captured;
        }

        let focus = self.focus.current_focus();
        let event = KeyEvent::quoted(stroke);
        match self.default_key_action(focus.as_ref()) {
            Some(id) => self.invoke_id(id, RecordSource::Key(event), multiplier.max(1)),
            None => KeyOutcome::Propagate,
        }
    }

    fn numeric_prefix(&mut self, stroke: Keystroke) -> PrefixStep {
        let at_root = self.state.current_node == NodeId::ROOT;

        if self.state.meta_next {
            self.state.meta_next = false;
            if self.is_cancel(stroke) {
                return PrefixStep::Continue;
            }
            return match stroke.plain_digit() {
                Some(digit) if at_root => {
                    self.state.push_prefix(Keystroke::ESC);
                    self.state.push_prefix(stroke);
                    self.state.processing_esc_digit = true;
                    self.state.accumulate(digit);
                    PrefixStep::Consumed
                }
                _ => PrefixStep::Meta(stroke.with_mods(Modifiers::ALT)),
            };
        }

        if at_root && self.universal == Some(stroke) {
            self.state.universal();
            self.state.push_prefix(stroke);
            self.state.processing_esc_digit = true;
            return PrefixStep::Consumed;
        }

        if self.state.processing_esc_digit {
            if let Some(digit) = stroke.plain_digit().or_else(|| stroke.meta_digit()) {
                self.state.accumulate(digit);
                self.state.push_prefix(stroke);
                return PrefixStep::Consumed;
            }
            self.state.processing_esc_digit = false;
        }

        if at_root {
            if let Some(digit) = stroke.meta_digit() {
                self.state.processing_esc_digit = true;
                self.state.accumulate(digit);
                self.state.push_prefix(stroke);
                return PrefixStep::Consumed;
            }
        }

        // A bare ESC arms sticky meta unless it extends the current prefix
        if stroke == Keystroke::ESC
            && (at_root || self.trie.child(self.state.current_node, stroke).is_none())
        {
            self.state.meta_next = true;
            return PrefixStep::Consumed;
        }

        PrefixStep::Continue
    }

    fn is_cancel(&self, stroke: Keystroke) -> bool {
        self.trie
            .child(self.state.current_node, stroke)
            .is_some_and(|child| self.trie.cancel(child).is_some())
    }

    fn multi_key(&mut self, event: &KeyEvent, stroke: Keystroke) -> KeyOutcome {
        let node = self.state.current_node;
        let focus = self.focus.current_focus();

        if let Some(child) = self.trie.child(node, stroke) {
            if let Some(action) = self.trie.cancel(child) {
                return self.cancel(event, action);
            }

            if self.trie.has_children(child) {
                self.state.current_node = child;
                self.state.pending_keystrokes.push(stroke);
                self.show_pending();
                tracing::debug!("Prefix {} absorbed", join_emacs(self.state.command_keystrokes()));
                return KeyOutcome::AwaitMore;
            }

            if let Some(action) = self.trie.select(child, focus.as_ref()) {
                self.state.pending_keystrokes.push(stroke);
                return self.complete(action, event, focus.as_ref());
            }
        }

        if node == NodeId::ROOT {
            let multiplier = self.state.multiplier();
            self.reset_state();
            return self.dispatch_character(event, multiplier, focus.as_ref());
        }

        // A complete binding that is also a prefix fires when the next
        // keystroke doesn't extend it; the keystroke then starts over
        if let Some(action) = self.trie.select(node, focus.as_ref()) {
            let last = self
                .state
                .pending_keystrokes
                .last()
                .copied()
                .unwrap_or(stroke);
            self.complete(action, &KeyEvent::synthetic(last), focus.as_ref());
            self.apply_requests();
            return self.process_stroke(event, stroke);
        }

        let mut keys = self.state.command_keystrokes().to_vec();
        keys.push(stroke);
        self.undefined(&keys)
    }

    fn undefined(&mut self, keys: &[Keystroke]) -> KeyOutcome {
        let text = format!("{} not defined", join_emacs(keys));
        tracing::debug!("{}", text);
        self.state.reset();
        self.set_status(&text);
        KeyOutcome::Undefined
    }

    fn cancel(&mut self, event: &KeyEvent, action: Option<ActionId>) -> KeyOutcome {
        tracing::debug!(
            "Cancelled prefix {:?}",
            join_emacs(self.state.command_keystrokes())
        );
        self.state.reset();
        self.set_status(CANCELLED);

        if let Some(id) = action {
            if let Some(action) = self.catalog.get(id).cloned() {
                if let Err(e) = action.invoke_from_key(event, 1) {
                    tracing::error!("Cancel action {} failed: {:#}", action.name(), e);
                }
            }
        }
        KeyOutcome::Cancelled
    }

    fn complete(&mut self, id: ActionId, event: &KeyEvent, focus: Option<&FocusId>) -> KeyOutcome {
        let Some(action) = self.catalog.get(id).cloned() else {
            self.reset_state();
            return KeyOutcome::Undefined;
        };

        if let Some(report) = self.state.report_next.take() {
            let keys = KeySequence::new(self.state.command_keystrokes().to_vec());
            self.reset_state();
            report(action.as_ref(), &keys);
            return KeyOutcome::Described(id);
        }

        if !action.works_with_current_focus(focus) {
            tracing::debug!(
                "{} declined focus {:?}; propagating",
                action.name(),
                focus.map(FocusId::as_str)
            );
            self.reset_state();
            return KeyOutcome::Propagate;
        }

        let multiplier = self.state.multiplier();
        self.reset_state();
        self.invoke(id, &action, RecordSource::Key(*event), multiplier, true)
    }

    /// Electric character, else the default key action, else propagate
    fn dispatch_character(
        &mut self,
        event: &KeyEvent,
        multiplier: u32,
        focus: Option<&FocusId>,
    ) -> KeyOutcome {
        let typed = !(event.mods.ctrl() || event.mods.alt() || event.mods.cmd_held());
        let electric = event.unicode.filter(|_| typed).and_then(|c| {
            self.electric
                .get(&(focus.cloned(), c))
                .or_else(|| self.electric.get(&(None, c)))
                .copied()
        });

        let Some(id) = electric.or_else(|| self.default_key_action(focus)) else {
            return KeyOutcome::Propagate;
        };

        match self.catalog.get(id).cloned() {
            Some(action) if action.works_with_current_focus(focus) => {
                self.invoke(id, &action, RecordSource::Key(*event), multiplier, true)
            }
            _ => KeyOutcome::Propagate,
        }
    }

    fn default_key_action(&self, focus: Option<&FocusId>) -> Option<ActionId> {
        focus
            .and_then(|f| self.default_key_actions.get(&Some(f.clone())))
            .or_else(|| self.default_key_actions.get(&None))
            .copied()
    }

    fn menu_activated(&mut self, id: MenuId) -> KeyOutcome {
        if let Some(popup) = self.popup.as_mut() {
            popup(id);
            return KeyOutcome::Forwarded;
        }

        let Some(entry) = self.menu.get(id) else {
            tracing::warn!("Menu activation for unknown id {}", id);
            return KeyOutcome::Propagate;
        };

        if self.state.current_node != NodeId::ROOT {
            if let Some(strokes) = self.menu_keystrokes(entry.action) {
                tracing::debug!("Menu {} continues prefix with {}", id, join_emacs(&strokes));
                let mut outcome = KeyOutcome::AwaitMore;
                for stroke in strokes {
                    outcome = self.process_stroke(&KeyEvent::synthetic(stroke), stroke);
                    if outcome != KeyOutcome::AwaitMore {
                        break;
                    }
                }
                return outcome;
            }
            self.reset_state();
        }

        self.invoke_menu_entry(id)
    }

    /// Keystrokes that finish the action's binding from the current
    /// prefix, or its first keystroke when the prefix doesn't lead there
    fn menu_keystrokes(&self, action: ActionId) -> Option<Vec<Keystroke>> {
        let sequence = self.key_sequence_for(action)?;
        let typed = self.state.command_keystrokes();
        if sequence.len() > typed.len() && sequence.starts_with(typed) {
            Some(sequence[typed.len()..].to_vec())
        } else {
            sequence.first().map(|stroke| vec![*stroke])
        }
    }

    fn invoke_menu_entry(&mut self, id: MenuId) -> KeyOutcome {
        let Some(entry) = self.menu.get(id) else {
            tracing::warn!("Activation for unknown menu/toolbar id {}", id);
            return KeyOutcome::Propagate;
        };
        let Some(action) = self.catalog.get(entry.action).cloned() else {
            return KeyOutcome::Propagate;
        };

        let focus = self.focus.current_focus();
        let multiplier = self.state.multiplier();
        self.reset_state();

        if action.works_with_current_focus(focus.as_ref()) {
            return self.invoke(entry.action, &action, RecordSource::Menu(entry.index), multiplier, true);
        }

        match self.keystroke_for(entry.action) {
            Some(stroke) => {
                let event = KeyEvent::synthetic(stroke);
                self.invoke(entry.action, &action, RecordSource::Key(event), multiplier, true)
            }
            None => KeyOutcome::Propagate,
        }
    }

    fn invoke_id(&mut self, id: ActionId, source: RecordSource, multiplier: u32) -> KeyOutcome {
        match self.catalog.get(id).cloned() {
            Some(action) => self.invoke(id, &action, source, multiplier, true),
            None => KeyOutcome::Propagate,
        }
    }

    fn invoke(
        &mut self,
        id: ActionId,
        action: &Rc<dyn Action>,
        source: RecordSource,
        multiplier: u32,
        record: bool,
    ) -> KeyOutcome {
        let multiplier = multiplier.max(1);
        let result = match source {
            RecordSource::Key(event) => action.invoke_from_key(&event, multiplier),
            RecordSource::Menu(index) => action.invoke_from_menu(index, multiplier),
        };

        match result {
            Ok(()) => {
                tracing::debug!("Dispatched {} x{}", action.name(), multiplier);
                if record {
                    self.record(id, action, source, multiplier);
                }
                KeyOutcome::Executed(id)
            }
            Err(e) => {
                tracing::error!("{} failed: {:#}", action.name(), e);
                self.state.reset();
                self.set_status(COMMAND_FAILED);
                KeyOutcome::Failed(id)
            }
        }
    }

    fn record(&mut self, id: ActionId, action: &Rc<dyn Action>, source: RecordSource, multiplier: u32) {
        if !action.is_recordable() {
            return;
        }
        let record = RecordedAction {
            action: id,
            name: action.name().to_string(),
            source,
            multiplier,
            coalescable: action.can_coalesce(),
        };
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(&record);
        }
        self.last_record = Some(record);
    }

    fn apply_requests(&mut self) {
        for request in self.handle.drain() {
            match request {
                DispatchRequest::QuotedInsert(multiplier) => {
                    self.state.quoted_next = Some(multiplier.max(1));
                }
                DispatchRequest::CaptureKeystroke(callback) => {
                    self.state.quoted_next = Some(1);
                    self.state.quoted_raw_callback = Some(callback);
                }
                DispatchRequest::DescribeNext(callback) => {
                    self.state.report_next = Some(callback);
                }
                DispatchRequest::Status(text) => self.set_status(&text),
            }
        }
    }

    // ------------------------------------------------------------------
    // Status display
    // ------------------------------------------------------------------

    fn set_status(&mut self, text: &str) {
        self.status.set_status_text(text, self.status_column);
        self.status_shown = !text.is_empty();
    }

    fn clear_status(&mut self) {
        if self.status_shown {
            self.set_status("");
        }
    }

    fn reset_state(&mut self) {
        self.state.reset();
        self.clear_status();
    }

    fn show_pending(&mut self) {
        let mut text = join_emacs(&self.state.pending_keystrokes);
        if self.state.meta_next {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str("ESC");
        }
        self.set_status(&text);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn action_id(&self, name: &str) -> Option<ActionId> {
        self.catalog.lookup(name)
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Handle actions use to talk back to this manager
    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// The trie, rebuilt first if registrations are pending
    pub fn key_trie(&mut self) -> &KeySequenceTrie {
        self.ensure_ready();
        &self.trie
    }

    pub fn last_record(&self) -> Option<&RecordedAction> {
        self.last_record.as_ref()
    }

    /// First global sequence bound to an action
    pub fn key_sequence_for(&self, action: ActionId) -> Option<&KeySequence> {
        self.action_keys.get(&action).and_then(|keys| keys.first())
    }

    /// Last keystroke of the action's first binding, used for synthetic
    /// events
    pub fn keystroke_for(&self, action: ActionId) -> Option<Keystroke> {
        self.key_sequence_for(action)
            .and_then(|sequence| sequence.last().copied())
    }

    pub fn menu_id_for(&self, action: ActionId) -> Option<MenuId> {
        self.menu.id_for(action)
    }

    /// Menu accelerator text; `None` for unbound actions and for actions
    /// deferring to the platform's native binding
    pub fn accelerator_text(&self, action: ActionId) -> Option<String> {
        if self.native.contains(&action) {
            return None;
        }
        self.key_sequence_for(action)
            .map(KeySequence::accelerator_text)
    }

    /// Menu items for every action with a placement, sorted by path then by
    /// the absolute ordering key
    pub fn menu_layout(&self) -> Vec<MenuItem> {
        let mut items: Vec<MenuItem> = self
            .catalog
            .iter()
            .filter_map(|(id, action)| {
                let placement = action.menu_placement()?;
                Some(MenuItem {
                    separator_before: placement.separator_before(),
                    path: placement.path,
                    label: action.name().to_string(),
                    action: id,
                    order: placement.order,
                    icon: placement.icon,
                    accelerator: self.accelerator_text(id),
                })
            })
            .collect();
        items.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then(a.order.unsigned_abs().cmp(&b.order.unsigned_abs()))
                .then(a.label.cmp(&b.label))
        });
        items
    }

    /// Every real binding in the trie, sorted by key text
    pub fn describe_bindings(&mut self) -> Vec<BindingDescription> {
        self.ensure_ready();
        let mut out: Vec<BindingDescription> = self
            .trie
            .bindings()
            .into_iter()
            .flat_map(|(keys, map)| {
                let text = join_emacs(&keys);
                map.entries()
                    .map(|(focus, id)| BindingDescription {
                        keys: text.clone(),
                        focus: focus.map(|f| f.to_string()),
                        action: self.catalog.name(id).to_string(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        out.sort();
        out
    }

    /// Start a quoted insert as if `quoted-insert` had run
    pub fn begin_quoted_insert(&mut self, multiplier: u32) {
        self.ensure_ready();
        self.state.quoted_next = Some(multiplier.max(1));
    }

    /// Deliver the next raw keystroke to `callback`
    pub fn capture_next_keystroke(&mut self, callback: impl FnOnce(Keystroke) + 'static) {
        self.ensure_ready();
        self.state.quoted_next = Some(1);
        self.state.quoted_raw_callback = Some(Box::new(callback));
    }

    /// Report the next matched action to `callback` instead of running it
    pub fn describe_next(&mut self, callback: impl FnOnce(&dyn Action, &KeySequence) + 'static) {
        self.ensure_ready();
        self.state.report_next = Some(Box::new(callback));
    }
}

impl std::fmt::Debug for AcceleratorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceleratorManager")
            .field("platform", &self.platform)
            .field("actions", &self.catalog.len())
            .field("nodes", &self.trie.len())
            .field("state", &self.state)
            .finish()
    }
}
