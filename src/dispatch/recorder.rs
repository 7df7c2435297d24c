//! Recording dispatched actions and playing them back

use std::cell::RefCell;
use std::rc::Rc;

use crate::keymap::ActionId;

use super::event::KeyEvent;
use super::manager::{AcceleratorManager, KeyOutcome};

/// What triggered a dispatched action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Key(KeyEvent),
    /// Menu or toolbar item, with the choice-group index if any
    Menu(Option<usize>),
}

/// One dispatched action as seen by a recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAction {
    pub action: ActionId,
    pub name: String,
    pub source: RecordSource,
    pub multiplier: u32,
    pub coalescable: bool,
}

/// Observer told about every recordable action the dispatcher runs
pub trait ActionRecorder {
    fn record(&mut self, record: &RecordedAction);
}

/// Keyboard macro: an in-memory list of records that can be replayed
///
/// Cloning gives another handle to the same macro, so one clone can be
/// attached to the dispatcher while the host keeps the other.
#[derive(Debug, Clone, Default)]
pub struct MacroRecorder {
    records: Rc<RefCell<Vec<RecordedAction>>>,
}

impl MacroRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn records(&self) -> Vec<RecordedAction> {
        self.records.borrow().clone()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }

    /// One-line description, e.g. `3 actions: forward-char, kill-line, yank`
    pub fn summary(&self) -> String {
        let records = self.records.borrow();
        match records.len() {
            0 => "Empty macro".to_string(),
            1 => format!("1 action: {}", records[0].name),
            n => format!(
                "{} actions: {}",
                n,
                records
                    .iter()
                    .map(|r| r.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// One line per record with its trigger and multiplier
    pub fn details(&self) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .map(|record| {
                let trigger = match record.source {
                    RecordSource::Key(event) => event.keystroke().emacs_string(),
                    RecordSource::Menu(Some(index)) => format!("menu item #{}", index),
                    RecordSource::Menu(None) => "menu".to_string(),
                };
                format!("{} x{} ({})", record.name, record.multiplier, trigger)
            })
            .collect()
    }

    /// Replay every record through `manager`, `times` times over
    ///
    /// Returns the number of actions that ran successfully; stops at the
    /// first failure.
    pub fn playback(&self, manager: &mut AcceleratorManager, times: u32) -> anyhow::Result<usize> {
        let records = self.records();
        let mut ran = 0;
        for _ in 0..times.max(1) {
            for record in &records {
                match manager.replay(record) {
                    KeyOutcome::Executed(_) => ran += 1,
                    other => anyhow::bail!("playback of {} stopped: {:?}", record.name, other),
                }
            }
        }
        tracing::debug!("Played back {} actions", ran);
        Ok(ran)
    }
}

impl ActionRecorder for MacroRecorder {
    fn record(&mut self, record: &RecordedAction) {
        let mut records = self.records.borrow_mut();
        if let Some(last) = records.last_mut() {
            if last.coalescable
                && record.coalescable
                && last.action == record.action
                && last.source == record.source
                && matches!(record.source, RecordSource::Key(_))
            {
                last.multiplier = last.multiplier.saturating_add(record.multiplier);
                return;
            }
        }
        records.push(record.clone());
    }
}
