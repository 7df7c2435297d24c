//! Key event dispatch
//!
//! Turns raw key events, characters, menu and toolbar activations into
//! action invocations.
//!
//! # Architecture
//!
//! ```text
//! host event → AcceleratorManager → DispatchState + KeySequenceTrie → Action
//!                                        ↓
//!                                  StatusDisplay, ActionRecorder
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut manager = AcceleratorManager::new(Box::new(status), Box::new(focus));
//! let save = manager.register_action(Rc::new(SaveBuffer))?;
//! manager.bind("C-x C-s", save)?;
//! manager.process_key_down(&KeyEvent::from_keystroke(ctrl_x));
//! ```

mod action;
mod control;
mod event;
mod host;
mod manager;
mod menu;
mod recorder;
mod state;

pub use action::{Action, ActionCatalog, MenuPlacement};
pub use control::{
    DescribeCallback, DescribeKey, DispatchHandle, KeystrokeCallback, QuotedInsert,
};
pub use event::{char_for, KeyEvent};
pub use host::{FocusProvider, NoFocus, NoStatus, SharedFocus, StatusDisplay, StatusLine};
pub use manager::{
    AcceleratorManager, BindingDescription, KeyOutcome, CANCELLED, COMMAND_FAILED,
};
pub use menu::{MenuEntry, MenuId, MenuItem};
pub use recorder::{ActionRecorder, MacroRecorder, RecordSource, RecordedAction};
pub use state::DispatchState;
