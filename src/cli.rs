//! Command-line front end: load a keymap and feed it keystrokes
//!
//! Supports:
//! - Listing every binding a keymap produces (`--list`)
//! - Replaying accelerator text through the dispatcher (`--keys "C-x C-s"`)
//! - Choosing the platform label and the focused control

use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;

use crate::config::DispatchConfig;
use crate::dispatch::{
    AcceleratorManager, Action, KeyEvent, KeyOutcome, SharedFocus, StatusLine,
};
use crate::keymap::{
    load_default_keymap, load_keymap_file, parse_key_sequence, FocusId, KeymapConfig,
};

/// Inspect and exercise multi-keystroke keymaps
#[derive(Parser, Debug, Default)]
#[command(
    name = "multikey",
    version,
    about = "Inspect and exercise multi-keystroke keymaps"
)]
pub struct CliArgs {
    /// Keymap file to load instead of the default and user keymaps
    #[arg(short = 'k', long, value_name = "PATH")]
    pub keymap: Option<PathBuf>,

    /// Platform label used to resolve per-platform bindings (mac, win, gtk, ...)
    #[arg(short = 'p', long, value_name = "LABEL")]
    pub platform: Option<String>,

    /// Name of the focused control while dispatching
    #[arg(short = 'f', long, value_name = "NAME")]
    pub focus: Option<String>,

    /// Keystrokes to dispatch, e.g. "C-u 3 C-x o"
    #[arg(long, value_name = "KEYS")]
    pub keys: Option<String>,

    /// List every binding, sorted by key sequence
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Console log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Action that logs each invocation, standing in for a host command
struct EchoAction {
    name: String,
    log: Rc<RefCell<Vec<String>>>,
}

impl Action for EchoAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke_from_key(&self, event: &KeyEvent, multiplier: u32) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!(
            "{} x{} ({})",
            self.name,
            multiplier,
            event.keystroke()
        ));
        Ok(())
    }

    fn invoke_from_menu(&self, _index: Option<usize>, multiplier: u32) -> anyhow::Result<()> {
        self.log
            .borrow_mut()
            .push(format!("{} x{} (menu)", self.name, multiplier));
        Ok(())
    }
}

/// Run the CLI, writing its report to `out`
pub fn run(args: &CliArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let mut config = DispatchConfig::load();
    if let Some(platform) = &args.platform {
        config.platform = platform.clone();
    }

    let keymap = match &args.keymap {
        Some(path) => load_keymap_file(path)
            .with_context(|| format!("Failed to load keymap {}", path.display()))?,
        None => load_default_keymap(),
    };

    let status = StatusLine::new();
    let focus = SharedFocus::new(args.focus.as_deref().map(FocusId::new));
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut manager = build_manager(&config, &keymap, status.clone(), focus, log.clone())?;

    if args.list {
        for binding in manager.describe_bindings() {
            match &binding.focus {
                Some(focus) => writeln!(out, "{:<20} {} [{}]", binding.keys, binding.action, focus)?,
                None => writeln!(out, "{:<20} {}", binding.keys, binding.action)?,
            }
        }
    }

    if let Some(keys) = &args.keys {
        let sequence = parse_key_sequence(keys)
            .with_context(|| format!("Invalid key sequence {:?}", keys))?;

        for &stroke in sequence.keystrokes() {
            let outcome = manager.process_key_down(&KeyEvent::from_keystroke(stroke));
            writeln!(
                out,
                "{:<12} {:<24} {:?}",
                stroke.to_string(),
                describe_outcome(&manager, outcome),
                status.text()
            )?;
            for line in log.borrow_mut().drain(..) {
                writeln!(out, "  -> {}", line)?;
            }
        }
    }

    Ok(())
}

/// Manager with the built-in actions, an echo action for every other name
/// the keymap mentions, and the keymap applied
fn build_manager(
    config: &DispatchConfig,
    keymap: &KeymapConfig,
    status: StatusLine,
    focus: SharedFocus,
    log: Rc<RefCell<Vec<String>>>,
) -> anyhow::Result<AcceleratorManager> {
    let mut manager = AcceleratorManager::with_config(config, Box::new(status), Box::new(focus))?;
    manager.register_builtins()?;

    for name in keymap.action_names() {
        if manager.action_id(name).is_none() {
            manager.register_action(Rc::new(EchoAction {
                name: name.to_string(),
                log: log.clone(),
            }))?;
        }
    }

    manager.apply_keymap(keymap)?;
    Ok(manager)
}

fn describe_outcome(manager: &AcceleratorManager, outcome: KeyOutcome) -> String {
    let name = |id| manager.catalog().name(id).to_string();
    match outcome {
        KeyOutcome::AwaitMore => "...".to_string(),
        KeyOutcome::Executed(id) => format!("ran {}", name(id)),
        KeyOutcome::Described(id) => format!("described {}", name(id)),
        KeyOutcome::Failed(id) => format!("failed {}", name(id)),
        KeyOutcome::Captured => "captured".to_string(),
        KeyOutcome::Cancelled => "cancelled".to_string(),
        KeyOutcome::Undefined => "undefined".to_string(),
        KeyOutcome::Forwarded => "forwarded".to_string(),
        KeyOutcome::Propagate => "not handled".to_string(),
        KeyOutcome::Ignored => "ignored".to_string(),
    }
}
