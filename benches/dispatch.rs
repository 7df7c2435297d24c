//! Benchmarks for the key dispatch hot paths
//!
//! - Accelerator parsing, through the cache and token by token
//! - Keystroke dispatch through multi-key prefixes
//! - Trie rebuild after registration changes
//!
//! Run with: cargo bench dispatch

use std::rc::Rc;

use multikey::dispatch::{AcceleratorManager, Action, KeyEvent, NoFocus, NoStatus};
use multikey::keymap::{parse_key_sequence, parse_keystroke, Keystroke};

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

fn main() {
    divan::main();
}

struct Noop(String);

impl Action for Noop {
    fn name(&self) -> &str {
        &self.0
    }

    fn invoke_from_key(&self, _event: &KeyEvent, _multiplier: u32) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Manager with up to 520 actions bound as `C-x <digit> <letter>`, then
/// under `C-c`
fn manager_with(count: usize) -> AcceleratorManager {
    let mut manager = AcceleratorManager::new(Box::new(NoStatus), Box::new(NoFocus));
    for i in 0..count {
        let id = manager
            .register_action(Rc::new(Noop(format!("action-{}", i))))
            .unwrap();
        let prefix = if i < 260 { "C-x" } else { "C-c" };
        let letter = (b'a' + (i % 26) as u8) as char;
        let keys = format!("{} {} {}", prefix, (i % 260) / 26, letter);
        manager.bind(&keys, id).unwrap();
    }
    manager
}

fn strokes(keys: &str) -> Vec<Keystroke> {
    parse_key_sequence(keys).unwrap().keystrokes().to_vec()
}

// ============================================================================
// Parsing
// ============================================================================

const ACCELERATORS: &[&str] = &[
    "C-x C-s",
    "C-x 4 C-f",
    "M-g g",
    "S-C-M-F5",
    "Ctrl+Shift+Tab",
    "ESC ESC ESC",
];

#[divan::bench]
fn parse_cached() {
    for text in ACCELERATORS {
        divan::black_box(parse_key_sequence(divan::black_box(text)).unwrap());
    }
}

#[divan::bench]
fn parse_tokens_uncached() {
    for text in ACCELERATORS {
        for token in divan::black_box(text).split_whitespace() {
            divan::black_box(parse_keystroke(token));
        }
    }
}

#[divan::bench]
fn format_emacs() {
    let sequences: Vec<_> = ACCELERATORS
        .iter()
        .map(|text| parse_key_sequence(text).unwrap())
        .collect();
    for sequence in &sequences {
        divan::black_box(sequence.to_string());
    }
}

// ============================================================================
// Dispatch
// ============================================================================

#[divan::bench(args = [10, 100, 500])]
fn dispatch_three_key_sequence(bencher: divan::Bencher, count: usize) {
    let mut manager = manager_with(count);
    manager.key_trie();
    let events: Vec<KeyEvent> = strokes("C-x 0 a")
        .into_iter()
        .map(KeyEvent::from_keystroke)
        .collect();

    bencher.bench_local(|| {
        for event in &events {
            divan::black_box(manager.process_key_down(event));
        }
    });
}

#[divan::bench]
fn dispatch_with_numeric_prefix(bencher: divan::Bencher) {
    let mut manager = manager_with(100);
    manager.key_trie();
    let events: Vec<KeyEvent> = strokes("M-4 2 C-x 1 b")
        .into_iter()
        .map(KeyEvent::from_keystroke)
        .collect();

    bencher.bench_local(|| {
        for event in &events {
            divan::black_box(manager.process_key_down(event));
        }
    });
}

#[divan::bench]
fn dispatch_undefined(bencher: divan::Bencher) {
    let mut manager = manager_with(100);
    manager.key_trie();
    let events: Vec<KeyEvent> = strokes("C-x 9 9")
        .into_iter()
        .map(KeyEvent::from_keystroke)
        .collect();

    bencher.bench_local(|| {
        for event in &events {
            divan::black_box(manager.process_key_down(event));
        }
    });
}

// ============================================================================
// Rebuild
// ============================================================================

#[divan::bench(args = [10, 100, 500])]
fn rebuild_trie(bencher: divan::Bencher, count: usize) {
    bencher
        .with_inputs(|| manager_with(count))
        .bench_local_values(|mut manager| {
            divan::black_box(manager.key_trie().len());
        });
}
