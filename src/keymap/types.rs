//! Core types for the keymap system: Keystroke, Modifiers, KeyCode

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

/// Modifier keys as a bitfield for efficient storage and comparison
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const CTRL: Modifiers = Modifiers(0b0001);
    pub const SHIFT: Modifiers = Modifiers(0b0010);
    pub const ALT: Modifiers = Modifiers(0b0100);
    pub const CMD: Modifiers = Modifiers(0b1000); // Cmd on macOS, Super/Win elsewhere

    /// Create modifiers from individual flags
    pub const fn new(ctrl: bool, shift: bool, alt: bool, cmd: bool) -> Self {
        let mut bits = 0u8;
        if ctrl {
            bits |= 0b0001;
        }
        if shift {
            bits |= 0b0010;
        }
        if alt {
            bits |= 0b0100;
        }
        if cmd {
            bits |= 0b1000;
        }
        Modifiers(bits)
    }

    /// Check if the physical control key is held
    #[inline]
    pub const fn ctrl(self) -> bool {
        self.0 & 0b0001 != 0
    }

    /// Check if shift is held
    #[inline]
    pub const fn shift(self) -> bool {
        self.0 & 0b0010 != 0
    }

    /// Check if alt/option is held
    #[inline]
    pub const fn alt(self) -> bool {
        self.0 & 0b0100 != 0
    }

    /// Check if cmd (super/win off macOS) is held
    #[inline]
    pub const fn cmd_held(self) -> bool {
        self.0 & 0b1000 != 0
    }

    /// Check if no modifiers are held
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Combine two modifier sets
    #[inline]
    pub const fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    /// Check if this contains all modifiers in other
    #[inline]
    pub const fn contains(self, other: Modifiers) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Get the platform-specific "command" modifier (Cmd on macOS, Ctrl elsewhere)
    ///
    /// This is what the `C-` prefix of an accelerator string means.
    pub fn cmd() -> Modifiers {
        if cfg!(target_os = "macos") {
            Modifiers::CMD
        } else {
            Modifiers::CTRL
        }
    }

    /// Emacs-style prefix text, e.g. `C-M-S-`
    pub fn emacs_prefix(self) -> String {
        let mut out = String::new();
        if cfg!(target_os = "macos") {
            if self.ctrl() {
                out.push_str("^-");
            }
            if self.cmd_held() {
                out.push_str("C-");
            }
        } else {
            if self.ctrl() {
                out.push_str("C-");
            }
            if self.cmd_held() {
                out.push_str("Super-");
            }
        }
        if self.alt() {
            out.push_str("M-");
        }
        if self.shift() {
            out.push_str("S-");
        }
        out
    }

    /// Native menu prefix text
    ///
    /// macOS uses the menu glyphs ⌃ ⌥ ⇧ ⌘, everything else spells the names out.
    pub fn menu_prefix(self) -> String {
        let mut parts = Vec::new();
        if cfg!(target_os = "macos") {
            if self.ctrl() {
                parts.push("⌃");
            }
            if self.alt() {
                parts.push("⌥");
            }
            if self.shift() {
                parts.push("⇧");
            }
            if self.cmd_held() {
                parts.push("⌘");
            }
            parts.concat()
        } else {
            if self.ctrl() {
                parts.push("Ctrl+");
            }
            if self.alt() {
                parts.push("Alt+");
            }
            if self.shift() {
                parts.push("Shift+");
            }
            if self.cmd_held() {
                parts.push("Win+");
            }
            parts.concat()
        }
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.emacs_prefix())
    }
}

/// A key code representing a physical or logical key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCode {
    /// A character key (folded to uppercase)
    Char(char),

    // Named keys
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Space,

    // Arrow keys
    Up,
    Down,
    Left,
    Right,

    // Navigation
    Home,
    End,
    PageUp,
    PageDown,
    Insert,

    // Function keys
    F(u8), // F1-F24

    // Numpad (physical keys)
    Numpad(u8),
    NumpadAdd,
    NumpadSubtract,
    NumpadMultiply,
    NumpadDivide,
    NumpadEnter,
    NumpadDecimal,

    // Bare modifier keys, reported by some hosts on their own
    Shift,
    Control,
    Alt,
    Command,

    /// A key name nothing recognizes; it will never match an event
    Named(&'static str),
}

/// Symbolic key names accepted by the parser, uppercase
const NAMED_KEYS: &[(&str, KeyCode)] = &[
    ("RETURN", KeyCode::Enter),
    ("RET", KeyCode::Enter),
    ("ENTER", KeyCode::Enter),
    ("ESCAPE", KeyCode::Escape),
    ("ESC", KeyCode::Escape),
    ("TAB", KeyCode::Tab),
    ("BACK", KeyCode::Backspace),
    ("BACKSPACE", KeyCode::Backspace),
    ("DELETE", KeyCode::Delete),
    ("DEL", KeyCode::Delete),
    ("SPACE", KeyCode::Space),
    ("SPC", KeyCode::Space),
    ("UP", KeyCode::Up),
    ("DOWN", KeyCode::Down),
    ("LEFT", KeyCode::Left),
    ("RIGHT", KeyCode::Right),
    ("HOME", KeyCode::Home),
    ("END", KeyCode::End),
    ("PAGEUP", KeyCode::PageUp),
    ("PGUP", KeyCode::PageUp),
    ("PRIOR", KeyCode::PageUp),
    ("PAGEDOWN", KeyCode::PageDown),
    ("PGDN", KeyCode::PageDown),
    ("NEXT", KeyCode::PageDown),
    ("INSERT", KeyCode::Insert),
    ("INS", KeyCode::Insert),
    ("NUMPAD_ADD", KeyCode::NumpadAdd),
    ("NUMADD", KeyCode::NumpadAdd),
    ("NUMPAD_SUBTRACT", KeyCode::NumpadSubtract),
    ("NUMSUBTRACT", KeyCode::NumpadSubtract),
    ("NUMSUB", KeyCode::NumpadSubtract),
    ("NUMPAD_MULTIPLY", KeyCode::NumpadMultiply),
    ("NUMMULTIPLY", KeyCode::NumpadMultiply),
    ("NUMMUL", KeyCode::NumpadMultiply),
    ("NUMPAD_DIVIDE", KeyCode::NumpadDivide),
    ("NUMDIVIDE", KeyCode::NumpadDivide),
    ("NUMDIV", KeyCode::NumpadDivide),
    ("NUMPAD_ENTER", KeyCode::NumpadEnter),
    ("NUMENTER", KeyCode::NumpadEnter),
    ("NUMPAD_DECIMAL", KeyCode::NumpadDecimal),
    ("NUMDECIMAL", KeyCode::NumpadDecimal),
    ("NUMDOT", KeyCode::NumpadDecimal),
    ("SHIFT", KeyCode::Shift),
    ("CONTROL", KeyCode::Control),
    ("CTRL", KeyCode::Control),
    ("ALT", KeyCode::Alt),
    ("COMMAND", KeyCode::Command),
    ("CMD", KeyCode::Command),
];

impl KeyCode {
    /// Canonical form: character keys folded to uppercase, others unchanged
    pub fn folded(self) -> Self {
        match self {
            KeyCode::Char(c) => KeyCode::Char(fold_upper(c)),
            other => other,
        }
    }

    /// Resolve a key specifier (everything after the modifiers)
    ///
    /// Single characters become [`KeyCode::Char`], folded to uppercase. Longer
    /// names are looked up case-insensitively; unknown names are interned and
    /// returned as [`KeyCode::Named`].
    pub fn from_name(name: &str) -> KeyCode {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return KeyCode::Char(fold_upper(c));
        }

        let upper = name.to_uppercase();
        if let Some((_, code)) = NAMED_KEYS.iter().find(|(n, _)| *n == upper) {
            return *code;
        }
        if let Some(code) = numbered_key(&upper) {
            return code;
        }
        KeyCode::Named(intern(&upper))
    }

    /// True for the bare SHIFT/CTRL/ALT/CMD keys
    pub const fn is_modifier(self) -> bool {
        matches!(
            self,
            KeyCode::Shift | KeyCode::Control | KeyCode::Alt | KeyCode::Command
        )
    }

    /// Name used in Emacs-style accelerator text
    pub fn emacs_name(self) -> String {
        match self {
            KeyCode::Char(c) if c.is_ascii_alphabetic() => c.to_ascii_lowercase().to_string(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Enter => "RET".into(),
            KeyCode::Escape => "ESC".into(),
            KeyCode::Tab => "TAB".into(),
            KeyCode::Backspace => "BACK".into(),
            KeyCode::Delete => "DELETE".into(),
            KeyCode::Space => "SPC".into(),
            KeyCode::Up => "UP".into(),
            KeyCode::Down => "DOWN".into(),
            KeyCode::Left => "LEFT".into(),
            KeyCode::Right => "RIGHT".into(),
            KeyCode::Home => "HOME".into(),
            KeyCode::End => "END".into(),
            KeyCode::PageUp => "PAGEUP".into(),
            KeyCode::PageDown => "PAGEDOWN".into(),
            KeyCode::Insert => "INSERT".into(),
            KeyCode::F(n) => format!("F{}", n),
            KeyCode::Numpad(n) => format!("NUMPAD{}", n),
            KeyCode::NumpadAdd => "NUMPAD_ADD".into(),
            KeyCode::NumpadSubtract => "NUMPAD_SUBTRACT".into(),
            KeyCode::NumpadMultiply => "NUMPAD_MULTIPLY".into(),
            KeyCode::NumpadDivide => "NUMPAD_DIVIDE".into(),
            KeyCode::NumpadEnter => "NUMPAD_ENTER".into(),
            KeyCode::NumpadDecimal => "NUMPAD_DECIMAL".into(),
            KeyCode::Shift => "SHIFT".into(),
            KeyCode::Control => "CONTROL".into(),
            KeyCode::Alt => "ALT".into(),
            KeyCode::Command => "COMMAND".into(),
            KeyCode::Named(name) => name.to_string(),
        }
    }

    /// Name used in native menu accelerators
    pub fn menu_name(self) -> String {
        match self {
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Enter => "Return".into(),
            KeyCode::Escape => "Esc".into(),
            KeyCode::Tab => "Tab".into(),
            KeyCode::Backspace => "Backspace".into(),
            KeyCode::Delete => "Delete".into(),
            KeyCode::Space => "Space".into(),
            KeyCode::Up => "Up".into(),
            KeyCode::Down => "Down".into(),
            KeyCode::Left => "Left".into(),
            KeyCode::Right => "Right".into(),
            KeyCode::Home => "Home".into(),
            KeyCode::End => "End".into(),
            KeyCode::PageUp => "PageUp".into(),
            KeyCode::PageDown => "PageDown".into(),
            KeyCode::Insert => "Insert".into(),
            KeyCode::F(n) => format!("F{}", n),
            KeyCode::Numpad(n) => format!("Num{}", n),
            KeyCode::NumpadAdd => "NumAdd".into(),
            KeyCode::NumpadSubtract => "NumSubtract".into(),
            KeyCode::NumpadMultiply => "NumMultiply".into(),
            KeyCode::NumpadDivide => "NumDivide".into(),
            KeyCode::NumpadEnter => "NumEnter".into(),
            KeyCode::NumpadDecimal => "NumDecimal".into(),
            KeyCode::Shift => "Shift".into(),
            KeyCode::Control => "Control".into(),
            KeyCode::Alt => "Alt".into(),
            KeyCode::Command => "Command".into(),
            KeyCode::Named(name) => name.to_string(),
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.emacs_name())
    }
}

/// F1..F24, NUMPAD0..9 and NUM0..9
fn numbered_key(upper: &str) -> Option<KeyCode> {
    if let Some(n) = upper.strip_prefix('F').and_then(|s| s.parse::<u8>().ok()) {
        if (1..=24).contains(&n) {
            return Some(KeyCode::F(n));
        }
    }
    let digits = upper
        .strip_prefix("NUMPAD")
        .or_else(|| upper.strip_prefix("NUM"))?;
    match digits.parse::<u8>() {
        Ok(n) if n <= 9 && digits.len() == 1 => Some(KeyCode::Numpad(n)),
        _ => None,
    }
}

/// Uppercase a character when that yields exactly one character
fn fold_upper(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Process-wide, append-only table of unrecognized key names
fn intern(name: &str) -> &'static str {
    static NAMES: OnceLock<Mutex<HashSet<&'static str>>> = OnceLock::new();
    let mut names = NAMES
        .get_or_init(|| Mutex::new(HashSet::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = names.get(name) {
        return existing;
    }
    let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
    names.insert(leaked);
    leaked
}

/// A single keystroke: a key with modifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keystroke {
    pub key: KeyCode,
    pub mods: Modifiers,
}

impl Keystroke {
    /// Bare escape, the sticky meta key
    pub const ESC: Keystroke = Keystroke::key(KeyCode::Escape);

    /// Create a new keystroke
    pub const fn new(key: KeyCode, mods: Modifiers) -> Self {
        Self { key, mods }
    }

    /// Create a keystroke with no modifiers
    pub const fn key(key: KeyCode) -> Self {
        Self {
            key,
            mods: Modifiers::NONE,
        }
    }

    /// Create a keystroke with a character key
    pub fn char(c: char) -> Self {
        Self {
            key: KeyCode::Char(fold_upper(c)),
            mods: Modifiers::NONE,
        }
    }

    /// Create a keystroke with a character and modifiers
    pub fn char_with_mods(c: char, mods: Modifiers) -> Self {
        Self {
            key: KeyCode::Char(fold_upper(c)),
            mods,
        }
    }

    /// Same key with extra modifiers OR-ed in
    pub fn with_mods(self, mods: Modifiers) -> Self {
        Self {
            key: self.key,
            mods: self.mods | mods,
        }
    }

    /// True when the key itself is a modifier (SHIFT alone, etc.)
    pub const fn is_modifier_only(&self) -> bool {
        self.key.is_modifier()
    }

    /// Digit value of an unmodified `0`..`9`
    pub fn plain_digit(&self) -> Option<u32> {
        if self.mods.is_empty() {
            self.digit()
        } else {
            None
        }
    }

    /// Digit value of `M-0`..`M-9`
    pub fn meta_digit(&self) -> Option<u32> {
        if self.mods == Modifiers::ALT {
            self.digit()
        } else {
            None
        }
    }

    fn digit(&self) -> Option<u32> {
        match self.key {
            KeyCode::Char(c) => c.to_digit(10),
            _ => None,
        }
    }

    /// Emacs-style rendering, e.g. `C-x` or `M-S-RET`
    pub fn emacs_string(&self) -> String {
        format!("{}{}", self.mods.emacs_prefix(), self.key.emacs_name())
    }

    /// Native menu rendering, e.g. `Ctrl+S` or `⌘S`
    pub fn menu_string(&self) -> String {
        format!("{}{}", self.mods.menu_prefix(), self.key.menu_name())
    }
}

impl fmt::Display for Keystroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.emacs_string())
    }
}
