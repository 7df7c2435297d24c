//! Key events as delivered by the host

use crate::keymap::{KeyCode, Keystroke, Modifiers};

/// A raw key-down event: modifiers, key code and the character the OS
/// translated it to, if any
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub mods: Modifiers,
    pub unicode: Option<char>,
    /// Built by the dispatcher rather than delivered by the host
    pub synthetic: bool,
}

impl KeyEvent {
    /// Character key codes are folded, so `Char('x')` and `Char('X')` name
    /// the same key
    pub fn new(key: KeyCode, mods: Modifiers, unicode: Option<char>) -> Self {
        Self {
            key: key.folded(),
            mods,
            unicode,
            synthetic: false,
        }
    }

    /// A printable character typed on its own (shift implied for capitals)
    pub fn typed(c: char) -> Self {
        let stroke = if c == ' ' {
            Keystroke::key(KeyCode::Space)
        } else {
            Keystroke::char(c)
        };
        let mods = if c.is_uppercase() {
            Modifiers::SHIFT
        } else {
            Modifiers::NONE
        };
        Self::new(stroke.key, mods, Some(c))
    }

    /// The event a host would deliver for this keystroke
    pub fn from_keystroke(stroke: Keystroke) -> Self {
        Self::new(stroke.key, stroke.mods, char_for(stroke))
    }

    /// Same as [`KeyEvent::from_keystroke`], flagged as synthetic
    pub fn synthetic(stroke: Keystroke) -> Self {
        Self {
            synthetic: true,
            ..Self::from_keystroke(stroke)
        }
    }

    /// The character event quoted insert produces for a keystroke
    ///
    /// Physical Ctrl with a letter yields the control character (`^A` is 1),
    /// Shift with a letter the capital, and a plain letter the lowercase.
    pub fn quoted(stroke: Keystroke) -> Self {
        Self::synthetic(stroke)
    }

    pub fn keystroke(&self) -> Keystroke {
        Keystroke::new(self.key.folded(), self.mods)
    }

    /// True for SHIFT, CTRL, ALT or CMD pressed on their own
    pub fn is_modifier_only(&self) -> bool {
        self.key.is_modifier()
    }
}

/// Character a keystroke types, following terminal conventions for Ctrl
pub fn char_for(stroke: Keystroke) -> Option<char> {
    let mods = stroke.mods;
    match stroke.key {
        KeyCode::Char(c) if mods.ctrl() && ('@'..='_').contains(&c) => {
            Some(char::from(c as u8 - b'@'))
        }
        KeyCode::Char(c) if mods.shift() => Some(c),
        KeyCode::Char(c) => Some(c.to_lowercase().next().unwrap_or(c)),
        KeyCode::Space => Some(' '),
        KeyCode::Tab => Some('\t'),
        KeyCode::Enter | KeyCode::NumpadEnter => Some('\r'),
        KeyCode::Escape => Some('\x1b'),
        KeyCode::Backspace => Some('\x08'),
        KeyCode::Delete => Some('\x7f'),
        KeyCode::Numpad(n) => char::from_digit(u32::from(n), 10),
        KeyCode::NumpadAdd => Some('+'),
        KeyCode::NumpadSubtract => Some('-'),
        KeyCode::NumpadMultiply => Some('*'),
        KeyCode::NumpadDivide => Some('/'),
        KeyCode::NumpadDecimal => Some('.'),
        _ => None,
    }
}
