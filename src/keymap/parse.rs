//! Accelerator string parsing and formatting
//!
//! Turns text such as `"C-x C-s"`, `"Ctrl+Shift+S"` or `"ESC 5 C-f"` into a
//! [`KeySequence`]. Parsing never rejects unknown names: an unrecognized key
//! becomes [`KeyCode::Named`] and simply never matches an event.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock, PoisonError};

use super::error::KeymapError;
use super::types::{KeyCode, Keystroke, Modifiers};

/// Which modifier an alias stands for
#[derive(Clone, Copy)]
enum Alias {
    /// `C-` and friends: Cmd on macOS, Ctrl elsewhere
    Command,
    Fixed(Modifiers),
}

/// Recognized modifier prefixes, longest first so `Ctrl-` wins over `C-`
const MODIFIER_ALIASES: &[(&str, Alias)] = &[
    ("Command-", Alias::Command),
    ("Command+", Alias::Command),
    ("Option-", Alias::Fixed(Modifiers::ALT)),
    ("Option+", Alias::Fixed(Modifiers::ALT)),
    ("Apple-", Alias::Command),
    ("Apple+", Alias::Command),
    ("Shift-", Alias::Fixed(Modifiers::SHIFT)),
    ("Shift+", Alias::Fixed(Modifiers::SHIFT)),
    ("Super-", Alias::Fixed(Modifiers::CMD)),
    ("Super+", Alias::Fixed(Modifiers::CMD)),
    ("Ctrl-", Alias::Command),
    ("Ctrl+", Alias::Command),
    ("Meta-", Alias::Fixed(Modifiers::ALT)),
    ("Meta+", Alias::Fixed(Modifiers::ALT)),
    ("Cmd-", Alias::Command),
    ("Cmd+", Alias::Command),
    ("Alt-", Alias::Fixed(Modifiers::ALT)),
    ("Alt+", Alias::Fixed(Modifiers::ALT)),
    ("Opt-", Alias::Fixed(Modifiers::ALT)),
    ("Opt+", Alias::Fixed(Modifiers::ALT)),
    ("Win-", Alias::Fixed(Modifiers::CMD)),
    ("Win+", Alias::Fixed(Modifiers::CMD)),
    ("^-", Alias::Fixed(Modifiers::CTRL)),
    ("C-", Alias::Command),
    ("S-", Alias::Fixed(Modifiers::SHIFT)),
    ("M-", Alias::Fixed(Modifiers::ALT)),
    ("^", Alias::Fixed(Modifiers::CTRL)),
    ("⌃", Alias::Fixed(Modifiers::CTRL)),
    ("⇧", Alias::Fixed(Modifiers::SHIFT)),
    ("⌥", Alias::Fixed(Modifiers::ALT)),
    ("⌘", Alias::Fixed(Modifiers::CMD)),
];

/// An ordered list of keystrokes, e.g. the result of parsing `"C-x C-s"`
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeySequence(Vec<Keystroke>);

impl KeySequence {
    pub fn new(keystrokes: Vec<Keystroke>) -> Self {
        Self(keystrokes)
    }

    /// Parse an accelerator string; results are cached per input string
    pub fn parse(text: &str) -> Result<Self, KeymapError> {
        parse_key_sequence(text)
    }

    pub fn keystrokes(&self) -> &[Keystroke] {
        &self.0
    }

    /// Fold sticky-meta escapes into the keystroke that follows them
    ///
    /// A bare `ESC` followed by a non-digit keystroke becomes that keystroke
    /// with ALT added, which is what the dispatcher produces when the same
    /// keys are typed: `"ESC x"` is `"M-x"` and `"ESC ESC ESC"` is
    /// `"M-ESC ESC"`. A trailing `ESC` and `ESC <digit>` are kept as typed.
    pub fn fold_sticky_meta(&self) -> KeySequence {
        let mut folded = Vec::with_capacity(self.0.len());
        let mut iter = self.0.iter().copied().peekable();
        while let Some(stroke) = iter.next() {
            if stroke == Keystroke::ESC {
                if let Some(next) = iter.peek().copied() {
                    if next.plain_digit().is_none() {
                        iter.next();
                        folded.push(next.with_mods(Modifiers::ALT));
                        continue;
                    }
                }
            }
            folded.push(stroke);
        }
        KeySequence(folded)
    }

    /// Emacs-style rendering, keystrokes separated by spaces
    pub fn emacs_string(&self) -> String {
        join_emacs(&self.0)
    }

    /// Accelerator text for a menu label
    ///
    /// A single keystroke uses the native menu rendering; multi-keystroke
    /// sequences can't be expressed natively and fall back to Emacs style.
    pub fn accelerator_text(&self) -> String {
        match self.0.as_slice() {
            [single] => single.menu_string(),
            strokes => join_emacs(strokes),
        }
    }
}

impl Deref for KeySequence {
    type Target = [Keystroke];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Keystroke>> for KeySequence {
    fn from(keystrokes: Vec<Keystroke>) -> Self {
        Self(keystrokes)
    }
}

impl FromStr for KeySequence {
    type Err = KeymapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_key_sequence(s)
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.emacs_string())
    }
}

/// Render keystrokes Emacs-style, separated by spaces
pub fn join_emacs(keystrokes: &[Keystroke]) -> String {
    keystrokes
        .iter()
        .map(|k| k.emacs_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an accelerator string like `"C-x C-s"` into a key sequence
///
/// Fails only for strings with no keystrokes in them.
pub fn parse_key_sequence(text: &str) -> Result<KeySequence, KeymapError> {
    static CACHE: OnceLock<Mutex<HashMap<String, KeySequence>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));

    if let Some(hit) = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(text)
    {
        return Ok(hit.clone());
    }

    let keystrokes: Vec<Keystroke> = text.split_whitespace().map(parse_keystroke).collect();
    if keystrokes.is_empty() {
        return Err(KeymapError::EmptyAccelerator);
    }

    let sequence = KeySequence(keystrokes);
    tracing::trace!("parsed accelerator {:?} as {}", text, sequence);
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(text.to_string(), sequence.clone());
    Ok(sequence)
}

/// Parse a single whitespace-free token such as `C-x` or `Ctrl+Shift+F5`
pub fn parse_keystroke(token: &str) -> Keystroke {
    let mut mods = Modifiers::NONE;
    let mut rest = token;

    // A modifier only counts when something is left over for the key, so
    // "C-^" is Ctrl plus the caret key and "C--" is Ctrl plus minus.
    while let Some((len, alias)) = match_modifier(rest) {
        mods = mods
            | match alias {
                Alias::Command => Modifiers::cmd(),
                Alias::Fixed(m) => m,
            };
        rest = &rest[len..];
    }

    Keystroke::new(KeyCode::from_name(rest), mods)
}

fn match_modifier(text: &str) -> Option<(usize, Alias)> {
    let bytes = text.as_bytes();
    MODIFIER_ALIASES.iter().find_map(|(alias, kind)| {
        let len = alias.len();
        let matches = bytes.len() > len && bytes[..len].eq_ignore_ascii_case(alias.as_bytes());
        matches.then_some((len, *kind))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(text: &str) -> Keystroke {
        let seq = parse_key_sequence(text).unwrap();
        assert_eq!(seq.len(), 1, "{text} should be a single keystroke");
        seq[0]
    }

    #[test]
    fn test_parse_simple_key() {
        assert_eq!(one("a"), Keystroke::char('A'));
        assert_eq!(one("a"), one("A"));
    }

    #[test]
    fn test_modifier_aliases_are_equivalent() {
        let expected = Keystroke::char_with_mods('c', Modifiers::cmd());
        assert_eq!(one("C-c"), expected);
        assert_eq!(one("Ctrl-C"), expected);
        assert_eq!(one("ctrl+c"), expected);
        assert_eq!(one("Cmd-c"), expected);
        assert_eq!(one("Command+c"), expected);
        assert_eq!(one("apple-c"), expected);
    }

    #[test]
    fn test_modifiers_in_any_order() {
        let expected = Keystroke::char_with_mods('x', Modifiers::cmd() | Modifiers::SHIFT | Modifiers::ALT);
        assert_eq!(one("S-C-M-x"), expected);
        assert_eq!(one("M-S-C-x"), expected);
        assert_eq!(one("Alt+Shift+Ctrl+X"), expected);
        assert_eq!(one("Opt-Shift-Ctrl-x"), expected);
        assert_eq!(one("meta+s-c-x"), expected);
    }

    #[test]
    fn test_caret_is_physical_control() {
        assert_eq!(one("^x"), Keystroke::char_with_mods('x', Modifiers::CTRL));
        assert_eq!(one("^-x"), Keystroke::char_with_mods('x', Modifiers::CTRL));
        // A lone caret is the key itself
        assert_eq!(one("^"), Keystroke::char('^'));
        assert_eq!(one("C-^"), Keystroke::char_with_mods('^', Modifiers::cmd()));
    }

    #[test]
    fn test_punctuation_keys_after_modifiers() {
        assert_eq!(one("C--"), Keystroke::char_with_mods('-', Modifiers::cmd()));
        assert_eq!(one("Ctrl++"), Keystroke::char_with_mods('+', Modifiers::cmd()));
        assert_eq!(one("M-<"), Keystroke::char_with_mods('<', Modifiers::ALT));
    }

    #[test]
    fn test_multi_keystroke_sequence() {
        let seq = parse_key_sequence("C-x   C-s").unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0], Keystroke::char_with_mods('x', Modifiers::cmd()));
        assert_eq!(seq[1], Keystroke::char_with_mods('s', Modifiers::cmd()));
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(one("RET"), Keystroke::key(KeyCode::Enter));
        assert_eq!(one("M-SPC"), Keystroke::new(KeyCode::Space, Modifiers::ALT));
        assert_eq!(one("S-TAB"), Keystroke::new(KeyCode::Tab, Modifiers::SHIFT));
        assert_eq!(one("C-F5"), Keystroke::new(KeyCode::F(5), Modifiers::cmd()));
    }

    #[test]
    fn test_unknown_key_is_not_an_error() {
        let stroke = one("C-Hyperspace");
        assert_eq!(stroke.key, KeyCode::Named("HYPERSPACE"));
    }

    #[test]
    fn test_empty_is_an_error() {
        assert_eq!(parse_key_sequence(""), Err(KeymapError::EmptyAccelerator));
        assert_eq!(parse_key_sequence("   "), Err(KeymapError::EmptyAccelerator));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = parse_key_sequence("ESC 5 C-f").unwrap();
        let b = parse_key_sequence("ESC 5 C-f").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_fold_sticky_meta() {
        let seq = parse_key_sequence("ESC x").unwrap().fold_sticky_meta();
        assert_eq!(seq, parse_key_sequence("M-x").unwrap());

        let seq = parse_key_sequence("ESC ESC ESC").unwrap().fold_sticky_meta();
        assert_eq!(seq, parse_key_sequence("M-ESC ESC").unwrap());

        let seq = parse_key_sequence("ESC 5 C-f").unwrap().fold_sticky_meta();
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn test_format_round_trip() {
        for text in [
            "C-x", "M-S-RET", "C-M-S-F12", "^-a", "S-TAB", "C--", "M-<", "NUMPAD5",
            "NUMPAD_ADD", "Super-q", "UNKNOWNKEY", "C-^", "PAGEDOWN",
        ] {
            let stroke = one(text);
            assert_eq!(one(&stroke.emacs_string()), stroke, "emacs form of {text}");
            assert_eq!(one(&stroke.menu_string()), stroke, "menu form of {text}");
        }
    }

    #[test]
    fn test_accelerator_text() {
        let single = parse_key_sequence("C-s").unwrap();
        assert_eq!(single.accelerator_text(), single[0].menu_string());

        let multi = parse_key_sequence("C-x C-s").unwrap();
        assert_eq!(multi.accelerator_text(), multi.emacs_string());
    }
}
