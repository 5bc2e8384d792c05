use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordParseError {
    #[error("shortcut is empty")]
    Empty,
    #[error("shortcut key is empty")]
    EmptyKey,
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
    pub const META: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };

    pub fn with_shift(self) -> Self {
        Self {
            shift: true,
            ..self
        }
    }
}

/// 鍵盤組合鍵，例如 `Ctrl+Shift+S`。 / Key chord such as `Ctrl+Shift+S`.
///
/// Single-character keys are stored upper-cased so `s` and `S` match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub modifiers: Modifiers,
    pub key: String,
}

impl KeyChord {
    pub fn new(modifiers: Modifiers, key: &str) -> Self {
        Self {
            modifiers,
            key: normalize_key(key),
        }
    }
}

fn normalize_key(key: &str) -> String {
    let key = key.trim();
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => ch.to_uppercase().collect(),
        _ => match key.to_ascii_lowercase().as_str() {
            "enter" | "return" => "Enter".to_string(),
            "esc" | "escape" => "Escape".to_string(),
            "space" => "Space".to_string(),
            "tab" => "Tab".to_string(),
            _ => key.to_string(),
        },
    }
}

impl FromStr for KeyChord {
    type Err = ChordParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.trim().is_empty() {
            return Err(ChordParseError::Empty);
        }
        let parts: Vec<&str> = input.split('+').map(str::trim).collect();
        let (key, modifier_parts) = match parts.split_last() {
            Some((key, rest)) => (*key, rest),
            None => return Err(ChordParseError::Empty),
        };
        if key.is_empty() {
            return Err(ChordParseError::EmptyKey);
        }

        let mut modifiers = Modifiers::NONE;
        for modifier in modifier_parts {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "shift" => modifiers.shift = true,
                "alt" | "option" => modifiers.alt = true,
                "cmd" | "meta" | "super" => modifiers.meta = true,
                other => return Err(ChordParseError::UnknownModifier(other.to_string())),
            }
        }
        Ok(KeyChord::new(modifiers, key))
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Modifiers {
            ctrl,
            shift,
            alt,
            meta,
        } = self.modifiers;
        for (active, name) in [(ctrl, "Ctrl"), (meta, "Cmd"), (alt, "Alt"), (shift, "Shift")] {
            if active {
                write!(f, "{name}+")?;
            }
        }
        f.write_str(&self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShortcutAction {
    Translate,
    Swap,
    Copy,
}

/// 組合鍵到動作的對應。 / Chord-to-action bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    bindings: Vec<(KeyChord, ShortcutAction)>,
}

impl Default for Keymap {
    fn default() -> Self {
        let mut keymap = Keymap::empty();
        for primary in [Modifiers::CTRL, Modifiers::META] {
            keymap.bind(KeyChord::new(primary, "Enter"), ShortcutAction::Translate);
            keymap.bind(KeyChord::new(primary.with_shift(), "S"), ShortcutAction::Swap);
            keymap.bind(KeyChord::new(primary.with_shift(), "C"), ShortcutAction::Copy);
        }
        keymap
    }
}

impl Keymap {
    pub fn empty() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// 綁定；同一組合鍵會被取代。 / Binds a chord, replacing any previous binding for it.
    pub fn bind(&mut self, chord: KeyChord, action: ShortcutAction) {
        self.bindings.retain(|(existing, _)| existing != &chord);
        self.bindings.push((chord, action));
    }

    pub fn lookup(&self, chord: &KeyChord) -> Option<ShortcutAction> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == chord)
            .map(|(_, action)| *action)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&KeyChord, ShortcutAction)> {
        self.bindings.iter().map(|(chord, action)| (chord, *action))
    }
}
