//! Hotkey strings such as `"F2"`, `"Ctrl+Shift+A"` or `"Alt+Mouse4"`.
//!
//! Keys are stored as Windows virtual-key codes so parsing works (and is
//! tested) on every platform.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HotkeyError {
    #[error("hotkey is empty")]
    Empty,
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("hotkey '{0}' has no main key")]
    MissingKey(String),
    #[error("hotkey '{0}' has more than one main key")]
    MultipleKeys(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

/// Mouse side buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideButton {
    /// XBUTTON1, usually "back"
    Mouse4,
    /// XBUTTON2, usually "forward"
    Mouse5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Windows virtual-key code
    Key(u16),
    Mouse(SideButton),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub trigger: Trigger,
}

pub const VK_F: u16 = 0x46;
const VK_F1: u16 = 0x70;
const VK_NUMPAD0: u16 = 0x60;

/// Named keys. The first entry for a code is its display name.
const NAMED_KEYS: &[(&str, u16)] = &[
    ("Space", 0x20),
    ("Enter", 0x0D),
    ("Return", 0x0D),
    ("Tab", 0x09),
    ("Esc", 0x1B),
    ("Escape", 0x1B),
    ("Backspace", 0x08),
    ("Insert", 0x2D),
    ("Ins", 0x2D),
    ("Delete", 0x2E),
    ("Del", 0x2E),
    ("Home", 0x24),
    ("End", 0x23),
    ("PageUp", 0x21),
    ("PgUp", 0x21),
    ("PageDown", 0x22),
    ("PgDn", 0x22),
    ("Left", 0x25),
    ("Up", 0x26),
    ("Right", 0x27),
    ("Down", 0x28),
    ("Pause", 0x13),
    ("CapsLock", 0x14),
    ("ScrollLock", 0x91),
    ("NumLock", 0x90),
    ("PrintScreen", 0x2C),
    ("NumMul", 0x6A),
    ("NumAdd", 0x6B),
    ("NumSub", 0x6D),
    ("NumDot", 0x6E),
    ("NumDiv", 0x6F),
    ("`", 0xC0),
    ("-", 0xBD),
    ("=", 0xBB),
    ("[", 0xDB),
    ("]", 0xDD),
    (";", 0xBA),
    ("'", 0xDE),
    (",", 0xBC),
    (".", 0xBE),
    ("/", 0xBF),
    ("\\", 0xDC),
];

fn parse_key(name: &str) -> Option<Trigger> {
    let lower = name.to_ascii_lowercase();

    match lower.as_str() {
        "mouse4" | "xbutton1" => return Some(Trigger::Mouse(SideButton::Mouse4)),
        "mouse5" | "xbutton2" => return Some(Trigger::Mouse(SideButton::Mouse5)),
        _ => {}
    }

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            return Some(Trigger::Key(c.to_ascii_uppercase() as u16));
        }
    }

    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u16>().ok()) {
        if (1..=24).contains(&n) {
            return Some(Trigger::Key(VK_F1 + n - 1));
        }
    }

    if let Some(n) = lower.strip_prefix("num").and_then(|n| n.parse::<u16>().ok()) {
        if n <= 9 {
            return Some(Trigger::Key(VK_NUMPAD0 + n));
        }
    }

    NAMED_KEYS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|&(_, vk)| Trigger::Key(vk))
}

fn key_name(vk: u16) -> String {
    match vk {
        0x30..=0x39 | 0x41..=0x5A => (vk as u8 as char).to_string(),
        VK_NUMPAD0..=0x69 => format!("Num{}", vk - VK_NUMPAD0),
        0x70..=0x87 => format!("F{}", vk - VK_F1 + 1),
        _ => NAMED_KEYS
            .iter()
            .find(|&&(_, code)| code == vk)
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| format!("VK{:#04X}", vk)),
    }
}

impl FromStr for Hotkey {
    type Err = HotkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(HotkeyError::Empty);
        }

        let mut modifiers = Modifiers::default();
        let mut trigger = None;

        for part in s.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "" => return Err(HotkeyError::MissingKey(s.to_string())),
                _ => {
                    let key = parse_key(part).ok_or_else(|| HotkeyError::UnknownKey(part.to_string()))?;
                    if trigger.replace(key).is_some() {
                        return Err(HotkeyError::MultipleKeys(s.to_string()));
                    }
                }
            }
        }

        let trigger = trigger.ok_or_else(|| HotkeyError::MissingKey(s.to_string()))?;
        Ok(Self { modifiers, trigger })
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.alt {
            write!(f, "Alt+")?;
        }
        if self.modifiers.shift {
            write!(f, "Shift+")?;
        }
        match self.trigger {
            Trigger::Key(vk) => write!(f, "{}", key_name(vk)),
            Trigger::Mouse(SideButton::Mouse4) => write!(f, "Mouse4"),
            Trigger::Mouse(SideButton::Mouse5) => write!(f, "Mouse5"),
        }
    }
}

impl Default for Hotkey {
    /// F2, no modifiers.
    fn default() -> Self {
        Self {
            modifiers: Modifiers::default(),
            trigger: Trigger::Key(VK_F1 + 1),
        }
    }
}
