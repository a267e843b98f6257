//! Push hotkey: string grammar and global registration
//!
//! Hotkey strings are plus-separated tokens: any of the modifiers
//! `Ctrl`/`Control`, `Alt`, `Shift`, `Win` plus exactly one key
//! (`F1`-`F12`, a letter, `Space`, `Insert`, `Delete`, `Home`, `End`).
//! Whitespace around tokens is ignored. A string that fails to parse
//! never takes the app down; registration just reports the error.

use thiserror::Error;

/// Hotkey string parse failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HotkeyParseError {
    #[error("unknown hotkey token '{0}'")]
    UnknownToken(String),
    #[error("hotkey has no key, only modifiers")]
    MissingKey,
    #[error("hotkey has more than one key")]
    ExtraKey,
}

/// The non-modifier part of a hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// `F1`–`F12`
    F(u8),
    /// `A`–`Z`
    Letter(char),
    Space,
    Insert,
    Delete,
    Home,
    End,
}

/// A parsed hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeySpec {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub win: bool,
    pub key: Key,
}

impl HotkeySpec {
    /// Parse a plus-separated hotkey string
    pub fn parse(input: &str) -> Result<Self, HotkeyParseError> {
        let mut ctrl = false;
        let mut alt = false;
        let mut shift = false;
        let mut win = false;
        let mut key: Option<Key> = None;

        for raw in input.split('+') {
            let token = raw.trim();
            if token.eq_ignore_ascii_case("ctrl") || token.eq_ignore_ascii_case("control") {
                ctrl = true;
            } else if token.eq_ignore_ascii_case("alt") {
                alt = true;
            } else if token.eq_ignore_ascii_case("shift") {
                shift = true;
            } else if token.eq_ignore_ascii_case("win") {
                win = true;
            } else {
                let parsed = parse_key(token)
                    .ok_or_else(|| HotkeyParseError::UnknownToken(token.to_string()))?;
                if key.replace(parsed).is_some() {
                    return Err(HotkeyParseError::ExtraKey);
                }
            }
        }

        let key = key.ok_or(HotkeyParseError::MissingKey)?;
        Ok(Self {
            ctrl,
            alt,
            shift,
            win,
            key,
        })
    }
}

fn parse_key(token: &str) -> Option<Key> {
    // F1..F12 before single letters so "F1" is not read as letter F + junk
    if let Some(digits) = token.strip_prefix('F').or_else(|| token.strip_prefix('f')) {
        if let Ok(n) = digits.parse::<u8>() {
            if (1..=12).contains(&n) {
                return Some(Key::F(n));
            }
        }
        if !digits.is_empty() {
            return None;
        }
    }

    if token.len() == 1 {
        let c = token.chars().next()?.to_ascii_uppercase();
        if c.is_ascii_uppercase() {
            return Some(Key::Letter(c));
        }
        return None;
    }

    match token.to_ascii_lowercase().as_str() {
        "space" => Some(Key::Space),
        "insert" => Some(Key::Insert),
        "delete" => Some(Key::Delete),
        "home" => Some(Key::Home),
        "end" => Some(Key::End),
        _ => None,
    }
}

/// Registered global hotkey; pressing it fires the channel
///
/// Registration failures (unsupported platform, hotkey taken) surface as
/// errors the caller logs; the agent keeps running without a hotkey.
#[cfg(feature = "hotkey")]
pub struct HotkeyListener {
    _manager: global_hotkey::GlobalHotKeyManager,
}

#[cfg(feature = "hotkey")]
impl HotkeyListener {
    /// Register `spec` and forward presses into `tx`
    pub fn register(
        spec: HotkeySpec,
        tx: tokio::sync::mpsc::Sender<()>,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;
        use global_hotkey::hotkey::{Code, HotKey, Modifiers};
        use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};

        let mut modifiers = Modifiers::empty();
        if spec.ctrl {
            modifiers |= Modifiers::CONTROL;
        }
        if spec.alt {
            modifiers |= Modifiers::ALT;
        }
        if spec.shift {
            modifiers |= Modifiers::SHIFT;
        }
        if spec.win {
            modifiers |= Modifiers::SUPER;
        }

        let code = key_code(spec.key);
        let hotkey = HotKey::new(Some(modifiers), code);
        let id = hotkey.id();

        let manager = GlobalHotKeyManager::new().context("hotkey manager init")?;
        manager.register(hotkey).context("hotkey registration")?;
        tracing::info!(?spec, "push hotkey registered");

        // The event receiver is a process-global blocking channel; a
        // plain thread drains it for the lifetime of the process.
        std::thread::spawn(move || {
            let receiver = GlobalHotKeyEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if event.id == id && event.state == HotKeyState::Pressed {
                    if tx.blocking_send(()).is_err() {
                        break;
                    }
                }
            }
        });

        Ok(Self { _manager: manager })
    }
}

#[cfg(feature = "hotkey")]
fn key_code(key: Key) -> global_hotkey::hotkey::Code {
    use global_hotkey::hotkey::Code;

    match key {
        Key::F(n) => match n {
            1 => Code::F1,
            2 => Code::F2,
            3 => Code::F3,
            4 => Code::F4,
            5 => Code::F5,
            6 => Code::F6,
            7 => Code::F7,
            8 => Code::F8,
            9 => Code::F9,
            10 => Code::F10,
            11 => Code::F11,
            _ => Code::F12,
        },
        Key::Letter(c) => match c {
            'A' => Code::KeyA,
            'B' => Code::KeyB,
            'C' => Code::KeyC,
            'D' => Code::KeyD,
            'E' => Code::KeyE,
            'F' => Code::KeyF,
            'G' => Code::KeyG,
            'H' => Code::KeyH,
            'I' => Code::KeyI,
            'J' => Code::KeyJ,
            'K' => Code::KeyK,
            'L' => Code::KeyL,
            'M' => Code::KeyM,
            'N' => Code::KeyN,
            'O' => Code::KeyO,
            'P' => Code::KeyP,
            'Q' => Code::KeyQ,
            'R' => Code::KeyR,
            'S' => Code::KeyS,
            'T' => Code::KeyT,
            'U' => Code::KeyU,
            'V' => Code::KeyV,
            'W' => Code::KeyW,
            'X' => Code::KeyX,
            'Y' => Code::KeyY,
            _ => Code::KeyZ,
        },
        Key::Space => Code::Space,
        Key::Insert => Code::Insert,
        Key::Delete => Code::Delete,
        Key::Home => Code::Home,
        Key::End => Code::End,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_hotkey() {
        let spec = HotkeySpec::parse("Ctrl+F6").unwrap();
        assert!(spec.ctrl);
        assert!(!spec.alt && !spec.shift && !spec.win);
        assert_eq!(spec.key, Key::F(6));
    }

    #[test]
    fn test_parse_control_alias_and_whitespace() {
        let spec = HotkeySpec::parse("  Control + Shift + V ").unwrap();
        assert!(spec.ctrl && spec.shift);
        assert_eq!(spec.key, Key::Letter('V'));
    }

    #[test]
    fn test_parse_all_modifiers_and_named_keys() {
        let spec = HotkeySpec::parse("Ctrl+Alt+Shift+Win+Space").unwrap();
        assert!(spec.ctrl && spec.alt && spec.shift && spec.win);
        assert_eq!(spec.key, Key::Space);

        assert_eq!(HotkeySpec::parse("Insert").unwrap().key, Key::Insert);
        assert_eq!(HotkeySpec::parse("Alt+Delete").unwrap().key, Key::Delete);
        assert_eq!(HotkeySpec::parse("Home").unwrap().key, Key::Home);
        assert_eq!(HotkeySpec::parse("End").unwrap().key, Key::End);
    }

    #[test]
    fn test_parse_function_key_range() {
        assert_eq!(HotkeySpec::parse("F1").unwrap().key, Key::F(1));
        assert_eq!(HotkeySpec::parse("Ctrl+F12").unwrap().key, Key::F(12));
        assert!(HotkeySpec::parse("F13").is_err());
        assert!(HotkeySpec::parse("F0").is_err());
    }

    #[test]
    fn test_parse_modifiers_only_fails() {
        assert_eq!(
            HotkeySpec::parse("Ctrl+Shift"),
            Err(HotkeyParseError::MissingKey)
        );
        assert_eq!(HotkeySpec::parse("Ctrl+"), Err(HotkeyParseError::UnknownToken(String::new())));
    }

    #[test]
    fn test_parse_two_keys_fails() {
        assert_eq!(
            HotkeySpec::parse("Ctrl+A+B"),
            Err(HotkeyParseError::ExtraKey)
        );
    }

    #[test]
    fn test_parse_unknown_token_fails() {
        assert!(matches!(
            HotkeySpec::parse("Ctrl+Frobnicate"),
            Err(HotkeyParseError::UnknownToken(_))
        ));
        assert!(HotkeySpec::parse("Ctrl+7").is_err());
    }

    #[test]
    fn test_parse_lowercase_letter_normalized() {
        assert_eq!(HotkeySpec::parse("Ctrl+v").unwrap().key, Key::Letter('V'));
    }
}
