//! Per-character key-event parameters for the fill primitive's synthetic
//! typing (spec §4.E: "type character by character ... dispatching
//! `keyDown` -> `char` -> `keyUp`").

/// CDP modifier bitmask values.
pub mod modifiers {
    pub const ALT: u8 = 1;
    pub const CONTROL: u8 = 2;
    pub const META: u8 = 4;
    pub const SHIFT: u8 = 8;
}

/// Everything `Input.dispatchKeyEvent` needs for one character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEventSpec {
    pub modifiers: u8,
    pub windows_virtual_key_code: i32,
    pub key: &'static str,
    pub code: &'static str,
}

/// The artificial, owned form used for characters that aren't representable
/// as `&'static str` (arbitrary unicode).
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedKeyEventSpec {
    pub modifiers: u8,
    pub windows_virtual_key_code: i32,
    pub key: String,
    pub code: String,
}

impl From<KeyEventSpec> for OwnedKeyEventSpec {
    fn from(spec: KeyEventSpec) -> Self {
        Self {
            modifiers: spec.modifiers,
            windows_virtual_key_code: spec.windows_virtual_key_code,
            key: spec.key.to_string(),
            code: spec.code.to_string(),
        }
    }
}

const UPPER_VK_BASE: i32 = 0x41; // 'A'
const DIGIT_VK_BASE: i32 = 0x30; // '0'

/// Resolves one character's `(modifiers, windowsVirtualKeyCode, key, code)`.
/// Covers ASCII letters, digits, common punctuation, space, and the handful
/// of shifted symbols on a US keyboard; anything else falls back to a
/// printable key event carrying the raw character as `key`/`text`.
pub fn key_event_for_char(ch: char) -> OwnedKeyEventSpec {
    if ch == '\n' || ch == '\r' {
        return enter_key_event().into();
    }

    if ch.is_ascii_alphabetic() {
        let upper = ch.to_ascii_uppercase();
        let vk = UPPER_VK_BASE + (upper as i32 - 'A' as i32);
        let modifiers = if ch.is_ascii_uppercase() { modifiers::SHIFT } else { 0 };
        return OwnedKeyEventSpec {
            modifiers,
            windows_virtual_key_code: vk,
            key: ch.to_string(),
            code: format!("Key{upper}"),
        };
    }

    if ch.is_ascii_digit() {
        let vk = DIGIT_VK_BASE + (ch as i32 - '0' as i32);
        return OwnedKeyEventSpec {
            modifiers: 0,
            windows_virtual_key_code: vk,
            key: ch.to_string(),
            code: format!("Digit{ch}"),
        };
    }

    if let Some(spec) = shifted_symbol(ch) {
        return spec;
    }

    if let Some(spec) = plain_symbol(ch) {
        return spec;
    }

    // Unmapped printable character: rely on `text` carrying the glyph and a
    // best-effort "Unidentified" key/code pair.
    OwnedKeyEventSpec {
        modifiers: 0,
        windows_virtual_key_code: 0,
        key: ch.to_string(),
        code: "Unidentified".to_string(),
    }
}

pub fn enter_key_event() -> KeyEventSpec {
    KeyEventSpec {
        modifiers: 0,
        windows_virtual_key_code: 0x0D,
        key: "Enter",
        code: "Enter",
    }
}

pub fn backspace_key_event() -> KeyEventSpec {
    KeyEventSpec {
        modifiers: 0,
        windows_virtual_key_code: 0x08,
        key: "Backspace",
        code: "Backspace",
    }
}

pub fn delete_key_event() -> KeyEventSpec {
    KeyEventSpec {
        modifiers: 0,
        windows_virtual_key_code: 0x2E,
        key: "Delete",
        code: "Delete",
    }
}

fn plain_symbol(ch: char) -> Option<OwnedKeyEventSpec> {
    let (vk, code) = match ch {
        ' ' => (0x20, "Space"),
        '-' => (0xBD, "Minus"),
        '=' => (0xBB, "Equal"),
        '[' => (0xDB, "BracketLeft"),
        ']' => (0xDD, "BracketRight"),
        '\\' => (0xDC, "Backslash"),
        ';' => (0xBA, "Semicolon"),
        '\'' => (0xDE, "Quote"),
        ',' => (0xBC, "Comma"),
        '.' => (0xBE, "Period"),
        '/' => (0xBF, "Slash"),
        '`' => (0xC0, "Backquote"),
        _ => return None,
    };
    Some(OwnedKeyEventSpec {
        modifiers: 0,
        windows_virtual_key_code: vk,
        key: ch.to_string(),
        code: code.to_string(),
    })
}

fn shifted_symbol(ch: char) -> Option<OwnedKeyEventSpec> {
    let (vk, code) = match ch {
        '!' => (0x31, "Digit1"),
        '@' => (0x32, "Digit2"),
        '#' => (0x33, "Digit3"),
        '$' => (0x34, "Digit4"),
        '%' => (0x35, "Digit5"),
        '^' => (0x36, "Digit6"),
        '&' => (0x37, "Digit7"),
        '*' => (0x38, "Digit8"),
        '(' => (0x39, "Digit9"),
        ')' => (0x30, "Digit0"),
        '_' => (0xBD, "Minus"),
        '+' => (0xBB, "Equal"),
        '{' => (0xDB, "BracketLeft"),
        '}' => (0xDD, "BracketRight"),
        '|' => (0xDC, "Backslash"),
        ':' => (0xBA, "Semicolon"),
        '"' => (0xDE, "Quote"),
        '<' => (0xBC, "Comma"),
        '>' => (0xBE, "Period"),
        '?' => (0xBF, "Slash"),
        '~' => (0xC0, "Backquote"),
        _ => return None,
    };
    Some(OwnedKeyEventSpec {
        modifiers: modifiers::SHIFT,
        windows_virtual_key_code: vk,
        key: ch.to_string(),
        code: code.to_string(),
    })
}

/// Per-key typing delay used between each dispatched character (spec §4.E).
pub const PER_KEY_DELAY_MS: u64 = 18;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_letter_has_no_shift_modifier() {
        let spec = key_event_for_char('a');
        assert_eq!(spec.modifiers, 0);
        assert_eq!(spec.windows_virtual_key_code, 0x41);
        assert_eq!(spec.code, "KeyA");
    }

    #[test]
    fn uppercase_letter_carries_shift_modifier() {
        let spec = key_event_for_char('A');
        assert_eq!(spec.modifiers, modifiers::SHIFT);
        assert_eq!(spec.windows_virtual_key_code, 0x41);
    }

    #[test]
    fn digit_maps_to_digit_vk() {
        let spec = key_event_for_char('7');
        assert_eq!(spec.windows_virtual_key_code, 0x37);
        assert_eq!(spec.code, "Digit7");
    }

    #[test]
    fn shifted_symbol_carries_shift_and_base_digit_code() {
        let spec = key_event_for_char('!');
        assert_eq!(spec.modifiers, modifiers::SHIFT);
        assert_eq!(spec.code, "Digit1");
    }

    #[test]
    fn newline_resolves_to_enter() {
        let spec = key_event_for_char('\n');
        assert_eq!(spec.key, "Enter");
    }

    #[test]
    fn unmapped_character_falls_back_to_unidentified() {
        let spec = key_event_for_char('字');
        assert_eq!(spec.code, "Unidentified");
        assert_eq!(spec.key, "字");
    }
}
