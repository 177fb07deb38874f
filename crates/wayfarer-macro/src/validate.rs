//! File name validation for the persisted macro store (spec's "Persisted
//! state layout").

use crate::errors::MacroError;

const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const RESERVED_DEVICE_NAMES: &[&str] =
    &["CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9"];

/// Validates a macro name used as (part of) a persisted file name: rejects
/// `<>:"/\|?*`, control characters, names outside 3-100 characters, and
/// reserved Windows device names (case-insensitive, ignoring any extension).
pub fn validate_macro_name(name: &str) -> Result<(), MacroError> {
    let len = name.chars().count();
    if !(3..=100).contains(&len) {
        return Err(MacroError::InvalidFileName { name: name.to_string(), reason: "name length must be 3-100 characters".into() });
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control()) {
        return Err(MacroError::InvalidFileName { name: name.to_string(), reason: format!("forbidden character {c:?}") });
    }
    let stem = name.split('.').next().unwrap_or(name);
    if RESERVED_DEVICE_NAMES.iter().any(|reserved| reserved.eq_ignore_ascii_case(stem)) {
        return Err(MacroError::InvalidFileName { name: name.to_string(), reason: "reserved device name".into() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_forbidden_characters() {
        assert!(validate_macro_name("check/out").is_err());
        assert!(validate_macro_name("a<b>c").is_err());
    }

    #[test]
    fn rejects_short_and_long_names() {
        assert!(validate_macro_name("ab").is_err());
        assert!(validate_macro_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn rejects_reserved_device_names() {
        assert!(validate_macro_name("CON").is_err());
        assert!(validate_macro_name("com3").is_err());
        assert!(validate_macro_name("lpt9.json").is_err());
    }

    #[test]
    fn accepts_ordinary_names() {
        assert!(validate_macro_name("login flow").is_ok());
        assert!(validate_macro_name("checkout-macro").is_ok());
    }
}
