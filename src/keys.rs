//! Keyboard input
//!
//! WebDriver encodes special keys as private-use code points inside the
//! string sent to an element. Names follow the usual WebDriver constants
//! (`TAB`, `ENTER`, `PAGE_DOWN`, ...); anything else is sent literally.

pub const NULL: char = '\u{E000}';
pub const TAB: char = '\u{E004}';
pub const ENTER: char = '\u{E007}';
pub const ESCAPE: char = '\u{E00C}';

/// Code point of a named key, case-insensitive
pub fn key_code(name: &str) -> Option<char> {
    let code = match name.to_ascii_uppercase().as_str() {
        "NULL" => 0xE000,
        "CANCEL" => 0xE001,
        "HELP" => 0xE002,
        "BACK_SPACE" => 0xE003,
        "TAB" => 0xE004,
        "CLEAR" => 0xE005,
        "RETURN" => 0xE006,
        "ENTER" => 0xE007,
        "SHIFT" => 0xE008,
        "CONTROL" => 0xE009,
        "ALT" => 0xE00A,
        "PAUSE" => 0xE00B,
        "ESCAPE" => 0xE00C,
        "SPACE" => 0xE00D,
        "PAGE_UP" => 0xE00E,
        "PAGE_DOWN" => 0xE00F,
        "END" => 0xE010,
        "HOME" => 0xE011,
        "LEFT" | "ARROW_LEFT" => 0xE012,
        "UP" | "ARROW_UP" => 0xE013,
        "RIGHT" | "ARROW_RIGHT" => 0xE014,
        "DOWN" | "ARROW_DOWN" => 0xE015,
        "INSERT" => 0xE016,
        "DELETE" => 0xE017,
        "SEMICOLON" => 0xE018,
        "EQUALS" => 0xE019,
        "F1" => 0xE031,
        "F2" => 0xE032,
        "F3" => 0xE033,
        "F4" => 0xE034,
        "F5" => 0xE035,
        "F6" => 0xE036,
        "F7" => 0xE037,
        "F8" => 0xE038,
        "F9" => 0xE039,
        "F10" => 0xE03A,
        "F11" => 0xE03B,
        "F12" => 0xE03C,
        "META" | "COMMAND" => 0xE03D,
        _ => return None,
    };
    char::from_u32(code)
}

/// A single key: its code point when named, else the text itself
pub fn parse_key(key: &str) -> String {
    match key_code(key) {
        Some(code) => code.to_string(),
        None => key.to_string(),
    }
}

/// Key press description, with `+` joining a chord such as `Control + a`
///
/// Chords are released with a trailing `NULL` so modifiers do not stick.
pub fn parse_keys(keys: &str) -> String {
    let parts: Vec<&str> = keys.split('+').map(str::trim).collect();
    if parts.len() > 1 && parts.iter().all(|p| !p.is_empty()) {
        let mut chord: String = parts.iter().map(|p| parse_key(p)).collect();
        chord.push(NULL);
        chord
    } else {
        parse_key(keys)
    }
}
