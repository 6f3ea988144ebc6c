//! Utility functions for common operations.

/// Names Windows refuses as file stems regardless of extension.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Makes a human-readable title safe to use as a file name.
///
/// Path separators, characters Windows forbids, and control characters
/// become `_`; runs of `_` collapse; surrounding spaces, dots and
/// underscores are trimmed. Everything else, including non-Latin
/// letters, is kept.
pub fn sanitize_filename(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let c = if is_forbidden(c) { '_' } else { c };
        if c == '_' {
            if !prev_underscore {
                cleaned.push(c);
            }
            prev_underscore = true;
        } else {
            cleaned.push(c);
            prev_underscore = false;
        }
    }

    let mut cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "untitled".to_string();
    }
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(&cleaned)) {
        cleaned.push('_');
    }
    cleaned
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}
