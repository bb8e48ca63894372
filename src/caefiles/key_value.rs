//! Colon-delimited `key: value` lines shared by submission logs and READMEs.

/// Value part of a `key: value` line.
///
/// Splits on the first colon and trims the remainder. Returns an empty string
/// if the line has no colon or nothing follows it.
pub fn value_of(line: &str) -> String {
    match line.trim().split_once(':') {
        Some((_, value)) => value.trim().to_string(),
        None => String::new(),
    }
}
