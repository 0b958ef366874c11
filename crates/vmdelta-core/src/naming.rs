/// Decoration marker vCenter operators put on display names to flag a state.
pub const DECORATION_MARKER: char = '*';

/// Map a raw display name to its comparison identity.
///
/// Every `*` is removed, then surrounding whitespace is trimmed. Everything
/// that compares or persists machine names must go through this function.
pub fn normalize(raw_name: &str) -> String {
    raw_name
        .chars()
        .filter(|c| *c != DECORATION_MARKER)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Descriptor file stem for an identity: lowercase, `_` and spaces become `-`.
pub fn file_stem(identity: &str) -> String {
    identity.to_lowercase().replace(['_', ' '], "-")
}

/// Whether a user-supplied selector names this identity.
///
/// The selector is normalized like a display name and compared case-insensitively.
pub fn selector_matches(selector: &str, identity: &str) -> bool {
    normalize(selector).to_lowercase() == identity.to_lowercase()
}
