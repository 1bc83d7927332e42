//! Conversation key resolver.
//!
//! Only legacy shared records (one record for both participants) carry a key.
//! The canonical schema identifies a conversation by owner store + partner email.

pub const KEY_SEPARATOR: &str = "::";

/// Derives the key of the unordered pair `{a, b}`.
///
/// `conversation_key(a, b) == conversation_key(b, a)` for every input,
/// including `a == b`.
pub fn conversation_key(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{first}{KEY_SEPARATOR}{second}")
}

/// Recovers both participants from a legacy key.
///
/// Returns `None` unless the key has exactly two non-empty halves.
pub fn split_key(key: &str) -> Option<(String, String)> {
    let (a, b) = key.split_once(KEY_SEPARATOR)?;
    if a.is_empty() || b.is_empty() || b.contains(KEY_SEPARATOR) {
        return None;
    }
    Some((a.to_string(), b.to_string()))
}
