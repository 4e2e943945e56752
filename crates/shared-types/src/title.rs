//! Name normalization for matching catalog titles with remote objects.

/// Number of characters compared when matching names.
pub const DISPLAY_KEY_LIMIT: usize = 25;

/// Hard cap for calendar entry descriptions.
pub const DESCRIPTION_LIMIT: usize = 1000;

/// Keep the first `limit` characters of `s`. No ellipsis is added.
pub fn truncate_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Matching key for a title or remote name: trimmed, then capped at
/// [`DISPLAY_KEY_LIMIT`] characters.
///
/// Two titles sharing the same key refer to the same remote object.
pub fn display_key(name: &str) -> &str {
    truncate_chars(name.trim(), DISPLAY_KEY_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_strings() {
        assert_eq!(truncate_chars("pwn", 25), "pwn");
        assert_eq!(truncate_chars("", 25), "");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("äöüß", 2), "äö");
        assert_eq!(truncate_chars("🚩🚩🚩", 1), "🚩");
    }

    #[test]
    fn test_display_key_trims_before_capping() {
        assert_eq!(display_key("  Foo CTF  "), "Foo CTF");
        assert_eq!(
            display_key("  An Extremely Long Capture The Flag 2024"),
            "An Extremely Long Capture"
        );
    }

    #[test]
    fn test_display_key_collides_at_limit() {
        let a = display_key("Some Really Long Event Name Quals");
        let b = display_key("Some Really Long Event Name Finals");
        assert_eq!(a, b);
        assert_eq!(a.chars().count(), DISPLAY_KEY_LIMIT);
    }

    #[test]
    fn test_description_cap() {
        let description = "x".repeat(1500);
        assert_eq!(truncate_chars(&description, DESCRIPTION_LIMIT).len(), 1000);
    }
}
