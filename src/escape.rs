//! Reversible escaping for quoted text fields.
//!
//! Subject and body text is stored inside double quotes in the archive
//! metadata file, and also fed to the message digest in escaped form, so
//! the transform must be exactly reversible and stable across releases.

/// Escape control characters and quotes in a text field.
///
/// Ampersand and backslash are routed through transient markers so that
/// the backslash sequences introduced for `\n`, `\r` and `"` cannot be
/// confused with backslashes already present in the input.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('\\', "&backslash;")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('"', "\\\"")
        .replace("&backslash;", "\\\\")
        .replace("&amp;", "&")
}

/// Reverse [`escape`].
///
/// Literal ampersands are marked first so input that happens to contain
/// the text `&backslash;` cannot collide with the transient marker.
pub fn unescape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace("\\\\", "&backslash;")
        .replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\\"", "\"")
        .replace("&backslash;", "\\")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(s: &str) {
        assert_eq!(unescape(&escape(s)), s, "round-trip failed for {s:?}");
    }

    #[test]
    fn test_escape_newline() {
        assert_eq!(escape("a\nb"), "a\\nb");
    }

    #[test]
    fn test_escape_carriage_return() {
        assert_eq!(escape("a\rb"), "a\\rb");
    }

    #[test]
    fn test_escape_quote() {
        assert_eq!(escape("say \"hi\""), "say \\\"hi\\\"");
    }

    #[test]
    fn test_escape_backslash() {
        assert_eq!(escape("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_escape_ampersand_passes_through() {
        assert_eq!(escape("a&b"), "a&b");
    }

    #[test]
    fn test_backslash_n_is_not_newline() {
        // A literal backslash followed by 'n' must stay distinct from a
        // real newline after the round trip.
        let literal = "a\\nb";
        let real = "a\nb";
        assert_ne!(escape(literal), escape(real));
        roundtrip(literal);
        roundtrip(real);
    }

    #[test]
    fn test_roundtrip_combinations() {
        roundtrip("");
        roundtrip("plain text");
        roundtrip("amp & backslash \\ mixed");
        roundtrip("quote \" newline \n cr \r");
        roundtrip("&backslash; literal marker text");
        roundtrip("&amp; literal marker text");
        roundtrip("\\\\ double \\n triple \\\\\\");
        roundtrip("trailing backslash \\");
    }
}
