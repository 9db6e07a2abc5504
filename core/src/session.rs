//! Session string parsing.
//!
//! The conversational front end identifies a conversation with a resource
//! path such as `projects/p/agent/sessions/abc123/contexts/ongoing-order`.
//! Orders in flight are keyed by the part of that path that names the
//! session.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)] // Constant pattern, covered by the tests below
static SESSION_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*?/sessions/(.*?)/contexts/").expect("session pattern is valid"));

/// Return the session-scoped prefix of `session`, up to and including `/contexts/`.
///
/// The span starts at the beginning of the line holding the first match.
/// Returns an empty string when there is no match.
///
/// # Examples
///
/// ```
/// use food_order_core::extract_session_path;
///
/// assert_eq!(
///     extract_session_path("https://x/sessions/abc123/contexts/y"),
///     "https://x/sessions/abc123/contexts/",
/// );
/// assert_eq!(extract_session_path("no-match"), "");
/// ```
#[must_use]
pub fn extract_session_path(session: &str) -> String {
    SESSION_PATH
        .find(session)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Return only the `<id>` segment between `/sessions/` and `/contexts/`.
#[must_use]
pub fn extract_session_id(session: &str) -> Option<&str> {
    SESSION_PATH
        .captures(session)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_pattern_compiles() {
        assert_eq!(SESSION_PATH.captures_len(), 2);
    }

    #[test]
    fn extracts_span_through_contexts_delimiter() {
        assert_eq!(
            extract_session_path("https://x/sessions/abc123/contexts/y"),
            "https://x/sessions/abc123/contexts/"
        );
    }

    #[test]
    fn no_match_is_empty() {
        assert_eq!(extract_session_path("no-match"), "");
        assert_eq!(extract_session_path("/sessions/abc123/no-contexts"), "");
        assert_eq!(extract_session_id("no-match"), None);
    }

    #[test]
    fn first_contexts_delimiter_wins() {
        let session = "projects/p/agent/sessions/s-1/contexts/ongoing-order/contexts/other";
        assert_eq!(
            extract_session_path(session),
            "projects/p/agent/sessions/s-1/contexts/"
        );
    }

    #[test]
    fn id_is_the_captured_segment() {
        let session = "projects/food-bot/agent/sessions/8f1c-22/contexts/ongoing-order";
        assert_eq!(extract_session_id(session), Some("8f1c-22"));
    }

    #[test]
    fn empty_id_still_matches() {
        assert_eq!(extract_session_path("/sessions//contexts/"), "/sessions//contexts/");
        assert_eq!(extract_session_id("/sessions//contexts/"), Some(""));
    }
}
