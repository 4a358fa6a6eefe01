use regex::Regex;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s_]+").expect("valid separator regex"));

/// Derives an event slug from its display name.
///
/// Lowercases, drops anything that is not a word character, whitespace or
/// hyphen, and joins the remaining words with underscores.
#[must_use]
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, "");
    let joined = SEPARATORS.replace_all(cleaned.trim(), "_");
    joined.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Payment Received!"), "payment_received");
        assert_eq!(slugify("Welcome"), "welcome");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  order -- shipped  now "), "order_shipped_now");
        assert_eq!(slugify("already_snake_case"), "already_snake_case");
    }

    #[test]
    fn test_slugify_drops_punctuation() {
        assert_eq!(slugify("Reset (password) #2"), "reset_password_2");
        assert_eq!(slugify("!!!"), "");
    }
}
