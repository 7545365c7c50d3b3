use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Strips every HTML tag from user text and returns it as plain text.
///
/// Ammonia drops the markup and escapes what is left; decoding the entities
/// afterwards gives back the literal characters the user typed, so clients
/// can render the result as text without double escaping.
pub fn sanitize_plain_text(input: &str) -> String {
    let cleaned = ammonia::Builder::new()
        .tags(HashSet::new())
        .strip_comments(true)
        .clean(input)
        .to_string();
    html_escape::decode_html_entities(&cleaned).trim().to_string()
}

fn tag_disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9-]+").expect("static tag regex"))
}

/// Turns free-form tags into lowercase slugs, dropping empties and duplicates
/// while keeping the first-seen order.
pub fn normalize_tags(raw_tags: &[String], max_tags: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    raw_tags
        .iter()
        .map(|tag| {
            let lowered = sanitize_plain_text(tag).to_lowercase().replace(' ', "-");
            tag_disallowed_chars()
                .replace_all(&lowered, "")
                .trim_matches('-')
                .to_string()
        })
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .take(max_tags)
        .collect()
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("static email regex"))
}

/// Loose shape check: something@something.something.
pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_but_keeps_text() {
        assert_eq!(
            sanitize_plain_text("  I <b>really</b> miss <script>alert(1)</script>them & us  "),
            "I really miss them & us"
        );
    }

    #[test]
    fn tags_become_unique_slugs() {
        let raw = vec![
            "Mental Health".to_string(),
            "mental-health".to_string(),
            "  ".to_string(),
            "<i>Hope!</i>".to_string(),
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "d".to_string(),
        ];
        assert_eq!(normalize_tags(&raw, 5), vec!["mental-health", "hope", "a", "b", "c"]);
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("someone@example.com"));
        assert!(!is_valid_email("someone@example"));
        assert!(!is_valid_email("not an email"));
    }
}
