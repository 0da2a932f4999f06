use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

const SUFFIX_LEN: usize = 6;

/// `<prefix>-<yyyymmddHHMMSSmmm>-<random>`: readable, sortable by creation
/// time, and unique even when one prefix is used many times per millisecond.
pub fn readable_id(prefix: &str, at: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}-{}-{}", slug(prefix), at.format("%Y%m%d%H%M%S%3f"), suffix)
}

/// Keep ids shell- and URL-friendly whatever the agent is called.
fn slug(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() { "agent".to_string() } else { slug.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_contains_agent_and_time() {
        let at = DateTime::parse_from_rfc3339("2024-03-05T10:11:12.345Z").unwrap().with_timezone(&Utc);
        let id = readable_id("Code Reviewer", at);
        assert!(id.starts_with("code-reviewer-20240305101112345-"), "{}", id);
    }

    #[test]
    fn test_ids_unique_within_same_millisecond() {
        let at = Utc::now();
        let ids: HashSet<String> = (0..500).map(|_| readable_id("coder", at)).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_slug_fallback() {
        assert_eq!(slug("  ***  "), "agent");
    }
}
