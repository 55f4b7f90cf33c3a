//! Wildcard pattern matching.
//!
//! This module provides simple wildcard matching for exclusion patterns.
//! Supports `*` as a wildcard that matches any sequence of characters.

/// Match a string against a wildcard pattern.
///
/// The pattern can contain:
/// - `*` - matches any sequence of characters (including empty)
/// - Any other character - matches itself literally
///
/// # Examples
///
/// ```
/// use lochist_util::wildcard::matches;
///
/// assert!(matches("*.swp", "main.rs.swp"));
/// assert!(matches(".idea", ".idea"));
/// assert!(matches("*", "anything"));
/// assert!(!matches("*.swp", "main.rs"));
/// ```
pub fn matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` seen and the text index it currently absorbs up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        if pi < pattern.len() && pattern[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if pi < pattern.len() && pattern[pi] == text[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star, absorbed)) = backtrack {
            pi = star + 1;
            ti = absorbed + 1;
            backtrack = Some((star, ti));
        } else {
            return false;
        }
    }

    pattern[pi..].iter().all(|&c| c == '*')
}

/// Check if a name matches any of the patterns.
///
/// Returns the first matching pattern, or None if no match.
pub fn find_matching_pattern<'a, S: AsRef<str>>(patterns: &'a [S], text: &str) -> Option<&'a str> {
    patterns
        .iter()
        .map(AsRef::as_ref)
        .find(|&p| matches(p, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches(".gitignore", ".gitignore"));
        assert!(!matches(".gitignore", ".gitattributes"));
    }

    #[test]
    fn test_wildcard_start() {
        assert!(matches("*.rs", "main.rs"));
        assert!(matches("*.rs", ".rs"));
        assert!(!matches("*.rs", "main.py"));
    }

    #[test]
    fn test_wildcard_end() {
        assert!(matches("build*", "build"));
        assert!(matches("build*", "build-output"));
        assert!(!matches("build*", "rebuild"));
    }

    #[test]
    fn test_multiple_wildcards() {
        assert!(matches("*tmp*", "a.tmp.txt"));
        assert!(matches("*tmp*", "tmp"));
        assert!(!matches("*tmp*", "temp"));
    }

    #[test]
    fn test_just_wildcard() {
        assert!(matches("*", "anything"));
        assert!(matches("*", ""));
    }

    #[test]
    fn test_empty_pattern() {
        assert!(matches("", ""));
        assert!(!matches("", "something"));
    }

    #[test]
    fn test_consecutive_wildcards() {
        assert!(matches("**", "anything"));
        assert!(matches("a**b", "ab"));
        assert!(matches("a**b", "aXXXb"));
    }

    #[test]
    fn test_star_retries_after_partial_match() {
        assert!(matches("*ab", "aab"));
        assert!(matches("a*b*c", "abxbyc"));
        assert!(!matches("a*b*c", "abxbyd"));
    }

    #[test]
    fn test_many_wildcards_stay_fast() {
        let text = "a".repeat(200);
        let start = std::time::Instant::now();
        assert!(!matches("*a*a*a*a*a*a*b", &text));
        assert!(matches("*a*a*a*a*a*a*", &text));
        assert!(start.elapsed() < std::time::Duration::from_millis(100));
    }

    #[test]
    fn test_find_matching_pattern_returns_first_match() {
        let patterns = vec![".git".to_string(), "*.swp".to_string(), "*".to_string()];
        assert_eq!(find_matching_pattern(&patterns, ".git"), Some(".git"));
        assert_eq!(find_matching_pattern(&patterns, "a.swp"), Some("*.swp"));
        assert_eq!(find_matching_pattern(&patterns, "main.rs"), Some("*"));
    }

    #[test]
    fn test_find_matching_pattern_none() {
        let patterns = [".idea", "compare"];
        assert_eq!(find_matching_pattern(&patterns, "src"), None);
    }
}
