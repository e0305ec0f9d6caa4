//! Small string and path helpers shared by the prompt builders and the mapper

/// Truncate a string to at most `max_bytes`, backing off to a UTF-8 char boundary.
///
/// Java sources routinely carry non-ASCII string literals, so slicing at a raw
/// byte offset would panic.
///
/// ```
/// use vulnlens::utils::truncate_to_char_boundary;
///
/// assert_eq!(truncate_to_char_boundary("onCreate", 2), "on");
/// assert_eq!(truncate_to_char_boundary("añb", 2), "a");
/// ```
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Normalize a path for comparison: forward slashes, lowercase
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

/// Non-empty components of a normalized path
pub fn path_components(normalized: &str) -> Vec<&str> {
    normalized.split('/').filter(|p| !p.is_empty()).collect()
}

/// Join names into a comma separated list of at most `limit` entries
pub fn join_limited(names: &[String], limit: usize) -> String {
    let shown: Vec<&str> = names.iter().take(limit).map(String::as_str).collect();
    if names.len() > limit {
        format!("{}, ...", shown.join(", "))
    } else {
        shown.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_input_untouched() {
        assert_eq!(truncate_to_char_boundary("class A {}", 100), "class A {}");
        assert_eq!(truncate_to_char_boundary("", 0), "");
    }

    #[test]
    fn test_truncate_backs_off_multibyte() {
        // 'ü' occupies bytes 1..3
        let s = "Müller";
        assert_eq!(truncate_to_char_boundary(s, 2), "M");
        assert_eq!(truncate_to_char_boundary(s, 3), "Mü");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("C:\\App\\src\\main\\java\\Com\\BankLogin.java"),
            "c:/app/src/main/java/com/banklogin.java"
        );
    }

    #[test]
    fn test_path_components_skips_empty() {
        assert_eq!(path_components("/a//b/c.java"), vec!["a", "b", "c.java"]);
    }

    #[test]
    fn test_join_limited() {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(join_limited(&names, 5), "a, b, c");
        assert_eq!(join_limited(&names, 2), "a, b, ...");
        assert_eq!(join_limited(&[], 2), "");
    }
}
