pub const MAX_TITLE_CHARS: usize = 100;
/// Leaves room for `_HHMMSS_<n>.txt` under the usual 255-byte name limit.
pub const MAX_TITLE_BYTES: usize = 200;
pub const UNTITLED: &str = "untitled_article";
pub const UNKNOWN_SOURCE: &str = "unknown_source";

fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim_end()
        .replace(' ', "_")
}

/// File-name stem for an article title.
pub fn sanitize_filename(title: &str) -> String {
    let mut cleaned = String::new();
    for c in clean(title).chars().take(MAX_TITLE_CHARS) {
        if cleaned.len() + c.len_utf8() > MAX_TITLE_BYTES {
            break;
        }
        cleaned.push(c);
    }
    if cleaned.is_empty() {
        UNTITLED.to_string()
    } else {
        cleaned
    }
}

/// Directory name for a source.
pub fn sanitize_source(source: &str) -> String {
    let cleaned = clean(source);
    if cleaned.is_empty() {
        UNKNOWN_SOURCE.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_punctuation() {
        assert_eq!(sanitize_filename("Breaking: A/B?"), "Breaking_AB");
        assert_eq!(sanitize_filename("  Leading and trailing  "), "__Leading_and_trailing");
        assert_eq!(sanitize_filename("Café-owner_speaks"), "Café-owner_speaks");
    }

    #[test]
    fn test_sanitize_filename_empty_and_long() {
        assert_eq!(sanitize_filename("?!/"), UNTITLED);
        assert_eq!(sanitize_filename(""), UNTITLED);

        let long = "word ".repeat(60);
        let name = sanitize_filename(&long);
        assert_eq!(name.chars().count(), MAX_TITLE_CHARS);
        assert!(name.starts_with("word_word_"));
    }

    #[test]
    fn test_sanitize_filename_byte_budget() {
        let name = sanitize_filename(&"经".repeat(120));
        assert!(name.len() <= MAX_TITLE_BYTES);
        assert_eq!(name.chars().count(), 66);

        let mixed = format!("a{}", "é".repeat(150));
        let name = sanitize_filename(&mixed);
        assert_eq!(name.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(name.len(), 1 + 99 * 2);
    }

    #[test]
    fn test_sanitize_source() {
        assert_eq!(sanitize_source("BBC News"), "BBC_News");
        assert_eq!(sanitize_source("Al Jazeera (English)"), "Al_Jazeera_English");
        assert_eq!(sanitize_source("***"), UNKNOWN_SOURCE);
        assert_eq!(sanitize_source(&"x".repeat(150)).len(), 150);
    }
}
