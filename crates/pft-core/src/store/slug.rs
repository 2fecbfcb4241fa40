//! Title slugs used for file names and duplicate matching.

const MAX_SLUG_CHARS: usize = 40;

/// Lowercase, hyphenated form of a title.
///
/// Letters (including diacritics) and digits are kept, every other run of
/// characters collapses into one `-`, and the result is capped at 40
/// characters.
pub fn slug_from_title(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_dash = false;
    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }

    let slug: String = slug.trim_matches('-').chars().take(MAX_SLUG_CHARS).collect();
    slug.trim_end_matches('-').to_string()
}

/// Slug portion of a local file stem (`UC001-user-login` -> `user-login`).
pub fn slug_from_file_stem(stem: &str) -> Option<&str> {
    stem.split_once('-')
        .map(|(_, slug)| slug)
        .filter(|slug| !slug.is_empty())
}

/// Bidirectional, case-insensitive containment check between two slugs.
///
/// Empty slugs never match; an empty string is contained in everything.
pub fn slugs_overlap(left: &str, right: &str) -> bool {
    let left = left.to_lowercase();
    let right = right.to_lowercase();
    if left.is_empty() || right.is_empty() {
        return false;
    }
    left.contains(&right) || right.contains(&left)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_from_title_examples() {
        let cases = [
            ("Simple Title", "simple-title"),
            ("Hello World!", "hello-world"),
            ("Přidej tmavý režim", "přidej-tmavý-režim"),
            ("  Extra   Spaces  ", "extra-spaces"),
            (
                "Very Long Title That Should Be Truncated To Maximum Forty Characters",
                "very-long-title-that-should-be-truncated",
            ),
            ("!!!", ""),
        ];
        for (title, expected) in cases {
            assert_eq!(slug_from_title(title), expected, "title: {title}");
        }
    }

    #[test]
    fn slug_from_file_stem_skips_prefix() {
        assert_eq!(slug_from_file_stem("UC001-user-login"), Some("user-login"));
        assert_eq!(slug_from_file_stem("UC001-"), None);
        assert_eq!(slug_from_file_stem("README"), None);
    }

    #[test]
    fn slugs_overlap_in_both_directions() {
        assert!(slugs_overlap("user-login", "login"));
        assert!(slugs_overlap("login", "User-Login"));
        assert!(!slugs_overlap("export", "login"));
        assert!(!slugs_overlap("", "login"));
    }
}
