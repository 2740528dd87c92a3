use std::collections::HashSet;

pub const DEFAULT_TITLE: &str = "Secret Santa";

/// Turn free-form participant input into a clean roster.
///
/// Entries are separated by newlines or commas, trimmed, and deduplicated
/// case-insensitively with the first spelling winning. Order is kept.
pub fn sanitize_names(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(['\n', ','])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(str::to_string)
        .collect()
}

pub fn normalize_title(raw: &str) -> String {
    let title = raw.trim();
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_newlines_and_commas() {
        let roster = sanitize_names("Alice\r\nBob, Carol\n\n  Dave  ,,");
        assert_eq!(roster, vec!["Alice", "Bob", "Carol", "Dave"]);
    }

    #[test]
    fn dedupes_ignoring_case_keeping_first_spelling() {
        let roster = sanitize_names("Léa\nbob\nLÉA\nBob\nCarol");
        assert_eq!(roster, vec!["Léa", "bob", "Carol"]);
    }

    #[test]
    fn blank_input_is_empty() {
        assert!(sanitize_names("  \n , \r\n").is_empty());
    }

    #[test]
    fn title_falls_back_when_blank() {
        assert_eq!(normalize_title("   "), DEFAULT_TITLE);
        assert_eq!(normalize_title("  Team Winter  "), "Team Winter");
    }
}
