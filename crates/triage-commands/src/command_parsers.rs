use regex::Regex;

/// Token every authorization gate treats as an override.
pub const ADMIN_PERMISSION: &str = "admin";

/// Every permission token the grant command accepts. Anything else in a grant
/// request is dropped without comment.
pub const GRANT_PERMISSION_VOCABULARY: &[&str] = &[
    "admin",
    "open",
    "close",
    "label",
    "assign",
    "review",
    "lock",
    "issue",
    "issue:open",
    "issue:close",
    "issue:label",
    "issue:assign",
    "issue:lock",
    "pr",
    "pr:open",
    "pr:close",
    "pr:label",
    "pr:assign",
    "pr:review",
    "pr:lock",
    "ci",
    "travis",
    "appveyor",
];

/// Add/remove partition of requested tokens, already filtered to a valid set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenDiff {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl TokenDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Returns capture group `group` of `pattern` over `text`, if the text
/// matches.
pub fn capture_string(pattern: &Regex, text: &str, group: usize) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(group))
        .map(|capture| capture.as_str().to_string())
}

/// Splits a grant-command tail into add/remove permission tokens.
///
/// Tokens are whitespace-separated; a `-` prefix marks a removal. Tokens
/// outside `GRANT_PERMISSION_VOCABULARY` are dropped silently.
pub fn permission_changes(tail: &str) -> TokenDiff {
    partition_tokens(tail.split_whitespace().map(str::to_string), |token| {
        GRANT_PERMISSION_VOCABULARY.contains(&token)
    })
}

/// Splits a label-command tail into add/remove label names.
///
/// Entries are comma-separated and trimmed; a `-` prefix marks a removal.
/// Names absent from `repository_labels` are dropped silently.
pub fn label_changes(tail: &str, repository_labels: &[String]) -> TokenDiff {
    partition_tokens(
        tail.split(',').map(|entry| entry.trim().to_string()),
        |name| repository_labels.iter().any(|label| label == name),
    )
}

fn partition_tokens(
    candidates: impl Iterator<Item = String>,
    mut is_valid: impl FnMut(&str) -> bool,
) -> TokenDiff {
    let mut diff = TokenDiff::default();
    for candidate in candidates {
        if let Some(removal) = candidate.strip_prefix('-') {
            let removal = removal.trim();
            if is_valid(removal) {
                diff.remove.push(removal.to_string());
            }
        } else if is_valid(&candidate) {
            diff.add.push(candidate);
        }
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| label.to_string()).collect()
    }

    #[test]
    fn unit_permission_changes_partitions_by_removal_prefix() {
        let diff = permission_changes("issue -pr");
        assert_eq!(diff.add, vec!["issue".to_string()]);
        assert_eq!(diff.remove, vec!["pr".to_string()]);
    }

    #[test]
    fn unit_permission_changes_collects_multiple_additions() {
        let diff = permission_changes("issue pr");
        assert_eq!(diff.add, vec!["issue".to_string(), "pr".to_string()]);
        assert!(diff.remove.is_empty());
    }

    #[test]
    fn unit_permission_changes_drops_unknown_tokens() {
        let diff = permission_changes("foo issue -bar -pr:label");
        assert_eq!(diff.add, vec!["issue".to_string()]);
        assert_eq!(diff.remove, vec!["pr:label".to_string()]);
    }

    #[test]
    fn unit_permission_changes_of_unrecognized_input_is_empty() {
        let diff = permission_changes("foo -bar");
        assert!(diff.is_empty());
    }

    #[test]
    fn unit_permission_changes_handles_empty_tail() {
        assert!(permission_changes("").is_empty());
        assert!(permission_changes("   ").is_empty());
    }

    #[test]
    fn unit_permission_changes_accepts_scoped_tokens() {
        let diff = permission_changes("issue:label -pr:review admin");
        assert_eq!(
            diff.add,
            vec!["issue:label".to_string(), "admin".to_string()]
        );
        assert_eq!(diff.remove, vec!["pr:review".to_string()]);
    }

    #[test]
    fn unit_label_changes_validates_against_repository_set() {
        let repository = owned(&["bug", "docs", "feature"]);
        let diff = label_changes("bug, -docs, unknown", &repository);
        assert_eq!(diff.add, vec!["bug".to_string()]);
        assert_eq!(diff.remove, vec!["docs".to_string()]);
    }

    #[test]
    fn unit_label_changes_trims_entries_and_removal_names() {
        let repository = owned(&["needs triage", "blocked"]);
        let diff = label_changes("  needs triage ,  - blocked ", &repository);
        assert_eq!(diff.add, vec!["needs triage".to_string()]);
        assert_eq!(diff.remove, vec!["blocked".to_string()]);
    }

    #[test]
    fn unit_label_changes_with_no_valid_entries_is_empty() {
        let repository = owned(&["bug"]);
        assert!(label_changes("typo, -missing", &repository).is_empty());
        assert!(label_changes("", &repository).is_empty());
    }

    #[test]
    fn unit_capture_string_returns_requested_group() {
        let pattern = Regex::new(r"(?i)^!close\s+#?(\d+)").expect("pattern");
        assert_eq!(
            capture_string(&pattern, "!close #9999", 1),
            Some("9999".to_string())
        );
        assert_eq!(
            capture_string(&pattern, "!CLOSE 12", 1),
            Some("12".to_string())
        );
        assert_eq!(capture_string(&pattern, "!close", 1), None);
    }

    #[test]
    fn regression_grant_vocabulary_keeps_admin_and_scoped_families() {
        assert!(GRANT_PERMISSION_VOCABULARY.contains(&ADMIN_PERMISSION));
        for family in ["issue", "pr"] {
            assert!(GRANT_PERMISSION_VOCABULARY.contains(&family));
            assert!(GRANT_PERMISSION_VOCABULARY
                .contains(&format!("{family}:label").as_str()));
        }
    }
}
