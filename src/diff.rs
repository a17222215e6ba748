//! Diff generation for previewing migrations.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::path::Path;

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Generates a unified diff between two strings.
pub fn unified_diff(original: &str, modified: &str, path: &Path) -> String {
    render(original, modified, path, false)
}

/// Unified diff with ANSI colors for terminal display.
pub fn colorized_diff(original: &str, modified: &str, path: &Path) -> String {
    render(original, modified, path, true)
}

fn render(original: &str, modified: &str, path: &Path, color: bool) -> String {
    let diff = TextDiff::from_lines(original, modified);
    let (header, reset) = if color { (CYAN, RESET) } else { ("", "") };
    let mut output = format!(
        "{header}--- a/{path}{reset}\n{header}+++ b/{path}{reset}\n",
        path = path.display()
    );

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            output.push('\n');
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let (sign, tint) = match change.tag() {
                    ChangeTag::Delete => ("-", RED),
                    ChangeTag::Insert => ("+", GREEN),
                    ChangeTag::Equal => (" ", ""),
                };
                if color && !tint.is_empty() {
                    output.push_str(&format!("{tint}{sign}{}{RESET}", change.value()));
                } else {
                    output.push_str(sign);
                    output.push_str(change.value());
                }
                if change.missing_newline() {
                    output.push('\n');
                }
            }
        }
    }

    output
}

/// Line counts over one or more changed files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl DiffSummary {
    /// Creates a summary from original and modified content.
    pub fn from_diff(original: &str, modified: &str) -> Self {
        let diff = TextDiff::from_lines(original, modified);
        let mut insertions = 0;
        let mut deletions = 0;

        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => insertions += 1,
                ChangeTag::Delete => deletions += 1,
                ChangeTag::Equal => {}
            }
        }

        Self {
            files_changed: usize::from(insertions > 0 || deletions > 0),
            insertions,
            deletions,
        }
    }

    /// Combines two summaries.
    pub fn merge(&mut self, other: &DiffSummary) {
        self.files_changed += other.files_changed;
        self.insertions += other.insertions;
        self.deletions += other.deletions;
    }
}

impl std::fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} file(s) changed, {} insertions(+), {} deletions(-)",
            self.files_changed, self.insertions, self.deletions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_diff_marks_changed_lines() {
        let diff = unified_diff("a\nb\n", "a\nc\n", Path::new("A.java"));
        assert!(diff.starts_with("--- a/A.java\n+++ b/A.java\n"));
        assert!(diff.contains("-b\n"));
        assert!(diff.contains("+c\n"));
        assert!(diff.contains(" a\n"));
    }

    #[test]
    fn test_summary_counts_and_merges() {
        let mut summary = DiffSummary::from_diff("a\nb\n", "a\nc\nd\n");
        assert_eq!(summary.insertions, 2);
        assert_eq!(summary.deletions, 1);
        summary.merge(&DiffSummary::from_diff("x\n", "x\n"));
        assert_eq!(summary.files_changed, 1);
    }
}
