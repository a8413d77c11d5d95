//! Line-level edit primitives.
//!
//! Every mutation in this crate reduces to replacing whole lines or
//! splicing new lines in at one position. Edits are applied in a single
//! pass so the document never exists in a half-rewritten state, and lines
//! outside an edit's target are carried over byte for byte.

use serde::Serialize;

/// Replacement of one line's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEdit {
    /// Zero-based line index.
    pub line: usize,
    /// Full replacement text for that line.
    pub text: String,
}

impl LineEdit {
    /// Create a line replacement.
    #[must_use]
    pub fn new(line: usize, text: impl Into<String>) -> Self {
        Self {
            line,
            text: text.into(),
        }
    }
}

/// New lines spliced in before the given line index.
///
/// `line` may equal the line count, which appends at the end of the
/// document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// Zero-based index the new lines are inserted before.
    pub line: usize,
    /// Lines to insert, without trailing newlines.
    pub lines: Vec<String>,
}

/// Apply line replacements atomically. Edits addressing lines beyond the
/// end of the document are ignored.
#[must_use]
pub fn apply_line_edits(text: &str, edits: &[LineEdit]) -> String {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    for edit in edits {
        if edit.line < lines.len() {
            lines[edit.line] = edit.text.clone();
        }
    }
    lines.join("\n")
}

/// Splice an insertion into the document.
#[must_use]
pub fn apply_insertion(text: &str, insertion: &Insertion) -> String {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    let at = insertion.line.min(lines.len());
    lines.splice(at..at, insertion.lines.iter().cloned());
    lines.join("\n")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_line_edits_replaces_only_targets() {
        let text = "a\nb\nc";
        let out = apply_line_edits(text, &[LineEdit::new(1, "B")]);
        assert_eq!(out, "a\nB\nc");
    }

    #[test]
    fn test_apply_line_edits_multiple_atomic() {
        let text = "a\nb\nc\nd";
        let edits = vec![LineEdit::new(0, "A"), LineEdit::new(3, "D")];
        assert_eq!(apply_line_edits(text, &edits), "A\nb\nc\nD");
    }

    #[test]
    fn test_apply_line_edits_out_of_bounds_ignored() {
        assert_eq!(apply_line_edits("a\nb", &[LineEdit::new(9, "X")]), "a\nb");
    }

    #[test]
    fn test_apply_insertion_middle() {
        let ins = Insertion {
            line: 1,
            lines: vec!["x".into(), "y".into()],
        };
        assert_eq!(apply_insertion("a\nb", &ins), "a\nx\ny\nb");
    }

    #[test]
    fn test_apply_insertion_append() {
        let ins = Insertion {
            line: 2,
            lines: vec!["x".into()],
        };
        assert_eq!(apply_insertion("a\nb", &ins), "a\nb\nx");
    }

    #[test]
    fn test_untouched_lines_byte_identical() {
        let text = "a \n\tb\t\n  c";
        let out = apply_line_edits(text, &[LineEdit::new(0, "A")]);
        assert_eq!(out, "A\n\tb\t\n  c");
    }
}
