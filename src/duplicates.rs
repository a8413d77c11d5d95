//! Duplicate identifier detection and resolution.
//!
//! Detection is a read-only query returning groups in first-seen order.
//! Resolution rewrites the identifier token (and nothing else) on every
//! occurrence after the first, pulling replacements from the allocator so
//! they stay unique across all tracked documents. Resolution is
//! idempotent: a second pass over resolved text yields zero edits.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::edit::LineEdit;
use crate::id::IdAllocator;
use crate::line::{LineClassifier, LineKind};

/// One identifier used on more than one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// The repeated identifier.
    pub id: String,
    /// Zero-based line indices, ascending.
    pub lines: Vec<usize>,
}

/// Find every identifier used by more than one task line.
///
/// Groups are returned in first-seen order of the identifier; tasks
/// without an identifier are ignored.
#[must_use]
pub fn find_duplicates(text: &str, prefix: &str) -> Vec<DuplicateGroup> {
    let classifier = LineClassifier::new(prefix);
    let mut order: Vec<String> = Vec::new();
    let mut lines_by_id: HashMap<String, Vec<usize>> = HashMap::new();

    for (line_no, line) in text.split('\n').enumerate() {
        let LineKind::Task(task) = classifier.classify(line) else {
            continue;
        };
        let Some(id) = task.id else {
            continue;
        };
        let entry = lines_by_id.entry(id.clone()).or_default();
        if entry.is_empty() {
            order.push(id);
        }
        entry.push(line_no);
    }

    order
        .into_iter()
        .filter_map(|id| {
            let lines = lines_by_id.remove(&id)?;
            (lines.len() >= 2).then_some(DuplicateGroup { id, lines })
        })
        .collect()
}

/// Compute the line edits that give every duplicate occurrence a fresh
/// identifier.
///
/// The allocator's claimed set stands in for "identifiers used anywhere
/// else": a caller tracking several documents releases this document's own
/// identifiers first, so only genuine cross-document claims remain. The
/// first unclaimed occurrence of an identifier keeps it; later occurrences
/// get `allocate_after` replacements. Only the identifier token changes -
/// indent, bullet, checkbox, description and assignees are carried over
/// verbatim.
#[must_use]
pub fn resolve(text: &str, allocator: &mut IdAllocator) -> Vec<LineEdit> {
    let classifier = LineClassifier::new(allocator.prefix());
    let mut local: HashSet<String> = HashSet::new();
    let mut edits = Vec::new();

    for (line_no, line) in text.split('\n').enumerate() {
        let LineKind::Task(task) = classifier.classify(line) else {
            continue;
        };
        let Some(id) = task.id else {
            continue;
        };

        if local.contains(&id) || allocator.contains(&id) {
            let replacement = allocator.allocate_after(&id);
            debug!(old = %id, new = %replacement, line = line_no, "rewriting duplicate identifier");
            local.insert(replacement.clone());
            edits.push(LineEdit::new(
                line_no,
                replace_id_token(line, &id, &replacement),
            ));
        } else {
            local.insert(id);
        }
    }

    edits
}

/// Substitute the trailing identifier token in a line, leaving every other
/// byte untouched.
fn replace_id_token(line: &str, old: &str, new: &str) -> String {
    match line.rfind(old) {
        Some(at) => {
            let mut out = String::with_capacity(line.len() + new.len() - old.len());
            out.push_str(&line[..at]);
            out.push_str(new);
            out.push_str(&line[at + old.len()..]);
            out
        }
        None => line.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
