//! Structure-preserving mutation operations.
//!
//! Every operation reads the current document text, re-validates its
//! target against the task-item pattern (and expected identifier, when
//! one is known) and computes the smallest sufficient set of line
//! replacements or insertions. Nothing outside the target lines is ever
//! rewritten. A target that no longer matches fails with a stale-target
//! error instead of guessing.

use crate::edit::{Insertion, LineEdit};
use crate::error::{PrdError, Result};
use crate::id::IdAllocator;
use crate::line::{self, LineClassifier, LineKind, TaskLine};

/// A committed insertion: where the task line landed and which identifier
/// it received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// The freshly allocated identifier.
    pub id: String,
    /// Line index the task line will occupy after application.
    pub task_line: usize,
    /// The insertion to splice into the document.
    pub insertion: Insertion,
}

// ============================================================================
// Target Validation
// ============================================================================

fn lines_of(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Parse the task at `line`, checking bounds, the task pattern, and the
/// expected identifier when given.
fn validated_task(
    classifier: &LineClassifier,
    lines: &[&str],
    line: usize,
    expected_id: Option<&str>,
) -> Result<TaskLine> {
    let raw = *lines
        .get(line)
        .ok_or(PrdError::LineOutOfBounds {
            line,
            len: lines.len(),
        })?;
    let task = classifier
        .parse_task(raw)
        .ok_or(PrdError::NotATask { line })?;
    if let Some(expected) = expected_id {
        if task.id.as_deref() != Some(expected) {
            return Err(PrdError::stale_target(line, expected, task.id.clone()));
        }
    }
    Ok(task)
}

// ============================================================================
// Toggle
// ============================================================================

/// Flip a task's completion state, preserving indent, bullet, description,
/// assignees and identifier.
///
/// # Errors
///
/// Fails when the line is out of bounds, no longer a task item, or carries
/// a different identifier than expected.
pub fn toggle_at_line(
    text: &str,
    line: usize,
    expected_id: Option<&str>,
    prefix: &str,
) -> Result<LineEdit> {
    let classifier = LineClassifier::new(prefix);
    let lines = lines_of(text);
    let mut task = validated_task(&classifier, &lines, line, expected_id)?;
    let completed = task.completed();
    task.set_completed(!completed);
    Ok(LineEdit::new(line, task.render()))
}

// ============================================================================
// Assign
// ============================================================================

/// Set a task's assignee, inserting the token before the trailing
/// identifier.
///
/// When the line already carries assignees, only the first-found token is
/// replaced; any further tokens are kept as-is.
///
/// # Errors
///
/// Fails on a stale or non-task target line.
pub fn assign_at_line(
    text: &str,
    line: usize,
    expected_id: Option<&str>,
    assignee: &str,
    prefix: &str,
) -> Result<LineEdit> {
    let classifier = LineClassifier::new(prefix);
    let lines = lines_of(text);
    let mut task = validated_task(&classifier, &lines, line, expected_id)?;
    let clean = assignee.trim_start_matches('@').to_string();
    if task.assignees.is_empty() {
        task.assignees.push(clean);
    } else {
        task.assignees[0] = clean;
    }
    Ok(LineEdit::new(line, task.render()))
}

/// Remove every assignee token from a task line.
///
/// # Errors
///
/// Fails on a stale or non-task target line.
pub fn unassign_at_line(
    text: &str,
    line: usize,
    expected_id: Option<&str>,
    prefix: &str,
) -> Result<LineEdit> {
    let classifier = LineClassifier::new(prefix);
    let lines = lines_of(text);
    let mut task = validated_task(&classifier, &lines, line, expected_id)?;
    task.assignees.clear();
    Ok(LineEdit::new(line, task.render()))
}

// ============================================================================
// Insertion
// ============================================================================

/// Format a fully-formed task line.
#[must_use]
pub fn format_task_line(indent: &str, text: &str, assignee: Option<&str>, id: &str) -> String {
    let mut out = format!("{indent}- [ ] {text}");
    if let Some(assignee) = assignee {
        out.push_str(" @");
        out.push_str(assignee.trim_start_matches('@'));
    }
    out.push(' ');
    out.push_str(id);
    out
}

/// Whether inserting next to this line wants a separating blank line:
/// prose does, blanks, tasks and headings do not.
fn needs_blank_separator(line: &str) -> bool {
    !line.trim().is_empty() && !line::is_task_line(line) && !line::is_heading(line)
}

fn build_insertion(
    lines: &[&str],
    at: usize,
    task_line: String,
    blank_before: bool,
) -> InsertOutcome {
    // Identifier is the final token of the task line.
    let id = task_line
        .rsplit(' ')
        .next()
        .unwrap_or_default()
        .to_string();
    let mut inserted = Vec::new();
    if blank_before {
        inserted.push(String::new());
    }
    let task_offset = inserted.len();
    inserted.push(task_line);
    if at < lines.len() && needs_blank_separator(lines[at]) {
        inserted.push(String::new());
    }
    InsertOutcome {
        id,
        task_line: at + task_offset,
        insertion: Insertion {
            line: at,
            lines: inserted,
        },
    }
}

/// Insert a new top-level task on the line after the cursor.
///
/// A blank line is added before when the cursor line is prose, and after
/// when the following line is prose; blank runs are never duplicated.
pub fn insert_after_line(
    text: &str,
    cursor_line: usize,
    task_text: &str,
    assignee: Option<&str>,
    allocator: &mut IdAllocator,
) -> InsertOutcome {
    let lines = lines_of(text);
    let id = allocator.allocate();
    let task_line = format_task_line("", task_text, assignee, &id);
    let at = (cursor_line + 1).min(lines.len());
    let blank_before = lines
        .get(cursor_line)
        .is_some_and(|l| needs_blank_separator(l));
    build_insertion(&lines, at, task_line, blank_before)
}

/// Append a new top-level task after the document's last task line, or at
/// the very end when the document has none.
pub fn insert_at_end(
    text: &str,
    task_text: &str,
    assignee: Option<&str>,
    allocator: &mut IdAllocator,
) -> InsertOutcome {
    let lines = lines_of(text);
    let id = allocator.allocate();
    let task_line = format_task_line("", task_text, assignee, &id);
    let at = lines
        .iter()
        .rposition(|l| line::is_task_line(l))
        .map_or(lines.len(), |i| i + 1);
    build_insertion(&lines, at, task_line, false)
}

/// Insert a new task as the last entry of a heading's section.
///
/// The section runs to the next heading of the same or a higher level;
/// the task lands after the section's last non-empty line, with a blank
/// separator after the heading itself.
///
/// # Errors
///
/// Fails when `heading_line` is out of bounds or not a heading.
pub fn insert_under_heading(
    text: &str,
    heading_line: usize,
    task_text: &str,
    assignee: Option<&str>,
    allocator: &mut IdAllocator,
) -> Result<InsertOutcome> {
    let classifier = LineClassifier::new(allocator.prefix());
    let lines = lines_of(text);
    let raw = *lines
        .get(heading_line)
        .ok_or(PrdError::LineOutOfBounds {
            line: heading_line,
            len: lines.len(),
        })?;
    let LineKind::Heading(heading) = classifier.classify(raw) else {
        return Err(PrdError::NotAHeading { line: heading_line });
    };

    let section_end = lines
        .iter()
        .enumerate()
        .skip(heading_line + 1)
        .find_map(|(i, l)| match classifier.classify(l) {
            LineKind::Heading(h) if h.level <= heading.level => Some(i),
            _ => None,
        })
        .unwrap_or(lines.len());

    let anchor = (heading_line + 1..section_end)
        .rev()
        .find(|&i| !lines[i].trim().is_empty())
        .unwrap_or(heading_line);

    let id = allocator.allocate();
    let task_line = format_task_line("", task_text, assignee, &id);
    let at = anchor + 1;
    let blank_before = anchor == heading_line || needs_blank_separator(lines[anchor]);
    Ok(build_insertion(&lines, at, task_line, blank_before))
}

/// Insert a new task as the last subtask of the task at `parent_line`.
///
/// The child is indented two spaces past the parent and placed after the
/// parent's last descendant.
///
/// # Errors
///
/// Fails on a stale or non-task parent line.
pub fn insert_as_subtask(
    text: &str,
    parent_line: usize,
    expected_parent_id: Option<&str>,
    task_text: &str,
    assignee: Option<&str>,
    allocator: &mut IdAllocator,
) -> Result<InsertOutcome> {
    let classifier = LineClassifier::new(allocator.prefix());
    let lines = lines_of(text);
    let parent = validated_task(&classifier, &lines, parent_line, expected_parent_id)?;
    let parent_indent = parent.indent_width();

    // The subtask block is the contiguous run of deeper-indented tasks.
    let mut at = parent_line + 1;
    while at < lines.len() {
        match classifier.parse_task(lines[at]) {
            Some(t) if t.indent_width() > parent_indent => at += 1,
            _ => break,
        }
    }

    let id = allocator.allocate();
    let indent = format!("{}  ", parent.indent);
    let task_line = format_task_line(&indent, task_text, assignee, &id);
    Ok(build_insertion(&lines, at, task_line, false))
}

// ============================================================================
// Conversion
// ============================================================================

/// Convert a plain list item into a task: `- [ ] content ID`, bullet
/// normalized to `-`.
///
/// # Errors
///
/// Fails when the line is not a plain list item, is already a task, or
/// already carries an identifier token.
pub fn convert_to_task(
    text: &str,
    line: usize,
    allocator: &mut IdAllocator,
) -> Result<(LineEdit, String)> {
    let classifier = LineClassifier::new(allocator.prefix());
    let lines = lines_of(text);
    let raw = *lines.get(line).ok_or(PrdError::LineOutOfBounds {
        line,
        len: lines.len(),
    })?;
    let LineKind::ListItem(item) = classifier.classify(raw) else {
        return Err(PrdError::NotAListItem { line });
    };
    if item.content.trim().is_empty() || classifier.id_regex().is_match(&item.content) {
        return Err(PrdError::NotAListItem { line });
    }

    let id = allocator.allocate();
    let new_line = format!("{}- [ ] {} {}", item.indent, item.content, id);
    Ok((LineEdit::new(line, new_line), id))
}

/// Convert every plain list item in the document into a task.
///
/// Identifiers form a strictly increasing sequence above the current
/// maximum, in line order.
#[must_use]
pub fn convert_all_in_document(text: &str, allocator: &mut IdAllocator) -> Vec<LineEdit> {
    convert_range(text, 0, usize::MAX, allocator)
}

/// Convert every plain list item within a heading's section.
///
/// # Errors
///
/// Fails when `heading_line` is not a heading.
pub fn convert_all_in_section(
    text: &str,
    heading_line: usize,
    allocator: &mut IdAllocator,
) -> Result<Vec<LineEdit>> {
    let classifier = LineClassifier::new(allocator.prefix());
    let lines = lines_of(text);
    let raw = *lines
        .get(heading_line)
        .ok_or(PrdError::LineOutOfBounds {
            line: heading_line,
            len: lines.len(),
        })?;
    let LineKind::Heading(heading) = classifier.classify(raw) else {
        return Err(PrdError::NotAHeading { line: heading_line });
    };
    let section_end = lines
        .iter()
        .enumerate()
        .skip(heading_line + 1)
        .find_map(|(i, l)| match classifier.classify(l) {
            LineKind::Heading(h) if h.level <= heading.level => Some(i),
            _ => None,
        })
        .unwrap_or(lines.len());
    Ok(convert_range(text, heading_line + 1, section_end, allocator))
}

fn convert_range(
    text: &str,
    start: usize,
    end: usize,
    allocator: &mut IdAllocator,
) -> Vec<LineEdit> {
    let classifier = LineClassifier::new(allocator.prefix());
    let mut edits = Vec::new();
    for (line_no, raw) in text.split('\n').enumerate() {
        if line_no < start || line_no >= end {
            continue;
        }
        let LineKind::ListItem(item) = classifier.classify(raw) else {
            continue;
        };
        if item.content.trim().is_empty() || classifier.id_regex().is_match(&item.content) {
            continue;
        }
        let id = allocator.allocate();
        edits.push(LineEdit::new(
            line_no,
            format!("{}- [ ] {} {}", item.indent, item.content, id),
        ));
    }
    edits
}

/// Convert a task back into a plain list item: checkbox and identifier
/// are stripped, assignees are kept, the bullet is normalized to `-`.
///
/// # Errors
///
/// Fails on a stale or non-task target line.
pub fn convert_to_list_item(
    text: &str,
    line: usize,
    expected_id: Option<&str>,
    prefix: &str,
) -> Result<LineEdit> {
    let classifier = LineClassifier::new(prefix);
    let lines = lines_of(text);
    let task = validated_task(&classifier, &lines, line, expected_id)?;

    let mut out = format!("{}-", task.indent);
    if !task.text.is_empty() {
        out.push(' ');
        out.push_str(&task.text);
    }
    for assignee in &task.assignees {
        out.push_str(" @");
        out.push_str(assignee);
    }
    Ok(LineEdit::new(line, out))
}

// ============================================================================
// Normalization
// ============================================================================

/// Document-wide formatting pass: returns an edit for every task line
/// whose checkbox, identifier placement or spacing is irregular.
/// Idempotent - running it on its own output yields zero edits.
#[must_use]
pub fn normalize_document(text: &str, prefix: &str) -> Vec<LineEdit> {
    let classifier = LineClassifier::new(prefix);
    text.split('\n')
        .enumerate()
        .filter_map(|(line_no, raw)| {
            let normalized = classifier.normalize_task_line(raw)?;
            (normalized != raw).then(|| LineEdit::new(line_no, normalized))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
