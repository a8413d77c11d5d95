//! Document parsing: raw Markdown text to a task forest.
//!
//! A single forward pass over the lines drives two explicit stacks, both
//! local to the call: the heading stack (pushing level L pops everything
//! at level >= L) and the indentation nesting stack for parent/child
//! links. Formatting irregularities are repaired along the way and
//! reported as line corrections; the parser never writes the document
//! itself.

use std::collections::HashSet;

use tracing::debug;

use crate::config::EngineConfig;
use crate::edit::{apply_line_edits, LineEdit};
use crate::id::IdAllocator;
use crate::line::{LineClassifier, LineKind};
use crate::task::{Heading, Task, TaskIndex, TaskList};

/// Result of parsing one document.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    /// The parsed task forest.
    pub list: TaskList,
    /// Line rewrites needed to normalize formatting or append generated
    /// identifiers. To be applied by the caller as one atomic rewrite,
    /// followed by a reparse for a fully consistent model.
    pub corrections: Vec<LineEdit>,
}

impl ParseOutcome {
    /// The document text with all corrections applied, or `None` when the
    /// input was already clean.
    #[must_use]
    pub fn normalized_text(&self, original: &str) -> Option<String> {
        if self.corrections.is_empty() {
            None
        } else {
            Some(apply_line_edits(original, &self.corrections))
        }
    }
}

/// Parse document text into a task forest.
///
/// Identifiers accepted here are claimed in the allocator as they are
/// seen; callers tracking several documents release a document's previous
/// identifiers before reparsing it. With `cross_document_ids` enabled, an
/// identifier already claimed elsewhere makes the line a duplicate: the
/// task is skipped for this pass (resolution is a separate, explicit
/// operation) without disturbing the heading or nesting context.
pub fn parse(text: &str, config: &EngineConfig, allocator: &mut IdAllocator) -> ParseOutcome {
    let classifier = LineClassifier::new(&config.id_prefix);

    let mut outcome = ParseOutcome::default();
    let mut heading_stack: Vec<Heading> = Vec::new();
    let mut nesting: Vec<(TaskIndex, usize)> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (line_no, raw) in text.split('\n').enumerate() {
        let mut line = raw.to_string();

        // Formatting repair happens before classification so malformed
        // checkboxes ("[]", "[x ]") become parseable task lines.
        if config.normalize_checkboxes {
            if let Some(normalized) = classifier.normalize_task_line(&line) {
                if normalized != line {
                    outcome
                        .corrections
                        .push(LineEdit::new(line_no, normalized.clone()));
                    line = normalized;
                }
            }
        }

        match classifier.classify(&line) {
            LineKind::Heading(h) => {
                while heading_stack
                    .last()
                    .is_some_and(|top| top.level >= h.level)
                {
                    heading_stack.pop();
                }
                heading_stack.push(Heading {
                    text: h.text,
                    level: h.level,
                    line: line_no,
                });
            }
            LineKind::Task(mut task_line) => {
                let mut generated = false;
                if task_line.id.is_none() && config.auto_generate_ids {
                    task_line.id = Some(allocator.allocate());
                    outcome
                        .corrections
                        .push(LineEdit::new(line_no, task_line.render()));
                    generated = true;
                }

                if let Some(id) = &task_line.id {
                    if !generated {
                        let claimed_elsewhere =
                            config.cross_document_ids && allocator.contains(id);
                        if seen.contains(id) || claimed_elsewhere {
                            // Duplicate: skip this task, leaving the
                            // heading and nesting stacks untouched.
                            debug!(id, line = line_no, "skipping duplicate identifier");
                            continue;
                        }
                        allocator.claim(id.clone());
                    }
                    seen.insert(id.clone());
                }

                let indent = task_line.indent_width();
                while nesting.last().is_some_and(|&(_, d)| d >= indent) {
                    nesting.pop();
                }
                let parent = nesting.last().map(|&(idx, _)| idx);

                let task = Task {
                    id: task_line.id.clone(),
                    text: task_line.text.clone(),
                    completed: task_line.completed(),
                    assignees: task_line.assignees.clone(),
                    line: line_no,
                    headers: heading_stack.clone(),
                    children: Vec::new(),
                    parent: None,
                };
                let index = outcome.list.push(task, parent);
                nesting.push((index, indent));
            }
            _ => {}
        }
    }

    debug!(
        tasks = outcome.list.len(),
        corrections = outcome.corrections.len(),
        "parsed document"
    );
    outcome
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_default(text: &str) -> ParseOutcome {
        let config = EngineConfig::default();
        let mut allocator = IdAllocator::default();
        parse(text, &config, &mut allocator)
    }

    fn parse_no_autogen(text: &str) -> ParseOutcome {
        let config = EngineConfig {
            auto_generate_ids: false,
            ..Default::default()
        };
        let mut allocator = IdAllocator::default();
        parse(text, &config, &mut allocator)
    }

    // ========================================================================
    // Basic Parsing Tests
    // ========================================================================

    #[test]
    fn test_parse_empty_document() {
        let outcome = parse_default("");
        assert!(outcome.list.is_empty());
        assert!(outcome.corrections.is_empty());
    }

    #[test]
    fn test_parse_single_task() {
        let outcome = parse_default("- [ ] do the thing PRD-100001");
        assert_eq!(outcome.list.len(), 1);
        let task = outcome.list.find("PRD-100001").unwrap();
        assert_eq!(task.text, "do the thing");
        assert!(!task.completed);
        assert_eq!(task.line, 0);
    }

    #[test]
    fn test_parse_completed_and_assignees() {
        let outcome = parse_default("- [x] review @alice @bob PRD-100001");
        let task = outcome.list.find("PRD-100001").unwrap();
        assert!(task.completed);
        assert_eq!(task.assignees, vec!["alice".to_string(), "bob".to_string()]);
    }

    // ========================================================================
    // Heading Scoping Tests
    // ========================================================================

    #[test]
    fn test_heading_stack_scoping() {
        let text = "# A\n## B\n- [ ] t1 PRD-100001\n# C\n- [ ] t2 PRD-100002";
        let outcome = parse_no_autogen(text);

        let t1 = outcome.list.find("PRD-100001").unwrap();
        let chain: Vec<(&str, u8)> = t1
            .headers
            .iter()
            .map(|h| (h.text.as_str(), h.level))
            .collect();
        assert_eq!(chain, vec![("A", 1), ("B", 2)]);

        let t2 = outcome.list.find("PRD-100002").unwrap();
        let chain: Vec<(&str, u8)> = t2
            .headers
            .iter()
            .map(|h| (h.text.as_str(), h.level))
            .collect();
        assert_eq!(chain, vec![("C", 1)]);
    }

    #[test]
    fn test_sibling_heading_replaces_same_level() {
        let text = "## A\n## B\n- [ ] t PRD-100001";
        let outcome = parse_no_autogen(text);
        let task = outcome.list.find("PRD-100001").unwrap();
        assert_eq!(task.headers.len(), 1);
        assert_eq!(task.headers[0].text, "B");
    }

    // ========================================================================
    // Nesting Tests
    // ========================================================================

    #[test]
    fn test_nesting_parent_child_sibling() {
        let text = "- [ ] parent PRD-100001\n  - [ ] child PRD-100002\n- [ ] sibling PRD-100003";
        let outcome = parse_no_autogen(text);

        assert_eq!(outcome.list.roots().len(), 2);
        let parent = outcome.list.find("PRD-100001").unwrap();
        assert_eq!(parent.children.len(), 1);
        let child = outcome.list.get(parent.children[0]);
        assert_eq!(child.id.as_deref(), Some("PRD-100002"));

        let sibling = outcome.list.find("PRD-100003").unwrap();
        assert!(sibling.children.is_empty());
        assert!(sibling.parent.is_none());
    }

    #[test]
    fn test_nesting_tab_indent_counts_as_four() {
        let text = "- [ ] parent PRD-100001\n\t- [ ] child PRD-100002\n  - [ ] also child PRD-100003";
        let outcome = parse_no_autogen(text);

        // Tab (4) nests under the root; two spaces (2) pops the tab entry
        // but stays under the root.
        let parent = outcome.list.find("PRD-100001").unwrap();
        assert_eq!(parent.children.len(), 2);
    }

    #[test]
    fn test_nesting_deep_chain() {
        let text = "- [ ] a PRD-100001\n  - [ ] b PRD-100002\n    - [ ] c PRD-100003";
        let outcome = parse_no_autogen(text);

        assert_eq!(outcome.list.roots().len(), 1);
        let a = outcome.list.find("PRD-100001").unwrap();
        let b = outcome.list.get(a.children[0]);
        assert_eq!(b.children.len(), 1);
        let c = outcome.list.get(b.children[0]);
        assert_eq!(c.id.as_deref(), Some("PRD-100003"));
    }

    // ========================================================================
    // Normalization Correction Tests
    // ========================================================================

    #[test]
    fn test_malformed_checkbox_produces_correction() {
        let outcome = parse_no_autogen("- [] task PRD-100001");
        assert_eq!(outcome.corrections.len(), 1);
        assert_eq!(outcome.corrections[0].text, "- [ ] task PRD-100001");
        // The task still parses in the same pass.
        assert!(outcome.list.find("PRD-100001").is_some());
    }

    #[test]
    fn test_normalized_text_application() {
        let text = "- [x ] a PRD-100001\n- [ ] b PRD-100002";
        let outcome = parse_no_autogen(text);
        let fixed = outcome.normalized_text(text).unwrap();
        assert_eq!(fixed, "- [x] a PRD-100001\n- [ ] b PRD-100002");
    }

    #[test]
    fn test_clean_document_has_no_corrections() {
        let text = "- [ ] a PRD-100001\n- [x] b PRD-100002";
        let outcome = parse_no_autogen(text);
        assert!(outcome.corrections.is_empty());
        assert!(outcome.normalized_text(text).is_none());
    }

    #[test]
    fn test_normalization_disabled_leaves_lines() {
        let config = EngineConfig {
            auto_generate_ids: false,
            normalize_checkboxes: false,
            ..Default::default()
        };
        let mut allocator = IdAllocator::default();
        let outcome = parse("- [x ] task PRD-100001", &config, &mut allocator);
        assert!(outcome.corrections.is_empty());
    }

    // ========================================================================
    // Identifier Generation Tests
    // ========================================================================

    #[test]
    fn test_auto_generate_missing_id() {
        let outcome = parse_default("- [ ] no id yet");
        assert_eq!(outcome.list.len(), 1);
        let task = outcome.list.find("PRD-100001").unwrap();
        assert_eq!(task.text, "no id yet");
        assert_eq!(outcome.corrections.len(), 1);
        assert_eq!(outcome.corrections[0].text, "- [ ] no id yet PRD-100001");
    }

    #[test]
    fn test_auto_generate_continues_above_existing_max() {
        let text = "- [ ] has id PRD-100005\n- [ ] needs id";
        let outcome = parse_default(text);
        assert!(outcome.list.find("PRD-100006").is_some());
    }

    #[test]
    fn test_auto_generate_preserves_bullet() {
        let outcome = parse_default("* [ ] starred");
        assert_eq!(outcome.corrections.len(), 2);
        // Normalization rewrites the bullet first; the id lands on the
        // normalized line.
        assert_eq!(outcome.corrections[1].text, "- [ ] starred PRD-100001");
    }

    #[test]
    fn test_no_autogen_keeps_task_unindexed() {
        let outcome = parse_no_autogen("- [ ] no id");
        assert_eq!(outcome.list.len(), 1);
        assert_eq!(outcome.list.ids().count(), 0);
        assert!(outcome.corrections.is_empty());
    }

    // ========================================================================
    // Duplicate Handling Tests
    // ========================================================================

    #[test]
    fn test_duplicate_in_document_skipped() {
        let text = "- [ ] first PRD-100001\n- [ ] second PRD-100001";
        let outcome = parse_no_autogen(text);
        assert_eq!(outcome.list.len(), 1);
        assert_eq!(outcome.list.find("PRD-100001").unwrap().text, "first");
    }

    #[test]
    fn test_duplicate_claimed_elsewhere_skipped() {
        let config = EngineConfig {
            auto_generate_ids: false,
            ..Default::default()
        };
        let mut allocator = IdAllocator::default();
        allocator.claim("PRD-100001");
        let outcome = parse("- [ ] mine PRD-100001", &config, &mut allocator);
        assert!(outcome.list.is_empty());
    }

    #[test]
    fn test_cross_document_check_can_be_disabled() {
        let config = EngineConfig {
            auto_generate_ids: false,
            cross_document_ids: false,
            ..Default::default()
        };
        let mut allocator = IdAllocator::default();
        allocator.claim("PRD-100001");
        let outcome = parse("- [ ] mine PRD-100001", &config, &mut allocator);
        assert_eq!(outcome.list.len(), 1);
    }

    #[test]
    fn test_duplicate_skip_preserves_context() {
        let text = "\
# Section
- [ ] parent PRD-100001
  - [ ] dup PRD-100001
  - [ ] child PRD-100002";
        let outcome = parse_no_autogen(text);

        // The skipped line resets neither the heading stack nor the
        // nesting stack: PRD-100002 is still a child of the parent.
        let parent = outcome.list.find("PRD-100001").unwrap();
        assert_eq!(parent.text, "parent");
        assert_eq!(parent.children.len(), 1);
        let child = outcome.list.get(parent.children[0]);
        assert_eq!(child.id.as_deref(), Some("PRD-100002"));
        assert_eq!(child.headers[0].text, "Section");
    }

    #[test]
    fn test_parse_claims_seen_ids() {
        let config = EngineConfig::default();
        let mut allocator = IdAllocator::default();
        parse("- [ ] a PRD-100001", &config, &mut allocator);
        assert!(allocator.contains("PRD-100001"));
    }
}
