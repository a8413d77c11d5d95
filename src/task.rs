//! In-memory task model.
//!
//! A parsed document yields a [`TaskList`]: an arena of [`Task`] records
//! forming a forest. The arena owns every task; parent/child links are
//! plain indices into it, so back-references cannot dangle or cycle. The
//! whole list is rebuilt atomically on every parse - the identifier is the
//! only field that is stable across reparses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One entry of a task's enclosing heading chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heading {
    /// Heading text.
    pub text: String,
    /// Heading level, 1-6.
    pub level: u8,
    /// Zero-based line index at time of parse.
    pub line: usize,
}

/// Index of a task within its [`TaskList`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskIndex(usize);

/// One checkbox task item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Stable identifier, absent when the line carries none and
    /// auto-generation is disabled.
    pub id: Option<String>,
    /// Trimmed description, excluding checkbox, assignees and identifier.
    pub text: String,
    /// Completion state derived from the checkbox.
    pub completed: bool,
    /// Assignee names, without the `@`.
    pub assignees: Vec<String>,
    /// Zero-based line index at time of last parse. A cache, invalidated
    /// by any edit that inserts or deletes lines above it.
    pub line: usize,
    /// Enclosing heading chain, outermost first.
    pub headers: Vec<Heading>,
    /// Child tasks, nested by indentation. Owned links.
    pub children: Vec<TaskIndex>,
    /// Non-owning back-reference to the parent.
    pub parent: Option<TaskIndex>,
}

impl Task {
    /// First assignee, if any.
    #[must_use]
    pub fn assignee(&self) -> Option<&str> {
        self.assignees.first().map(String::as_str)
    }
}

/// The parsed task forest of one document.
#[derive(Debug, Clone, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
    roots: Vec<TaskIndex>,
    by_id: HashMap<String, TaskIndex>,
}

impl TaskList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks in the forest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the forest is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Append a task. With no parent it becomes a root; otherwise it is
    /// attached as the parent's last child. Tasks with an identifier are
    /// registered in the id index.
    pub fn push(&mut self, mut task: Task, parent: Option<TaskIndex>) -> TaskIndex {
        let index = TaskIndex(self.tasks.len());
        task.parent = parent;
        if let Some(id) = &task.id {
            self.by_id.insert(id.clone(), index);
        }
        self.tasks.push(task);
        match parent {
            Some(p) => self.tasks[p.0].children.push(index),
            None => self.roots.push(index),
        }
        index
    }

    /// Get a task by index.
    #[must_use]
    pub fn get(&self, index: TaskIndex) -> &Task {
        &self.tasks[index.0]
    }

    /// Top-level tasks in document order.
    #[must_use]
    pub fn roots(&self) -> &[TaskIndex] {
        &self.roots
    }

    /// All tasks in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Indices of all tasks in document order.
    pub fn indices(&self) -> impl Iterator<Item = TaskIndex> {
        (0..self.tasks.len()).map(TaskIndex)
    }

    /// Look up a task index by identifier.
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<TaskIndex> {
        self.by_id.get(id).copied()
    }

    /// Look up a task by identifier.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Task> {
        self.index_of(id).map(|i| self.get(i))
    }

    /// Identifiers of every task in the list.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.by_id.keys().map(String::as_str)
    }

    /// Last line occupied by a task or any of its descendants. Used to
    /// find the end of a subtask block for insertions.
    #[must_use]
    pub fn last_descendant_line(&self, index: TaskIndex) -> usize {
        let task = self.get(index);
        task.children
            .iter()
            .map(|&c| self.last_descendant_line(c))
            .fold(task.line, usize::max)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, line: usize) -> Task {
        Task {
            id: Some(id.to_string()),
            text: format!("task {id}"),
            completed: false,
            assignees: Vec::new(),
            line,
            headers: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    #[test]
    fn test_push_root_and_child() {
        let mut list = TaskList::new();
        let parent = list.push(task("PRD-100001", 0), None);
        let child = list.push(task("PRD-100002", 1), Some(parent));

        assert_eq!(list.roots(), &[parent]);
        assert_eq!(list.get(parent).children, vec![child]);
        assert_eq!(list.get(child).parent, Some(parent));
    }

    #[test]
    fn test_find_by_id() {
        let mut list = TaskList::new();
        list.push(task("PRD-100001", 0), None);

        assert_eq!(list.find("PRD-100001").unwrap().line, 0);
        assert!(list.find("PRD-999999").is_none());
    }

    #[test]
    fn test_task_without_id_is_not_indexed() {
        let mut list = TaskList::new();
        let mut t = task("PRD-100001", 0);
        t.id = None;
        list.push(t, None);

        assert_eq!(list.len(), 1);
        assert_eq!(list.ids().count(), 0);
    }

    #[test]
    fn test_last_descendant_line() {
        let mut list = TaskList::new();
        let root = list.push(task("PRD-100001", 0), None);
        let child = list.push(task("PRD-100002", 1), Some(root));
        list.push(task("PRD-100003", 2), Some(child));
        list.push(task("PRD-100004", 5), Some(root));

        assert_eq!(list.last_descendant_line(root), 5);
        assert_eq!(list.last_descendant_line(child), 2);
    }

    #[test]
    fn test_assignee_helper() {
        let mut t = task("PRD-100001", 0);
        assert!(t.assignee().is_none());
        t.assignees = vec!["alice".into(), "bob".into()];
        assert_eq!(t.assignee(), Some("alice"));
    }
}
