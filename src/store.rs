//! Workspace-level document store.
//!
//! The store owns the engine state for one workspace root: configuration,
//! the parsed model of every tracked document, and the shared identifier
//! registry. All task lookups and mutations go through it; mutations
//! re-read the document from disk, validate the target, write the edited
//! text back atomically and reparse, so the in-memory model never drifts
//! from the files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::discover;
use crate::duplicates::{self, DuplicateGroup};
use crate::edit::{apply_insertion, apply_line_edits};
use crate::error::{PrdError, Result};
use crate::id::IdAllocator;
use crate::line::LineClassifier;
use crate::ops;
use crate::parser;
use crate::task::{Heading, Task, TaskList};

/// Completion filter for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    /// Every task.
    #[default]
    All,
    /// Completed tasks only.
    Completed,
    /// Uncompleted tasks only.
    Uncompleted,
}

impl TaskFilter {
    fn keep(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Completed => task.completed,
            Self::Uncompleted => !task.completed,
        }
    }
}

impl std::str::FromStr for TaskFilter {
    type Err = PrdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "completed" | "done" => Ok(Self::Completed),
            "uncompleted" | "open" => Ok(Self::Uncompleted),
            other => Err(PrdError::InvalidConfig {
                field: "filter".to_string(),
                reason: format!("'{other}' is not one of all, completed, uncompleted"),
            }),
        }
    }
}

impl std::fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Completed => "completed",
            Self::Uncompleted => "uncompleted",
        };
        f.write_str(name)
    }
}

/// Where a created task lands in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateAnchor {
    /// After the document's last task line.
    #[default]
    End,
    /// On the line after the given one.
    AfterLine(usize),
    /// As the last entry of the section opened by the heading at the
    /// given line.
    UnderHeading(usize),
}

/// Flat, serializable view of one task, as returned by queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Stable identifier, absent only when auto-generation is off.
    pub id: Option<String>,
    /// Task description.
    pub text: String,
    /// Completion state.
    pub completed: bool,
    /// Assignee names, without the `@`.
    pub assignees: Vec<String>,
    /// Document the task lives in.
    pub document: PathBuf,
    /// Zero-based line index at last parse.
    pub line: usize,
    /// Enclosing heading chain, outermost first.
    pub headers: Vec<Heading>,
    /// Number of direct subtasks.
    pub children: usize,
}

impl TaskRecord {
    fn from_task(task: &Task, document: &Path) -> Self {
        Self {
            id: task.id.clone(),
            text: task.text.clone(),
            completed: task.completed,
            assignees: task.assignees.clone(),
            document: document.to_path_buf(),
            line: task.line,
            headers: task.headers.clone(),
            children: task.children.len(),
        }
    }
}

/// Engine state for one workspace root.
#[derive(Debug)]
pub struct DocumentStore {
    config: EngineConfig,
    documents: BTreeMap<PathBuf, TaskList>,
    allocator: IdAllocator,
    writing: bool,
}

impl DocumentStore {
    /// Create a store with explicit configuration and no tracked
    /// documents.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let allocator = IdAllocator::new(config.id_prefix.clone(), config.id_floor);
        Self {
            config,
            documents: BTreeMap::new(),
            allocator,
            writing: false,
        }
    }

    /// Open a workspace: load `prdtask.json` from `root`, discover task
    /// documents and parse them all.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or an unreadable document.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let config = EngineConfig::load(root)?;
        let mut store = Self::with_config(config);
        for path in discover::find_documents(root, &store.config.file_patterns)? {
            store.process_path(&path)?;
        }
        info!(documents = store.documents.len(), "workspace opened");
        Ok(store)
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Paths of all tracked documents, sorted.
    pub fn documents(&self) -> impl Iterator<Item = &Path> {
        self.documents.keys().map(PathBuf::as_path)
    }

    /// The parsed model of one tracked document.
    #[must_use]
    pub fn document(&self, path: &Path) -> Option<&TaskList> {
        self.documents.get(path)
    }

    /// Whether a document write is currently in flight.
    #[must_use]
    pub fn is_writing(&self) -> bool {
        self.writing
    }

    // =========================================================================
    // Document lifecycle
    // =========================================================================

    /// Read, parse and track a document, writing formatting corrections
    /// and generated identifiers back to disk in one pass.
    ///
    /// Reprocessing an already-tracked path releases its previous
    /// identifier claims first, so moved or deleted tasks free their
    /// identifiers.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or the corrections cannot be
    /// written.
    pub fn process_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let text =
            fs::read_to_string(&path).map_err(|e| PrdError::document(path.clone(), e))?;

        self.release_claims_of(&path);
        let outcome = parser::parse(&text, &self.config, &mut self.allocator);
        if let Some(fixed) = outcome.normalized_text(&text) {
            debug!(path = %path.display(), corrections = outcome.corrections.len(), "writing corrections");
            self.write_document(&path, &fixed)?;
        }
        self.documents.insert(path, outcome.list);
        Ok(())
    }

    /// Stop tracking a document, releasing its identifier claims.
    pub fn remove_document(&mut self, path: &Path) {
        self.release_claims_of(path);
        self.documents.remove(path);
    }

    fn release_claims_of(&mut self, path: &Path) {
        let Some(list) = self.documents.get(path) else {
            return;
        };
        let ids: Vec<String> = list.ids().map(str::to_string).collect();
        for id in &ids {
            self.allocator.release(id);
        }
    }

    /// Guarded write: at most one document write may be in flight per
    /// store.
    fn write_document(&mut self, path: &Path, text: &str) -> Result<()> {
        if self.writing {
            return Err(PrdError::EngineBusy {
                path: path.to_path_buf(),
            });
        }
        self.writing = true;
        let result = fs::write(path, text).map_err(|e| PrdError::document(path, e));
        self.writing = false;
        result
    }

    /// Write new text, release identifiers minted for it during the edit,
    /// and reparse so the registry reflects exactly what is on disk.
    fn commit(&mut self, path: &Path, text: &str, minted: &[String]) -> Result<()> {
        self.write_document(path, text)?;
        for id in minted {
            self.allocator.release(id);
        }
        self.process_path(path)
    }

    fn read_tracked(&self, path: &Path) -> Result<String> {
        if !self.documents.contains_key(path) {
            return Err(PrdError::document(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "document is not tracked"),
            ));
        }
        fs::read_to_string(path).map_err(|e| PrdError::document(path, e))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Find a task by identifier across all tracked documents.
    #[must_use]
    pub fn find_task(&self, id: &str) -> Option<(&Path, &Task)> {
        self.documents
            .iter()
            .find_map(|(path, list)| list.find(id).map(|t| (path.as_path(), t)))
    }

    /// Fetch one task as a record.
    ///
    /// # Errors
    ///
    /// Fails when the identifier is unknown.
    pub fn get_task(&self, id: &str) -> Result<TaskRecord> {
        self.find_task(id)
            .map(|(path, task)| TaskRecord::from_task(task, path))
            .ok_or_else(|| PrdError::task_not_found(id))
    }

    /// List tasks across all tracked documents, optionally restricted to
    /// one document, in document order.
    #[must_use]
    pub fn list_tasks(&self, filter: TaskFilter, document: Option<&Path>) -> Vec<TaskRecord> {
        self.documents
            .iter()
            .filter(|(path, _)| document.is_none_or(|d| d == path.as_path()))
            .flat_map(|(path, list)| {
                list.iter()
                    .filter(|t| filter.keep(t))
                    .map(|t| TaskRecord::from_task(t, path))
            })
            .collect()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Toggle a task's completion state and persist the change.
    ///
    /// # Errors
    ///
    /// Fails for an unknown identifier, or with a stale-target error when
    /// the file changed under the model.
    pub fn toggle_task(&mut self, id: &str) -> Result<TaskRecord> {
        let (path, line) = self.locate(id)?;
        let text = self.read_tracked(&path)?;
        let edit = ops::toggle_at_line(&text, line, Some(id), &self.config.id_prefix)?;
        let new_text = apply_line_edits(&text, &[edit]);
        self.commit(&path, &new_text, &[])?;
        self.get_task(id)
    }

    /// Set a task's assignee and persist the change.
    ///
    /// # Errors
    ///
    /// Fails for an unknown identifier or a stale target.
    pub fn assign_task(&mut self, id: &str, assignee: &str) -> Result<TaskRecord> {
        let (path, line) = self.locate(id)?;
        let text = self.read_tracked(&path)?;
        let edit = ops::assign_at_line(&text, line, Some(id), assignee, &self.config.id_prefix)?;
        let new_text = apply_line_edits(&text, &[edit]);
        self.commit(&path, &new_text, &[])?;
        self.get_task(id)
    }

    /// Remove all assignees from a task and persist the change.
    ///
    /// # Errors
    ///
    /// Fails for an unknown identifier or a stale target.
    pub fn unassign_task(&mut self, id: &str) -> Result<TaskRecord> {
        let (path, line) = self.locate(id)?;
        let text = self.read_tracked(&path)?;
        let edit = ops::unassign_at_line(&text, line, Some(id), &self.config.id_prefix)?;
        let new_text = apply_line_edits(&text, &[edit]);
        self.commit(&path, &new_text, &[])?;
        self.get_task(id)
    }

    /// Create a new task and persist it.
    ///
    /// With no document given, the first tracked document is used.
    ///
    /// # Errors
    ///
    /// Fails when no document is tracked, or the anchor is invalid.
    pub fn create_task(
        &mut self,
        text: &str,
        assignee: Option<&str>,
        document: Option<&Path>,
        anchor: CreateAnchor,
    ) -> Result<TaskRecord> {
        let path = match document {
            Some(d) => d.to_path_buf(),
            None => self
                .documents
                .keys()
                .next()
                .cloned()
                .ok_or(PrdError::NoDocuments)?,
        };
        let doc_text = self.read_tracked(&path)?;
        let outcome = match anchor {
            CreateAnchor::End => ops::insert_at_end(&doc_text, text, assignee, &mut self.allocator),
            CreateAnchor::AfterLine(line) => {
                ops::insert_after_line(&doc_text, line, text, assignee, &mut self.allocator)
            }
            CreateAnchor::UnderHeading(line) => {
                ops::insert_under_heading(&doc_text, line, text, assignee, &mut self.allocator)?
            }
        };
        let new_text = apply_insertion(&doc_text, &outcome.insertion);
        self.commit(&path, &new_text, std::slice::from_ref(&outcome.id))?;
        self.get_task(&outcome.id)
    }

    /// Create a new task nested under an existing one.
    ///
    /// # Errors
    ///
    /// Fails for an unknown parent identifier or a stale parent line.
    pub fn create_subtask(
        &mut self,
        parent_id: &str,
        text: &str,
        assignee: Option<&str>,
    ) -> Result<TaskRecord> {
        let (path, line) = self.locate(parent_id)?;
        let doc_text = self.read_tracked(&path)?;
        let outcome = ops::insert_as_subtask(
            &doc_text,
            line,
            Some(parent_id),
            text,
            assignee,
            &mut self.allocator,
        )?;
        let new_text = apply_insertion(&doc_text, &outcome.insertion);
        self.commit(&path, &new_text, std::slice::from_ref(&outcome.id))?;
        self.get_task(&outcome.id)
    }

    /// Convert the plain list item at `line` into a task.
    ///
    /// # Errors
    ///
    /// Fails when the line is not a convertible list item.
    pub fn convert_line(&mut self, path: &Path, line: usize) -> Result<TaskRecord> {
        let text = self.read_tracked(path)?;
        let (edit, id) = ops::convert_to_task(&text, line, &mut self.allocator)?;
        let new_text = apply_line_edits(&text, &[edit]);
        self.commit(path, &new_text, std::slice::from_ref(&id))?;
        self.get_task(&id)
    }

    /// Convert every plain list item in a document (or one heading's
    /// section) into tasks. Returns the number of conversions.
    ///
    /// # Errors
    ///
    /// Fails when `section` does not point at a heading.
    pub fn convert_all(&mut self, path: &Path, section: Option<usize>) -> Result<usize> {
        let text = self.read_tracked(path)?;
        let edits = match section {
            Some(heading_line) => {
                ops::convert_all_in_section(&text, heading_line, &mut self.allocator)?
            }
            None => ops::convert_all_in_document(&text, &mut self.allocator),
        };
        if edits.is_empty() {
            return Ok(0);
        }
        let classifier = LineClassifier::new(&self.config.id_prefix);
        let minted: Vec<String> = edits
            .iter()
            .filter_map(|e| classifier.parse_task(&e.text)?.id)
            .collect();
        let new_text = apply_line_edits(&text, &edits);
        let count = edits.len();
        self.commit(path, &new_text, &minted)?;
        Ok(count)
    }

    /// Convert a task back into a plain list item, freeing its
    /// identifier.
    ///
    /// # Errors
    ///
    /// Fails for an unknown identifier or a stale target.
    pub fn deconvert_line(&mut self, id: &str) -> Result<()> {
        let (path, line) = self.locate(id)?;
        let text = self.read_tracked(&path)?;
        let edit = ops::convert_to_list_item(&text, line, Some(id), &self.config.id_prefix)?;
        let new_text = apply_line_edits(&text, &[edit]);
        self.commit(&path, &new_text, &[])
    }

    // =========================================================================
    // Duplicates and normalization
    // =========================================================================

    /// Find duplicate identifiers within one document.
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be read.
    pub fn find_duplicates(&self, path: &Path) -> Result<Vec<DuplicateGroup>> {
        let text = self.read_tracked(path)?;
        Ok(duplicates::find_duplicates(&text, &self.config.id_prefix))
    }

    /// Rewrite duplicate identifier occurrences in one document. Returns
    /// the number of rewritten lines.
    ///
    /// The document's own claims are released first, so its first
    /// occurrences keep their identifiers; claims held by other tracked
    /// documents still force a rewrite.
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be read or written.
    pub fn fix_duplicates(&mut self, path: &Path) -> Result<usize> {
        let text = self.read_tracked(path)?;
        self.release_claims_of(path);
        let edits = duplicates::resolve(&text, &mut self.allocator);
        if edits.is_empty() {
            // Reclaim what was released.
            return self.process_path(path).map(|()| 0);
        }

        let classifier = LineClassifier::new(&self.config.id_prefix);
        let minted: Vec<String> = edits
            .iter()
            .filter_map(|e| classifier.parse_task(&e.text)?.id)
            .collect();
        let new_text = apply_line_edits(&text, &edits);
        let count = edits.len();
        info!(path = %path.display(), rewritten = count, "resolved duplicate identifiers");
        self.commit(path, &new_text, &minted)?;
        Ok(count)
    }

    /// Run the formatting pass over one document. Returns the number of
    /// corrected lines.
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be read or written.
    pub fn normalize(&mut self, path: &Path) -> Result<usize> {
        let text = self.read_tracked(path)?;
        let edits = ops::normalize_document(&text, &self.config.id_prefix);
        if edits.is_empty() {
            return Ok(0);
        }
        let new_text = apply_line_edits(&text, &edits);
        let count = edits.len();
        self.commit(path, &new_text, &[])?;
        Ok(count)
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Render a Markdown progress report across all tracked documents.
    #[must_use]
    pub fn progress_report(&self) -> String {
        let all = self.list_tasks(TaskFilter::All, None);
        let total = all.len();
        let completed = all.iter().filter(|t| t.completed).count();
        let percent = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };

        let mut report = String::new();
        report.push_str("# Task Progress Report\n\n");
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
        ));
        report.push_str(&format!(
            "**{completed} / {total} tasks completed ({percent:.0}%)**\n\n"
        ));

        report.push_str("## By Document\n\n");
        for (path, list) in &self.documents {
            let done = list.iter().filter(|t| t.completed).count();
            report.push_str(&format!(
                "- `{}`: {done} / {} completed\n",
                path.display(),
                list.len()
            ));
        }

        let mut by_assignee: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for task in &all {
            for assignee in &task.assignees {
                let entry = by_assignee.entry(assignee).or_default();
                entry.1 += 1;
                if task.completed {
                    entry.0 += 1;
                }
            }
        }
        if !by_assignee.is_empty() {
            report.push_str("\n## By Assignee\n\n");
            report.push_str("| Assignee | Completed | Total |\n");
            report.push_str("| --- | --- | --- |\n");
            for (assignee, (done, total)) in &by_assignee {
                report.push_str(&format!("| @{assignee} | {done} | {total} |\n"));
            }
        }
        report
    }

    fn locate(&self, id: &str) -> Result<(PathBuf, usize)> {
        self.find_task(id)
            .map(|(path, task)| (path.to_path_buf(), task.line))
            .ok_or_else(|| PrdError::task_not_found(id))
    }
}

// ============================================================================
// Tests
// ============================================================================
