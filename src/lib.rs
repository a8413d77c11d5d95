//! prdtask - Markdown-embedded task tracking engine
//!
//! Tasks live as checkbox list items inside ordinary Markdown documents,
//! each carrying a stable `PRD-NNNNNN` identifier. The engine parses
//! those documents into a task forest, keeps identifiers unique across
//! the workspace, and applies mutations as minimal line edits so the
//! surrounding Markdown is never reflowed.
//!
//! # Architecture
//!
//! - [`line`] - per-line classification and token decomposition
//! - [`parser`] - document text to task forest, with formatting repair
//! - [`id`] - identifier allocation and the cross-document registry
//! - [`ops`] - toggle, assign, insert, convert and normalize operations
//! - [`duplicates`] - duplicate identifier detection and resolution
//! - [`store`] - workspace facade tying documents, config and ids together
//! - [`server`] - line-delimited JSON service over the store
//!
//! # Example
//!
//! ```rust,ignore
//! use prdtask::{DocumentStore, TaskFilter};
//!
//! let mut store = DocumentStore::open(".")?;
//! for task in store.list_tasks(TaskFilter::Uncompleted, None) {
//!     println!("{}: {}", task.id.as_deref().unwrap_or("-"), task.text);
//! }
//! store.toggle_task("PRD-100001")?;
//! ```

pub mod config;
pub mod discover;
pub mod duplicates;
pub mod edit;
pub mod error;
pub mod id;
pub mod line;
pub mod ops;
pub mod parser;
pub mod server;
pub mod store;
pub mod task;

// Re-export commonly used types
pub use config::EngineConfig;
pub use duplicates::{find_duplicates, resolve, DuplicateGroup};
pub use edit::{apply_insertion, apply_line_edits, Insertion, LineEdit};
pub use error::{PrdError, Result};
pub use id::IdAllocator;
pub use parser::{parse, ParseOutcome};
pub use store::{CreateAnchor, DocumentStore, TaskFilter, TaskRecord};
pub use task::{Heading, Task, TaskIndex, TaskList};
