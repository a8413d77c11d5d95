//! Custom error types for prdtask.
//!
//! Parsing-level irregularities (malformed checkboxes, missing identifiers)
//! are absorbed into the task model and never surface here. This module
//! covers the failures that callers must handle explicitly: stale mutation
//! targets, unknown tasks, and unreadable or unwritable documents.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for prdtask operations
#[derive(Error, Debug)]
pub enum PrdError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // =========================================================================
    // Document Errors
    // =========================================================================
    /// Reading or writing a tracked document failed
    #[error("Document {path}: {source}")]
    Document {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No tracked document available for the operation
    #[error("No task documents found in workspace")]
    NoDocuments,

    // =========================================================================
    // Mutation Errors
    // =========================================================================
    /// Task identifier not present in any tracked document
    #[error("Task {id} not found")]
    TaskNotFound { id: String },

    /// Target line index no longer exists in the document
    #[error("Line {line} out of bounds (document has {len} lines)")]
    LineOutOfBounds { line: usize, len: usize },

    /// Target line does not match the task-item pattern
    #[error("Line {line} is not a task item")]
    NotATask { line: usize },

    /// Target line does not match the plain list-item pattern
    #[error("Line {line} is not a convertible list item")]
    NotAListItem { line: usize },

    /// Target line does not match the heading pattern
    #[error("Line {line} is not a heading")]
    NotAHeading { line: usize },

    /// Line content changed between read and write
    #[error("Stale target at line {line}: expected {expected}, found {}", found.as_deref().unwrap_or("no identifier"))]
    StaleTarget {
        line: usize,
        expected: String,
        found: Option<String>,
    },

    /// A write is already in flight for this engine instance
    #[error("Engine busy: write in progress for {path}")]
    EngineBusy { path: PathBuf },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PrdError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create a document IO error
    pub fn document(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Document {
            path: path.into(),
            source,
        }
    }

    /// Create a task-not-found error
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::TaskNotFound { id: id.into() }
    }

    /// Create a stale-target error
    pub fn stale_target(line: usize, expected: impl Into<String>, found: Option<String>) -> Self {
        Self::StaleTarget {
            line,
            expected: expected.into(),
            found,
        }
    }

    /// Wrap an arbitrary error
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(anyhow::Error::new(err))
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error is a stale-target condition (caller may retry
    /// against fresh state)
    pub fn is_stale_target(&self) -> bool {
        matches!(
            self,
            Self::StaleTarget { .. } | Self::LineOutOfBounds { .. } | Self::NotATask { .. }
        )
    }

    /// Check if this error is recoverable without operator intervention
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::StaleTarget { .. }
                | Self::LineOutOfBounds { .. }
                | Self::NotATask { .. }
                | Self::NotAListItem { .. }
                | Self::NotAHeading { .. }
                | Self::TaskNotFound { .. }
                | Self::EngineBusy { .. }
        )
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::InvalidConfig { .. } => 7,
            Self::Document { .. } | Self::NoDocuments => 6,
            Self::TaskNotFound { .. } => 3,
            Self::StaleTarget { .. }
            | Self::LineOutOfBounds { .. }
            | Self::NotATask { .. }
            | Self::NotAListItem { .. }
            | Self::NotAHeading { .. } => 4,
            Self::EngineBusy { .. } => 5,
            _ => 1,
        }
    }
}

/// Type alias for prdtask results
pub type Result<T> = std::result::Result<T, PrdError>;
