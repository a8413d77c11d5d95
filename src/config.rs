//! Engine configuration.
//!
//! Settings are read from an optional `prdtask.json` in the workspace
//! root; every field has a default so an absent or partial file is fine.
//! Field names on disk are camelCase, matching the editor-integration
//! settings surface this engine grew up next to.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PrdError, Result};
use crate::id::DEFAULT_ID_FLOOR;

/// Settings file name looked up in the workspace root.
pub const SETTINGS_FILE: &str = "prdtask.json";

/// Configuration consumed by the parsing and mutation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Fill in missing identifiers during parse.
    pub auto_generate_ids: bool,
    /// Identifier prefix, e.g. `PRD` in `PRD-100001`.
    pub id_prefix: String,
    /// Numeric suffix floor; generated identifiers start one above it.
    pub id_floor: u32,
    /// Run the checkbox/identifier normalization pass during parse.
    pub normalize_checkboxes: bool,
    /// Enforce identifier uniqueness across all tracked documents, not
    /// just within one.
    pub cross_document_ids: bool,
    /// Filename patterns that mark a Markdown file as a task document.
    /// Matched case-insensitively against the file name.
    pub file_patterns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_generate_ids: true,
            id_prefix: "PRD".to_string(),
            id_floor: DEFAULT_ID_FLOOR,
            normalize_checkboxes: true,
            cross_document_ids: true,
            file_patterns: vec![
                "*prd*.md".to_string(),
                "PRD*.md".to_string(),
                "*PRD*.md".to_string(),
            ],
        }
    }
}

impl EngineConfig {
    /// Load configuration from `prdtask.json` under `root`, falling back
    /// to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed,
    /// or when a field value fails validation.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let path = root.as_ref().join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .map_err(|e| PrdError::config_with_path(e.to_string(), path.clone()))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| PrdError::config_with_path(e.to_string(), path))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty or non-alphanumeric prefix, or an
    /// empty pattern list.
    pub fn validate(&self) -> Result<()> {
        if self.id_prefix.is_empty() {
            return Err(PrdError::InvalidConfig {
                field: "idPrefix".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !self.id_prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PrdError::InvalidConfig {
                field: "idPrefix".to_string(),
                reason: format!("'{}' contains non-alphanumeric characters", self.id_prefix),
            });
        }
        if self.file_patterns.is_empty() {
            return Err(PrdError::InvalidConfig {
                field: "filePatterns".to_string(),
                reason: "must list at least one pattern".to_string(),
            });
        }
        Ok(())
    }

    /// Path of the settings file under a workspace root.
    #[must_use]
    pub fn settings_path(root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(SETTINGS_FILE)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.auto_generate_ids);
        assert_eq!(config.id_prefix, "PRD");
        assert_eq!(config.id_floor, 100_000);
        assert!(config.normalize_checkboxes);
        assert!(config.cross_document_ids);
        assert_eq!(config.file_patterns.len(), 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"autoGenerateIds": false}"#).unwrap();
        assert!(!config.auto_generate_ids);
        assert_eq!(config.id_prefix, "PRD");
        assert!(config.normalize_checkboxes);
    }

    #[test]
    fn test_camel_case_field_names() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"idPrefix": "TASK", "normalizeCheckboxes": false, "crossDocumentIds": false}"#,
        )
        .unwrap();
        assert_eq!(config.id_prefix, "TASK");
        assert!(!config.normalize_checkboxes);
        assert!(!config.cross_document_ids);
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let config = EngineConfig {
            id_prefix: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_symbol_prefix() {
        let config = EngineConfig {
            id_prefix: "PR D".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path()).unwrap();
        assert_eq!(config.id_prefix, "PRD");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"idPrefix": "SPEC", "autoGenerateIds": false}"#,
        )
        .unwrap();
        let config = EngineConfig::load(dir.path()).unwrap();
        assert_eq!(config.id_prefix, "SPEC");
        assert!(!config.auto_generate_ids);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        assert!(EngineConfig::load(dir.path()).is_err());
    }
}
