//! Shared types for the auto-organize workflow
//!
//! Everything here crosses a boundary: the local filesystem collaborator,
//! the remote organize service, or the CLI. Field names match the service's
//! snake_case JSON.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Confidence recorded in history when a suggestion carries none
pub const DEFAULT_LOG_CONFIDENCE: f64 = 0.9;

/// A file found directly under the folder being organized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannedFile {
    pub filename: String,
    /// Lower-cased with a leading dot (".pdf"), empty when the file has none
    pub extension: String,
    pub size_bytes: u64,
    /// Absolute path; unique within a session
    pub path: String,
    /// RFC 3339 UTC timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    /// Text/OCR preview filled in by content extraction
    #[serde(default)]
    pub content_preview: String,
}

/// A sub-folder that already exists under the root, sent as a naming hint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExistingFolder {
    pub folder_name: String,
    pub folder_path: String,
    pub sample_files: Vec<String>,
    pub file_count: usize,
}

/// One proposed destination folder and the files assigned to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderSuggestion {
    #[serde(default)]
    pub folder_path: String,
    pub folder_name: String,
    /// Filenames from the scan, not paths
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub file_count: usize,
}

impl FolderSuggestion {
    /// Folder name relative to the organize root
    pub fn destination(&self) -> &str {
        if self.folder_path.trim().is_empty() {
            &self.folder_name
        } else {
            &self.folder_path
        }
    }

    pub fn confidence_or_default(&self) -> f64 {
        self.confidence.unwrap_or(DEFAULT_LOG_CONFIDENCE)
    }
}

/// Grouping returned by the clustering service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrganizeResult {
    #[serde(default)]
    pub folders: Vec<FolderSuggestion>,
    #[serde(default)]
    pub total_files: usize,
    #[serde(default)]
    pub total_folders: usize,
    #[serde(default)]
    pub naming_method: String,
}

impl OrganizeResult {
    /// Scanned files that no suggestion claims. They are left in place.
    pub fn unassigned<'a>(&self, scanned: &'a [ScannedFile]) -> Vec<&'a ScannedFile> {
        let assigned: HashSet<&str> = self
            .folders
            .iter()
            .flat_map(|f| f.files.iter().map(String::as_str))
            .collect();

        scanned
            .iter()
            .filter(|f| !assigned.contains(f.filename.as_str()))
            .collect()
    }

    /// Number of (suggestion, filename) pairs in the result
    pub fn assigned_count(&self) -> usize {
        self.folders.iter().map(|f| f.files.len()).sum()
    }
}

/// A single file move handed to the local move primitive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveOperation {
    pub source_path: String,
    /// Relative to the organize root
    pub dest_folder: String,
    pub filename: String,
}

/// Aggregate outcome of one `execute_moves` batch
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MoveExecutionResult {
    pub success: bool,
    pub moved_count: usize,
    /// Destination already occupied or folder creation failed
    #[serde(default)]
    pub skipped_count: usize,
    pub errors: Vec<String>,
    /// Source paths of the files that were actually moved
    #[serde(default)]
    pub moved_files: Vec<String>,
}

/// A reusable sorting rule derived from a finished organize run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestedRule {
    pub rule_type: String,
    pub pattern: String,
    pub target_folder: String,
    #[serde(default)]
    pub file_count: usize,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub description: String,
    /// Session-local selection; never sent anywhere
    #[serde(default = "default_selected", skip_serializing)]
    pub selected: bool,
}

fn default_selected() -> bool {
    true
}

/// Mode flags chosen by the user for one organize run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrganizeOptions {
    pub use_gemini_naming: bool,
    pub use_gemini_full: bool,
    pub use_existing_folders: bool,
    pub use_content_extraction: bool,
    #[serde(default)]
    pub custom_prompt: String,
}

/// Index from filename to scanned file, first occurrence wins
pub fn index_by_filename(files: &[ScannedFile]) -> HashMap<&str, &ScannedFile> {
    let mut index = HashMap::with_capacity(files.len());
    for file in files {
        index.entry(file.filename.as_str()).or_insert(file);
    }
    index
}
