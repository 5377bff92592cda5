//! Wire types for the organize service

use crate::models::{ExistingFolder, FolderSuggestion, ScannedFile, SuggestedRule};
use serde::{Deserialize, Serialize};

/// File metadata sent for analysis. Raw bytes never leave the machine here.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileMetadata {
    pub filename: String,
    pub extension: String,
    pub size_bytes: u64,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_preview: Option<String>,
}

impl From<&ScannedFile> for FileMetadata {
    fn from(file: &ScannedFile) -> Self {
        Self {
            filename: file.filename.clone(),
            extension: file.extension.clone(),
            size_bytes: file.size_bytes,
            path: file.path.clone(),
            content_preview: if file.content_preview.is_empty() {
                None
            } else {
                Some(file.content_preview.clone())
            },
        }
    }
}

/// Body of `POST /auto-organize/analyze`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalyzeRequest {
    pub files: Vec<FileMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub existing_folders: Vec<ExistingFolder>,
    pub use_gemini_naming: bool,
    pub use_gemini_full: bool,
    pub use_existing_folders: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    pub min_clusters: u32,
    pub max_clusters: u32,
}

/// Body of `POST /auto-organize/extract-content`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractContentRequest {
    /// Base64 of the first bytes of the file
    pub content: String,
    pub extension: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExtractContentResponse {
    #[serde(default)]
    pub content_preview: String,
}

/// Body of `POST /auto-organize/generate-rules`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateRulesRequest {
    pub folders: Vec<FolderSuggestion>,
    pub source_folder: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GenerateRulesResponse {
    #[serde(default)]
    pub rules: Vec<SuggestedRule>,
    #[serde(default)]
    pub total_rules: usize,
}

/// Body of `POST /actions/log`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionLogRequest {
    pub filename: String,
    pub source_path: String,
    pub dest_path: String,
    pub confidence: f64,
}
