use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::models::{
    ExistingFolder, MoveExecutionResult, OrganizeOptions, OrganizeResult, ScannedFile,
    SuggestedRule,
};

/// Step of an organize session
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrganizeStep {
    /// No run in progress
    Idle,
    /// Listing the folder
    Scanning,
    /// Extraction and cluster analysis
    Analyzing,
    /// Waiting for the user to approve the grouping
    Preview,
    /// Moves in flight
    Executing,
    /// Moves finished, rules can be requested
    Done,
}

impl OrganizeStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Analyzing => "analyzing",
            Self::Preview => "preview",
            Self::Executing => "executing",
            Self::Done => "done",
        }
    }

    /// Steps a cancel request may discard
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            Self::Scanning | Self::Analyzing | Self::Preview | Self::Done
        )
    }
}

impl fmt::Display for OrganizeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one organize attempt. A new `id` is minted on every reset, so
/// late results from a discarded attempt can be recognised and dropped.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizeSession {
    pub id: String,
    pub step: OrganizeStep,
    pub status_message: String,
    pub folder: Option<PathBuf>,
    pub options: OrganizeOptions,
    pub scanned_files: Vec<ScannedFile>,
    pub existing_folders: Vec<ExistingFolder>,
    pub result: Option<OrganizeResult>,
    /// Folder focused in the preview
    pub selected_folder: Option<String>,
    pub suggested_rules: Vec<SuggestedRule>,
    pub last_execution: Option<MoveExecutionResult>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrganizeSession {
    /// Empty session waiting for a folder
    pub fn idle(status: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            step: OrganizeStep::Idle,
            status_message: status.into(),
            folder: None,
            options: OrganizeOptions::default(),
            scanned_files: Vec::new(),
            existing_folders: Vec::new(),
            result: None,
            selected_folder: None,
            suggested_rules: Vec::new(),
            last_execution: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Fresh session for `folder`, already in `Scanning`
    pub fn begin(folder: PathBuf, options: OrganizeOptions) -> Self {
        let status = format!("Scanning {}", folder.display());
        Self {
            folder: Some(folder),
            options,
            step: OrganizeStep::Scanning,
            ..Self::idle(status)
        }
    }

    /// Move to `step` with a new status line
    pub fn transition(&mut self, step: OrganizeStep, status: impl Into<String>) {
        tracing::debug!(session = %self.id, from = %self.step, to = %step, "Organize step");
        self.step = step;
        self.set_status(status);
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status_message = status.into();
        self.updated_at = Utc::now();
    }

    /// Scanned files no suggestion claims
    pub fn unassigned_files(&self) -> Vec<&ScannedFile> {
        match &self.result {
            Some(result) => result.unassigned(&self.scanned_files),
            None => Vec::new(),
        }
    }

    pub fn selected_rules(&self) -> Vec<SuggestedRule> {
        self.suggested_rules
            .iter()
            .filter(|r| r.selected)
            .cloned()
            .collect()
    }
}

impl Default for OrganizeSession {
    fn default() -> Self {
        Self::idle("")
    }
}
