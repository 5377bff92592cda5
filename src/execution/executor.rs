//! Move Executor
//!
//! Turns an approved [`OrganizeResult`] into concrete move operations and
//! hands them to the filesystem collaborator as one batch.
//!
//! Suggested filenames that match no scanned file are dropped before
//! submission. They are an artifact of the clustering response, not a user
//! facing failure, so they never show up in `errors`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::OrganizeError;
use crate::models::{
    index_by_filename, FolderSuggestion, MoveExecutionResult, MoveOperation, OrganizeResult,
    ScannedFile,
};
use crate::services::FileOps;

/// A suggested filename resolved to the scanned file it refers to
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAssignment<'a> {
    pub suggestion: &'a FolderSuggestion,
    pub file: &'a ScannedFile,
}

impl ResolvedAssignment<'_> {
    pub fn to_operation(&self) -> MoveOperation {
        MoveOperation {
            source_path: self.file.path.clone(),
            dest_folder: self.suggestion.destination().to_string(),
            filename: self.file.filename.clone(),
        }
    }

    /// Where the file ends up under `base_folder`
    pub fn dest_path(&self, base_folder: &Path) -> PathBuf {
        base_folder
            .join(self.suggestion.destination())
            .join(&self.file.filename)
    }
}

/// Resolve every (suggestion, filename) pair against the scan.
///
/// Unknown filenames are skipped. A filename claimed by several suggestions
/// goes to the first one only, a file can only be moved once.
pub fn resolve_assignments<'a>(
    result: &'a OrganizeResult,
    scanned: &'a [ScannedFile],
) -> Vec<ResolvedAssignment<'a>> {
    let index = index_by_filename(scanned);
    let mut seen: HashSet<&str> = HashSet::new();
    let mut resolved = Vec::new();

    for suggestion in &result.folders {
        for filename in &suggestion.files {
            let Some(file) = index.get(filename.as_str()) else {
                tracing::debug!(file = %filename, folder = %suggestion.folder_name, "Dropping unscanned filename");
                continue;
            };
            if !seen.insert(file.filename.as_str()) {
                tracing::debug!(file = %filename, "Filename assigned twice, keeping first folder");
                continue;
            }
            resolved.push(ResolvedAssignment { suggestion, file });
        }
    }

    resolved
}

/// Build the move batch for a result
pub fn plan_moves(result: &OrganizeResult, scanned: &[ScannedFile]) -> Vec<MoveOperation> {
    resolve_assignments(result, scanned)
        .iter()
        .map(ResolvedAssignment::to_operation)
        .collect()
}

/// Executes a result through the filesystem collaborator
pub struct MoveExecutor {
    files: Arc<dyn FileOps>,
}

/// Outcome of executing one plan
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub result: MoveExecutionResult,
    /// Operations handed to the move primitive
    pub submitted: usize,
    /// Distinct destination folders among the submitted operations
    pub destinations: usize,
}

impl MoveExecutor {
    pub fn new(files: Arc<dyn FileOps>) -> Self {
        Self { files }
    }

    /// Execute the plan. Per-file failures are reported inside the result;
    /// `Err` means the batch itself could not run.
    pub async fn execute(
        &self,
        base_folder: &Path,
        result: &OrganizeResult,
        scanned: &[ScannedFile],
    ) -> Result<ExecutionReport, OrganizeError> {
        let operations = plan_moves(result, scanned);
        let submitted = operations.len();
        let destinations = operations
            .iter()
            .map(|op| op.dest_folder.as_str())
            .collect::<HashSet<_>>()
            .len();

        tracing::info!(
            folder = %base_folder.display(),
            operations = submitted,
            dropped = result.assigned_count().saturating_sub(submitted),
            "Executing move plan"
        );

        if operations.is_empty() {
            return Ok(ExecutionReport {
                result: MoveExecutionResult {
                    success: true,
                    ..Default::default()
                },
                submitted,
                destinations,
            });
        }

        let mut outcome = self
            .files
            .execute_moves(base_folder, operations, true)
            .await?;

        if outcome.moved_count > submitted {
            tracing::warn!(
                moved = outcome.moved_count,
                submitted,
                "Move primitive reported more moves than submitted"
            );
            outcome.moved_count = submitted;
        }

        Ok(ExecutionReport {
            result: outcome,
            submitted,
            destinations,
        })
    }
}
