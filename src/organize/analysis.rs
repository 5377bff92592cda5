//! Cluster analysis request
//!
//! One call per organize run: file metadata, optional existing-folder hints
//! and the user's mode flags go out, a grouped [`OrganizeResult`] comes back.
//! Cluster bounds are forwarded as-is; the service owns cluster-count policy.

use std::sync::Arc;

use crate::ai::{AnalyzeRequest, FileMetadata, OrganizeApi};
use crate::config::OrganizeLimits;
use crate::error::ApiError;
use crate::execution::resolve_assignments;
use crate::models::{ExistingFolder, OrganizeOptions, OrganizeResult, ScannedFile};

pub struct ClusterAnalysisClient {
    api: Arc<dyn OrganizeApi>,
    min_clusters: u32,
    max_clusters: u32,
}

impl ClusterAnalysisClient {
    pub fn new(api: Arc<dyn OrganizeApi>, limits: &OrganizeLimits) -> Self {
        Self {
            api,
            min_clusters: limits.min_clusters,
            max_clusters: limits.max_clusters,
        }
    }

    pub fn build_request(
        &self,
        files: &[ScannedFile],
        existing_folders: &[ExistingFolder],
        options: &OrganizeOptions,
    ) -> AnalyzeRequest {
        let custom_prompt = options.custom_prompt.trim();

        AnalyzeRequest {
            files: files.iter().map(FileMetadata::from).collect(),
            existing_folders: if options.use_existing_folders {
                existing_folders.to_vec()
            } else {
                Vec::new()
            },
            use_gemini_naming: options.use_gemini_naming,
            use_gemini_full: options.use_gemini_full,
            use_existing_folders: options.use_existing_folders,
            custom_prompt: (!custom_prompt.is_empty()).then(|| custom_prompt.to_string()),
            min_clusters: self.min_clusters,
            max_clusters: self.max_clusters,
        }
    }

    pub async fn analyze(
        &self,
        token: &str,
        files: &[ScannedFile],
        existing_folders: &[ExistingFolder],
        options: &OrganizeOptions,
    ) -> Result<OrganizeResult, ApiError> {
        let request = self.build_request(files, existing_folders, options);

        tracing::info!(
            files = request.files.len(),
            hints = request.existing_folders.len(),
            "Requesting cluster analysis"
        );

        let mut result = self.api.analyze(token, &request).await?;
        normalize(&mut result, files);

        tracing::info!(
            folders = result.folders.len(),
            assigned = result.assigned_count(),
            method = %result.naming_method,
            "Cluster analysis complete"
        );

        Ok(result)
    }
}

/// Fill counters the service left at zero. `total_files` only counts
/// filenames that resolve to a scanned file.
fn normalize(result: &mut OrganizeResult, scanned: &[ScannedFile]) {
    for folder in &mut result.folders {
        if folder.file_count == 0 {
            folder.file_count = folder.files.len();
        }
    }
    if result.total_folders == 0 {
        result.total_folders = result.folders.len();
    }
    if result.total_files == 0 {
        let resolved = resolve_assignments(result, scanned).len();
        result.total_files = resolved;
    }
}
