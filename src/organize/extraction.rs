//! Content Extraction
//!
//! Reads the head of each file and asks the service for a text/OCR preview.
//! Files are processed in fixed windows: everything in a window runs
//! concurrently and the next window starts once the whole window settled.
//! Output order always equals input order.

use base64::Engine;
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;

use crate::ai::{ExtractContentRequest, OrganizeApi};
use crate::config::OrganizeLimits;
use crate::models::ScannedFile;
use crate::services::FileOps;

/// Counts from one extraction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub extracted: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Windowed reader + remote extractor
pub struct ContentExtractionBatcher {
    files: Arc<dyn FileOps>,
    api: Arc<dyn OrganizeApi>,
    max_bytes: usize,
    window: usize,
}

impl ContentExtractionBatcher {
    pub fn new(files: Arc<dyn FileOps>, api: Arc<dyn OrganizeApi>, limits: &OrganizeLimits) -> Self {
        Self {
            files,
            api,
            max_bytes: limits.extraction_max_bytes,
            window: limits.extraction_window.max(1),
        }
    }

    /// Fill `content_preview` where extraction succeeds.
    ///
    /// `progress` is called after every window with `(processed, total)`.
    /// A failing file keeps an empty preview and never affects its neighbours.
    pub async fn extract_all<F>(
        &self,
        token: &str,
        mut files: Vec<ScannedFile>,
        mut progress: F,
    ) -> (Vec<ScannedFile>, ExtractionStats)
    where
        F: FnMut(usize, usize),
    {
        let total = files.len();
        let mut processed = 0;
        let mut stats = ExtractionStats::default();

        tracing::info!(files = total, window = self.window, "Extracting content previews");

        for window in files.chunks_mut(self.window) {
            let tasks = window.iter_mut().map(|file| async move {
                match self.extract_one(token, file).await {
                    Ok(Some(preview)) => {
                        file.content_preview = preview;
                        Outcome::Extracted
                    }
                    Ok(None) => Outcome::Empty,
                    Err(e) => {
                        tracing::warn!(file = %file.filename, error = %e, "Content extraction failed");
                        file.content_preview.clear();
                        Outcome::Failed
                    }
                }
            });

            for outcome in join_all(tasks).await {
                match outcome {
                    Outcome::Extracted => stats.extracted += 1,
                    Outcome::Empty => stats.empty += 1,
                    Outcome::Failed => stats.failed += 1,
                }
            }

            processed += window.len();
            progress(processed, total);
        }

        tracing::info!(
            extracted = stats.extracted,
            empty = stats.empty,
            failed = stats.failed,
            "Content extraction finished"
        );

        (files, stats)
    }

    async fn extract_one(&self, token: &str, file: &ScannedFile) -> Result<Option<String>, String> {
        let bytes = self
            .files
            .read_bytes(Path::new(&file.path), self.max_bytes)
            .await
            .map_err(|e| format!("read failed: {}", e))?;

        if bytes.is_empty() {
            return Ok(None);
        }

        let request = ExtractContentRequest {
            content: base64::engine::general_purpose::STANDARD.encode(&bytes),
            extension: file.extension.clone(),
            filename: file.filename.clone(),
        };

        let response = self
            .api
            .extract_content(token, &request)
            .await
            .map_err(|e| e.to_string())?;

        let preview = response.content_preview.trim().to_string();
        Ok(if preview.is_empty() { None } else { Some(preview) })
    }
}

enum Outcome {
    Extracted,
    Empty,
    Failed,
}
