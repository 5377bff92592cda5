//! Best-effort move history
//!
//! Every executed move is reported to the service's history endpoint from a
//! detached task. Failures only bump a counter and a warning; they never
//! reach the organize session.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::ai::{ActionLogRequest, OrganizeApi};
use crate::execution::resolve_assignments;
use crate::models::{OrganizeResult, ScannedFile};

/// Side channel for logging outcomes, shared across all batches
#[derive(Debug, Default)]
pub struct ActionLogStats {
    logged: AtomicUsize,
    failed: AtomicUsize,
}

impl ActionLogStats {
    pub fn logged(&self) -> usize {
        self.logged.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Totals for one batch, available once its tasks finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionLogSummary {
    pub logged: usize,
    pub failed: usize,
}

/// Handles of the tasks spawned for one execution.
/// Dropping it leaves the tasks running.
#[derive(Debug)]
pub struct ActionLogBatch {
    handles: Vec<JoinHandle<bool>>,
}

impl ActionLogBatch {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every call in the batch
    pub async fn wait(self) -> ActionLogSummary {
        let mut summary = ActionLogSummary::default();
        for handle in self.handles {
            match handle.await {
                Ok(true) => summary.logged += 1,
                Ok(false) => summary.failed += 1,
                Err(join_err) => {
                    tracing::warn!(error = %join_err, "History task panicked");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

/// Build one history entry per resolved move
pub fn history_entries(
    base_folder: &Path,
    result: &OrganizeResult,
    scanned: &[ScannedFile],
) -> Vec<ActionLogRequest> {
    resolve_assignments(result, scanned)
        .into_iter()
        .map(|assignment| ActionLogRequest {
            filename: assignment.file.filename.clone(),
            source_path: assignment.file.path.clone(),
            dest_path: assignment.dest_path(base_folder).to_string_lossy().to_string(),
            confidence: assignment.suggestion.confidence_or_default(),
        })
        .collect()
}

pub struct ActionLogger {
    api: Arc<dyn OrganizeApi>,
    stats: Arc<ActionLogStats>,
}

impl ActionLogger {
    pub fn new(api: Arc<dyn OrganizeApi>) -> Self {
        Self {
            api,
            stats: Arc::new(ActionLogStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ActionLogStats> {
        Arc::clone(&self.stats)
    }

    /// Fire one independent history call per entry. Must run inside a tokio runtime.
    pub fn log_moves(&self, token: &str, entries: Vec<ActionLogRequest>) -> ActionLogBatch {
        tracing::debug!(entries = entries.len(), "Recording move history");

        let handles = entries
            .into_iter()
            .map(|entry| {
                let api = Arc::clone(&self.api);
                let stats = Arc::clone(&self.stats);
                let token = token.to_string();

                tokio::spawn(async move {
                    match api.log_action(&token, &entry).await {
                        Ok(()) => {
                            stats.logged.fetch_add(1, Ordering::Relaxed);
                            true
                        }
                        Err(e) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(file = %entry.filename, error = %e, "Failed to record move history");
                            false
                        }
                    }
                })
            })
            .collect();

        ActionLogBatch { handles }
    }
}
