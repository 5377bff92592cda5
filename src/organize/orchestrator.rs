//! Organize Orchestrator
//!
//! Owns one [`OrganizeSession`] and drives it through
//! `Idle → Scanning → Analyzing → Preview → Executing → Done`.
//!
//! Every await point is followed by a session id check. `cancel()` swaps in
//! a fresh session immediately, so a scan, extraction or analysis that
//! completes afterwards finds a different id and its result is dropped with
//! [`OrganizeError::Stale`].
//!
//! Failure handling:
//! - validation and auth failures stay in `Idle`, nothing remote is called
//! - scan or analysis failures discard the session and return to `Idle`
//! - an execution failure returns to `Preview` with the approved plan intact

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::ai::{AccessTokenSource, OrganizeApi};
use crate::config::OrganizeLimits;
use crate::error::{ApiError, OrganizeError};
use crate::execution::{resolve_assignments, ExecutionReport, MoveExecutor};
use crate::history::{history_entries, ActionLogBatch, ActionLogStats, ActionLogger};
use crate::models::{
    MoveExecutionResult, OrganizeOptions, OrganizeResult, ScannedFile, SuggestedRule,
};
use crate::services::FileOps;

use super::analysis::ClusterAnalysisClient;
use super::extraction::ContentExtractionBatcher;
use super::rules::RuleSynthesizer;
use super::session::{OrganizeSession, OrganizeStep};

pub const STATUS_FOLDER_EMPTY: &str = "folder is empty";
pub const STATUS_AUTH_REQUIRED: &str = "authentication required";
pub const STATUS_SESSION_EXPIRED: &str = "session expired, please sign in again";
pub const STATUS_NO_RULES: &str = "no pattern found";
pub const STATUS_CANCELLED: &str = "cancelled";

/// Status update pushed to the caller after every step change
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizeProgress {
    pub session_id: String,
    pub step: OrganizeStep,
    pub message: String,
    /// Set while content extraction runs
    pub processed: Option<(usize, usize)>,
}

pub type ProgressCallback = Arc<dyn Fn(&OrganizeProgress) + Send + Sync>;

/// Returned by a successful [`OrganizeOrchestrator::execute`]
#[derive(Debug)]
pub struct ExecutionSummary {
    pub result: MoveExecutionResult,
    pub submitted: usize,
    /// Folders that received at least one submitted move
    pub destinations: usize,
    /// Filenames no suggestion claimed; they were left in place
    pub unassigned: Vec<String>,
    pub status: String,
    /// History calls still running in the background
    pub history: Option<ActionLogBatch>,
}

/// Collaborators the orchestrator sequences
pub struct OrganizeDeps {
    pub files: Arc<dyn FileOps>,
    pub tokens: Arc<dyn AccessTokenSource>,
    pub api: Arc<dyn OrganizeApi>,
}

pub struct OrganizeOrchestrator {
    files: Arc<dyn FileOps>,
    tokens: Arc<dyn AccessTokenSource>,
    limits: OrganizeLimits,
    extractor: ContentExtractionBatcher,
    analysis: ClusterAnalysisClient,
    executor: MoveExecutor,
    action_log: ActionLogger,
    rules: RuleSynthesizer,
    session: Mutex<OrganizeSession>,
    progress: Option<ProgressCallback>,
}

impl OrganizeOrchestrator {
    pub fn new(deps: OrganizeDeps, limits: OrganizeLimits) -> Self {
        Self {
            extractor: ContentExtractionBatcher::new(
                Arc::clone(&deps.files),
                Arc::clone(&deps.api),
                &limits,
            ),
            analysis: ClusterAnalysisClient::new(Arc::clone(&deps.api), &limits),
            executor: MoveExecutor::new(Arc::clone(&deps.files)),
            action_log: ActionLogger::new(Arc::clone(&deps.api)),
            rules: RuleSynthesizer::new(Arc::clone(&deps.api)),
            files: deps.files,
            tokens: deps.tokens,
            limits,
            session: Mutex::new(OrganizeSession::default()),
            progress: None,
        }
    }

    /// Receive a callback on every status change
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Copy of the current session
    pub fn snapshot(&self) -> OrganizeSession {
        self.lock().clone()
    }

    pub fn step(&self) -> OrganizeStep {
        self.lock().step
    }

    pub fn status(&self) -> String {
        self.lock().status_message.clone()
    }

    /// Counters of the background history calls
    pub fn history_stats(&self) -> Arc<ActionLogStats> {
        self.action_log.stats()
    }

    fn lock(&self) -> MutexGuard<'_, OrganizeSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `f` only if session `id` is still the live one
    fn guarded<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut OrganizeSession) -> R,
    ) -> Result<R, OrganizeError> {
        let mut session = self.lock();
        if session.id != id {
            tracing::debug!(stale = id, live = %session.id, "Discarding result of replaced session");
            return Err(OrganizeError::Stale);
        }
        Ok(f(&mut session))
    }

    /// [`Self::guarded`], then report the new status
    fn update<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut OrganizeSession) -> R,
    ) -> Result<R, OrganizeError> {
        let value = self.guarded(id, f)?;
        self.notify(None);
        Ok(value)
    }

    fn notify(&self, processed: Option<(usize, usize)>) {
        let Some(callback) = &self.progress else { return };
        let progress = {
            let session = self.lock();
            OrganizeProgress {
                session_id: session.id.clone(),
                step: session.step,
                message: session.status_message.clone(),
                processed,
            }
        };
        callback(&progress);
    }

    /// Record a pre-flight rejection while staying in `Idle`
    fn reject_idle(&self, error: OrganizeError) -> OrganizeError {
        self.lock().set_status(error.to_string());
        self.notify(None);
        error
    }

    /// Discard session `id` and return to `Idle` with `error` as status
    fn fail_to_idle(&self, id: &str, error: OrganizeError) -> OrganizeError {
        match self.update(id, |session| {
            *session = OrganizeSession::idle(error.to_string());
        }) {
            Ok(()) => {
                tracing::warn!(error = %error, "Organize run failed");
                error
            }
            Err(stale) => stale,
        }
    }

    /// Scan `folder`, optionally extract content, and request a grouping.
    ///
    /// Ends in `Preview` on success and in `Idle` on any failure; the
    /// returned error text is also the session status.
    pub async fn start(
        &self,
        folder: impl AsRef<Path>,
        options: OrganizeOptions,
    ) -> Result<OrganizeResult, OrganizeError> {
        let folder = folder.as_ref();

        let current = self.step();
        if current != OrganizeStep::Idle {
            return Err(OrganizeError::InvalidState {
                action: "start organizing",
                step: current.to_string(),
            });
        }

        if folder.as_os_str().is_empty() || folder.to_string_lossy().trim().is_empty() {
            return Err(self.reject_idle(OrganizeError::Validation(STATUS_FOLDER_EMPTY.to_string())));
        }

        let Some(token) = self.tokens.get_access_token() else {
            return Err(self.reject_idle(OrganizeError::Auth(STATUS_AUTH_REQUIRED.to_string())));
        };

        let id = {
            let mut session = self.lock();
            if session.step != OrganizeStep::Idle {
                return Err(OrganizeError::InvalidState {
                    action: "start organizing",
                    step: session.step.to_string(),
                });
            }
            *session = OrganizeSession::begin(folder.to_path_buf(), options.clone());
            session.id.clone()
        };
        self.notify(None);

        tracing::info!(session = %id, folder = %folder.display(), "Starting organize run");

        match self.scan_and_analyze(&id, &token, folder, &options).await {
            Ok(result) => Ok(result),
            Err(OrganizeError::Stale) => Err(OrganizeError::Stale),
            Err(err) => Err(self.fail_to_idle(&id, err)),
        }
    }

    async fn scan_and_analyze(
        &self,
        id: &str,
        token: &str,
        folder: &Path,
        options: &OrganizeOptions,
    ) -> Result<OrganizeResult, OrganizeError> {
        let files = self
            .files
            .scan_folder(folder)
            .await
            .map_err(|e| OrganizeError::Io(format!("failed to scan {}: {}", folder.display(), e)))?;

        if files.is_empty() {
            return Err(OrganizeError::Validation(STATUS_FOLDER_EMPTY.to_string()));
        }
        if files.len() > self.limits.max_files {
            return Err(OrganizeError::Validation(format!(
                "too many files ({}, limit {})",
                files.len(),
                self.limits.max_files
            )));
        }

        let existing_folders = if options.use_existing_folders {
            match self.files.scan_existing_folders(folder).await {
                Ok(folders) => folders,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not list existing folders, continuing without hints");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let file_count = files.len();
        self.update(id, |session| {
            session.scanned_files = files.clone();
            session.existing_folders = existing_folders.clone();
            session.transition(
                OrganizeStep::Analyzing,
                format!("Analyzing {} files", file_count),
            );
        })?;

        let files = if options.use_content_extraction {
            let (files, _stats) = self
                .extractor
                .extract_all(token, files, |processed, total| {
                    let updated = self.guarded(id, |session| {
                        session.set_status(format!("Extracting content ({}/{})", processed, total));
                    });
                    if updated.is_ok() {
                        self.notify(Some((processed, total)));
                    }
                })
                .await;

            self.update(id, |session| {
                session.scanned_files = files.clone();
                session.set_status(format!("Analyzing {} files", file_count));
            })?;
            files
        } else {
            files
        };

        let result = self
            .analysis
            .analyze(token, &files, &existing_folders, options)
            .await
            .map_err(analysis_error)?;

        let status = preview_status(&result, &files);
        self.update(id, |session| {
            session.result = Some(result.clone());
            session.transition(OrganizeStep::Preview, status);
        })?;

        Ok(result)
    }

    /// Focus one suggested folder in the preview, or clear the focus
    pub fn select_folder(&self, folder_name: Option<&str>) -> Result<(), OrganizeError> {
        let mut session = self.lock();
        if session.step != OrganizeStep::Preview {
            return Err(OrganizeError::InvalidState {
                action: "select a folder",
                step: session.step.to_string(),
            });
        }

        if let Some(name) = folder_name {
            let known = session
                .result
                .as_ref()
                .is_some_and(|r| r.folders.iter().any(|f| f.folder_name == name));
            if !known {
                return Err(OrganizeError::Validation(format!("unknown folder: {}", name)));
            }
        }

        session.selected_folder = folder_name.map(str::to_string);
        Ok(())
    }

    /// Apply the previewed grouping.
    ///
    /// Per-file failures are part of the summary. If the batch itself fails
    /// the session goes back to `Preview` and `execute` can be retried.
    pub async fn execute(&self) -> Result<ExecutionSummary, OrganizeError> {
        let (id, folder, result, scanned) = {
            let mut session = self.lock();
            if session.step != OrganizeStep::Preview {
                return Err(OrganizeError::InvalidState {
                    action: "execute",
                    step: session.step.to_string(),
                });
            }
            let (Some(folder), Some(result)) = (session.folder.clone(), session.result.clone())
            else {
                return Err(OrganizeError::InvalidState {
                    action: "execute without a plan",
                    step: session.step.to_string(),
                });
            };
            session.transition(OrganizeStep::Executing, "Moving files");
            (session.id.clone(), folder, result, session.scanned_files.clone())
        };
        self.notify(None);

        let report = match self.executor.execute(&folder, &result, &scanned).await {
            Ok(report) => report,
            Err(err) => {
                let message = format!("Move failed: {}", err);
                self.update(&id, |session| {
                    session.transition(OrganizeStep::Preview, message);
                })?;
                tracing::warn!(error = %err, "Move batch failed, plan kept for retry");
                return Err(err);
            }
        };

        let unassigned: Vec<String> = result
            .unassigned(&scanned)
            .into_iter()
            .map(|f| f.filename.clone())
            .collect();
        let status = execution_status(&report, unassigned.len());

        self.update(&id, |session| {
            session.last_execution = Some(report.result.clone());
            session.transition(OrganizeStep::Done, status.clone());
        })?;

        let history = self.record_history(&folder, &result, &scanned, &report);

        Ok(ExecutionSummary {
            result: report.result,
            submitted: report.submitted,
            destinations: report.destinations,
            unassigned,
            status,
            history,
        })
    }

    fn record_history(
        &self,
        folder: &Path,
        result: &OrganizeResult,
        scanned: &[ScannedFile],
        report: &ExecutionReport,
    ) -> Option<ActionLogBatch> {
        if report.result.moved_count == 0 {
            return None;
        }
        let Some(token) = self.tokens.get_access_token() else {
            tracing::warn!("No access token, skipping move history");
            return None;
        };

        let moved: HashSet<&str> = report.result.moved_files.iter().map(String::as_str).collect();
        let mut entries = history_entries(folder, result, scanned);
        entries.retain(|entry| moved.contains(entry.source_path.as_str()));
        Some(self.action_log.log_moves(&token, entries))
    }

    /// Ask for reusable rules based on the finished run
    pub async fn generate_rules(&self) -> Result<Vec<SuggestedRule>, OrganizeError> {
        let (id, folder, result) = {
            let session = self.lock();
            let (OrganizeStep::Done, Some(folder), Some(result)) =
                (session.step, session.folder.clone(), session.result.clone())
            else {
                return Err(OrganizeError::InvalidState {
                    action: "generate rules",
                    step: session.step.to_string(),
                });
            };
            (session.id.clone(), folder, result)
        };

        let Some(token) = self.tokens.get_access_token() else {
            self.update(&id, |session| session.set_status(STATUS_AUTH_REQUIRED))?;
            return Err(OrganizeError::Auth(STATUS_AUTH_REQUIRED.to_string()));
        };

        self.update(&id, |session| session.set_status("Looking for sorting patterns"))?;

        match self.rules.suggest(&token, &result, &folder).await {
            Ok(rules) => {
                let status = if rules.is_empty() {
                    STATUS_NO_RULES.to_string()
                } else {
                    format!("Found {} rule suggestions", rules.len())
                };
                self.update(&id, |session| {
                    session.suggested_rules = rules.clone();
                    session.set_status(status);
                })?;
                Ok(rules)
            }
            Err(err) => {
                let err = match err {
                    ApiError::Unauthorized => OrganizeError::Auth(STATUS_SESSION_EXPIRED.to_string()),
                    other => OrganizeError::from(other),
                };
                let message = format!("Rule suggestion failed: {}", err);
                self.update(&id, |session| session.set_status(message))?;
                Err(err)
            }
        }
    }

    /// Flip the selection of a suggested rule, returns the new state
    pub fn toggle_rule(&self, index: usize) -> Result<bool, OrganizeError> {
        let mut session = self.lock();
        let rule = session
            .suggested_rules
            .get_mut(index)
            .ok_or_else(|| OrganizeError::Validation(format!("no rule at index {}", index)))?;
        rule.selected = !rule.selected;
        Ok(rule.selected)
    }

    /// Rules the user kept. They are not stored anywhere.
    pub fn confirm_rules(&self) -> Vec<SuggestedRule> {
        let selected = self.lock().selected_rules();
        for rule in &selected {
            tracing::info!(
                rule_type = %rule.rule_type,
                pattern = %rule.pattern,
                target = %rule.target_folder,
                "Confirmed rule"
            );
        }
        selected
    }

    /// Discard the session. Not possible while moves are running.
    pub fn cancel(&self) -> bool {
        {
            let mut session = self.lock();
            if !session.step.is_cancellable() {
                tracing::debug!(step = %session.step, "Ignoring cancel");
                return false;
            }
            tracing::info!(session = %session.id, step = %session.step, "Organize run cancelled");
            *session = OrganizeSession::idle(STATUS_CANCELLED);
        }
        self.notify(None);
        true
    }

    /// Close a finished session and return to `Idle`
    pub fn finish(&self) -> Result<(), OrganizeError> {
        {
            let mut session = self.lock();
            if session.step != OrganizeStep::Done {
                return Err(OrganizeError::InvalidState {
                    action: "finish",
                    step: session.step.to_string(),
                });
            }
            *session = OrganizeSession::idle("");
        }
        self.notify(None);
        Ok(())
    }

    /// Folder of the live session, if any
    pub fn folder(&self) -> Option<PathBuf> {
        self.lock().folder.clone()
    }
}

fn analysis_error(err: ApiError) -> OrganizeError {
    match err {
        ApiError::Unauthorized => OrganizeError::Auth(STATUS_SESSION_EXPIRED.to_string()),
        other => OrganizeError::from_analysis(other),
    }
}

fn preview_status(result: &OrganizeResult, scanned: &[ScannedFile]) -> String {
    let resolved = resolve_assignments(result, scanned);
    let folders: HashSet<&str> = resolved.iter().map(|a| a.suggestion.destination()).collect();
    let unassigned = result.unassigned(scanned).len();

    let mut status = format!(
        "Proposed {} folders for {} files",
        folders.len(),
        resolved.len()
    );
    if unassigned > 0 {
        status.push_str(&format!(", {} unassigned", unassigned));
    }
    status
}

fn execution_status(report: &ExecutionReport, unassigned: usize) -> String {
    let outcome = &report.result;
    let mut status = format!(
        "Moved {} of {} files into {} folders",
        outcome.moved_count, report.submitted, report.destinations
    );
    if outcome.skipped_count > 0 {
        status.push_str(&format!(", {} skipped", outcome.skipped_count));
    }
    if !outcome.errors.is_empty() {
        status.push_str(&format!(", {} failed", outcome.errors.len()));
    }
    if unassigned > 0 {
        status.push_str(&format!(", {} left unassigned", unassigned));
    }
    status
}
