//! In-memory collaborators for organize tests

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::ai::*;
use crate::config::OrganizeLimits;
use crate::error::ApiError;
use crate::models::*;
use crate::services::FileOps;

use super::orchestrator::{OrganizeDeps, OrganizeOrchestrator};

pub fn scanned(name: &str) -> ScannedFile {
    let extension = Path::new(name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    ScannedFile {
        filename: name.to_string(),
        extension,
        size_bytes: 128,
        path: format!("/root/{}", name),
        modified: None,
        content_preview: String::new(),
    }
}

fn api_error(status: u16) -> ApiError {
    match status {
        0 => ApiError::Transport("connection refused".to_string()),
        401 => ApiError::Unauthorized,
        other => ApiError::Service {
            status: other,
            body: "fake failure".to_string(),
        },
    }
}

fn filename_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct MoveBatch {
    pub base: PathBuf,
    pub moves: Vec<MoveOperation>,
    pub create_folders: bool,
}

#[derive(Default)]
pub struct FakeFiles {
    files: Mutex<Vec<ScannedFile>>,
    existing: Mutex<Vec<ExistingFolder>>,
    unreadable: Mutex<HashSet<String>>,
    empty: Mutex<HashSet<String>>,
    failing_moves: Mutex<HashSet<String>>,
    batch_error: Mutex<Option<String>>,
    scan_error: Mutex<Option<String>>,
    overreport: AtomicBool,
    scan_calls: AtomicUsize,
    reads_in_flight: AtomicUsize,
    peak_reads: AtomicUsize,
    batches: Mutex<Vec<MoveBatch>>,
}

impl FakeFiles {
    pub fn with_names(names: &[&str]) -> Self {
        let fake = Self::default();
        *fake.files.lock().unwrap() = names.iter().map(|n| scanned(n)).collect();
        fake
    }

    pub fn with_count(count: usize) -> Self {
        let fake = Self::default();
        *fake.files.lock().unwrap() = (0..count).map(|i| scanned(&format!("file{}.txt", i))).collect();
        fake
    }

    pub fn scanned(&self) -> Vec<ScannedFile> {
        self.files.lock().unwrap().clone()
    }

    pub fn set_existing(&self, folders: Vec<ExistingFolder>) {
        *self.existing.lock().unwrap() = folders;
    }

    pub fn set_unreadable(&self, name: &str) {
        self.unreadable.lock().unwrap().insert(name.to_string());
    }

    pub fn set_empty(&self, name: &str) {
        self.empty.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_move(&self, name: &str) {
        self.failing_moves.lock().unwrap().insert(name.to_string());
    }

    pub fn set_batch_error(&self, message: Option<&str>) {
        *self.batch_error.lock().unwrap() = message.map(str::to_string);
    }

    pub fn set_scan_error(&self, message: &str) {
        *self.scan_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn set_overreport(&self, on: bool) {
        self.overreport.store(on, Ordering::SeqCst);
    }

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    pub fn peak_reads(&self) -> usize {
        self.peak_reads.load(Ordering::SeqCst)
    }

    pub fn move_batches(&self) -> Vec<MoveBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileOps for FakeFiles {
    async fn scan_folder(&self, _path: &Path) -> std::io::Result<Vec<ScannedFile>> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.scan_error.lock().unwrap().clone() {
            return Err(std::io::Error::new(std::io::ErrorKind::NotFound, message));
        }
        Ok(self.scanned())
    }

    async fn scan_existing_folders(&self, _path: &Path) -> std::io::Result<Vec<ExistingFolder>> {
        Ok(self.existing.lock().unwrap().clone())
    }

    async fn read_bytes(&self, path: &Path, max_bytes: usize) -> std::io::Result<Vec<u8>> {
        let name = filename_of(path);

        let now = self.reads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_reads.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.reads_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unreadable.lock().unwrap().contains(&name) {
            return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        }
        if self.empty.lock().unwrap().contains(&name) {
            return Ok(Vec::new());
        }

        let mut bytes = format!("content of {}", name).into_bytes();
        bytes.truncate(max_bytes);
        Ok(bytes)
    }

    async fn execute_moves(
        &self,
        base_folder: &Path,
        moves: Vec<MoveOperation>,
        create_folders: bool,
    ) -> std::io::Result<MoveExecutionResult> {
        self.batches.lock().unwrap().push(MoveBatch {
            base: base_folder.to_path_buf(),
            moves: moves.clone(),
            create_folders,
        });

        if let Some(message) = self.batch_error.lock().unwrap().clone() {
            return Err(std::io::Error::other(message));
        }

        let failing = self.failing_moves.lock().unwrap().clone();
        let mut result = MoveExecutionResult::default();
        for op in &moves {
            if failing.contains(&op.filename) {
                result.errors.push(format!("Failed to move {}: denied", op.filename));
                result.skipped_count += 1;
            } else {
                result.moved_count += 1;
                result.moved_files.push(op.source_path.clone());
            }
        }
        if self.overreport.load(Ordering::SeqCst) {
            result.moved_count += 1;
        }
        result.success = result.errors.is_empty();
        Ok(result)
    }
}

/// Lets a test hold an analysis call open
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct FakeApi {
    analysis: Mutex<Option<Result<OrganizeResult, u16>>>,
    analysis_gates: Mutex<VecDeque<Arc<Gate>>>,
    analyze_requests: Mutex<Vec<AnalyzeRequest>>,
    extract_calls: AtomicUsize,
    extract_failures: Mutex<HashSet<String>>,
    rules: Mutex<Vec<SuggestedRule>>,
    rules_error: Mutex<Option<u16>>,
    shuffle_rules: AtomicBool,
    rule_requests: Mutex<Vec<GenerateRulesRequest>>,
    log_failures: Mutex<HashSet<String>>,
    logged: Mutex<Vec<ActionLogRequest>>,
    log_calls: AtomicUsize,
}

impl FakeApi {
    pub fn grouping(groups: &[(&str, &[&str])]) -> OrganizeResult {
        OrganizeResult {
            folders: groups
                .iter()
                .map(|(name, files)| FolderSuggestion {
                    folder_path: name.to_string(),
                    folder_name: name.to_string(),
                    files: files.iter().map(|f| f.to_string()).collect(),
                    reason: format!("{} files", name),
                    confidence: None,
                    file_count: 0,
                })
                .collect(),
            total_files: 0,
            total_folders: 0,
            naming_method: "fake".to_string(),
        }
    }

    pub fn rule(pattern: &str, target: &str, confidence: f64) -> SuggestedRule {
        SuggestedRule {
            rule_type: "extension".to_string(),
            pattern: pattern.to_string(),
            target_folder: target.to_string(),
            file_count: 1,
            confidence,
            description: format!("{} goes to {}", pattern, target),
            selected: false,
        }
    }

    /// Status 401 is unauthorized, 0 a transport failure
    pub fn set_analysis(&self, outcome: Result<OrganizeResult, u16>) {
        *self.analysis.lock().unwrap() = Some(outcome);
    }

    /// Queue a gate; each analysis call takes the oldest one
    pub fn gate_analysis(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.analysis_gates.lock().unwrap().push_back(Arc::clone(&gate));
        gate
    }

    pub fn fail_extraction_for(&self, name: &str) {
        self.extract_failures.lock().unwrap().insert(name.to_string());
    }

    pub fn set_rules(&self, rules: Vec<SuggestedRule>) {
        *self.rules.lock().unwrap() = rules;
    }

    pub fn set_rules_error(&self, status: u16) {
        *self.rules_error.lock().unwrap() = Some(status);
    }

    pub fn set_shuffle_rules(&self, on: bool) {
        self.shuffle_rules.store(on, Ordering::SeqCst);
    }

    pub fn fail_log_for(&self, name: &str) {
        self.log_failures.lock().unwrap().insert(name.to_string());
    }

    pub fn analyze_requests(&self) -> Vec<AnalyzeRequest> {
        self.analyze_requests.lock().unwrap().clone()
    }

    pub fn rule_requests(&self) -> Vec<GenerateRulesRequest> {
        self.rule_requests.lock().unwrap().clone()
    }

    pub fn logged_files(&self) -> Vec<ActionLogRequest> {
        self.logged.lock().unwrap().clone()
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    /// Every call that reached the service, successful or not
    pub fn remote_calls(&self) -> usize {
        self.analyze_requests.lock().unwrap().len()
            + self.extract_calls()
            + self.rule_requests.lock().unwrap().len()
            + self.log_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrganizeApi for FakeApi {
    async fn analyze(&self, _token: &str, request: &AnalyzeRequest) -> Result<OrganizeResult, ApiError> {
        self.analyze_requests.lock().unwrap().push(request.clone());

        let gate = self.analysis_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let outcome = self.analysis.lock().unwrap().clone();
        match outcome {
            Some(Ok(result)) => Ok(result),
            Some(Err(status)) => Err(api_error(status)),
            None => Ok(OrganizeResult::default()),
        }
    }

    async fn extract_content(
        &self,
        _token: &str,
        request: &ExtractContentRequest,
    ) -> Result<ExtractContentResponse, ApiError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        if self.extract_failures.lock().unwrap().contains(&request.filename) {
            return Err(api_error(500));
        }
        Ok(ExtractContentResponse {
            content_preview: format!("preview of {}", request.filename),
        })
    }

    async fn generate_rules(
        &self,
        _token: &str,
        request: &GenerateRulesRequest,
    ) -> Result<GenerateRulesResponse, ApiError> {
        let call = {
            let mut requests = self.rule_requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        if let Some(status) = *self.rules_error.lock().unwrap() {
            return Err(api_error(status));
        }

        let mut rules = self.rules.lock().unwrap().clone();
        if self.shuffle_rules.load(Ordering::SeqCst) && call % 2 == 0 {
            rules.reverse();
        }
        Ok(GenerateRulesResponse {
            total_rules: rules.len(),
            rules,
        })
    }

    async fn log_action(&self, _token: &str, request: &ActionLogRequest) -> Result<(), ApiError> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        if self.log_failures.lock().unwrap().contains(&request.filename) {
            return Err(api_error(0));
        }
        self.logged.lock().unwrap().push(request.clone());
        Ok(())
    }
}

pub fn orchestrator(
    files: Arc<FakeFiles>,
    api: Arc<FakeApi>,
    token: Option<&str>,
) -> OrganizeOrchestrator {
    OrganizeOrchestrator::new(
        OrganizeDeps {
            files,
            tokens: Arc::new(StaticToken(token.map(str::to_string))),
            api,
        },
        OrganizeLimits::default(),
    )
}
