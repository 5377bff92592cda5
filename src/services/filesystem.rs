//! Local filesystem collaborator
//!
//! Scans the organize root and performs the approved moves. Blocking
//! filesystem work runs on the tokio blocking pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::models::{ExistingFolder, MoveExecutionResult, MoveOperation, ScannedFile};

/// Sample filenames sent per existing folder
const EXISTING_FOLDER_SAMPLES: usize = 5;

/// Filesystem primitives consumed by the orchestrator
#[async_trait]
pub trait FileOps: Send + Sync {
    /// Files directly under `path` (non-recursive, hidden files skipped)
    async fn scan_folder(&self, path: &Path) -> std::io::Result<Vec<ScannedFile>>;

    /// Immediate sub-folders of `path`, used as naming hints
    async fn scan_existing_folders(&self, path: &Path) -> std::io::Result<Vec<ExistingFolder>>;

    /// At most `max_bytes` from the start of the file
    async fn read_bytes(&self, path: &Path, max_bytes: usize) -> std::io::Result<Vec<u8>>;

    /// Apply a batch of moves, continuing past individual failures.
    /// An `Err` means the batch could not be attempted at all.
    async fn execute_moves(
        &self,
        base_folder: &Path,
        moves: Vec<MoveOperation>,
        create_folders: bool,
    ) -> std::io::Result<MoveExecutionResult>;
}

/// [`FileOps`] backed by the real filesystem
#[derive(Debug, Clone, Default)]
pub struct LocalFileOps;

impl LocalFileOps {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileOps for LocalFileOps {
    async fn scan_folder(&self, path: &Path) -> std::io::Result<Vec<ScannedFile>> {
        let path = path.to_path_buf();
        run_blocking(move || scan_folder_sync(&path)).await
    }

    async fn scan_existing_folders(&self, path: &Path) -> std::io::Result<Vec<ExistingFolder>> {
        let path = path.to_path_buf();
        run_blocking(move || scan_existing_folders_sync(&path)).await
    }

    async fn read_bytes(&self, path: &Path, max_bytes: usize) -> std::io::Result<Vec<u8>> {
        let path = path.to_path_buf();
        run_blocking(move || read_bytes_sync(&path, max_bytes)).await
    }

    async fn execute_moves(
        &self,
        base_folder: &Path,
        moves: Vec<MoveOperation>,
        create_folders: bool,
    ) -> std::io::Result<MoveExecutionResult> {
        let base = base_folder.to_path_buf();
        run_blocking(move || execute_moves_sync(&base, &moves, create_folders)).await
    }
}

async fn run_blocking<T, F>(f: F) -> std::io::Result<T>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| std::io::Error::other(format!("Task failed: {}", e)))?
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn ensure_directory(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Folder does not exist: {}", path.display()),
        ));
    }
    if !path.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Path is not a directory: {}", path.display()),
        ));
    }
    Ok(())
}

fn scan_folder_sync(path: &Path) -> std::io::Result<Vec<ScannedFile>> {
    ensure_directory(path)?;

    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let Ok(entry) = entry else { continue };
        let file_path = entry.path();

        if file_path.is_dir() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().to_string();
        if filename.is_empty() || is_hidden(&filename) {
            continue;
        }

        let extension = file_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        let metadata = entry.metadata().ok();
        let size_bytes = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
        let modified = metadata
            .and_then(|m| m.modified().ok())
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339());

        files.push(ScannedFile {
            filename,
            extension,
            size_bytes,
            path: file_path.to_string_lossy().to_string(),
            modified,
            content_preview: String::new(),
        });
    }

    // read_dir order is platform dependent
    files.sort_by(|a, b| a.filename.cmp(&b.filename));

    tracing::debug!(folder = %path.display(), files = files.len(), "Scanned folder");
    Ok(files)
}

fn scan_existing_folders_sync(path: &Path) -> std::io::Result<Vec<ExistingFolder>> {
    ensure_directory(path)?;

    let mut folders = Vec::new();
    for entry in fs::read_dir(path)? {
        let Ok(entry) = entry else { continue };
        let folder_path = entry.path();
        if !folder_path.is_dir() {
            continue;
        }

        let folder_name = entry.file_name().to_string_lossy().to_string();
        if is_hidden(&folder_name) {
            continue;
        }

        let mut names: Vec<String> = match fs::read_dir(&folder_path) {
            Ok(children) => children
                .filter_map(Result::ok)
                .filter(|c| c.path().is_file())
                .map(|c| c.file_name().to_string_lossy().to_string())
                .filter(|n| !is_hidden(n))
                .collect(),
            Err(e) => {
                tracing::debug!(folder = %folder_path.display(), error = %e, "Unreadable sub-folder");
                Vec::new()
            }
        };
        names.sort();

        let file_count = names.len();
        names.truncate(EXISTING_FOLDER_SAMPLES);

        folders.push(ExistingFolder {
            folder_name,
            folder_path: folder_path.to_string_lossy().to_string(),
            sample_files: names,
            file_count,
        });
    }

    folders.sort_by(|a, b| a.folder_name.cmp(&b.folder_name));
    Ok(folders)
}

fn read_bytes_sync(path: &Path, max_bytes: usize) -> std::io::Result<Vec<u8>> {
    let file = fs::File::open(path)?;
    let mut content = Vec::with_capacity(max_bytes.min(64 * 1024));
    file.take(max_bytes as u64).read_to_end(&mut content)?;
    Ok(content)
}

/// Outcome of a single move
enum MoveOutcome {
    Moved,
    Skipped,
}

fn execute_moves_sync(
    base: &Path,
    moves: &[MoveOperation],
    create_folders: bool,
) -> std::io::Result<MoveExecutionResult> {
    ensure_directory(base)?;
    let root = base.canonicalize()?;

    let mut result = MoveExecutionResult::default();

    for action in moves {
        match move_one(&root, action, create_folders) {
            Ok(MoveOutcome::Moved) => {
                result.moved_count += 1;
                result.moved_files.push(action.source_path.clone());
            }
            Ok(MoveOutcome::Skipped) => result.skipped_count += 1,
            Err(err) => {
                tracing::debug!(file = %action.filename, error = %err, "Move failed");
                result.errors.push(err);
                result.skipped_count += 1;
            }
        }
    }

    result.success = result.errors.is_empty();

    tracing::info!(
        moved = result.moved_count,
        skipped = result.skipped_count,
        failed = result.errors.len(),
        "Executed move batch"
    );
    Ok(result)
}

fn move_one(root: &Path, action: &MoveOperation, create_folders: bool) -> Result<MoveOutcome, String> {
    let source = PathBuf::from(&action.source_path);
    let dest_folder = confined_destination(root, &action.dest_folder)?;
    ensure_within(root, &dest_folder)?;
    let dest_file = dest_folder.join(&action.filename);

    if create_folders && !dest_folder.exists() {
        fs::create_dir_all(&dest_folder).map_err(|e| {
            format!("Failed to create folder {}: {}", dest_folder.display(), e)
        })?;
    }

    // Never overwrite
    if dest_file.exists() {
        tracing::debug!(dest = %dest_file.display(), "Destination exists, skipping");
        return Ok(MoveOutcome::Skipped);
    }

    perform_move(&source, &dest_file)
        .map_err(|e| format!("Failed to move {}: {}", action.filename, e))?;
    Ok(MoveOutcome::Moved)
}

/// Resolve `dest_folder` to a sub-folder of the canonical `root`.
///
/// `.` and `..` are resolved lexically; absolute paths, the root itself and
/// anything climbing above it are rejected.
fn confined_destination(root: &Path, dest_folder: &str) -> Result<PathBuf, String> {
    let mut relative = PathBuf::new();

    for component in Path::new(dest_folder).components() {
        match component {
            Component::Normal(name) => relative.push(name),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return Err(format!(
                        "Destination escapes the organize folder: {}",
                        dest_folder
                    ));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("Absolute destination not allowed: {}", dest_folder));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(format!("Destination is not a sub-folder: {:?}", dest_folder));
    }
    Ok(root.join(relative))
}

/// Reject destinations that leave `root` through a symlinked folder
fn ensure_within(root: &Path, path: &Path) -> Result<(), String> {
    let existing = path.ancestors().find(|p| p.exists()).unwrap_or(root);
    let resolved = existing
        .canonicalize()
        .map_err(|e| format!("Failed to resolve {}: {}", existing.display(), e))?;

    if !resolved.starts_with(root) {
        return Err(format!(
            "Destination escapes the organize folder: {} is not under {}",
            resolved.display(),
            root.display()
        ));
    }
    Ok(())
}

/// Try rename first (same filesystem), fall back to copy+delete
fn perform_move(source: &Path, destination: &Path) -> Result<(), String> {
    if let Err(rename_err) = fs::rename(source, destination) {
        fs::copy(source, destination).map_err(|e| format!("{} / {}", rename_err, e))?;
        fs::remove_file(source).map_err(|e| format!("Failed to remove source: {}", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn op(source: &Path, dest_folder: &str) -> MoveOperation {
        MoveOperation {
            source_path: source.to_string_lossy().to_string(),
            dest_folder: dest_folder.to_string(),
            filename: source.file_name().unwrap().to_string_lossy().to_string(),
        }
    }

    #[tokio::test]
    async fn test_scan_skips_hidden_and_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Report.PDF"), "pdf").unwrap();
        fs::write(dir.path().join(".DS_Store"), "x").unwrap();
        fs::write(dir.path().join("notes"), "plain").unwrap();
        fs::create_dir(dir.path().join("Docs")).unwrap();

        let files = LocalFileOps::new().scan_folder(dir.path()).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["Report.PDF", "notes"]);
        assert_eq!(files[0].extension, ".pdf");
        assert_eq!(files[0].size_bytes, 3);
        assert!(files[0].modified.is_some());
        assert_eq!(files[1].extension, "");
    }

    #[tokio::test]
    async fn test_scan_missing_folder_fails() {
        let dir = tempdir().unwrap();
        let err = LocalFileOps::new()
            .scan_folder(&dir.path().join("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_scan_existing_folders_samples() {
        let dir = tempdir().unwrap();
        let docs = dir.path().join("Docs");
        fs::create_dir(&docs).unwrap();
        for i in 0..7 {
            fs::write(docs.join(format!("doc{}.txt", i)), "x").unwrap();
        }
        fs::create_dir(dir.path().join(".git")).unwrap();

        let folders = LocalFileOps::new()
            .scan_existing_folders(dir.path())
            .await
            .unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].folder_name, "Docs");
        assert_eq!(folders[0].file_count, 7);
        assert_eq!(folders[0].sample_files.len(), EXISTING_FOLDER_SAMPLES);
    }

    #[tokio::test]
    async fn test_read_bytes_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, vec![b'a'; 1000]).unwrap();

        let bytes = LocalFileOps::new().read_bytes(&path, 100).await.unwrap();
        assert_eq!(bytes.len(), 100);

        let missing = LocalFileOps::new()
            .read_bytes(&dir.path().join("nope"), 100)
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_execute_moves_creates_folders() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.jpg");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();

        let result = LocalFileOps::new()
            .execute_moves(dir.path(), vec![op(&a, "Docs"), op(&b, "Images")], true)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.moved_count, 2);
        assert_eq!(result.moved_files.len(), 2);
        assert!(dir.path().join("Docs/a.pdf").exists());
        assert!(dir.path().join("Images/b.jpg").exists());
        assert!(!a.exists());
    }

    #[tokio::test]
    async fn test_execute_moves_continues_past_failures() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let c = dir.path().join("c.txt");
        fs::write(&a, "a").unwrap();
        fs::write(&c, "c").unwrap();
        fs::create_dir(dir.path().join("Docs")).unwrap();
        fs::write(dir.path().join("Docs/c.txt"), "already here").unwrap();

        let moves = vec![
            op(&dir.path().join("gone.txt"), "Docs"),
            op(&c, "Docs"),
            op(&a, "Docs"),
        ];
        let result = LocalFileOps::new()
            .execute_moves(dir.path(), moves, true)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.moved_count, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.skipped_count, 2);
        assert!(c.exists(), "existing destination must not be overwritten");
        assert!(dir.path().join("Docs/a.pdf").exists());
    }

    #[tokio::test]
    async fn test_execute_moves_stays_inside_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("inbox");
        fs::create_dir(&root).unwrap();
        let a = root.join("a.pdf");
        let b = root.join("b.jpg");
        let c = root.join("c.txt");
        for path in [&a, &b, &c] {
            fs::write(path, "x").unwrap();
        }

        let moves = vec![
            op(&a, "../escaped"),
            op(&b, "/tmp/elsewhere"),
            op(&c, "Work/../Docs"),
        ];
        let result = LocalFileOps::new()
            .execute_moves(&root, moves, true)
            .await
            .unwrap();

        assert_eq!(result.moved_count, 1);
        assert_eq!(result.errors.len(), 2);
        assert!(a.exists());
        assert!(b.exists());
        assert!(!dir.path().join("escaped").exists());
        assert!(root.join("Docs/c.txt").exists());
        assert!(!root.join("Work").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_moves_rejects_symlinked_folder() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("inbox");
        let outside = dir.path().join("outside");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("Docs")).unwrap();
        let a = root.join("a.pdf");
        fs::write(&a, "a").unwrap();

        let result = LocalFileOps::new()
            .execute_moves(&root, vec![op(&a, "Docs")], true)
            .await
            .unwrap();

        assert_eq!(result.moved_count, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(a.exists());
        assert!(!outside.join("a.pdf").exists());
    }

    #[test]
    fn test_confined_destination() {
        let root = Path::new("/data/inbox");
        assert_eq!(
            confined_destination(root, "Docs/./Reports").unwrap(),
            PathBuf::from("/data/inbox/Docs/Reports")
        );
        assert!(confined_destination(root, "..").is_err());
        assert!(confined_destination(root, "Docs/../..").is_err());
        assert!(confined_destination(root, "/etc").is_err());
        assert!(confined_destination(root, ".").is_err());
        assert!(confined_destination(root, "").is_err());
    }

    #[tokio::test]
    async fn test_execute_moves_without_folder_creation() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        fs::write(&a, "a").unwrap();

        let result = LocalFileOps::new()
            .execute_moves(dir.path(), vec![op(&a, "Docs")], false)
            .await
            .unwrap();

        assert_eq!(result.moved_count, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(a.exists());
    }
}
