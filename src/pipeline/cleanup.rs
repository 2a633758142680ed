//! Unconditional removal of job-local artifacts.
//!
//! Deletion failures are logged and swallowed: cleanup runs after both
//! success and failure, and a cleanup problem must never mask the
//! pipeline's actual outcome.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Delete each path; a missing file is not an error.
pub async fn cleanup_files(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed temporary file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary file");
            }
        }
    }
}

/// Remove a job's scratch subdirectory and anything still inside it
/// (partial downloads whose names were never returned to the caller).
pub async fn cleanup_job_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => tracing::debug!(dir = %dir.display(), "removed job scratch directory"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to remove job scratch directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removes_existing_files_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.mp3");
        let absent = dir.path().join("never-created.mp3");
        std::fs::write(&present, b"x").unwrap();

        cleanup_files(&[present.clone(), absent]).await;

        assert!(!present.exists());
    }

    #[tokio::test]
    async fn keeps_going_after_a_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("gone.mp3");
        let second = dir.path().join("still-here.mp3");
        std::fs::write(&second, b"x").unwrap();

        // First path never existed; the second must still be removed.
        cleanup_files(&[first, second.clone()]).await;

        assert!(!second.exists());
    }

    #[tokio::test]
    async fn job_dir_sweep_takes_unregistered_files_with_it() {
        let dir = tempfile::tempdir().unwrap();
        let job_dir = dir.path().join("job-123");
        std::fs::create_dir_all(&job_dir).unwrap();
        std::fs::write(job_dir.join("partial.mp3"), b"half").unwrap();

        cleanup_job_dir(&job_dir).await;

        assert!(!job_dir.exists());
    }

    #[tokio::test]
    async fn job_dir_sweep_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        cleanup_job_dir(&dir.path().join("never-created")).await;
    }
}
