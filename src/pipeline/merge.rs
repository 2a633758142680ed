//! External merge tool invocation.
//!
//! Runs ffmpeg's concat demuxer as a child process: stdout is
//! discarded, stderr is drained into a capped buffer, and the wait is
//! bounded by a timeout after which the process is killed. Diagnostics
//! therefore never grow past the cap no matter how chatty the tool is.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::config::MergeConfig;
use crate::error::MergeError;

/// Most stderr bytes retained for diagnostics.
const STDERR_CAP: usize = 8 * 1024;

/// Concatenates manifest-listed inputs into one output artifact.
#[async_trait]
pub trait Merger: Send + Sync {
    async fn concat(&self, manifest: &Path, output: &Path) -> Result<(), MergeError>;
}

/// Production merger driving the ffmpeg binary.
pub struct FfmpegMerger {
    binary: PathBuf,
    timeout: Duration,
    reencode: bool,
}

impl FfmpegMerger {
    pub fn new(config: &MergeConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: config.timeout,
            reencode: config.reencode,
        }
    }
}

#[async_trait]
impl Merger for FfmpegMerger {
    async fn concat(&self, manifest: &Path, output: &Path) -> Result<(), MergeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-hide_banner")
            .arg("-nostdin")
            .arg("-y")
            .arg("-f")
            .arg("concat")
            // The manifest uses absolute paths, which the demuxer
            // considers unsafe by default.
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(manifest);
        if !self.reencode {
            // Stream-copy: fast, but requires uniform input codec
            // parameters. Incompatible inputs fail at the tool level.
            cmd.arg("-c").arg("copy");
        }
        cmd.arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| MergeError::Spawn {
            binary: self.binary.display().to_string(),
            source: e,
        })?;

        let stderr = child.stderr.take().expect("stderr was piped");
        let stderr_handle = tokio::spawn(collect_capped(stderr));

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(waited) => waited?,
            Err(_) => {
                // kill() also reaps the child, so nothing lingers.
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill timed-out merge process");
                }
                return Err(MergeError::Timeout {
                    timeout: self.timeout,
                });
            }
        };

        let diagnostics = stderr_handle.await.unwrap_or_default();

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return Err(MergeError::Failed { code, diagnostics });
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(MergeError::MissingOutput {
                path: output.to_path_buf(),
            });
        }

        tracing::debug!(output = %output.display(), "merge complete");
        Ok(())
    }
}

/// Drain a stream into a capped string.
///
/// Keeps reading past the cap, discarding, so the child never stalls on
/// a full stderr pipe.
async fn collect_capped<R>(mut reader: R) -> String
where
    R: AsyncReadExt + Unpin,
{
    let mut collected: Vec<u8> = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let room = STDERR_CAP.saturating_sub(collected.len());
                let take = room.min(n);
                collected.extend_from_slice(&buf[..take]);
                if take < n {
                    truncated = true;
                }
            }
            Err(_) => break,
        }
    }
    let mut text = String::from_utf8_lossy(&collected).into_owned();
    if truncated {
        text.push_str("\n[diagnostics truncated]");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collect_capped_keeps_short_output_verbatim() {
        let out = collect_capped(&b"Unsafe file name 'x.mp3'"[..]).await;
        assert_eq!(out, "Unsafe file name 'x.mp3'");
    }

    #[tokio::test]
    async fn collect_capped_truncates_and_marks() {
        let big = vec![b'x'; STDERR_CAP * 3];
        let out = collect_capped(&big[..]).await;
        assert!(out.len() < STDERR_CAP + 64);
        assert!(out.ends_with("[diagnostics truncated]"));
    }

    #[cfg(unix)]
    mod subprocess {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Write an executable shell script standing in for ffmpeg.
        fn fake_tool(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-ffmpeg");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path
        }

        fn merger(binary: PathBuf, timeout: Duration) -> FfmpegMerger {
            FfmpegMerger::new(&MergeConfig {
                binary,
                timeout,
                reencode: false,
            })
        }

        #[tokio::test]
        async fn nonzero_exit_maps_to_failed_with_diagnostics() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "echo 'boom: invalid data' >&2; exit 1");
            let merger = merger(tool, Duration::from_secs(5));

            let err = merger
                .concat(&dir.path().join("list.txt"), &dir.path().join("out.mp3"))
                .await
                .unwrap_err();

            match err {
                MergeError::Failed { code, diagnostics } => {
                    assert_eq!(code, 1);
                    assert!(diagnostics.contains("boom: invalid data"));
                }
                other => panic!("expected Failed, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn success_requires_the_output_file_to_exist() {
            let dir = tempfile::tempdir().unwrap();
            // Exits 0 without writing anything.
            let tool = fake_tool(dir.path(), "exit 0");
            let merger = merger(tool, Duration::from_secs(5));

            let err = merger
                .concat(&dir.path().join("list.txt"), &dir.path().join("out.mp3"))
                .await
                .unwrap_err();
            assert!(matches!(err, MergeError::MissingOutput { .. }));
        }

        #[tokio::test]
        async fn zero_exit_with_output_succeeds() {
            let dir = tempfile::tempdir().unwrap();
            let out = dir.path().join("out.mp3");
            // Last argument is the output path; touch it like the real tool would.
            let tool = fake_tool(dir.path(), "for last; do :; done; : > \"$last\"; exit 0");
            let merger = merger(tool, Duration::from_secs(5));

            merger
                .concat(&dir.path().join("list.txt"), &out)
                .await
                .unwrap();
            assert!(out.exists());
        }

        #[tokio::test]
        async fn hung_tool_is_killed_after_timeout() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "sleep 30");
            let merger = merger(tool, Duration::from_millis(200));

            let start = std::time::Instant::now();
            let err = merger
                .concat(&dir.path().join("list.txt"), &dir.path().join("out.mp3"))
                .await
                .unwrap_err();

            assert!(matches!(err, MergeError::Timeout { .. }));
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "kill must not wait for the tool to finish"
            );
        }

        #[tokio::test]
        async fn missing_binary_maps_to_spawn_error() {
            let merger = merger(
                PathBuf::from("/nonexistent/audiocat-no-such-tool"),
                Duration::from_secs(1),
            );
            let err = merger
                .concat(Path::new("list.txt"), Path::new("out.mp3"))
                .await
                .unwrap_err();
            assert!(matches!(err, MergeError::Spawn { .. }));
        }
    }
}
