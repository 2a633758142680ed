//! The concatenation pipeline: download, manifest, merge, upload,
//! clean up.
//!
//! Stages run strictly in order and abort on the first error; cleanup
//! runs unconditionally afterwards against every artifact created up to
//! that point, followed by a sweep of the job's scratch subdirectory.

pub mod cleanup;
pub mod fetch;
pub mod manifest;
pub mod merge;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, MergeError, Result};
use crate::job::{Job, JobStage};
use crate::storage::ObjectStore;

pub use fetch::{Fetcher, HttpFetcher};
pub use merge::{FfmpegMerger, Merger};

/// Output container for merged artifacts. Stream-copy concatenation
/// keeps the input encoding, so homogeneous mp3 inputs stay mp3.
const OUTPUT_EXTENSION: &str = "mp3";

/// Sequences one job through the full pipeline.
///
/// All effects go through injected trait objects, so every external
/// surface (network, merge tool, storage) is substitutable in tests.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    merger: Arc<dyn Merger>,
    store: Arc<dyn ObjectStore>,
    scratch_root: PathBuf,
    key_prefix: String,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        merger: Arc<dyn Merger>,
        store: Arc<dyn ObjectStore>,
        scratch_root: PathBuf,
        key_prefix: String,
    ) -> Self {
        Self {
            fetcher,
            merger,
            store,
            scratch_root,
            key_prefix,
        }
    }

    /// Run the job to completion and return the public URL of the
    /// merged artifact.
    ///
    /// Regardless of outcome, nothing the job wrote under its scratch
    /// subdirectory survives this call.
    pub async fn run(&self, job: &Job) -> Result<String> {
        let job_dir = self.scratch_root.join(job.id.to_string());
        tokio::fs::create_dir_all(&job_dir).await?;

        let mut artifacts: Vec<PathBuf> = Vec::new();
        let result = self.run_stages(job, &job_dir, &mut artifacts).await;

        tracing::debug!(job_id = %job.id, stage = %JobStage::Cleaning, artifacts = artifacts.len(), "cleaning up");
        cleanup::cleanup_files(&artifacts).await;
        cleanup::cleanup_job_dir(&job_dir).await;

        match &result {
            Ok(url) => {
                tracing::info!(job_id = %job.id, stage = %JobStage::Done, output_url = %url, "job complete");
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job.id,
                    stage = %JobStage::Failed,
                    failed_stage = %failed_stage(e),
                    error = %e,
                    "job failed"
                );
            }
        }

        result
    }

    async fn run_stages(
        &self,
        job: &Job,
        job_dir: &std::path::Path,
        artifacts: &mut Vec<PathBuf>,
    ) -> Result<String> {
        let mut inputs: Vec<PathBuf> = Vec::with_capacity(job.audio_urls.len());
        for (index, url) in job.audio_urls.iter().enumerate() {
            tracing::info!(job_id = %job.id, stage = %JobStage::Downloading, index, url, "fetching input");
            let path = self.fetcher.fetch(url, job_dir).await?;
            artifacts.push(path.clone());
            inputs.push(path);
        }

        tracing::info!(job_id = %job.id, stage = %JobStage::Manifesting, inputs = inputs.len(), "writing manifest");
        let manifest_path = job_dir.join(format!("{}_concat_list.txt", job.id));
        // Register before writing so a partially written manifest is
        // still collected.
        artifacts.push(manifest_path.clone());
        manifest::write_manifest(&inputs, &manifest_path).await?;

        tracing::info!(job_id = %job.id, stage = %JobStage::Merging, "invoking merge tool");
        let output_path = job_dir.join(format!("{}.{}", job.id, OUTPUT_EXTENSION));
        artifacts.push(output_path.clone());
        self.merger.concat(&manifest_path, &output_path).await?;
        if !tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            return Err(Error::Merge(MergeError::MissingOutput {
                path: output_path,
            }));
        }

        tracing::info!(job_id = %job.id, stage = %JobStage::Uploading, "uploading merged output");
        let key = format!(
            "{}/{}.{}",
            self.key_prefix.trim_matches('/'),
            job.id,
            OUTPUT_EXTENSION
        );
        let url = self.store.put(&output_path, &key).await?;

        Ok(url)
    }
}

/// Which stage an error belongs to, for the failure log line.
fn failed_stage(err: &Error) -> JobStage {
    match err {
        Error::Validation(_) => JobStage::Validating,
        Error::Download(_) => JobStage::Downloading,
        Error::Merge(MergeError::UnsafeManifestPath { .. }) => JobStage::Manifesting,
        Error::Merge(_) => JobStage::Merging,
        Error::Upload(_) => JobStage::Uploading,
        _ => JobStage::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn failed_stage_maps_error_families() {
        assert_eq!(
            failed_stage(&Error::Validation(ValidationError::TooFewInputs {
                min: 2,
                got: 1
            })),
            JobStage::Validating
        );
        assert_eq!(
            failed_stage(&Error::Merge(MergeError::Failed {
                code: 1,
                diagnostics: String::new()
            })),
            JobStage::Merging
        );
        assert_eq!(
            failed_stage(&Error::Merge(MergeError::UnsafeManifestPath {
                path: "x".into()
            })),
            JobStage::Manifesting
        );
    }
}
