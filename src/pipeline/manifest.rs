//! Concat-demuxer manifest generation.
//!
//! One convention, everywhere: absolute paths with OS separators
//! normalized to forward slashes, consumed by the merge tool with
//! `-safe 0`. Basename-relative manifests (which require the tool to be
//! launched from the scratch directory) are deliberately not supported;
//! mixing the two conventions is how manifests silently stop resolving.

use std::path::{Path, PathBuf};

use crate::error::MergeError;

/// Write the manifest for `inputs`, in order, to `dest`.
///
/// Line format is `file '<reference>'`. Input order is preserved
/// exactly; it determines the final audio ordering.
pub async fn write_manifest(inputs: &[PathBuf], dest: &Path) -> Result<(), MergeError> {
    let mut lines = String::new();
    for input in inputs {
        lines.push_str(&format!("file '{}'\n", manifest_reference(input)?));
    }
    tokio::fs::write(dest, lines).await?;
    Ok(())
}

/// Absolute, forward-slash form of one input path.
///
/// Inputs are generated internally (UUID names under the scratch root),
/// so a quote can only appear if the scratch root itself contains one;
/// refuse rather than emit a line the tool would misparse.
fn manifest_reference(input: &Path) -> Result<String, MergeError> {
    let absolute = if input.is_absolute() {
        input.to_path_buf()
    } else {
        std::env::current_dir()?.join(input)
    };
    let reference = absolute.to_string_lossy().replace('\\', "/");
    if reference.contains('\'') {
        return Err(MergeError::UnsafeManifestPath { path: reference });
    }
    Ok(reference)
}
