//! Streaming download of remote inputs into job-local scratch storage.
//!
//! Local names are derived from a fresh UUID, never from the remote
//! filename, so concurrent jobs and hostile `Content-Disposition`-style
//! names cannot collide or escape the scratch directory. Bodies are
//! streamed chunk-at-a-time to disk and never buffered whole in memory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use url::Url;
use uuid::Uuid;

use crate::error::DownloadError;

/// Request timeout for a single input download.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Extension used when neither the URL path nor the response headers
/// yield anything usable.
const DEFAULT_EXTENSION: &str = ".mp3";

/// Retrieves one remote resource into a destination directory.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` into `dest_dir`, returning the local path.
    ///
    /// A failed call may leave a partial file in `dest_dir`; callers
    /// own the directory sweep that collects it.
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, DownloadError>;
}

/// Production fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client for fetcher");

        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        let parsed = Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| DownloadError::Io {
                path: dest_dir.to_path_buf(),
                source: e,
            })?;

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| DownloadError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let extension = extension_from_url(&parsed)
            .or_else(|| content_type.as_deref().and_then(extension_from_content_type))
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        let local = dest_dir.join(format!("{}{}", Uuid::new_v4(), extension));

        let mut file = tokio::fs::File::create(&local)
            .await
            .map_err(|e| DownloadError::Io {
                path: local.clone(),
                source: e,
            })?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Transport {
                url: url.to_string(),
                source: e,
            })?;
            file.write_all(&chunk).await.map_err(|e| DownloadError::Io {
                path: local.clone(),
                source: e,
            })?;
        }
        file.flush().await.map_err(|e| DownloadError::Io {
            path: local.clone(),
            source: e,
        })?;

        tracing::debug!(url, path = %local.display(), "download complete");
        Ok(local)
    }
}

/// Take a short alphanumeric suffix from the URL path, if any.
///
/// Query strings are already stripped by `Url::path()`, so
/// `/file.mp3?sig=...` yields `.mp3`.
fn extension_from_url(url: &Url) -> Option<String> {
    let name = url.path().rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 4 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

/// Map a response Content-Type to a file extension.
fn extension_from_content_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim();
    let candidates = mime_guess::get_mime_extensions_str(essence)?;
    candidates.first().map(|ext| format!(".{ext}"))
}
