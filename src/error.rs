//! Error types for audiocat.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-shape errors. These are the only errors whose text is
/// surfaced verbatim to clients.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("audio_urls must contain at least {min} URLs, got {got}")]
    TooFewInputs { min: usize, got: usize },

    #[error("audio_urls[{index}] is not a valid URL: {reason}")]
    InvalidUrl { index: usize, reason: String },

    #[error("audio_urls[{index}] has unsupported scheme '{scheme}'; only http and https are allowed")]
    UnsupportedScheme { index: usize, scheme: String },

    #[error("Invalid request body: {0}")]
    MalformedBody(String),
}

/// Errors retrieving a remote input to local storage.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("source is not a fetchable URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("transport failure fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the external concatenation tool.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("failed to spawn merge tool '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("merge tool exited with status {code}: {diagnostics}")]
    Failed { code: i32, diagnostics: String },

    #[error("merge timed out after {timeout:?} and the tool was killed")]
    Timeout { timeout: Duration },

    #[error("input path not representable in a concat manifest: {path}")]
    UnsafeManifestPath { path: String },

    #[error("merge produced no output file at {path}")]
    MissingOutput { path: PathBuf },

    #[error("IO error during merge: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors pushing the merged artifact to object storage.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to read {path} for upload: {reason}")]
    Read { path: String, reason: String },

    #[error("storage backend rejected object '{key}': {reason}")]
    Rejected { key: String, reason: String },
}

/// Errors submitting a deferred job to the external runner.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("job runner request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job runner returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::MissingEnvVar("AUDIOCAT_S3_BUCKET".to_string());
        let msg = err.to_string();
        assert!(
            msg.contains("AUDIOCAT_S3_BUCKET"),
            "Should mention the variable name: {msg}"
        );

        let err = ConfigError::InvalidValue {
            key: "AUDIOCAT_BIND_ADDR".to_string(),
            message: "must be host:port".to_string(),
        };
        let msg = err.to_string();
        assert!(
            msg.contains("AUDIOCAT_BIND_ADDR"),
            "Should mention the key: {msg}"
        );
        assert!(msg.contains("host:port"), "Should include the message: {msg}");
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::TooFewInputs { min: 2, got: 1 };
        let msg = err.to_string();
        assert!(msg.contains('2'), "Should mention the minimum: {msg}");
        assert!(msg.contains('1'), "Should mention the actual count: {msg}");

        let err = ValidationError::UnsupportedScheme {
            index: 3,
            scheme: "ftp".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ftp"), "Should mention the scheme: {msg}");
        assert!(msg.contains('3'), "Should mention the index: {msg}");
    }

    #[test]
    fn download_error_display() {
        let err = DownloadError::Status {
            url: "https://cdn.example/a.mp3".to_string(),
            status: 404,
        };
        let msg = err.to_string();
        assert!(msg.contains("404"), "Should mention the status: {msg}");
        assert!(msg.contains("a.mp3"), "Should mention the URL: {msg}");
    }

    #[test]
    fn merge_error_display() {
        let err = MergeError::Failed {
            code: 1,
            diagnostics: "Unsafe file name".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("status 1"), "Should mention the exit code: {msg}");
        assert!(
            msg.contains("Unsafe file name"),
            "Should carry diagnostics: {msg}"
        );

        let err = MergeError::Timeout {
            timeout: Duration::from_secs(300),
        };
        assert!(err.to_string().contains("300"), "Should mention the timeout");
    }

    #[test]
    fn top_level_error_from_conversions() {
        let validation = ValidationError::TooFewInputs { min: 2, got: 0 };
        let err: Error = validation.into();
        assert!(matches!(err, Error::Validation(_)));

        let merge = MergeError::Failed {
            code: 1,
            diagnostics: String::new(),
        };
        let err: Error = merge.into();
        assert!(matches!(err, Error::Merge(_)));

        let upload = UploadError::Rejected {
            key: "merged_audio/x.mp3".to_string(),
            reason: "access denied".to_string(),
        };
        let err: Error = upload.into();
        assert!(matches!(err, Error::Upload(_)));
    }
}
