//! Configuration for audiocat.
//!
//! Everything is environment-driven (`AUDIOCAT_*` variables, `.env`
//! supported). Each section owns its own `from_env`; nothing outside
//! this module reads the process environment, so the execution mode is
//! decided exactly once at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Main configuration for the service.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub scratch: ScratchConfig,
    pub merge: MergeConfig,
    pub storage: StorageConfig,
    pub runner: RunnerConfig,
    pub execution: ExecutionConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            server: ServerConfig::from_env()?,
            scratch: ScratchConfig::from_env()?,
            merge: MergeConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            runner: RunnerConfig::from_env()?,
            execution: ExecutionConfig::from_env()?,
        })
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Optional API key; when set, `x-api-key` is required on the
    /// concatenate route.
    pub api_key: Option<SecretString>,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = optional_env("AUDIOCAT_BIND_ADDR")?
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let bind_addr = raw.parse().map_err(|e| ConfigError::InvalidValue {
            key: "AUDIOCAT_BIND_ADDR".to_string(),
            message: format!("must be host:port ({e})"),
        })?;

        let api_key = optional_env("AUDIOCAT_API_KEY")?.map(SecretString::from);

        Ok(Self { bind_addr, api_key })
    }
}

/// Local scratch storage for in-flight jobs.
///
/// Every job works inside `<root>/<job-id>/`; the root itself is shared
/// between concurrent jobs and must never hold job files directly.
#[derive(Debug, Clone)]
pub struct ScratchConfig {
    pub root: PathBuf,
}

impl ScratchConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let root = optional_env("AUDIOCAT_SCRATCH_DIR")?
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("audiocat"));
        Ok(Self { root })
    }
}

/// External merge tool configuration.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Path or name of the ffmpeg binary.
    pub binary: PathBuf,
    /// Hard bound on a single merge invocation; the process is killed
    /// on expiry.
    pub timeout: Duration,
    /// Re-encode instead of stream-copy. Slower, but tolerates inputs
    /// with mismatched codec parameters.
    pub reencode: bool,
}

impl MergeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let binary = optional_env("AUDIOCAT_FFMPEG_BIN")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));

        let timeout_secs: u64 = parse_optional_env("AUDIOCAT_MERGE_TIMEOUT_SECS", 300)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AUDIOCAT_MERGE_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let reencode = parse_bool_env("AUDIOCAT_MERGE_REENCODE", false)?;

        Ok(Self {
            binary,
            timeout: Duration::from_secs(timeout_secs),
            reencode,
        })
    }
}

/// Object storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Destination bucket. Required in inline/worker mode; the check
    /// happens when the storage client is constructed so a
    /// deferred-only deployment can omit it.
    pub bucket: Option<String>,
    pub region: String,
    /// Custom endpoint for S3-compatible backends (MinIO, R2, ...).
    /// Implies path-style addressing.
    pub endpoint_url: Option<String>,
    /// Overrides the public URL base for returned links (e.g. a CDN
    /// domain in front of the bucket).
    pub public_base_url: Option<String>,
    /// Key prefix for merged output objects.
    pub key_prefix: String,
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bucket: optional_env("AUDIOCAT_S3_BUCKET")?,
            region: optional_env("AUDIOCAT_S3_REGION")?
                .unwrap_or_else(|| "us-east-1".to_string()),
            endpoint_url: optional_env("AUDIOCAT_S3_ENDPOINT_URL")?,
            public_base_url: optional_env("AUDIOCAT_PUBLIC_BASE_URL")?,
            key_prefix: optional_env("AUDIOCAT_KEY_PREFIX")?
                .unwrap_or_else(|| "merged_audio".to_string()),
        })
    }
}

/// External job runner configuration (deferred mode only).
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base URL of the runner API. Required in deferred mode; checked
    /// when the dispatcher is constructed.
    pub endpoint: Option<String>,
    /// Name of the job the runner starts for us.
    pub job_name: String,
    /// Optional bearer token for the runner API.
    pub token: Option<SecretString>,
}

impl RunnerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let endpoint = optional_env("AUDIOCAT_RUNNER_URL")?;
        if let Some(ref url) = endpoint
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                key: "AUDIOCAT_RUNNER_URL".to_string(),
                message: "must start with http:// or https://".to_string(),
            });
        }

        Ok(Self {
            endpoint,
            job_name: optional_env("AUDIOCAT_RUNNER_JOB_NAME")?
                .unwrap_or_else(|| "audiocat-worker".to_string()),
            token: optional_env("AUDIOCAT_RUNNER_TOKEN")?.map(SecretString::from),
        })
    }
}

/// How a received request is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run the full pipeline in-process and answer with the final URL.
    Inline,
    /// Hand the payload to the external job runner and answer with an
    /// acknowledgment.
    Deferred,
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" | "worker" | "job" => Ok(Self::Inline),
            "deferred" | "service" => Ok(Self::Deferred),
            other => Err(format!(
                "unknown execution mode '{other}' (expected 'inline' or 'deferred')"
            )),
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Inline => "inline",
            Self::Deferred => "deferred",
        })
    }
}

/// Execution mode configuration.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
}

impl ExecutionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mode = parse_optional_env("AUDIOCAT_EXECUTION_MODE", ExecutionMode::Inline)?;
        Ok(Self { mode })
    }
}

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{e}"),
        }),
    }
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match optional_env(key)? {
        None => Ok(default),
        Some(s) => match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got '{other}'"),
            }),
        },
    }
}
