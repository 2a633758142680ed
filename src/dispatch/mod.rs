//! Deferred-execution seam: submitting a job to an external runner.

pub mod http;

use async_trait::async_trait;

use crate::error::DispatchError;

/// Opaque reference to a runner-side execution, for acknowledgments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRef(pub String);

impl std::fmt::Display for ExecutionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands a job payload to an external runner for background execution.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Submit `payload` for the named job; returns the runner's
    /// execution reference.
    async fn submit(
        &self,
        job_name: &str,
        payload: &serde_json::Value,
    ) -> Result<ExecutionRef, DispatchError>;
}

pub use http::HttpJobRunner;
