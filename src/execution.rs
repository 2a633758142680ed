//! Execution strategy: inline pipeline vs. deferred hand-off.
//!
//! The strategy is chosen once at startup from configuration and
//! injected into the HTTP layer; nothing downstream inspects the
//! environment. Both strategies end in the same final state (one
//! uploaded artifact, zero leaked local files); they differ only in
//! whether the response carries the final URL or an acknowledgment.

use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatch::JobRunner;
use crate::error::Result;
use crate::job::Job;
use crate::pipeline::Pipeline;

/// What the caller gets back from executing a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The pipeline ran to completion here.
    Completed { output_url: String },
    /// The job was handed to the external runner.
    Dispatched { reference: String },
}

#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    async fn execute(&self, job: Job) -> Result<ExecutionOutcome>;
}

/// Runs the full pipeline in-process (worker/job environment).
pub struct InlineExecutor {
    pipeline: Arc<Pipeline>,
}

impl InlineExecutor {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl ExecutionStrategy for InlineExecutor {
    async fn execute(&self, job: Job) -> Result<ExecutionOutcome> {
        let output_url = self.pipeline.run(&job).await?;
        Ok(ExecutionOutcome::Completed { output_url })
    }
}

/// Submits the original payload to the job runner (request-serving
/// environment). Never touches local storage.
pub struct DeferredDispatcher {
    runner: Arc<dyn JobRunner>,
    job_name: String,
}

impl DeferredDispatcher {
    pub fn new(runner: Arc<dyn JobRunner>, job_name: String) -> Self {
        Self { runner, job_name }
    }
}

#[async_trait]
impl ExecutionStrategy for DeferredDispatcher {
    async fn execute(&self, job: Job) -> Result<ExecutionOutcome> {
        let reference = self.runner.submit(&self.job_name, &job.payload()).await?;
        Ok(ExecutionOutcome::Dispatched {
            reference: reference.0,
        })
    }
}
