//! HTTP job runner client.
//!
//! POSTs the original request payload to the runner API and reads an
//! execution reference out of the response. Submission is synchronous
//! from the caller's point of view but bounded by a short timeout; the
//! runner does the actual work out of band.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::RunnerConfig;
use crate::dispatch::{ExecutionRef, JobRunner};
use crate::error::{ConfigError, DispatchError};

/// Bound on one submission round-trip.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Most response-body bytes kept when reporting a rejected submission.
const ERROR_BODY_CAP: usize = 1024;

#[derive(Debug)]
pub struct HttpJobRunner {
    client: reqwest::Client,
    endpoint: String,
    token: Option<SecretString>,
}

impl HttpJobRunner {
    pub fn new(config: &RunnerConfig) -> Result<Self, ConfigError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "AUDIOCAT_RUNNER_URL".to_string(),
                hint: "deferred mode needs the job runner endpoint".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "AUDIOCAT_RUNNER_URL".to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint,
            token: config.token.clone(),
        })
    }
}

/// Submission URL for a named job.
fn submit_url(endpoint: &str, job_name: &str) -> String {
    format!("{}/jobs/{}:run", endpoint.trim_end_matches('/'), job_name)
}

#[async_trait]
impl JobRunner for HttpJobRunner {
    async fn submit(
        &self,
        job_name: &str,
        payload: &serde_json::Value,
    ) -> Result<ExecutionRef, DispatchError> {
        let url = submit_url(&self.endpoint, job_name);

        let mut request = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "payload": payload }));
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(floor_char_boundary(&body, ERROR_BODY_CAP));
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
        let reference = body
            .get("execution")
            .and_then(|v| v.as_str())
            .unwrap_or("accepted")
            .to_string();

        tracing::info!(job_name, execution = %reference, "job submitted to runner");
        Ok(ExecutionRef(reference))
    }
}

/// Largest valid UTF-8 char boundary at or before `pos`, so truncating
/// by byte position can't panic mid-character.
fn floor_char_boundary(s: &str, pos: usize) -> usize {
    if pos >= s.len() {
        return s.len();
    }
    let mut i = pos;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_url_joins_cleanly() {
        assert_eq!(
            submit_url("https://runner.internal/", "audiocat-worker"),
            "https://runner.internal/jobs/audiocat-worker:run"
        );
        assert_eq!(
            submit_url("https://runner.internal", "audiocat-worker"),
            "https://runner.internal/jobs/audiocat-worker:run"
        );
    }

    #[test]
    fn new_requires_an_endpoint() {
        let err = HttpJobRunner::new(&RunnerConfig {
            endpoint: None,
            job_name: "audiocat-worker".to_string(),
            token: None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }

    #[test]
    fn floor_char_boundary_handles_multibyte() {
        let s = "hé"; // h = 1 byte, é = 2 bytes
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(floor_char_boundary(s, 100), 3);
        assert_eq!(floor_char_boundary("hello", 3), 3);
    }
}
