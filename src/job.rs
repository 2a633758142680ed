//! Job model: one request to concatenate an ordered list of audio
//! sources into a single output.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Minimum number of inputs for a concatenation to make sense.
pub const MIN_INPUTS: usize = 2;

/// Wire shape of a concatenation request. This exact payload is also
/// what the deferred path forwards to the job runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatenateRequest {
    pub audio_urls: Vec<String>,
}

impl ConcatenateRequest {
    /// Check the request shape: at least [`MIN_INPUTS`] well-formed
    /// http(s) URLs. Runs before any filesystem or network activity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.audio_urls.len() < MIN_INPUTS {
            return Err(ValidationError::TooFewInputs {
                min: MIN_INPUTS,
                got: self.audio_urls.len(),
            });
        }

        for (index, raw) in self.audio_urls.iter().enumerate() {
            let parsed = url::Url::parse(raw).map_err(|e| ValidationError::InvalidUrl {
                index,
                reason: e.to_string(),
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ValidationError::UnsupportedScheme {
                    index,
                    scheme: parsed.scheme().to_string(),
                });
            }
        }

        Ok(())
    }
}

/// A validated concatenation job.
///
/// Construction through [`Job::try_new`] is the single validation
/// point: a `Job` in hand means the request shape already passed.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    /// Source URLs in playback order. The order here determines the
    /// final audio ordering end to end.
    pub audio_urls: Vec<String>,
}

impl Job {
    pub fn try_new(request: ConcatenateRequest) -> Result<Self, ValidationError> {
        request.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            audio_urls: request.audio_urls,
        })
    }

    /// The original wire payload, for handing to the job runner.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({ "audio_urls": self.audio_urls })
    }
}

/// Pipeline stages, carried in structured log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Received,
    Validating,
    Downloading,
    Manifesting,
    Merging,
    Uploading,
    Cleaning,
    Done,
    Failed,
}

impl JobStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validating => "validating",
            Self::Downloading => "downloading",
            Self::Manifesting => "manifesting",
            Self::Merging => "merging",
            Self::Uploading => "uploading",
            Self::Cleaning => "cleaning",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(urls: &[&str]) -> ConcatenateRequest {
        ConcatenateRequest {
            audio_urls: urls.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn rejects_empty_and_single_input() {
        assert!(matches!(
            request(&[]).validate(),
            Err(ValidationError::TooFewInputs { got: 0, .. })
        ));
        assert!(matches!(
            request(&["https://cdn.example/a.mp3"]).validate(),
            Err(ValidationError::TooFewInputs { got: 1, .. })
        ));
    }

    #[test]
    fn accepts_two_well_formed_urls() {
        let req = request(&["https://cdn.example/a.mp3", "http://cdn.example/b.mp3"]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_url_with_index() {
        let req = request(&["https://cdn.example/a.mp3", "not a url"]);
        assert!(matches!(
            req.validate(),
            Err(ValidationError::InvalidUrl { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let req = request(&["ftp://cdn.example/a.mp3", "https://cdn.example/b.mp3"]);
        assert!(matches!(
            req.validate(),
            Err(ValidationError::UnsupportedScheme { index: 0, .. })
        ));
    }

    #[test]
    fn try_new_assigns_unique_ids() {
        let req = request(&["https://cdn.example/a.mp3", "https://cdn.example/b.mp3"]);
        let a = Job::try_new(req.clone()).unwrap();
        let b = Job::try_new(req).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn payload_round_trips_the_request() {
        let req = request(&["https://cdn.example/a.mp3", "https://cdn.example/b.mp3"]);
        let job = Job::try_new(req).unwrap();
        let payload = job.payload();
        assert_eq!(payload["audio_urls"][0], "https://cdn.example/a.mp3");
        assert_eq!(payload["audio_urls"][1], "https://cdn.example/b.mp3");
    }
}
