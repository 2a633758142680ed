//! Wire types for the HTTP API.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Error;

/// Inline mode: the pipeline finished and the artifact is live.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub job_id: Uuid,
    pub status: &'static str,
    pub output_url: String,
}

/// Deferred mode: the runner took the job.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub job_id: Uuid,
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Fixed client-facing text for downstream failures. Tool diagnostics,
/// filesystem paths and transport details stay in the server logs.
const OPAQUE_FAILURE: &str = "audio concatenation failed; see server logs for details";

/// Map a pipeline/dispatch error to its HTTP shape.
///
/// Validation text is safe to echo (it describes the caller's own
/// request); everything else is collapsed to an opaque 500.
pub fn error_response(err: &Error) -> (StatusCode, Json<ErrorBody>) {
    match err {
        Error::Validation(v) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: v.to_string(),
            }),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: OPAQUE_FAILURE.to_string(),
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MergeError, ValidationError};

    #[test]
    fn validation_errors_are_400_and_verbatim() {
        let err = Error::Validation(ValidationError::TooFewInputs { min: 2, got: 1 });
        let (status, Json(body)) = error_response(&err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("at least 2"));
    }

    #[test]
    fn downstream_errors_are_opaque_500s() {
        let err = Error::Merge(MergeError::Failed {
            code: 1,
            diagnostics: "/tmp/job-x/input-7.mp3: Invalid data found".to_string(),
        });
        let (status, Json(body)) = error_response(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.contains("Invalid data"), "no tool diagnostics");
        assert!(!body.error.contains("/tmp"), "no filesystem paths");
    }
}
