//! API handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::{Error, ValidationError};
use crate::execution::ExecutionOutcome;
use crate::job::{ConcatenateRequest, Job};
use crate::server::AppState;
use crate::server::types::{AcceptedResponse, ErrorBody, SuccessResponse, error_response};

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /v1/audio/concatenate`
///
/// 200 with the final URL (inline mode), 202 with an acknowledgment
/// (deferred mode), 400 on request-shape problems, opaque 500 on
/// anything downstream.
pub async fn concatenate_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ConcatenateRequest>, JsonRejection>,
) -> Result<Response, (StatusCode, Json<ErrorBody>)> {
    let Json(request) = body.map_err(|rejection| {
        error_response(&Error::Validation(ValidationError::MalformedBody(
            rejection.body_text(),
        )))
    })?;

    let job = Job::try_new(request).map_err(|e| error_response(&Error::Validation(e)))?;
    let job_id = job.id;
    tracing::info!(%job_id, inputs = job.audio_urls.len(), "received concatenation request");

    match state.strategy.execute(job).await {
        Ok(ExecutionOutcome::Completed { output_url }) => Ok((
            StatusCode::OK,
            Json(SuccessResponse {
                job_id,
                status: "success",
                output_url,
            }),
        )
            .into_response()),
        Ok(ExecutionOutcome::Dispatched { reference }) => Ok((
            StatusCode::ACCEPTED,
            Json(AcceptedResponse {
                job_id,
                status: "processing_started",
                message: format!("job execution '{reference}' started"),
            }),
        )
            .into_response()),
        Err(err) => {
            // Full detail server-side only; the response stays opaque.
            tracing::error!(%job_id, error = %err, "concatenation job failed");
            Err(error_response(&err))
        }
    }
}
