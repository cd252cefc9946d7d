//! Submission of a finished workout to the workout API.
//!
//! [`SubmissionTransport`] is the seam the engine talks to;
//! [`HttpSubmissionTransport`] implements it with [`reqwest`] against
//! `POST {api_url}/api/workouts`.

use std::time::Duration;

use async_trait::async_trait;
use liftlog_core::command::{
    CreateWorkoutCommand, CreateWorkoutResponse, ErrorResponse, ValidationErrorResponse,
};

/// Path of the workout creation endpoint, relative to the API base URL.
pub const WORKOUTS_PATH: &str = "/api/workouts";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server rejected the workout with field-level violations.
    #[error("Workout rejected with {} validation error(s)", violation_count(.0))]
    Validation(ValidationErrorResponse),

    /// The HTTP request itself failed (network, DNS, TLS, timeout, body).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Any other non-2xx status.
    #[error("Workout API error ({status}): {message}")]
    Api { status: u16, message: String },
}

fn violation_count(response: &ValidationErrorResponse) -> usize {
    response.details.len()
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    async fn create_workout(
        &self,
        command: &CreateWorkoutCommand,
    ) -> Result<CreateWorkoutResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// HTTP client for the workout API.
pub struct HttpSubmissionTransport {
    client: reqwest::Client,
    api_url: String,
}

impl HttpSubmissionTransport {
    /// * `api_url` - Base URL, e.g. `http://localhost:4321`.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Reuse an existing [`reqwest::Client`], e.g. one carrying session cookies.
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{WORKOUTS_PATH}", self.api_url)
    }
}

#[async_trait]
impl SubmissionTransport for HttpSubmissionTransport {
    async fn create_workout(
        &self,
        command: &CreateWorkoutCommand,
    ) -> Result<CreateWorkoutResponse, TransportError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(command)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<CreateWorkoutResponse>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status.as_u16(), &body))
    }
}

/// Turn a non-2xx status and body into a [`TransportError`].
///
/// A `400` with a well-formed validation body becomes
/// [`TransportError::Validation`]; anything else is reported as
/// [`TransportError::Api`] with the server's message when one is present.
pub fn classify_failure(status: u16, body: &str) -> TransportError {
    if status == 400 {
        if let Ok(validation) = serde_json::from_str::<ValidationErrorResponse>(body) {
            return TransportError::Validation(validation);
        }
    }

    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                "empty response body".to_string()
            } else {
                body.chars().take(200).collect()
            }
        });

    TransportError::Api { status, message }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
