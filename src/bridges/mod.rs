//! HTTP clients for the external collaborators: the bot platform and the
//! payment processor. Constructed once at startup and shared via `AppState`.
//! Timeouts and retries are left to reqwest defaults.

use reqwest::StatusCode;
use thiserror::Error;
use tracing::error;

use crate::web::error::AppError;

pub mod bot_platform;
pub mod payments;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{service} returned status {status}")]
    RemoteStatus {
        service: &'static str,
        status: StatusCode,
    },
    #[error("unexpected response from {service}: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl From<BridgeError> for AppError {
    fn from(err: BridgeError) -> Self {
        // Detail goes to the log; callers get a generic message.
        error!(error = %err, "upstream bridge call failed");
        let service = match &err {
            BridgeError::RemoteStatus { service, .. } | BridgeError::Decode { service, .. } => {
                service
            }
            BridgeError::Request(_) => &"upstream service",
        };
        AppError::UpstreamError(format!("{service} is currently unavailable"))
    }
}

/// Converts a non-success response into `RemoteStatus`, logging the body.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, BridgeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    error!(service, %status, body, "non-success response from upstream");
    Err(BridgeError::RemoteStatus { service, status })
}
