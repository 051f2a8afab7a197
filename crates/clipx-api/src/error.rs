//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use clipx_extract::ExtractError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Shown for a governor denial.
pub const TOO_MANY_REQUESTS_MESSAGE: &str = "Too many requests. Please try again in a few minutes.";

/// Shown for any unexpected failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Failed to extract video. Please try again later.";

/// Shown when every source came up empty.
pub const NO_VIDEO_MESSAGE: &str = "No video found in this tweet. This could be because:\n\n\
1) The tweet doesn't contain a video\n\
2) The video is from a private account\n\
3) The tweet has been deleted\n\
4) The account is suspended\n\n\
Please check if the tweet actually contains a video.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("No video found (rate limited: {rate_limited})")]
    NoVideoFound { rate_limited: bool, window_minutes: u64 },

    #[error("Rate limited, retry after {retry_after_minutes} minutes")]
    RateLimited { retry_after_minutes: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map a pipeline failure. `window_minutes` feeds the rate-limited 404 message.
    pub fn from_extract(err: ExtractError, window_minutes: u64) -> Self {
        match err {
            ExtractError::InvalidInput(e) => Self::BadRequest(e.to_string()),
            ExtractError::RateLimited { retry_after_minutes } => Self::RateLimited { retry_after_minutes },
            ExtractError::NoVideoFound { rate_limited } => Self::NoVideoFound {
                rate_limited,
                window_minutes,
            },
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoVideoFound { .. } => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Message shown when the authenticated upstream refused us.
pub fn upstream_rate_limited_message(window_minutes: u64) -> String {
    format!(
        "Twitter API rate limit reached. Please try again in {} minutes.\n\n\
         Alternative: Replace \"x.com\" with \"fxtwitter.com\" in your URL and try again.",
        window_minutes
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limited: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_minutes: Option<u64>,
}

impl ErrorResponse {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            rate_limited: None,
            retry_after_minutes: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            ApiError::BadRequest(msg) => ErrorResponse::message(msg),
            ApiError::NoVideoFound {
                rate_limited,
                window_minutes,
            } => ErrorResponse {
                error: if rate_limited {
                    upstream_rate_limited_message(window_minutes)
                } else {
                    NO_VIDEO_MESSAGE.to_string()
                },
                rate_limited: Some(rate_limited),
                retry_after_minutes: None,
            },
            ApiError::RateLimited { retry_after_minutes } => ErrorResponse {
                error: TOO_MANY_REQUESTS_MESSAGE.to_string(),
                rate_limited: Some(true),
                retry_after_minutes: Some(retry_after_minutes),
            },
            // Internal detail stays in the logs
            ApiError::Internal(detail) => {
                error!("Extraction failed: {}", detail);
                ErrorResponse::message(INTERNAL_ERROR_MESSAGE)
            }
        };

        (status, Json(body)).into_response()
    }
}
