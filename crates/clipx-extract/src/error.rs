//! Extraction error types.

use thiserror::Error;

use clipx_models::PostUrlError;

/// Result type for pipeline-level operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type used inside a single strategy before it is folded into an outcome.
pub type StrategyResult<T> = Result<T, StrategyError>;

/// Terminal outcomes of an extraction that reach the caller.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    InvalidInput(#[from] PostUrlError),

    #[error("Rate limited, retry after {retry_after_minutes} minutes")]
    RateLimited { retry_after_minutes: u64 },

    #[error("No video found (rate limited: {rate_limited})")]
    NoVideoFound { rate_limited: bool },
}

/// Failures inside a single strategy. Never leaves the strategy.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Upstream unavailable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status}")]
    Http { status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
}

impl StrategyError {
    pub fn http(status: reqwest::StatusCode) -> Self {
        Self::Http {
            status: status.as_u16(),
        }
    }
}

/// Credential exchange failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Client credentials are not configured")]
    MissingCredentials,

    #[error("Credential exchange rejected with HTTP {status}")]
    Rejected { status: u16 },

    #[error("Credential exchange failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("At least one strategy must be configured")]
    NoStrategies,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message_passes_through() {
        let err: ExtractError = PostUrlError::InvalidUrl.into();
        assert_eq!(err.to_string(), "Invalid Twitter URL");
    }

    #[test]
    fn test_strategy_error_display() {
        let err = StrategyError::http(reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Upstream returned HTTP 502");

        let err: StrategyError = AuthError::Rejected { status: 403 }.into();
        assert_eq!(
            err.to_string(),
            "Authentication failed: Credential exchange rejected with HTTP 403"
        );
    }
}
