//! Retry policy for archive transfers and classification of HTTP failures.

use reqwest::StatusCode;

/// Maximum number of attempts for one transfer.
pub const MAX_RETRIES: usize = 3;

/// Delay between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Responses that will not succeed on a second attempt.
#[derive(Debug, thiserror::Error)]
pub enum NonRetryableError {
    #[error("server requires authentication (HTTP {0})")]
    Unauthorized(u16),
    #[error("access forbidden (HTTP 403)")]
    Forbidden,
    #[error("no such file on server (HTTP 404)")]
    NotFound,
    #[error("server is rate limiting requests (HTTP 429); try again later")]
    TooManyRequests,
    #[error("request rejected (HTTP {0})")]
    ClientError(u16),
}

/// Returns `Err` for 4xx responses; server errors and transport failures are
/// worth retrying.
pub fn classify_status(status: StatusCode) -> Result<(), NonRetryableError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::PROXY_AUTHENTICATION_REQUIRED => {
            Err(NonRetryableError::Unauthorized(status.as_u16()))
        }
        StatusCode::FORBIDDEN => Err(NonRetryableError::Forbidden),
        StatusCode::NOT_FOUND => Err(NonRetryableError::NotFound),
        StatusCode::TOO_MANY_REQUESTS => Err(NonRetryableError::TooManyRequests),
        s if s.is_client_error() => Err(NonRetryableError::ClientError(s.as_u16())),
        _ => Ok(()),
    }
}

/// Map an `error_for_status()` failure to an `anyhow::Error`, wrapping
/// client errors as [`NonRetryableError`] so the retry loop stops early.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match error.status().map(classify_status) {
        Some(Err(non_retryable)) => anyhow::Error::from(non_retryable),
        _ => anyhow::Error::from(error),
    }
}

pub fn is_retryable(error: &anyhow::Error) -> bool {
    error.downcast_ref::<NonRetryableError>().is_none()
}
