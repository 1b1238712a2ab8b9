//! Backend error mapping.
//!
//! [`BackendError`] itself lives in `examkit-core`; this module maps
//! transport failures and HTTP statuses onto it.

use reqwest::StatusCode;
use serde::Deserialize;

pub use examkit_core::error::BackendError;

/// Classify a transport-level failure.
pub(crate) fn from_transport(err: reqwest::Error, timeout_secs: u64) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(timeout_secs)
    } else {
        BackendError::NetworkError(err.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// Map a non-success status and its body onto a [`BackendError`].
///
/// `not_found` builds the error for a 404, since only the caller knows
/// which resource was missing.
pub(crate) fn from_status(
    status: StatusCode,
    body: String,
    not_found: impl FnOnce() -> BackendError,
) -> BackendError {
    match status {
        StatusCode::NOT_FOUND => not_found(),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::AuthenticationFailed(body),
        _ => {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            BackendError::ApiError {
                status: status.as_u16(),
                message,
            }
        }
    }
}
