//! Session and backend error types.
//!
//! `BackendError` lives here rather than in `examkit-backends` so the
//! session engine can classify delegate failures without string matching.

use thiserror::Error;

use crate::session::SessionPhase;

/// Errors surfaced by an [`ExamSession`](crate::session::ExamSession).
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The exam document could not be fetched; no session exists.
    #[error("failed to load exam '{test_id}': {message}")]
    Load { test_id: String, message: String },

    /// The grading delegate failed. The answers are intact and can be resubmitted.
    #[error("submission failed: {0}")]
    Submission(String),

    #[error("answer index {index} out of range (0..{len})")]
    AnswerIndexOutOfRange { index: usize, len: usize },

    #[error("writing task index {index} out of range (0..{len})")]
    WritingIndexOutOfRange { index: usize, len: usize },

    #[error("step index {index} out of range (0..{len})")]
    StepIndexOutOfRange { index: usize, len: usize },

    /// Answers were snapshotted for submission and no longer accept writes.
    #[error("answers are frozen while the session is {0}")]
    AnswersFrozen(SessionPhase),

    #[error("cannot {action} while the session is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: SessionPhase,
    },
}

impl SessionError {
    /// Returns `true` if retrying the same operation can succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Submission(_))
    }
}

/// Errors that can occur when talking to a content or grading backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No exam with the given test id exists.
    #[error("exam not found: {0}")]
    ExamNotFound(String),

    /// No submission with the given id exists.
    #[error("submission not found: {0}")]
    SubmissionNotFound(String),

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The backend cannot perform this operation.
    #[error("unsupported by {backend}: {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },
}

impl BackendError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            BackendError::ExamNotFound(_)
                | BackendError::SubmissionNotFound(_)
                | BackendError::AuthenticationFailed(_)
                | BackendError::Unsupported { .. }
        )
    }
}
