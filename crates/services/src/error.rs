//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{QuestionId, RollError, SubmissionSummaryError};
use storage::repository::StorageError;

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error(transparent)]
    InvalidRoll(#[from] RollError),
    #[error("roll number is not on the exam roster")]
    NotOnRoster,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the session engine.
///
/// Expiry and placeholder rejections are *not* errors; they surface as
/// `SelectOutcome` variants so the caller can show a notice instead of
/// failing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("question {0} is not in the bank")]
    UnknownQuestion(QuestionId),
    #[error("session already submitted")]
    Submitted,
    #[error(transparent)]
    Summary(#[from] SubmissionSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
