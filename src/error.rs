//! Error taxonomy for the ingestion and processing pipeline.
//!
//! Validation problems are recovered locally by the source selector and never
//! reach a session. Everything else ends in a `Failed` or `Cancelled` session
//! and is surfaced to the user through a notification.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    /// Bad file or meeting link.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Backend rejected or was unreachable while a job was being started.
    #[error("submission failed: {0}")]
    Submission(String),

    #[error("processing timed out after {attempts} status checks")]
    PollingTimeout { attempts: u32 },

    /// A status or result fetch failed in transit.
    #[error("status check failed: {0}")]
    PollingTransport(String),

    /// Backend answered but reported `success: false`.
    #[error("backend error: {0}")]
    Backend(String),

    #[error("processing cancelled")]
    Cancelled,

    /// Operation issued while the session or selector is in the wrong state.
    #[error("not ready: {0}")]
    NotReady(String),
}

impl WizardError {
    /// Whether the error should be shown to the user as a notification.
    pub fn surfaces_to_user(&self) -> bool {
        !matches!(self, WizardError::Validation(_))
    }

    /// Short machine-readable tag used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            WizardError::Validation(_) => "validation",
            WizardError::Submission(_) => "submission",
            WizardError::PollingTimeout { .. } => "polling_timeout",
            WizardError::PollingTransport(_) => "polling_transport",
            WizardError::Backend(_) => "backend",
            WizardError::Cancelled => "cancelled",
            WizardError::NotReady(_) => "not_ready",
        }
    }

    /// Re-tag a transport or backend failure that happened during submission.
    pub(crate) fn into_submission(self) -> Self {
        match self {
            WizardError::PollingTransport(msg) | WizardError::Backend(msg) => {
                WizardError::Submission(msg)
            }
            other => other,
        }
    }
}

pub type WizardResult<T> = Result<T, WizardError>;
