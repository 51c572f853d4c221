//! Session state and the shared handle observers read it through.

use std::sync::Arc;
use tokio::sync::watch;

use crate::backend::TranscriptMetadata;
use crate::error::WizardError;
use crate::poller::PollLimit;

/// Lifecycle of the backend job behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Submitting,
    Processing,
    Completed,
    Cancelled,
    Failed(String),
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }

    /// A job is on its way and `start()` must not submit another.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Submitting | Self::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub job_state: JobState,
    pub job_id: Option<String>,
    pub file_id: Option<String>,
    pub result_text: String,
    pub metadata: Option<TranscriptMetadata>,
    pub poll_attempts: u32,
    pub poll_limit: PollLimit,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub last_error: Option<WizardError>,
    /// Bumped whenever the running job is invalidated; stale writers compare against it.
    pub(crate) epoch: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            job_state: JobState::Idle,
            job_id: None,
            file_id: None,
            result_text: String::new(),
            metadata: None,
            poll_attempts: 0,
            poll_limit: PollLimit::Bounded(0),
            progress: None,
            message: None,
            last_error: None,
            epoch: 0,
        }
    }
}

impl SessionState {
    pub fn is_completed(&self) -> bool {
        self.job_state == JobState::Completed
    }
}

/// Shared handle for reading a session's state from outside its owner.
#[derive(Clone)]
pub struct SessionStatusHandle {
    inner: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStatusHandle {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(tx),
        }
    }
}

impl SessionStatusHandle {
    pub fn get(&self) -> SessionState {
        self.inner.borrow().clone()
    }

    pub fn job_state(&self) -> JobState {
        self.inner.borrow().job_state.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.subscribe()
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.inner.borrow().epoch
    }

    pub(crate) fn modify<F>(&self, f: F)
    where
        F: FnOnce(&mut SessionState),
    {
        self.inner.send_modify(f);
    }

    /// Apply `f` only if no reset or cancel happened since `epoch` was read.
    pub(crate) fn modify_if_current<F>(&self, epoch: u64, f: F) -> bool
    where
        F: FnOnce(&mut SessionState),
    {
        let mut applied = false;
        self.inner.send_modify(|state| {
            if state.epoch == epoch {
                f(state);
                applied = true;
            }
        });
        applied
    }

    /// Drop job-specific data and return to `Idle`, invalidating any running job.
    pub(crate) fn reset(&self) {
        self.inner.send_modify(|state| {
            let epoch = state.epoch + 1;
            let poll_limit = state.poll_limit;
            *state = SessionState {
                epoch,
                poll_limit,
                ..SessionState::default()
            };
        });
    }

    pub(crate) fn fail(&self, epoch: u64, error: &WizardError) -> bool {
        self.modify_if_current(epoch, |state| {
            state.job_state = JobState::Failed(error.to_string());
            state.last_error = Some(error.clone());
        })
    }
}
