//! Interval-based status polling.
//!
//! A poller repeatedly awaits a [`StatusCheck`] until the job reports
//! completion, the attempt budget runs out, or its cancellation token fires.
//! Checks never overlap: each one is awaited before the next interval starts.

use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{WizardError, WizardResult};

/// One answer from a status endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    pub completed: bool,
    /// The backend dropped the job on its own.
    pub cancelled: bool,
    pub message: Option<String>,
    pub progress: Option<u8>,
}

impl StatusReport {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn done() -> Self {
        Self {
            completed: true,
            progress: Some(100),
            ..Self::default()
        }
    }
}

/// Capability for querying a job's status.
#[async_trait]
pub trait StatusCheck: Send + Sync {
    async fn check_status(&self) -> WizardResult<StatusReport>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollLimit {
    Bounded(u32),
    /// Live recordings keep polling until completion or cancellation.
    Unbounded,
}

impl PollLimit {
    pub fn allows(&self, attempts: u32) -> bool {
        match self {
            PollLimit::Bounded(limit) => attempts < *limit,
            PollLimit::Unbounded => true,
        }
    }
}

impl std::fmt::Display for PollLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollLimit::Bounded(limit) => write!(f, "{limit}"),
            PollLimit::Unbounded => write!(f, "unbounded"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    pub limit: PollLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(StatusReport),
    /// The cancellation token fired.
    Cancelled,
    /// The backend reported the job as cancelled.
    RemoteCancelled,
    Failed(WizardError),
}

pub struct JobStatusPoller {
    config: PollerConfig,
    attempts: Arc<AtomicU32>,
}

impl JobStatusPoller {
    pub fn new(config: PollerConfig) -> Self {
        Self {
            config,
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Status checks issued so far by the current run.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Poll until a terminal outcome. `on_report` sees every non-error answer.
    pub async fn run<F>(
        &self,
        check: &dyn StatusCheck,
        cancel: &CancellationToken,
        mut on_report: F,
    ) -> PollOutcome
    where
        F: FnMut(u32, &StatusReport) + Send,
    {
        self.attempts.store(0, Ordering::SeqCst);
        let mut attempts: u32 = 0;

        loop {
            if !self.config.limit.allows(attempts) {
                warn!("Status polling gave up after {} checks", attempts);
                return PollOutcome::Failed(WizardError::PollingTimeout { attempts });
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = sleep(self.config.interval) => {}
            }

            attempts += 1;
            self.attempts.store(attempts, Ordering::SeqCst);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                result = check.check_status() => result,
            };

            match result {
                Ok(report) => {
                    debug!(
                        "Status check {}/{}: completed={} progress={:?}",
                        attempts, self.config.limit, report.completed, report.progress
                    );
                    on_report(attempts, &report);

                    if report.completed {
                        return PollOutcome::Completed(report);
                    }
                    if report.cancelled {
                        return PollOutcome::RemoteCancelled;
                    }
                }
                Err(e) => {
                    warn!("Status check {} failed: {}", attempts, e);
                    let e = match e {
                        WizardError::Backend(msg) => WizardError::PollingTransport(msg),
                        other => other,
                    };
                    return PollOutcome::Failed(e);
                }
            }
        }
    }

    /// Run on a background task and hand back its disposer.
    pub fn spawn(self, check: Arc<dyn StatusCheck>) -> PollHandle<PollOutcome> {
        PollHandle::spawn(move |token| async move {
            self.run(check.as_ref(), &token, |_, _| {}).await
        })
    }
}

/// Disposer for a background polling task.
///
/// Cancelling is idempotent. Dropping the handle cancels the task, so no
/// timer outlives its owner.
pub struct PollHandle<T> {
    token: CancellationToken,
    task: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> PollHandle<T> {
    pub fn spawn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(f(token.clone()));
        Self {
            token,
            task: Some(task),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the task to end. `None` if it panicked or was aborted.
    pub async fn join(mut self) -> Option<T> {
        let task = self.task.take()?;
        task.await.ok()
    }

    /// Cancel, then wait until the task has actually stopped.
    pub async fn shutdown(self) -> Option<T> {
        self.cancel();
        self.join().await
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
