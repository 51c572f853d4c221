//! Processing session state machine.
//!
//! `Idle -> Submitting -> Processing -> {Completed | Failed | Cancelled}`.
//! Terminal states hold until `reset()` or a new source selection. One
//! parameterized session serves every asynchronous wizard page; the page is
//! picked through [`Stage`].

mod stage;
pub mod status;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::{FileStatusRequest, ProcessingBackend, RecordingMode, TranscriptMetadata};
use crate::config::{Config, PollingConfig};
use crate::error::{WizardError, WizardResult};
use crate::poller::{JobStatusPoller, PollHandle, PollLimit, PollOutcome, PollerConfig};
use crate::source::{
    ActiveSource, FileMetadata, IngestionSourceSelector, RecordingState, SourceKind,
};
use crate::validation::ValidationRules;

use stage::{fetch_result, StageResult, StageStatusCheck};

pub use stage::Stage;
pub use status::{JobState, SessionState, SessionStatusHandle};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub polling: PollingConfig,
    pub rules: ValidationRules,
    pub error_window: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            polling: config.polling.clone(),
            rules: ValidationRules::from_config(&config.validation),
            error_window: Duration::from_secs(config.ui.error_display_seconds),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedResult {
    text: String,
    metadata: Option<TranscriptMetadata>,
}

/// What `start()` is about to submit, captured before any network call.
enum JobPlan {
    File {
        path: PathBuf,
        name: String,
        size_bytes: u64,
        hash: Option<String>,
    },
    MeetingLink {
        url: String,
        mode: RecordingMode,
    },
    Recording,
    Transcription,
    Summary {
        transcript: Option<String>,
    },
}

enum Submission {
    Accepted { file_id: Option<String> },
    /// The backend already holds a result for this file.
    AlreadyProcessed(StageResult),
}

pub struct ProcessingSession {
    id: Uuid,
    stage: Stage,
    backend: Arc<dyn ProcessingBackend>,
    selector: IngestionSourceSelector,
    polling: PollingConfig,
    live_source: bool,
    input_text: Option<String>,
    status: SessionStatusHandle,
    job: Option<PollHandle<()>>,
    completed_files: Arc<Mutex<HashMap<String, CachedResult>>>,
}

impl ProcessingSession {
    pub fn new(stage: Stage, backend: Arc<dyn ProcessingBackend>, options: SessionOptions) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            stage,
            backend,
            selector: IngestionSourceSelector::new(options.rules, options.error_window),
            polling: options.polling,
            live_source: false,
            input_text: None,
            status: SessionStatusHandle::default(),
            job: None,
            completed_files: Arc::new(Mutex::new(HashMap::new())),
        };
        let limit = session.poll_limit();
        session.status.modify(|state| state.poll_limit = limit);
        debug!("Session {} created for {}", session.id, stage.as_str());
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn selector(&self) -> &IngestionSourceSelector {
        &self.selector
    }

    pub fn status(&self) -> SessionStatusHandle {
        self.status.clone()
    }

    pub fn state(&self) -> SessionState {
        self.status.get()
    }

    pub fn job_state(&self) -> JobState {
        self.status.job_state()
    }

    pub fn is_completed(&self) -> bool {
        self.job_state() == JobState::Completed
    }

    pub fn result_text(&self) -> String {
        self.status.get().result_text
    }

    /// Live sources poll without a limit.
    pub fn is_live_source(&self) -> bool {
        match self.stage {
            Stage::Ingestion => self.selector.kind() == SourceKind::LiveRecording,
            Stage::Transcription | Stage::Summary => self.live_source,
        }
    }

    pub fn poll_limit(&self) -> PollLimit {
        if self.is_live_source() {
            PollLimit::Unbounded
        } else {
            PollLimit::Bounded(self.polling.poll_limit)
        }
    }

    /// Carry the live-recording flag over from the ingestion page.
    pub fn set_live_source(&mut self, live: bool) {
        self.live_source = live;
        let limit = self.poll_limit();
        self.status.modify(|state| state.poll_limit = limit);
    }

    /// Text handed to the summary stage.
    pub fn set_input_text(&mut self, text: Option<String>) {
        self.input_text = text;
    }

    // ------------------------------------------------------------------
    // Source selection
    // ------------------------------------------------------------------

    /// Select a file from disk. Re-selecting the same content keeps the session as is.
    pub async fn select_file(&mut self, path: &Path) -> WizardResult<()> {
        let mut file = match FileMetadata::from_path(path).await {
            Ok(file) => file,
            Err(e) => {
                self.discard_source().await;
                self.selector.set_error(e.to_string());
                return Err(e);
            }
        };

        if !self
            .selector
            .rules()
            .is_acceptable_file(file.name(), file.size_bytes())
        {
            self.discard_source().await;
            return self.selector.select_file(file);
        }

        if self.is_same_file(&mut file).await {
            info!(
                "Session {}: same file selected again, keeping current state",
                self.id
            );
            return Ok(());
        }

        self.prepare_switch().await;
        self.selector.select_file(file)
    }

    pub async fn select_meeting_link(
        &mut self,
        url: &str,
        mode: Option<RecordingMode>,
    ) -> WizardResult<()> {
        if !self.selector.rules().is_acceptable_meeting_link(url) {
            self.discard_source().await;
            return self.selector.select_meeting_link(url, mode);
        }

        let same_link = matches!(
            self.selector.active(),
            ActiveSource::MeetingLink { url: current, .. } if current == url.trim()
        );
        if same_link {
            if let Some(mode) = mode {
                self.set_recording_mode(mode)?;
            }
            return Ok(());
        }

        self.prepare_switch().await;
        self.selector.select_meeting_link(url, mode)
    }

    pub fn set_recording_mode(&mut self, mode: RecordingMode) -> WizardResult<()> {
        if self.job_state().is_busy() {
            return Err(WizardError::NotReady(
                "cannot change recording mode while processing".to_string(),
            ));
        }
        self.selector.set_recording_mode(mode)
    }

    /// Start a live recording. Only allowed from an idle recorder; anything
    /// else is refused before the current source or job is touched.
    pub async fn start_recording(&mut self) -> WizardResult<()> {
        let recording = self.selector.recording_state();
        if recording != RecordingState::Idle {
            return Err(WizardError::NotReady(format!(
                "recording is {}; clear it before starting again",
                recording.as_str()
            )));
        }

        self.prepare_switch().await;
        self.selector.start_recording(self.backend.as_ref()).await
    }

    pub async fn stop_recording(&mut self) -> WizardResult<()> {
        self.selector.stop_recording(self.backend.as_ref()).await
    }

    pub async fn clear_source(&mut self) {
        self.prepare_switch().await;
        self.selector.clear();
    }

    async fn is_same_file(&mut self, file: &mut FileMetadata) -> bool {
        let Some(current) = self.selector.active_file_mut() else {
            return false;
        };
        if current.size_bytes() != file.size_bytes() {
            return false;
        }

        let current_hash = match current.content_hash().await {
            Ok(hash) => hash.to_string(),
            Err(_) => return false,
        };
        match file.content_hash().await {
            Ok(hash) => hash == current_hash,
            Err(_) => false,
        }
    }

    /// An invalid selection drops whatever was selected before it.
    async fn discard_source(&mut self) {
        if self.selector.kind() != SourceKind::None {
            self.prepare_switch().await;
            self.selector.clear();
        }
    }

    /// Identifies the result currently held. Changes whenever the job is
    /// reset, cancelled or restarted, so derived pages can tell when they are stale.
    pub(crate) fn generation(&self) -> u64 {
        self.status.epoch()
    }

    /// Cancel any in-flight job, stop a running live recording and return to `Idle`.
    async fn prepare_switch(&mut self) {
        if self.job_state().is_busy() {
            info!(
                "Session {}: cancelling in-flight job before switching source",
                self.id
            );
            if let Err(e) = self.cancel().await {
                warn!("Session {}: cancel before switch failed: {}", self.id, e);
            }
        }

        if self.selector.recording_state() == RecordingState::Recording {
            if let Err(e) = self.backend.stop_recording().await {
                warn!("Session {}: failed to stop live recording: {}", self.id, e);
            }
        }

        self.stop_job().await;
        self.status.reset();
    }

    // ------------------------------------------------------------------
    // Job lifecycle
    // ------------------------------------------------------------------

    /// Submit the job and begin polling.
    ///
    /// Returns the state reached. Calling it while a job is already on its
    /// way, or after completion, changes nothing.
    pub async fn start(&mut self) -> WizardResult<JobState> {
        let current = self.job_state();
        if current.is_busy() {
            debug!(
                "Session {}: start ignored, job already {}",
                self.id,
                current.as_str()
            );
            return Ok(current);
        }
        if current == JobState::Completed {
            return Ok(current);
        }
        if current.is_terminal() {
            info!("Session {}: retrying after {}", self.id, current.as_str());
            self.stop_job().await;
            self.status.reset();
        }

        let plan = self.plan().await?;

        if let JobPlan::File {
            hash: Some(hash), ..
        } = &plan
        {
            let cached = self.completed_files.lock().await.get(hash).cloned();
            if let Some(cached) = cached {
                info!(
                    "Session {}: file already processed in this session, reusing result",
                    self.id
                );
                self.status.modify(|state| {
                    state.job_state = JobState::Completed;
                    state.result_text = cached.text;
                    state.metadata = cached.metadata;
                    state.progress = Some(100);
                });
                return Ok(JobState::Completed);
            }
        }

        let file_hash = match &plan {
            JobPlan::File { hash, .. } => hash.clone(),
            _ => None,
        };

        let epoch = self.status.epoch();
        let poll_limit = self.poll_limit();
        self.status.modify(|state| {
            state.job_state = JobState::Submitting;
            state.poll_limit = poll_limit;
            state.poll_attempts = 0;
            state.last_error = None;
        });
        info!(
            "Session {}: submitting {} job (poll limit {})",
            self.id,
            self.stage.as_str(),
            poll_limit
        );

        match self.submit(plan).await {
            Err(e) => {
                let e = e.into_submission();
                error!("Session {}: submission failed: {}", self.id, e);
                self.status.fail(epoch, &e);
                Err(e)
            }
            Ok(Submission::AlreadyProcessed(result)) => {
                info!(
                    "Session {}: backend already holds a transcript for this file",
                    self.id
                );
                self.complete(epoch, result, file_hash).await;
                Ok(self.job_state())
            }
            Ok(Submission::Accepted { file_id }) => {
                let job_id = Uuid::new_v4().to_string();
                info!("Session {}: job {} accepted, polling", self.id, job_id);
                self.status.modify_if_current(epoch, |state| {
                    state.job_state = JobState::Processing;
                    state.job_id = Some(job_id);
                    state.file_id = file_id;
                });
                self.spawn_job(epoch, file_hash);
                Ok(JobState::Processing)
            }
        }
    }

    /// Stop polling, ask the backend to cancel, and move to `Cancelled`.
    ///
    /// Does nothing unless a job is processing. The session is `Cancelled`
    /// even if the backend call fails; that failure is returned.
    pub async fn cancel(&mut self) -> WizardResult<()> {
        let mut cancelled = false;
        self.status.modify(|state| {
            if state.job_state.is_busy() {
                state.job_state = JobState::Cancelled;
                state.last_error = Some(WizardError::Cancelled);
                state.epoch += 1;
                cancelled = true;
            }
        });

        self.stop_job().await;

        if !cancelled {
            return Ok(());
        }

        info!("Session {}: processing cancelled", self.id);
        if let Err(e) = self.backend.cancel_processing().await {
            warn!("Session {}: backend cancel failed: {}", self.id, e);
            return Err(e);
        }
        Ok(())
    }

    /// Return the job to `Idle`. The selected source and cached results stay.
    pub async fn reset(&mut self) {
        self.stop_job().await;
        self.status.reset();
        debug!("Session {}: reset", self.id);
    }

    /// Cancel whatever is running and forget everything, including the source.
    pub async fn reset_all(&mut self) {
        if self.job_state().is_busy() {
            if let Err(e) = self.cancel().await {
                warn!("Session {}: cancel during reset failed: {}", self.id, e);
            }
        }
        self.reset().await;
        self.selector.clear();
        self.completed_files.lock().await.clear();
        self.input_text = None;
        self.live_source = false;
        let limit = self.poll_limit();
        self.status.modify(|state| state.poll_limit = limit);
    }

    /// Wait until no job is submitting or processing, then return the state.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.status.subscribe();
        let settled = rx
            .wait_for(|state| !state.job_state.is_busy())
            .await
            .map(|state| (*state).clone());
        match settled {
            Ok(state) => state,
            Err(_) => self.status.get(),
        }
    }

    async fn stop_job(&mut self) {
        if let Some(job) = self.job.take() {
            job.shutdown().await;
        }
    }

    async fn plan(&mut self) -> WizardResult<JobPlan> {
        match self.stage {
            Stage::Ingestion => self.plan_ingestion().await,
            Stage::Transcription => Ok(JobPlan::Transcription),
            Stage::Summary => Ok(JobPlan::Summary {
                transcript: self.input_text.clone(),
            }),
        }
    }

    async fn plan_ingestion(&mut self) -> WizardResult<JobPlan> {
        if !self.selector.is_ready() {
            let reason = match self.selector.active() {
                ActiveSource::None => "no input source selected".to_string(),
                ActiveSource::MeetingLink { .. } => "choose a recording mode first".to_string(),
                ActiveSource::LiveRecording => "stop the recording first".to_string(),
                ActiveSource::File(_) => "file is not ready".to_string(),
            };
            return Err(WizardError::NotReady(reason));
        }

        let id = self.id;
        match self.selector.active().clone() {
            ActiveSource::File(_) => {
                let Some(file) = self.selector.active_file_mut() else {
                    return Err(WizardError::NotReady("file is not ready".to_string()));
                };
                let hash = match file.content_hash().await {
                    Ok(hash) => Some(hash.to_string()),
                    Err(e) => {
                        warn!("Session {}: hashing failed, uploading anyway: {}", id, e);
                        None
                    }
                };
                Ok(JobPlan::File {
                    path: file.path().to_path_buf(),
                    name: file.name().to_string(),
                    size_bytes: file.size_bytes(),
                    hash,
                })
            }
            ActiveSource::MeetingLink {
                url,
                mode: Some(mode),
            } => Ok(JobPlan::MeetingLink { url, mode }),
            ActiveSource::LiveRecording => Ok(JobPlan::Recording),
            ActiveSource::MeetingLink { mode: None, .. } | ActiveSource::None => Err(
                WizardError::NotReady("no input source selected".to_string()),
            ),
        }
    }

    async fn submit(&self, plan: JobPlan) -> WizardResult<Submission> {
        let backend = self.backend.as_ref();
        match plan {
            JobPlan::File {
                path,
                name,
                size_bytes,
                hash,
            } => {
                if let Some(hash) = hash {
                    let request = FileStatusRequest {
                        file_hash: hash,
                        file_name: name.clone(),
                        file_size: size_bytes,
                    };
                    match backend.check_file_status(&request).await {
                        Ok(status) if !status.needs_reprocess => {
                            match fetch_result(Stage::Ingestion, backend).await {
                                Ok(result) => return Ok(Submission::AlreadyProcessed(result)),
                                Err(e) => warn!(
                                    "Session {}: stored transcript unavailable, reprocessing: {}",
                                    self.id, e
                                ),
                            }
                        }
                        Ok(_) => {}
                        Err(e) => warn!(
                            "Session {}: file status check failed, reprocessing: {}",
                            self.id, e
                        ),
                    }
                }

                let file_id = backend.upload_file(&path, &name).await?;
                info!("Session {}: uploaded {} as {}", self.id, name, file_id);
                backend.process_file(&file_id).await?;
                Ok(Submission::Accepted {
                    file_id: Some(file_id),
                })
            }
            JobPlan::MeetingLink { url, mode } => {
                backend.prepare_zoom(&url, mode).await?;
                backend.join_meeting().await?;
                Ok(Submission::Accepted { file_id: None })
            }
            JobPlan::Recording => {
                backend.process_recording().await?;
                Ok(Submission::Accepted { file_id: None })
            }
            JobPlan::Transcription => Ok(Submission::Accepted { file_id: None }),
            JobPlan::Summary { transcript } => {
                backend.generate_summary(transcript.as_deref()).await?;
                Ok(Submission::Accepted { file_id: None })
            }
        }
    }

    async fn complete(&self, epoch: u64, result: StageResult, file_hash: Option<String>) {
        record_completion(
            &self.status,
            &self.completed_files,
            epoch,
            result,
            file_hash,
        )
        .await;
    }

    fn spawn_job(&mut self, epoch: u64, file_hash: Option<String>) {
        let interval = match self.stage {
            Stage::Summary => self.polling.summary_interval(),
            Stage::Ingestion | Stage::Transcription => self.polling.interval(),
        };
        let poller = JobStatusPoller::new(PollerConfig {
            interval,
            limit: self.poll_limit(),
        });
        let check = StageStatusCheck {
            stage: self.stage,
            backend: Arc::clone(&self.backend),
        };
        let backend = Arc::clone(&self.backend);
        let status = self.status.clone();
        let completed_files = Arc::clone(&self.completed_files);
        let stage = self.stage;
        let session_id = self.id;

        self.job = Some(PollHandle::spawn(move |token| async move {
            let outcome = poller
                .run(&check, &token, |attempt, report| {
                    status.modify_if_current(epoch, |state| {
                        state.poll_attempts = attempt;
                        if report.progress.is_some() {
                            state.progress = report.progress;
                        }
                        state.message = report.message.clone();
                    });
                })
                .await;

            match outcome {
                PollOutcome::Completed(_) => {
                    let fetched = tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            debug!("Session {}: result fetch abandoned", session_id);
                            return;
                        }
                        fetched = fetch_result(stage, backend.as_ref()) => fetched,
                    };
                    match fetched {
                        Ok(result) => {
                            info!(
                                "Session {}: {} completed ({} chars)",
                                session_id,
                                stage.as_str(),
                                result.text.len()
                            );
                            record_completion(&status, &completed_files, epoch, result, file_hash)
                                .await;
                        }
                        Err(e) => {
                            error!("Session {}: fetching result failed: {}", session_id, e);
                            status.fail(epoch, &e);
                        }
                    }
                }
                PollOutcome::Cancelled => {
                    debug!("Session {}: polling stopped", session_id);
                }
                PollOutcome::RemoteCancelled => {
                    warn!("Session {}: backend cancelled the job", session_id);
                    status.modify_if_current(epoch, |state| {
                        state.job_state = JobState::Cancelled;
                        state.last_error = Some(WizardError::Cancelled);
                    });
                }
                PollOutcome::Failed(e) => {
                    error!("Session {}: processing failed: {}", session_id, e);
                    status.fail(epoch, &e);
                }
            }
        }));
    }
}

async fn record_completion(
    status: &SessionStatusHandle,
    completed_files: &Mutex<HashMap<String, CachedResult>>,
    epoch: u64,
    result: StageResult,
    file_hash: Option<String>,
) {
    let cached = CachedResult {
        text: result.text,
        metadata: result.metadata,
    };
    let applied = status.modify_if_current(epoch, |state| {
        state.job_state = JobState::Completed;
        state.result_text = cached.text.clone();
        state.metadata = cached.metadata.clone();
        state.progress = Some(100);
    });

    if applied {
        if let Some(hash) = file_hash {
            completed_files.lock().await.insert(hash, cached);
        }
    }
}
