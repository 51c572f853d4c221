//! Ingestion source selection.
//!
//! Exactly one of file upload, meeting link or live recording may be active
//! at a time. An invalid selection leaves no source active and records a
//! short-lived `last_error` for display; it never reaches the processing
//! session.

mod file;

use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::backend::{ProcessingBackend, RecordingMode};
use crate::error::{WizardError, WizardResult};
use crate::validation::ValidationRules;

pub use file::FileMetadata;

#[derive(Debug, Clone, PartialEq)]
pub enum ActiveSource {
    None,
    File(FileMetadata),
    MeetingLink {
        url: String,
        /// Must be chosen before the link can be processed.
        mode: Option<RecordingMode>,
    },
    LiveRecording,
}

impl ActiveSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            ActiveSource::None => SourceKind::None,
            ActiveSource::File(_) => SourceKind::File,
            ActiveSource::MeetingLink { .. } => SourceKind::MeetingLink,
            ActiveSource::LiveRecording => SourceKind::LiveRecording,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    None,
    File,
    MeetingLink,
    LiveRecording,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::File => "file_upload",
            Self::MeetingLink => "zoom_meeting",
            Self::LiveRecording => "live_recording",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Completed,
}

impl RecordingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone)]
struct TransientError {
    message: String,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct IngestionSourceSelector {
    rules: ValidationRules,
    error_window: Duration,
    active: ActiveSource,
    recording: RecordingState,
    last_error: Option<TransientError>,
}

impl IngestionSourceSelector {
    pub fn new(rules: ValidationRules, error_window: Duration) -> Self {
        Self {
            rules,
            error_window,
            active: ActiveSource::None,
            recording: RecordingState::Idle,
            last_error: None,
        }
    }

    pub fn active(&self) -> &ActiveSource {
        &self.active
    }

    pub fn kind(&self) -> SourceKind {
        self.active.kind()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recording
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    pub(crate) fn active_file_mut(&mut self) -> Option<&mut FileMetadata> {
        match &mut self.active {
            ActiveSource::File(file) => Some(file),
            _ => None,
        }
    }

    /// The last rejection message, until its display window lapses.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error
            .as_ref()
            .filter(|err| Instant::now() < err.expires_at)
            .map(|err| err.message.as_str())
    }

    /// Whether the active source has everything needed to start processing.
    pub fn is_ready(&self) -> bool {
        match &self.active {
            ActiveSource::None => false,
            ActiveSource::File(_) => true,
            ActiveSource::MeetingLink { mode, .. } => mode.is_some(),
            ActiveSource::LiveRecording => self.recording == RecordingState::Completed,
        }
    }

    pub fn select_file(&mut self, file: FileMetadata) -> WizardResult<()> {
        if let Some(reason) = self
            .rules
            .file_rejection_reason(file.name(), file.size_bytes())
        {
            return Err(self.reject(reason));
        }

        info!("Selected file {} ({} bytes)", file.name(), file.size_bytes());
        self.activate(ActiveSource::File(file));
        Ok(())
    }

    /// Select a meeting link. A changed link has to have its mode chosen again.
    pub fn select_meeting_link(
        &mut self,
        url: &str,
        mode: Option<RecordingMode>,
    ) -> WizardResult<()> {
        if !self.rules.is_acceptable_meeting_link(url) {
            let reason = if url.trim().is_empty() {
                "meeting link is empty".to_string()
            } else {
                format!("'{}' is not a meeting join link", url.trim())
            };
            return Err(self.reject(reason));
        }

        info!("Selected meeting link (mode: {:?})", mode);
        self.activate(ActiveSource::MeetingLink {
            url: url.trim().to_string(),
            mode,
        });
        Ok(())
    }

    pub fn set_recording_mode(&mut self, new_mode: RecordingMode) -> WizardResult<()> {
        match &mut self.active {
            ActiveSource::MeetingLink { mode, .. } => {
                *mode = Some(new_mode);
                Ok(())
            }
            _ => Err(WizardError::NotReady(
                "recording mode applies only to a meeting link".to_string(),
            )),
        }
    }

    /// `Idle -> Recording`, once the backend acknowledges.
    pub async fn start_recording(&mut self, backend: &dyn ProcessingBackend) -> WizardResult<()> {
        if self.recording != RecordingState::Idle {
            return Err(WizardError::NotReady(format!(
                "recording is {}; clear it before starting again",
                self.recording.as_str()
            )));
        }

        if let Err(e) = backend.start_recording().await {
            warn!("Backend refused to start recording: {}", e);
            self.set_error(format!("could not start recording: {e}"));
            return Err(e);
        }

        self.activate(ActiveSource::LiveRecording);
        self.recording = RecordingState::Recording;
        info!("Live recording started");
        Ok(())
    }

    /// `Recording -> Completed`, once the backend acknowledges.
    pub async fn stop_recording(&mut self, backend: &dyn ProcessingBackend) -> WizardResult<()> {
        if self.recording != RecordingState::Recording {
            return Err(WizardError::NotReady(format!(
                "no recording in progress (state: {})",
                self.recording.as_str()
            )));
        }

        if let Err(e) = backend.stop_recording().await {
            warn!("Backend refused to stop recording: {}", e);
            self.set_error(format!("could not stop recording: {e}"));
            return Err(e);
        }

        self.recording = RecordingState::Completed;
        info!("Live recording stopped");
        Ok(())
    }

    pub fn clear(&mut self) {
        self.active = ActiveSource::None;
        self.recording = RecordingState::Idle;
        self.last_error = None;
    }

    fn activate(&mut self, source: ActiveSource) {
        if source.kind() != SourceKind::LiveRecording {
            self.recording = RecordingState::Idle;
        }
        self.active = source;
        self.last_error = None;
    }

    fn reject(&mut self, reason: String) -> WizardError {
        self.active = ActiveSource::None;
        self.recording = RecordingState::Idle;
        self.set_error(reason.clone());
        WizardError::Validation(reason)
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.last_error = Some(TransientError {
            message,
            expires_at: Instant::now() + self.error_window,
        });
    }
}
