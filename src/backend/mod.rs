//! Processing backend contract.
//!
//! The backend does the real work (upload storage, recording, transcription,
//! summarization). Sessions only talk to it through [`ProcessingBackend`],
//! chosen at construction time.

mod client;
pub mod types;

use async_trait::async_trait;
use std::path::Path;

use crate::error::WizardResult;

pub use client::HttpBackend;
pub use types::{
    AppStatus, FileStatus, FileStatusRequest, ProcessingState, ProcessingStatus, RecordingMode,
    SummaryText, TranscriptMetadata, TranscriptText, TranscriptionStatus,
};

/// Every call the wizard makes against the backend.
///
/// Transport failures come back as `WizardError::PollingTransport`, envelopes
/// with `success: false` as `WizardError::Backend`.
#[async_trait]
pub trait ProcessingBackend: Send + Sync {
    /// `POST /api/upload-only`, returns the backend file id.
    async fn upload_file(&self, path: &Path, file_name: &str) -> WizardResult<String>;

    /// `POST /api/process-file`
    async fn process_file(&self, file_id: &str) -> WizardResult<()>;

    /// `POST /api/check-file-status`
    async fn check_file_status(&self, request: &FileStatusRequest) -> WizardResult<FileStatus>;

    /// `POST /api/prepare-zoom`
    async fn prepare_zoom(&self, zoom_url: &str, mode: RecordingMode) -> WizardResult<()>;

    /// `POST /api/join-meeting`
    async fn join_meeting(&self) -> WizardResult<()>;

    /// `POST /api/start-recording`
    async fn start_recording(&self) -> WizardResult<()>;

    /// `POST /api/stop-recording`
    async fn stop_recording(&self) -> WizardResult<()>;

    /// `POST /api/process-recording`
    async fn process_recording(&self) -> WizardResult<()>;

    /// `GET /api/processing/status`
    async fn processing_status(&self) -> WizardResult<ProcessingStatus>;

    /// `POST /api/cancel-processing`
    async fn cancel_processing(&self) -> WizardResult<()>;

    /// `POST /api/generate_summary`. `None` lets the backend use its stored transcript.
    async fn generate_summary(&self, transcript: Option<&str>) -> WizardResult<()>;

    /// `GET /api/summary/text`
    async fn summary_text(&self) -> WizardResult<SummaryText>;

    /// `GET /api/transcription/status`
    async fn transcription_status(&self) -> WizardResult<TranscriptionStatus>;

    /// `GET /api/transcription/text`
    async fn transcription_text(&self) -> WizardResult<TranscriptText>;

    /// `GET /api/status`
    async fn app_status(&self) -> WizardResult<AppStatus>;
}
