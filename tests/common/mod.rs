//! Scripted in-memory backend shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use meetwise::backend::{
    AppStatus, FileStatus, FileStatusRequest, ProcessingBackend, ProcessingState,
    ProcessingStatus, RecordingMode, SummaryText, TranscriptMetadata, TranscriptText,
    TranscriptionStatus,
};
use meetwise::config::PollingConfig;
use meetwise::error::{WizardError, WizardResult};
use meetwise::session::SessionOptions;
use meetwise::validation::ValidationRules;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TRANSCRIPT: &str = "Alice: let's ship on Friday. Bob: agreed.";
pub const SUMMARY: &str = "The team agreed to ship on Friday.";

/// What the fake answers. Queues are consumed one reply per call.
pub struct Script {
    /// Replies to `processing_status`; `processing_default` once drained.
    pub processing: VecDeque<ProcessingState>,
    pub processing_default: ProcessingState,
    /// Pending replies from `transcription_status` before it reports completion.
    pub transcription_pending: u32,
    /// `summary_text` answers `success: false` this many times first.
    pub summary_pending: u32,
    pub needs_reprocess: bool,
    pub upload_error: Option<WizardError>,
    pub cancel_error: Option<WizardError>,
    pub transcript: String,
    pub summary: String,
    /// How long `transcription_text` takes to answer.
    pub transcript_delay: Duration,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            processing: VecDeque::new(),
            processing_default: ProcessingState::Processing,
            transcription_pending: 0,
            summary_pending: 0,
            needs_reprocess: true,
            upload_error: None,
            cancel_error: None,
            transcript: TRANSCRIPT.to_string(),
            summary: SUMMARY.to_string(),
            transcript_delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
pub struct FakeBackend {
    script: Mutex<Script>,
    calls: Mutex<HashMap<&'static str, u32>>,
    uploads: Mutex<Vec<String>>,
    summary_inputs: Mutex<Vec<Option<String>>>,
    zoom_requests: Mutex<Vec<(String, RecordingMode)>>,
}

impl FakeBackend {
    /// Jobs stay in `processing` forever.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_script(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            ..Self::default()
        })
    }

    /// Reports `processing` `pending` times, then `completed`.
    pub fn completing_after(pending: usize) -> Arc<Self> {
        Self::with_script(Script {
            processing: std::iter::repeat(ProcessingState::Processing)
                .take(pending)
                .collect(),
            processing_default: ProcessingState::Completed,
            ..Script::default()
        })
    }

    pub fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn calls(&self, name: &str) -> u32 {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn summary_inputs(&self) -> Vec<Option<String>> {
        self.summary_inputs.lock().unwrap().clone()
    }

    pub fn zoom_requests(&self) -> Vec<(String, RecordingMode)> {
        self.zoom_requests.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str) {
        *self.calls.lock().unwrap().entry(name).or_insert(0) += 1;
    }
}

#[async_trait]
impl ProcessingBackend for FakeBackend {
    async fn upload_file(&self, _path: &Path, file_name: &str) -> WizardResult<String> {
        self.record("upload_file");
        if let Some(err) = self.script().upload_error.clone() {
            return Err(err);
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(file_name.to_string());
        Ok(format!("file-{}", uploads.len()))
    }

    async fn process_file(&self, _file_id: &str) -> WizardResult<()> {
        self.record("process_file");
        Ok(())
    }

    async fn check_file_status(&self, _request: &FileStatusRequest) -> WizardResult<FileStatus> {
        self.record("check_file_status");
        Ok(FileStatus {
            needs_reprocess: self.script().needs_reprocess,
        })
    }

    async fn prepare_zoom(&self, zoom_url: &str, mode: RecordingMode) -> WizardResult<()> {
        self.record("prepare_zoom");
        self.zoom_requests
            .lock()
            .unwrap()
            .push((zoom_url.to_string(), mode));
        Ok(())
    }

    async fn join_meeting(&self) -> WizardResult<()> {
        self.record("join_meeting");
        Ok(())
    }

    async fn start_recording(&self) -> WizardResult<()> {
        self.record("start_recording");
        Ok(())
    }

    async fn stop_recording(&self) -> WizardResult<()> {
        self.record("stop_recording");
        Ok(())
    }

    async fn process_recording(&self) -> WizardResult<()> {
        self.record("process_recording");
        Ok(())
    }

    async fn processing_status(&self) -> WizardResult<ProcessingStatus> {
        self.record("processing_status");
        let mut script = self.script();
        let status = script
            .processing
            .pop_front()
            .unwrap_or(script.processing_default);
        Ok(ProcessingStatus {
            status,
            mode: Some("file_upload".to_string()),
            has_transcript: status == ProcessingState::Completed,
        })
    }

    async fn cancel_processing(&self) -> WizardResult<()> {
        self.record("cancel_processing");
        match self.script().cancel_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn generate_summary(&self, transcript: Option<&str>) -> WizardResult<()> {
        self.record("generate_summary");
        self.summary_inputs
            .lock()
            .unwrap()
            .push(transcript.map(str::to_string));
        Ok(())
    }

    async fn summary_text(&self) -> WizardResult<SummaryText> {
        self.record("summary_text");
        let mut script = self.script();
        if script.summary_pending > 0 {
            script.summary_pending -= 1;
            return Err(WizardError::Backend("Summary not ready".to_string()));
        }
        Ok(SummaryText {
            summary: script.summary.clone(),
        })
    }

    async fn transcription_status(&self) -> WizardResult<TranscriptionStatus> {
        self.record("transcription_status");
        let mut script = self.script();
        let completed = script.transcription_pending == 0;
        if !completed {
            script.transcription_pending -= 1;
        }
        Ok(TranscriptionStatus {
            completed,
            message: (!completed).then(|| "Transcribing audio".to_string()),
            progress: Some(if completed { 100 } else { 50 }),
        })
    }

    async fn transcription_text(&self) -> WizardResult<TranscriptText> {
        self.record("transcription_text");
        let delay = self.script().transcript_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(TranscriptText {
            transcript: self.script().transcript.clone(),
            metadata: Some(TranscriptMetadata {
                filename: self.uploads.lock().unwrap().last().cloned(),
                language: Some("en".to_string()),
                language_probability: Some(0.97),
                duration: Some(312.5),
            }),
        })
    }

    async fn app_status(&self) -> WizardResult<AppStatus> {
        self.record("app_status");
        Ok(AppStatus::default())
    }
}

/// Options with the default 500ms interval and a small poll limit.
pub fn options(poll_limit: u32) -> SessionOptions {
    SessionOptions {
        polling: PollingConfig {
            interval_ms: 500,
            poll_limit,
            summary_interval_ms: 1000,
        },
        rules: ValidationRules::default(),
        error_window: Duration::from_secs(3),
    }
}

/// Write `size` bytes of `fill` into `dir/name`.
pub fn write_file(dir: &Path, name: &str, size: usize, fill: u8) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![fill; size]).unwrap();
    path
}
