//! Wire types for the processing backend.
//!
//! Every response is wrapped in `{success, data?, error?}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// How the backend should capture a remote meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingMode {
    Auto,
    Manual,
}

impl RecordingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl std::str::FromStr for RecordingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown recording mode '{other}' (expected auto or manual)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileStatusRequest {
    pub file_hash: String,
    pub file_name: String,
    pub file_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileStatus {
    pub needs_reprocess: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ProcessFileRequest<'a> {
    pub file_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PrepareZoomRequest<'a> {
    pub zoom_url: &'a str,
    pub recording_mode: RecordingMode,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GenerateSummaryRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<&'a str>,
}

/// Server-side job status reported by `GET /api/processing/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    Idle,
    Processing,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingStatus {
    pub status: ProcessingState,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub has_transcript: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionStatus {
    pub completed: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub progress: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMetadata {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub language_probability: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptText {
    pub transcript: String,
    #[serde(default)]
    pub metadata: Option<TranscriptMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryText {
    pub summary: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppStatus {
    #[serde(default)]
    pub is_recording: bool,
    #[serde(default)]
    pub has_transcript: bool,
    #[serde(default)]
    pub has_summary: bool,
}
