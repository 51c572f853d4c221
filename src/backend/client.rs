//! reqwest implementation of the backend contract.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use super::types::{
    AppStatus, Envelope, FileStatus, FileStatusRequest, GenerateSummaryRequest,
    PrepareZoomRequest, ProcessFileRequest, ProcessingStatus, RecordingMode, SummaryText,
    TranscriptText, TranscriptionStatus, UploadResponse,
};
use super::ProcessingBackend;
use crate::config::BackendConfig;
use crate::error::{WizardError, WizardResult};

/// Client for the processing backend's `/api` routes.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a new client with the given base URL.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn from_config(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        Ok(Self::with_client(client, &config.base_url))
    }

    fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}/api/{}", self.base_url, route)
    }

    async fn get<T: DeserializeOwned>(&self, route: &str) -> WizardResult<T> {
        debug!("GET /api/{}", route);
        let response = self
            .client
            .get(self.url(route))
            .send()
            .await
            .map_err(|e| transport(route, e))?;
        Self::unwrap_envelope(route, response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        route: &str,
        body: &B,
    ) -> WizardResult<T> {
        debug!("POST /api/{}", route);
        let response = self
            .client
            .post(self.url(route))
            .json(body)
            .send()
            .await
            .map_err(|e| transport(route, e))?;
        Self::unwrap_envelope(route, response).await
    }

    async fn post_ack<B: Serialize + ?Sized>(&self, route: &str, body: &B) -> WizardResult<()> {
        let _: Option<Value> = self.post(route, body).await?;
        Ok(())
    }

    async fn unwrap_envelope<T: DeserializeOwned>(
        route: &str,
        response: reqwest::Response,
    ) -> WizardResult<T> {
        let status = response.status();
        let body = response.text().await.map_err(|e| transport(route, e))?;

        let envelope: Envelope<Value> = serde_json::from_str(&body).map_err(|_| {
            WizardError::PollingTransport(format!(
                "/api/{} returned {} with unparseable body: {}",
                route, status, body
            ))
        })?;

        if !envelope.success {
            return Err(WizardError::Backend(envelope.error.unwrap_or_else(|| {
                format!("/api/{} failed with status {}", route, status)
            })));
        }

        serde_json::from_value(envelope.data.unwrap_or(Value::Null)).map_err(|e| {
            WizardError::PollingTransport(format!("/api/{} returned unexpected data: {}", route, e))
        })
    }
}

fn transport(route: &str, err: reqwest::Error) -> WizardError {
    WizardError::PollingTransport(format!("/api/{}: {}", route, err))
}

pub(crate) fn mime_type_for_extension(ext: &str) -> &'static str {
    match ext {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "flv" => "video/x-flv",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ProcessingBackend for HttpBackend {
    async fn upload_file(&self, path: &Path, file_name: &str) -> WizardResult<String> {
        let file_data = fs::read(path).await.map_err(|e| {
            WizardError::Submission(format!("failed to read {}: {}", path.display(), e))
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let part = Part::bytes(file_data)
            .file_name(file_name.to_string())
            .mime_str(mime_type_for_extension(&ext))
            .map_err(|e| WizardError::Submission(e.to_string()))?;

        let route = "upload-only";
        debug!("POST /api/{} ({})", route, file_name);
        let response = self
            .client
            .post(self.url(route))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(|e| transport(route, e))?;

        let uploaded: UploadResponse = Self::unwrap_envelope(route, response).await?;
        Ok(uploaded.file_id)
    }

    async fn process_file(&self, file_id: &str) -> WizardResult<()> {
        self.post_ack("process-file", &ProcessFileRequest { file_id })
            .await
    }

    async fn check_file_status(&self, request: &FileStatusRequest) -> WizardResult<FileStatus> {
        self.post("check-file-status", request).await
    }

    async fn prepare_zoom(&self, zoom_url: &str, mode: RecordingMode) -> WizardResult<()> {
        self.post_ack(
            "prepare-zoom",
            &PrepareZoomRequest {
                zoom_url,
                recording_mode: mode,
            },
        )
        .await
    }

    async fn join_meeting(&self) -> WizardResult<()> {
        self.post_ack("join-meeting", &serde_json::json!({})).await
    }

    async fn start_recording(&self) -> WizardResult<()> {
        self.post_ack("start-recording", &serde_json::json!({}))
            .await
    }

    async fn stop_recording(&self) -> WizardResult<()> {
        self.post_ack("stop-recording", &serde_json::json!({}))
            .await
    }

    async fn process_recording(&self) -> WizardResult<()> {
        self.post_ack("process-recording", &serde_json::json!({}))
            .await
    }

    async fn processing_status(&self) -> WizardResult<ProcessingStatus> {
        self.get("processing/status").await
    }

    async fn cancel_processing(&self) -> WizardResult<()> {
        self.post_ack("cancel-processing", &serde_json::json!({}))
            .await
    }

    async fn generate_summary(&self, transcript: Option<&str>) -> WizardResult<()> {
        self.post_ack("generate_summary", &GenerateSummaryRequest { transcript })
            .await
    }

    async fn summary_text(&self) -> WizardResult<SummaryText> {
        self.get("summary/text").await
    }

    async fn transcription_status(&self) -> WizardResult<TranscriptionStatus> {
        self.get("transcription/status").await
    }

    async fn transcription_text(&self) -> WizardResult<TranscriptText> {
        self.get("transcription/text").await
    }

    async fn app_status(&self) -> WizardResult<AppStatus> {
        self.get("status").await
    }
}
