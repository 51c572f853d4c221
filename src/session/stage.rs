//! Per-page differences between processing sessions.
//!
//! The three asynchronous pages share one state machine and only differ in
//! which endpoints report status and deliver the result.

use async_trait::async_trait;
use std::sync::Arc;

use crate::backend::{ProcessingBackend, ProcessingState, TranscriptMetadata};
use crate::error::{WizardError, WizardResult};
use crate::poller::{StatusCheck, StatusReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Page 2: submit the selected source and wait for the backend job.
    Ingestion,
    /// Page 3: wait for the transcript.
    Transcription,
    /// Page 4: generate and fetch the summary.
    Summary,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::Transcription => "transcription",
            Self::Summary => "summary",
        }
    }
}

/// Status check bound to one stage's endpoint.
pub(crate) struct StageStatusCheck {
    pub stage: Stage,
    pub backend: Arc<dyn ProcessingBackend>,
}

#[async_trait]
impl StatusCheck for StageStatusCheck {
    async fn check_status(&self) -> WizardResult<StatusReport> {
        match self.stage {
            Stage::Ingestion => {
                let status = self.backend.processing_status().await?;
                Ok(StatusReport {
                    completed: status.status == ProcessingState::Completed,
                    cancelled: status.status == ProcessingState::Cancelled,
                    message: status.mode,
                    progress: None,
                })
            }
            Stage::Transcription => {
                let status = self.backend.transcription_status().await?;
                Ok(StatusReport {
                    completed: status.completed,
                    cancelled: false,
                    message: status.message,
                    progress: status.progress,
                })
            }
            // The summary route answers `success: false` until a summary exists.
            Stage::Summary => match self.backend.summary_text().await {
                Ok(_) => Ok(StatusReport::done()),
                Err(WizardError::Backend(message)) => Ok(StatusReport {
                    message: Some(message),
                    ..StatusReport::pending()
                }),
                Err(e) => Err(e),
            },
        }
    }
}

pub(crate) struct StageResult {
    pub text: String,
    pub metadata: Option<TranscriptMetadata>,
}

pub(crate) async fn fetch_result(
    stage: Stage,
    backend: &dyn ProcessingBackend,
) -> WizardResult<StageResult> {
    let result = match stage {
        Stage::Ingestion | Stage::Transcription => {
            let transcript = backend.transcription_text().await?;
            StageResult {
                text: transcript.transcript,
                metadata: transcript.metadata,
            }
        }
        Stage::Summary => StageResult {
            text: backend.summary_text().await?.summary,
            metadata: None,
        },
    };

    if result.text.trim().is_empty() {
        return Err(WizardError::PollingTransport(format!(
            "{} finished without any text",
            stage.as_str()
        )));
    }

    Ok(result)
}
