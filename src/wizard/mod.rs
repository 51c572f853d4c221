//! Page sequencing for the four-page wizard.
//!
//! Welcome → Upload → Transcription → Summary. Forward moves are gated on
//! each page's session; backward moves are always allowed.

use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::ProcessingBackend;
use crate::config::Config;
use crate::session::{ProcessingSession, SessionOptions, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Page {
    Welcome = 1,
    Upload = 2,
    Transcription = 3,
    Summary = 4,
}

impl Page {
    pub const FIRST: Page = Page::Welcome;
    pub const LAST: Page = Page::Summary;

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Welcome),
            2 => Some(Self::Upload),
            3 => Some(Self::Transcription),
            4 => Some(Self::Summary),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Upload => "upload",
            Self::Transcription => "transcription",
            Self::Summary => "summary",
        }
    }
}

pub struct WizardNavigator {
    current: Page,
    direct_advance: bool,
    ingestion: ProcessingSession,
    transcription: ProcessingSession,
    summary: ProcessingSession,
    /// Ingestion generation the transcription page was entered with.
    transcription_source: Option<u64>,
    /// Transcription generation the summary page was entered with.
    summary_source: Option<u64>,
}

impl WizardNavigator {
    pub fn new(
        backend: Arc<dyn ProcessingBackend>,
        options: SessionOptions,
        direct_advance: bool,
    ) -> Self {
        Self {
            current: Page::FIRST,
            direct_advance,
            ingestion: ProcessingSession::new(
                Stage::Ingestion,
                Arc::clone(&backend),
                options.clone(),
            ),
            transcription: ProcessingSession::new(
                Stage::Transcription,
                Arc::clone(&backend),
                options.clone(),
            ),
            summary: ProcessingSession::new(Stage::Summary, backend, options),
            transcription_source: None,
            summary_source: None,
        }
    }

    pub fn from_config(backend: Arc<dyn ProcessingBackend>, config: &Config) -> Self {
        Self::new(
            backend,
            SessionOptions::from_config(config),
            config.wizard.direct_advance,
        )
    }

    pub fn current_page(&self) -> Page {
        self.current
    }

    pub fn ingestion(&self) -> &ProcessingSession {
        &self.ingestion
    }

    pub fn ingestion_mut(&mut self) -> &mut ProcessingSession {
        &mut self.ingestion
    }

    pub fn transcription(&self) -> &ProcessingSession {
        &self.transcription
    }

    pub fn transcription_mut(&mut self) -> &mut ProcessingSession {
        &mut self.transcription
    }

    pub fn summary(&self) -> &ProcessingSession {
        &self.summary
    }

    pub fn summary_mut(&mut self) -> &mut ProcessingSession {
        &mut self.summary
    }

    /// Whether the given page lets the user move past it.
    ///
    /// A finished page only counts while the page before it still holds the
    /// result it was entered with.
    pub fn can_advance(&self, page: u8) -> bool {
        match Page::from_number(page) {
            Some(Page::Welcome) => true,
            Some(Page::Upload) => {
                self.ingestion.is_completed()
                    || (self.direct_advance && self.ingestion.selector().is_ready())
            }
            Some(Page::Transcription) => {
                self.transcription.is_completed()
                    && self.transcription_source == Some(self.ingestion.generation())
            }
            Some(Page::Summary) => {
                self.summary.is_completed()
                    && self.summary_source == Some(self.transcription.generation())
            }
            None => false,
        }
    }

    /// Move to `page`. Returns whether the move happened.
    pub async fn go_to(&mut self, page: u8) -> bool {
        let Some(target) = Page::from_number(page) else {
            debug!("Ignoring navigation to invalid page {}", page);
            return false;
        };

        if target > self.current {
            let blocked = (self.current.number()..target.number()).find(|p| !self.can_advance(*p));
            if let Some(blocked) = blocked {
                debug!(
                    "Navigation to page {} blocked at page {}",
                    target.number(),
                    blocked
                );
                return false;
            }
            self.prepare_forward(target).await;
        }

        info!("Page {} -> {}", self.current.number(), target.number());
        self.current = target;
        true
    }

    pub async fn next(&mut self) -> bool {
        self.go_to(self.current.number() + 1).await
    }

    pub async fn back(&mut self) -> bool {
        if self.current == Page::FIRST {
            return false;
        }
        self.go_to(self.current.number() - 1).await
    }

    /// The Finish action: reset every page's session and return to page 1.
    ///
    /// Only available from the last page.
    pub async fn finish(&mut self) -> bool {
        if self.current != Page::LAST {
            return false;
        }

        self.ingestion.reset_all().await;
        self.transcription.reset_all().await;
        self.summary.reset_all().await;
        self.transcription_source = None;
        self.summary_source = None;
        self.current = Page::FIRST;
        info!("Wizard finished, back to page 1");
        true
    }

    /// Hand the earlier pages' context to the sessions being entered.
    ///
    /// A session built from an earlier result that has since been replaced
    /// is reset before it is entered again.
    async fn prepare_forward(&mut self, target: Page) {
        let live = self.ingestion.is_live_source();

        if target >= Page::Transcription {
            let source = self.ingestion.generation();
            if self.transcription_source.is_some_and(|seen| seen != source) {
                info!("Ingestion result changed, discarding transcription");
                self.transcription.reset_all().await;
            }
            self.transcription_source = Some(source);
            self.transcription.set_live_source(live);
        }
        if target >= Page::Summary {
            let source = self.transcription.generation();
            if self.summary_source.is_some_and(|seen| seen != source) {
                info!("Transcription result changed, discarding summary");
                self.summary.reset_all().await;
            }
            self.summary_source = Some(source);
            self.summary.set_live_source(live);
            let transcript = [&self.transcription, &self.ingestion]
                .iter()
                .map(|session| session.result_text())
                .find(|text| !text.trim().is_empty());
            self.summary.set_input_text(transcript);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_numbers() {
        assert_eq!(Page::from_number(3), Some(Page::Transcription));
        assert_eq!(Page::from_number(0), None);
        assert_eq!(Page::from_number(5), None);
        assert_eq!(Page::Summary.number(), 4);
        assert!(Page::Upload < Page::Transcription);
    }
}
