pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod global;
pub mod poller;
pub mod session;
pub mod source;
pub mod validation;
pub mod wizard;

pub use backend::{HttpBackend, ProcessingBackend, RecordingMode};
pub use error::{WizardError, WizardResult};
pub use session::{JobState, ProcessingSession, SessionOptions, Stage};
pub use source::IngestionSourceSelector;
pub use validation::ValidationRules;
pub use wizard::{Page, WizardNavigator};
