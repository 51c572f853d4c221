pub mod args;
mod run;

use anyhow::{bail, Context, Result};
use std::sync::Arc;

use crate::backend::{HttpBackend, ProcessingBackend};
use crate::config::Config;
use crate::validation::ValidationRules;

pub use args::{Cli, CliCommand, RunCliArgs, ValidateCliArgs};
pub use run::handle_run_command;

fn connect(config: &Config) -> Result<Arc<dyn ProcessingBackend>> {
    let backend = HttpBackend::from_config(&config.backend)?;
    Ok(Arc::new(backend))
}

pub async fn handle_status_command() -> Result<()> {
    let config = Config::load()?;
    let backend = connect(&config)?;

    let app = backend
        .app_status()
        .await
        .context("Failed to reach the processing backend")?;
    let processing = backend.processing_status().await?;

    println!("Backend: {}", config.backend.base_url);
    println!("Recording: {}", yes_no(app.is_recording));
    println!("Transcript available: {}", yes_no(app.has_transcript));
    println!("Summary available: {}", yes_no(app.has_summary));
    println!("Processing: {}", processing.status.as_str());
    if let Some(mode) = processing.mode {
        println!("Mode: {}", mode);
    }

    Ok(())
}

pub async fn handle_cancel_command() -> Result<()> {
    let config = Config::load()?;
    let backend = connect(&config)?;
    backend
        .cancel_processing()
        .await
        .context("Failed to cancel processing")?;
    println!("Cancellation requested");
    Ok(())
}

pub fn handle_validate_command(args: ValidateCliArgs) -> Result<()> {
    let config = Config::load()?;
    let rules = ValidationRules::from_config(&config.validation);

    if let Some(path) = args.file {
        let size = std::fs::metadata(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .len();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        match rules.file_rejection_reason(name, size) {
            None => println!("OK: {} ({:.1}MB)", name, size as f64 / 1_000_000.0),
            Some(reason) => bail!("Rejected: {}", reason),
        }
    }

    if let Some(link) = args.link {
        if rules.is_acceptable_meeting_link(&link) {
            println!("OK: {}", link.trim());
        } else {
            bail!("Rejected: not a Zoom meeting link: {}", link);
        }
    }

    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
