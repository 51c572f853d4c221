//! CLI handler that drives the wizard from the terminal.
//!
//! Selects the input on the upload page, then runs the ingestion,
//! transcription and summary sessions in order, advancing a page after each.

use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::TranscriptMetadata;
use crate::cli::args::RunCliArgs;
use crate::cli::connect;
use crate::config::Config;
use crate::export::{self, SUMMARY_PREFIX, TRANSCRIPT_PREFIX};
use crate::session::{JobState, ProcessingSession, SessionState};
use crate::wizard::{Page, WizardNavigator};

/// Handle the run CLI command.
pub async fn handle_run_command(args: RunCliArgs) -> Result<()> {
    let config = Config::load()?;
    let backend = connect(&config)?;
    let mut wizard = WizardNavigator::from_config(backend, &config);
    let show_progress = !args.no_progress;

    // 1. Welcome -> Upload
    advance(&mut wizard, Page::Upload).await?;

    // 2. Pick the input source
    select_source(wizard.ingestion_mut(), &args).await?;

    // 3. Ingest, then transcribe, then summarize
    let ingested = run_session(wizard.ingestion_mut(), "Processing input", show_progress).await?;
    advance(&mut wizard, Page::Transcription).await?;

    let transcribed = run_session(wizard.transcription_mut(), "Transcribing", show_progress).await?;
    advance(&mut wizard, Page::Summary).await?;

    let summarized = run_session(wizard.summary_mut(), "Summarizing", show_progress).await?;

    let transcript = if transcribed.result_text.trim().is_empty() {
        ingested.result_text.clone()
    } else {
        transcribed.result_text.clone()
    };
    let metadata = transcribed
        .metadata
        .or(ingested.metadata)
        .unwrap_or_default();

    // 4. Output
    print_metadata(&metadata);
    println!("\n=== Transcript ===\n{}", transcript);
    println!("\n=== Summary ===\n{}", summarized.result_text);

    if args.export {
        let dir = config.export_dir()?;
        let transcript_path =
            export::save_with_metadata(&transcript, &metadata, TRANSCRIPT_PREFIX, &dir)?;
        let summary_path =
            export::save_with_metadata(&summarized.result_text, &metadata, SUMMARY_PREFIX, &dir)?;
        eprintln!("Transcript saved to: {}", transcript_path.display());
        eprintln!("Summary saved to: {}", summary_path.display());
    }

    wizard.finish().await;
    Ok(())
}

async fn advance(wizard: &mut WizardNavigator, page: Page) -> Result<()> {
    if !wizard.go_to(page.number()).await {
        bail!(
            "Cannot continue to the {} page yet (current page: {})",
            page.as_str(),
            wizard.current_page().as_str()
        );
    }
    Ok(())
}

async fn select_source(session: &mut ProcessingSession, args: &RunCliArgs) -> Result<()> {
    if let Some(path) = &args.file {
        session
            .select_file(path)
            .await
            .with_context(|| format!("Cannot use {}", path.display()))?;
        return Ok(());
    }

    if let Some(link) = &args.link {
        session
            .select_meeting_link(link, Some(args.mode))
            .await
            .context("Cannot use meeting link")?;
        return Ok(());
    }

    if let Some(seconds) = args.record_seconds {
        session
            .start_recording()
            .await
            .context("Failed to start recording")?;
        eprintln!("Recording for {}s (Ctrl+C to stop early)...", seconds);

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Recording stopped early by user");
            }
        }

        session
            .stop_recording()
            .await
            .context("Failed to stop recording")?;
        return Ok(());
    }

    Err(anyhow!("No input source given"))
}

/// Start the session and wait for it to settle. Ctrl+C cancels the job.
async fn run_session(
    session: &mut ProcessingSession,
    label: &str,
    show_progress: bool,
) -> Result<SessionState> {
    let progress = if show_progress {
        Some(spawn_progress(session, label))
    } else {
        None
    };

    session.start().await?;

    let settled = tokio::select! {
        state = session.settled() => Some(state),
        _ = tokio::signal::ctrl_c() => None,
    };

    let state = match settled {
        Some(state) => state,
        None => {
            if let Err(e) = session.cancel().await {
                warn!("Backend did not acknowledge cancellation: {}", e);
            }
            session.state()
        }
    };

    if let Some((pb, task)) = progress {
        task.abort();
        match &state.job_state {
            JobState::Completed => pb.finish_with_message(format!("{label}: done")),
            other => pb.abandon_with_message(format!("{label}: {}", other.as_str())),
        }
    }

    match &state.job_state {
        JobState::Completed => Ok(state),
        JobState::Cancelled => bail!("{} was cancelled", label),
        JobState::Failed(reason) => bail!("{} failed: {}", label, reason),
        other => bail!("{} stopped in unexpected state {}", label, other.as_str()),
    }
}

/// Spinner fed from the session's status channel.
fn spawn_progress(session: &ProcessingSession, label: &str) -> (ProgressBar, JoinHandle<()>) {
    let pb = create_spinner();
    pb.set_message(label.to_string());

    let mut rx = session.status().subscribe();
    let bar = pb.clone();
    let label = label.to_string();
    let task = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            let mut message = format!("{} [{}]", label, state.job_state.as_str());
            if state.poll_attempts > 0 {
                message.push_str(&format!(" check {}/{}", state.poll_attempts, state.poll_limit));
            }
            if let Some(progress) = state.progress {
                message.push_str(&format!(" {}%", progress));
            }
            if let Some(detail) = &state.message {
                message.push_str(&format!(" {}", detail));
            }
            bar.set_message(message);
        }
    });

    (pb, task)
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {elapsed_precise} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_metadata(metadata: &TranscriptMetadata) {
    if let Some(filename) = &metadata.filename {
        println!("File: {}", filename);
    }
    if let Some(language) = &metadata.language {
        match metadata.language_probability {
            Some(p) => println!("Language: {} ({:.0}%)", language, p * 100.0),
            None => println!("Language: {}", language),
        }
    }
    if let Some(duration) = metadata.duration {
        println!("Duration: {:.2}s", duration);
    }
}
