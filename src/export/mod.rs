//! Saving transcripts and summaries as text files.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::backend::TranscriptMetadata;

/// Prefix for exported transcripts.
pub const TRANSCRIPT_PREFIX: &str = "Transcription";
/// Prefix for exported summaries.
pub const SUMMARY_PREFIX: &str = "Meeting_Summary";

/// Render the metadata header followed by a blank line and the content.
pub fn with_metadata(content: &str, metadata: &TranscriptMetadata, now: DateTime<Local>) -> String {
    let duration = metadata
        .duration
        .map(|d| format!("{d:.2}s"))
        .unwrap_or_else(|| "unknown".to_string());

    let header = [
        format!("Date: {}", now.format("%Y-%m-%d %H:%M:%S")),
        format!(
            "Original File: {}",
            metadata.filename.as_deref().unwrap_or("unknown")
        ),
        format!(
            "Language: {}",
            metadata.language.as_deref().unwrap_or("unknown")
        ),
        format!("Duration: {duration}"),
        "-".repeat(50),
    ]
    .join("\n");

    format!("{header}\n\n{content}")
}

/// Write `<prefix>_<YYYYmmdd_HHMMSS>.txt` into `dir` and return its path.
pub fn save_with_metadata(
    content: &str,
    metadata: &TranscriptMetadata,
    prefix: &str,
    dir: &Path,
) -> Result<PathBuf> {
    let now = Local::now();
    std::fs::create_dir_all(dir).context("Failed to create export directory")?;

    let path = dir.join(format!("{}_{}.txt", prefix, now.format("%Y%m%d_%H%M%S")));
    std::fs::write(&path, with_metadata(content, metadata, now))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Exported {} to {:?}", prefix, path);
    Ok(path)
}
