use clap::{ArgGroup, Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::backend::RecordingMode;

#[derive(Parser, Debug)]
#[command(name = "meetwise")]
#[command(about = "Turn meeting recordings into transcripts and summaries", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Walk through upload, transcription and summary for one input
    Run(RunCliArgs),
    /// Show what the backend is currently doing
    Status,
    /// Ask the backend to cancel the running job
    Cancel,
    /// Check a file or meeting link against the local input rules
    Validate(ValidateCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["file", "link", "record_seconds"]),
))]
pub struct RunCliArgs {
    /// Audio or video file to upload
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Zoom meeting link to join
    #[arg(short, long)]
    pub link: Option<String>,
    /// Recording mode for a meeting link (auto or manual)
    #[arg(short, long, default_value = "auto")]
    pub mode: RecordingMode,
    /// Record live audio for this many seconds
    #[arg(long)]
    pub record_seconds: Option<u64>,
    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,
    /// Save the transcript and summary to the export directory
    #[arg(short, long)]
    pub export: bool,
}

#[derive(ClapArgs, Debug)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["file", "link"]),
))]
pub struct ValidateCliArgs {
    /// File to check
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Meeting link to check
    #[arg(short, long)]
    pub link: Option<String>,
}
