use anyhow::Result;
use clap::Parser;
use meetwise::cli::{
    handle_cancel_command, handle_run_command, handle_status_command, handle_validate_command, Cli,
    CliCommand,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        CliCommand::Version => {
            println!("Meetwise {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::Run(args) => handle_run_command(args).await,
        CliCommand::Status => handle_status_command().await,
        CliCommand::Cancel => handle_cancel_command().await,
        CliCommand::Validate(args) => handle_validate_command(args),
    }
}
