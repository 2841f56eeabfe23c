use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use termpanel_core::Settings;

#[derive(Parser)]
#[command(name = "termpanel")]
#[command(about = "termpanel - several shells behind one terminal")]
#[command(version)]
struct Cli {
    /// Process host program to launch
    #[arg(long)]
    host: Option<String>,

    /// Extra argument for the process host (repeatable)
    #[arg(long = "host-arg", allow_hyphen_values = true)]
    host_args: Vec<String>,

    /// Working directory for new terminals
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = match cli.config {
        Some(ref path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Settings::load(),
    };

    if let Some(host) = cli.host {
        settings.host.program = host;
    }
    if !cli.host_args.is_empty() {
        settings.host.args = cli.host_args;
    }

    let cwd = cli.cwd.or_else(|| std::env::current_dir().ok());
    termpanel_cli::app::run(settings, cwd).await?;

    Ok(())
}
