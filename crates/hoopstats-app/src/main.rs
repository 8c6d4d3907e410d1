// hoopstats entry point.
//
// 1. Initialize tracing (stderr; stdout carries the per-year results)
// 2. Parse the command line
// 3. Load config, apply command-line overrides
// 4. Build the HTTP page source and run the command

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use hoopstats_app::cli::{self, Cli};
use hoopstats_app::config;
use hoopstats_app::fetch::HttpPageSource;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing()?;
    let cli = Cli::parse();

    let mut config = config::load_config().context("failed to load configuration")?;
    if let Some(dir) = cli.output_dir.clone() {
        config.export.output_dir = dir;
    }
    info!("Exporting to {}", config.export.output_dir.display());

    let source = HttpPageSource::new(&config.source).context("failed to build HTTP client")?;

    match cli::run(&cli.command, &config, &source).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("{e}");
            eprintln!("hoopstats: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hoopstats_app=info,hoopstats_core=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
