use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epg_live::{
    Annotator,
    config::{Config, SelectionMode},
    utils::parse_clock_override,
};

#[derive(Parser)]
#[command(name = "epg-live")]
#[command(version)]
#[command(about = "Annotates an M3U playlist with live and upcoming events from an XMLTV guide")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (defaults to $EPG_LIVE_CONFIG or config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Don't create the configuration file when it is missing
    #[arg(long)]
    no_write_default: bool,

    /// Guide location, URL or path (overrides config file)
    #[arg(short, long, value_name = "LOCATION")]
    epg: Option<String>,

    /// Playlist location, URL or path (overrides config file)
    #[arg(short, long, value_name = "LOCATION")]
    playlist: Option<String>,

    /// Output playlist path (overrides config file)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Selection mode: one-per-channel or many-per-channel
    #[arg(short, long)]
    mode: Option<SelectionMode>,

    /// Evaluate at a fixed instant instead of the wall clock (e.g. "2025-12-23 20:00")
    #[arg(long, value_name = "TIME")]
    now: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("epg_live={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting epg-live v{}", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_from_file_with(&config_path, !cli.no_write_default)?;
    info!("Configuration loaded from: {}", config_path);

    // Override config with CLI arguments
    if let Some(epg) = cli.epg {
        config.sources.epg = epg;
    }
    if let Some(playlist) = cli.playlist {
        config.sources.playlist = playlist;
    }
    if let Some(output) = cli.output {
        config.sources.output = output;
    }
    if let Some(mode) = cli.mode {
        config.selection.mode = mode;
    }

    let annotator = Annotator::new(&config)?;
    let now = cli
        .now
        .as_deref()
        .map(|value| parse_clock_override(value, annotator.timezone()))
        .transpose()
        .context("Invalid --now value")?;

    let annotation = annotator.load_and_annotate(&config.sources, now).await?;
    info!("Evaluated at {}", annotation.now);

    std::fs::write(&config.sources.output, &annotation.playlist).with_context(|| {
        format!("Failed to write playlist to {}", config.sources.output.display())
    })?;
    info!(
        "Wrote {} entries to {}",
        annotation.diagnostics.emitted_entries,
        config.sources.output.display()
    );

    if let Some(path) = &config.sources.unmatched_output {
        let mut unmatched = annotation.diagnostics.unmatched_channels.join("\n");
        if !unmatched.is_empty() {
            unmatched.push('\n');
        }
        std::fs::write(path, unmatched)
            .with_context(|| format!("Failed to write unmatched list to {}", path.display()))?;
        info!("Wrote unmatched channel list to {}", path.display());
    }

    if let Some(path) = &config.sources.report_output {
        let report = annotation.diagnostics.to_json()?;
        std::fs::write(path, report)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        info!("Wrote run report to {}", path.display());
    }

    Ok(())
}
