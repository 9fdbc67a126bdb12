//! ycrawler main entry point
//!
//! This is the command-line interface for the Hacker News discussion archiver.

use anyhow::Context;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use ycrawler::config::{config_fingerprint, read_config, validate, Config};
use ycrawler::crawler::crawl;

/// ycrawler: archive new Hacker News discussions and the pages they cite
///
/// ycrawler polls the front page on a fixed interval. Every story it has not
/// seen before gets its discussion page downloaded, along with every page
/// linked from the comments.
#[derive(Parser, Debug)]
#[command(name = "ycrawler")]
#[command(version)]
#[command(about = "Archive new Hacker News discussions", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Seconds between front page polls
    #[arg(long, value_name = "SECS")]
    repeat_interval: Option<u64>,

    /// Number of top stories considered per poll
    #[arg(long, value_name = "N")]
    page_limit: Option<usize>,

    /// Directory that receives one subdirectory per story
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Download everything but write nothing to disk
    #[arg(long, conflicts_with = "live")]
    dry_run: bool,

    /// Write downloaded pages to disk
    #[arg(long, conflicts_with = "dry_run")]
    live: bool,

    /// Append log output to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Maximum number of stories downloading at once
    #[arg(long, value_name = "N")]
    story_concurrency: Option<usize>,

    /// Maximum number of simultaneous link downloads per story
    #[arg(long, value_name = "N")]
    link_concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Extra attempts for timeouts, connection errors, 429 and 5xx
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Also download the article each story points at
    #[arg(long)]
    download_story_url: bool,

    /// Validate the configuration, print it and exit
    #[arg(long)]
    check_config: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(secs) = self.repeat_interval {
            config.crawler.repeat_interval_secs = secs;
        }
        if let Some(limit) = self.page_limit {
            config.crawler.page_limit = limit;
        }
        if let Some(dir) = &self.download_dir {
            config.output.download_dir = dir.clone();
        }
        if self.dry_run {
            config.output.dry_run = true;
        }
        if self.live {
            config.output.dry_run = false;
        }
        if let Some(file) = &self.log_file {
            config.logging.log_file = Some(file.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.log_level = level.clone();
        }
        if let Some(n) = self.story_concurrency {
            config.crawler.story_concurrency = n;
        }
        if let Some(n) = self.link_concurrency {
            config.crawler.link_concurrency = n;
        }
        if let Some(secs) = self.timeout {
            config.crawler.request_timeout_secs = secs;
        }
        if let Some(n) = self.max_retries {
            config.crawler.max_retries = n;
        }
        if self.download_story_url {
            config.crawler.download_story_url = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration")?;

    if cli.check_config {
        print!("{}", toml::to_string(&config)?);
        return Ok(());
    }

    setup_logging(&config, cli.verbose, cli.quiet)?;

    let fingerprint = config_fingerprint(&config)?;
    tracing::info!(
        "Starting ycrawler {} (config {})",
        env!("CARGO_PKG_VERSION"),
        &fingerprint[..12]
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, finishing running downloads");
                on_signal.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    match crawl(&config, cancel).await {
        Ok(()) => {
            tracing::info!("Crawler shut down cleanly");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawler failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the tracing subscriber
///
/// `RUST_LOG` wins over everything. Otherwise `-q` limits output to errors,
/// `-v` flags raise the configured level, and the configured level applies.
fn setup_logging(config: &Config, verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if quiet => EnvFilter::new("error"),
        Err(_) => match verbose {
            0 => EnvFilter::new(format!("ycrawler={},warn", config.logging.log_level)),
            1 => EnvFilter::new("ycrawler=debug,info"),
            2 => EnvFilter::new("ycrawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        },
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match &config.logging.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }

    Ok(())
}
