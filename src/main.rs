//! fern-junit-client CLI - Send JUnit test reports to Fern.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use fern_junit_client::config::{self, Config, DEFAULT_CONFIG_FILE};
use fern_junit_client::model::{TestRun, random_seed};
use fern_junit_client::report::{print_summary, summary_line};
use fern_junit_client::{Publisher, RunBuilder};

#[derive(Parser)]
#[command(name = "fern-junit-client")]
#[command(about = "CLI tool for sending JUnit test reports to Fern", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to ./fern.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send JUnit test reports to Fern
    Send(SendArgs),

    /// Validate configuration without reading or sending reports
    Validate(SendArgs),
}

#[derive(Args, Debug, Default)]
struct SendArgs {
    /// Base URL of the Fern Reporter instance to send test reports to
    #[arg(short = 'u', long)]
    fern_url: Option<String>,

    /// Name of the project to associate test reports with
    #[arg(short = 'n', long)]
    project_name: Option<String>,

    /// ID of the project to associate test reports with
    #[arg(short = 'i', long)]
    project_id: Option<String>,

    /// File name pattern of test reports to send to Fern (repeatable)
    #[arg(short = 'f', long = "file-pattern")]
    file_patterns: Vec<String>,

    /// Comma-separated tags to be included on runs
    #[arg(short = 't', long)]
    tags: Option<String>,

    /// Directory that file patterns are relative to
    #[arg(long)]
    project_dir: Option<PathBuf>,

    /// Skip report paths that fail to parse and don't fail on publish errors
    #[arg(long)]
    keep_going: bool,

    /// Upload attempts; redirects within an attempt do not count
    #[arg(long)]
    max_attempts: Option<u32>,
}

impl SendArgs {
    /// Overlays command-line values on top of the file configuration.
    fn apply(self, config: &mut Config) {
        if let Some(url) = self.fern_url {
            config.fern.url = url;
        }
        if let Some(name) = self.project_name {
            config.fern.project_name = name;
        }
        if let Some(id) = self.project_id {
            config.fern.project_id = id;
        }
        if !self.file_patterns.is_empty() {
            config.fern.report_paths = self.file_patterns;
        }
        if let Some(tags) = self.tags {
            config.fern.tags = tags.split(',').map(String::from).collect();
        }
        if let Some(dir) = self.project_dir {
            config.fern.project_dir = Some(dir);
        }
        if self.keep_going {
            config.fern.fail_on_error = false;
        }
        if let Some(attempts) = self.max_attempts {
            config.publish.max_attempts = attempts;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (args, validate_only) = match cli.command {
        Commands::Send(args) => (args, false),
        Commands::Validate(args) => (args, true),
    };

    let mut config = match cli.config.as_deref() {
        Some(path) => config::load_config(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            config::load_config(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => Config::default(),
    };
    args.apply(&mut config);

    // Set up logging
    let log_level = if cli.verbose || config.fern.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    config.validate()?;

    if validate_only {
        info!("Configuration is valid");
        return Ok(());
    }

    send(&config).await
}

async fn send(config: &Config) -> Result<()> {
    let fail_on_error = config.fern.fail_on_error;

    if config.fern.project_name.trim().is_empty() {
        info!("Project ID: {}", config.fern.project_id);
    } else {
        info!("Project name: {}", config.fern.project_name);
    }
    info!("Publishing to Fern instance at: {}", config.fern_url());
    info!("Reading reports from: {}", config.fern.report_paths.join(":"));

    let mut run = TestRun::new(
        config.fern.project_name.clone(),
        config.fern.project_id.clone(),
        random_seed(),
    );

    let mut builder = RunBuilder::new().with_tags(&config.tag_string());
    if let Some(dir) = &config.fern.project_dir {
        builder = builder.with_project_dir(dir.clone());
    }

    for report_path in &config.fern.report_paths {
        debug!("Processing report path: {}", report_path);

        match builder.parse_reports_into(&mut run, report_path) {
            Ok(()) => debug!("Successfully parsed reports from {}", report_path),
            // An invalid pattern is a configuration mistake, not a missing report.
            Err(e) if fail_on_error || !e.is_report_error() => {
                return Err(e)
                    .with_context(|| format!("Failed to parse reports from {}", report_path));
            }
            Err(e) => warn!("Failed to parse reports from {}: {}", report_path, e),
        }
    }

    if run.is_empty() {
        info!("No test suites found in the provided report paths. Nothing to publish.");
        return Ok(());
    }

    info!("{}", summary_line(&run.counts()));
    print_summary(&run);

    let publisher = Publisher::new(config.fern_url())?
        .with_max_attempts(config.publish.max_attempts)
        .with_retry_delay(config.retry_delay());

    match publisher.publish(&run).await {
        Ok(()) => info!("Successfully published test results to Fern"),
        Err(e) if fail_on_error => {
            return Err(e).context("Failed to publish test results to Fern");
        }
        Err(e) => error!("Failed to publish test results to Fern: {}", e),
    }

    Ok(())
}
