// src/bin/cli.rs

//! Sitewatch CLI
//!
//! Weekly change detection across the configured sites. Snapshots land in
//! `{data_dir}`, run summaries in `{output_dir}/{run_date}/summary.json`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sitewatch::{
    config,
    error::{AppError, Result},
    fetch::ResilientClient,
    models::{MonitorConfig, RunSummary, SiteConfig, validate_sites},
    pipeline::{Orchestrator, compare, write_summary},
    services::AdapterOptions,
    storage::{LocalSnapshotStore, SnapshotStore},
};

/// sitewatch - Weekly Site Change Monitor
#[derive(Parser, Debug)]
#[command(
    name = "sitewatch",
    version,
    about = "Detects new and changed content across monitored websites"
)]

struct Cli {
    /// Path to config.toml (relative paths resolve against SITEWATCH_HOME)
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit one JSON object per log line
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect every site, compare with last week and write the run summary
    Run {
        /// Run date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Comma-separated site keys to run (e.g. nt,unitel)
        #[arg(long, value_delimiter = ',')]
        sites: Vec<String>,

        /// Also crawl an arbitrary start URL (repeatable)
        #[arg(long = "url")]
        urls: Vec<String>,

        /// Skip detail-page fetching
        #[arg(long)]
        no_details: bool,

        /// Do not list screenshot targets in the summary
        #[arg(long)]
        no_screenshots: bool,

        /// Replace snapshots already stored for the run date
        #[arg(long)]
        overwrite: bool,
    },

    /// Validate configuration files
    Validate,

    /// List stored snapshot dates
    Snapshots {
        /// Only this site (default: all configured sites)
        site: Option<String>,
    },

    /// Compare two stored snapshots of one site
    Diff {
        site: String,

        /// Newer snapshot date, defaults to the latest stored
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Older snapshot date, defaults to the one before `--to`
        #[arg(long)]
        from: Option<NaiveDate>,
    },

    /// Show resolved paths and configured sites
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));

    if json {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "ts": Utc::now().to_rfc3339(),
                "level": record.level().as_str(),
                "target": record.target(),
                "msg": record.args().to_string(),
            });
            writeln!(buf, "{line}")
        });
    } else {
        builder.format_timestamp_secs();
    }

    builder.init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let env_files = config::load_env();
    init_logging(cli.verbose, cli.json_logs);

    for path in &env_files {
        log::debug!("Loaded environment from {}", path.display());
    }

    let base_dir = config::base_dir();
    let config_path = config::resolve_path(&base_dir, &cli.config);

    match cli.command {
        Command::Run {
            date,
            sites,
            urls,
            no_details,
            no_screenshots,
            overwrite,
        } => {
            let mut config = config::load_config(&config_path)?;
            let run_date = date.unwrap_or_else(|| Local::now().date_naive());

            if no_details {
                config.run.fetch_details = false;
            }
            if overwrite {
                config.run.overwrite = true;
            }

            let mut selected = config.selected_sites(&sites);
            for url in &urls {
                selected.push(SiteConfig::generic(url, None)?);
            }
            for site in &mut selected {
                if no_details {
                    site.fetch_details = Some(false);
                }
                if no_screenshots {
                    site.screenshots = false;
                }
            }
            if selected.is_empty() {
                return Err(AppError::config(format!(
                    "No enabled sites match {:?}",
                    sites
                )));
            }
            validate_sites(&selected)?;

            let summary = run(&config, &base_dir, &selected, run_date).await?;
            let output_dir = config.paths.output_dir(&base_dir);
            let summary_path = write_summary(&summary, &output_dir).await?;
            log::info!("Summary written to {}", summary_path.display());

            if summary.all_failed() {
                log::error!("All {} sites failed", summary.sites.len());
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            let config = match config::load_config(&config_path) {
                Ok(config) => config,
                Err(e) => {
                    log::error!("Config validation failed: {}", e);
                    return Err(e);
                }
            };
            log::info!("✓ Config OK ({} sites)", config.sites.len());
        }

        Command::Snapshots { site } => {
            let config = config::load_config(&config_path)?;
            let store = LocalSnapshotStore::new(config.paths.data_dir(&base_dir));
            let keys = match site {
                Some(key) => vec![key],
                None => config.sites.iter().map(|s| s.key.clone()).collect(),
            };

            for key in keys {
                let dates = store.list_dates(&key).await?;
                let dates: Vec<String> = dates.iter().map(NaiveDate::to_string).collect();
                println!("{key}: {}", if dates.is_empty() { "-".to_string() } else { dates.join(", ") });
            }
        }

        Command::Diff { site, to, from } => {
            let config = config::load_config(&config_path)?;
            let store = LocalSnapshotStore::new(config.paths.data_dir(&base_dir));

            let to = match to {
                Some(date) => date,
                None => store
                    .list_dates(&site)
                    .await?
                    .last()
                    .copied()
                    .ok_or_else(|| AppError::config(format!("No snapshots stored for '{site}'")))?,
            };
            let current = store
                .load(&site, to)
                .await?
                .ok_or_else(|| AppError::config(format!("No snapshot for '{site}' on {to}")))?;
            let previous = match from {
                Some(date) => Some(store.load(&site, date).await?.ok_or_else(|| {
                    AppError::config(format!("No snapshot for '{site}' on {date}"))
                })?),
                None => store.load_previous(&site, to).await?,
            };

            let change_set = compare(previous.as_ref(), &current);
            println!("{}", serde_json::to_string_pretty(&change_set)?);
        }

        Command::Info => {
            let config = config::load_config(&config_path)?;
            log::info!("Base directory: {}", base_dir.display());
            log::info!(
                "Config: {} ({})",
                config_path.display(),
                if config_path.exists() { "found" } else { "defaults" }
            );
            log::info!("Snapshots: {}", config.paths.data_dir(&base_dir).display());
            log::info!("Summaries: {}", config.paths.output_dir(&base_dir).display());
            log::info!(
                "Browser rendering: {}",
                if cfg!(feature = "browser") && config.browser.enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            for site in &config.sites {
                log::info!(
                    "  {} [{:?}{}] {}",
                    site.key,
                    site.kind,
                    if site.enabled { "" } else { ", disabled" },
                    site.listing_url
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn run(
    config: &MonitorConfig,
    base_dir: &Path,
    sites: &[SiteConfig],
    run_date: NaiveDate,
) -> Result<RunSummary> {
    let store = Arc::new(LocalSnapshotStore::new(config.paths.data_dir(base_dir)));
    let fetcher = Arc::new(ResilientClient::from_config(config)?);
    let orchestrator = Orchestrator::new(config.run.clone(), store, fetcher)
        .with_adapter_options(AdapterOptions::from_config(config));

    log::info!(
        "Checking {} sites for {}: {}",
        sites.len(),
        run_date,
        sites.iter().map(|s| s.key.as_str()).collect::<Vec<_>>().join(", ")
    );

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        log::warn!("Interrupted, finishing up...");
    };

    Ok(orchestrator.run_until(sites, run_date, shutdown).await)
}
