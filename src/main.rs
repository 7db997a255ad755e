use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use pjfscraper::{history::History, pipeline::Pipeline, Config, PartitionKey, Variant};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// pjfscraper: downloads the Juiz de Fora budget spreadsheets and stages them in DuckDB.
#[derive(Debug, Parser)]
struct Args {
    /// YAML configuration file.
    #[arg(long, env = "PJF_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `data_dir` from the configuration.
    #[arg(long, env = "PJF_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the partition keys due today.
    Partitions { variant: Variant },
    /// Download one partition, or every due one.
    Fetch {
        variant: Variant,
        #[arg(long)]
        partition: Option<String>,
        /// Fetch even if the history log says it was already fetched.
        #[arg(long)]
        force: bool,
    },
    /// Normalize every raw file of a variant and append it to its staging table.
    Stage { variant: Variant },
    /// Print the fetch log of a variant, oldest first.
    History { variant: Variant },
    /// Fetch all due partitions of every variant, then stage every variant.
    Run {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // ─── logging ─────────────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("exiting with error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = args.data_dir {
        config = config.with_data_dir(dir);
    }
    let today = Local::now().date_naive();

    match args.command {
        Command::Partitions { variant } => {
            for key in variant.partitions().keys_as_of(today) {
                println!("{}", key);
            }
            return Ok(());
        }
        Command::History { variant } => {
            for record in History::new(config.history_dir())?.records(variant)? {
                println!("{}", record);
            }
            return Ok(());
        }
        _ => {}
    }

    let pipeline = Arc::new(Pipeline::new(config)?);
    match args.command {
        Command::Partitions { .. } | Command::History { .. } => {}

        Command::Fetch {
            variant,
            partition: Some(raw),
            ..
        } => {
            let key = PartitionKey::parse(&raw)?;
            pipeline.materialize(variant, &key).await?;
        }

        Command::Fetch {
            variant,
            partition: None,
            force,
        } => {
            let report = pipeline.fetch_due(variant, today, force).await?;
            info!(
                %variant,
                fetched = report.fetched.len(),
                skipped = report.skipped,
                failed = report.failed.len(),
                "fetch finished"
            );
            if !report.is_success() {
                bail!("{} partition(s) of {} failed", report.failed.len(), variant);
            }
        }

        Command::Stage { variant } => {
            let rows = stage(pipeline, variant).await?;
            info!(%variant, rows, "stage finished");
        }

        Command::Run { force } => {
            let mut failures = 0;
            for variant in Variant::ALL {
                let report = pipeline.fetch_due(variant, today, force).await?;
                failures += report.failed.len();
                info!(%variant, fetched = report.fetched.len(), failed = report.failed.len(), "fetched");
            }
            for variant in Variant::ALL {
                match stage(pipeline.clone(), variant).await {
                    Ok(rows) => info!(%variant, rows, "staged"),
                    Err(e) => {
                        error!(%variant, "stage failed: {:#}", e);
                        failures += 1;
                    }
                }
            }
            if failures > 0 {
                bail!("{} failure(s) during run", failures);
            }
        }
    }
    Ok(())
}

/// Spreadsheet parsing and DuckDB writes are blocking.
async fn stage(pipeline: Arc<Pipeline>, variant: Variant) -> Result<usize> {
    tokio::task::spawn_blocking(move || pipeline.stage(variant))
        .await
        .context("stage task panicked")?
}
