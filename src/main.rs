//! httplogging - endpoint availability logger
//!
//! Probes the regObs API, the grid time-series service and the chart server,
//! records every probe in SQLite and optionally renders the recent history.
//! Meant to be started by an external scheduler, one job at a time.

mod config;
mod db;
mod jobs;
mod probe;
mod report;
#[cfg(test)]
mod testutil;

use clap::{Parser, Subcommand};
use config::Config;
use db::Store;
use jobs::{OutputOptions, SeriesJob, StatusJob};

use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "httplogging")]
#[command(about = "Probe NVE endpoints and log status, response time and payload")]
struct Args {
    #[command(subcommand)]
    job: Job,

    /// Write the recent history to <output-dir>/<job>.log
    #[arg(long, global = true)]
    write_to_file: bool,

    /// Render the recent history to <output-dir>/<job>.svg
    #[arg(long, global = true)]
    make_plot: bool,

    /// SQLite database file (overrides HTTPLOGGING_DB_PATH)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Directory for log files and charts (overrides HTTPLOGGING_OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Job {
    /// regObs KDV elements
    Kdvelements,
    /// regObs observations within radius
    Observations,
    /// Grid time-series service
    Gts {
        /// Parameter code; repeatable (default: sdfsw, tm, sd)
        #[arg(long = "parameter")]
        parameters: Vec<String>,
    },
    /// Chart server
    Chartserver {
        /// Parameter code; repeatable (default: sdfsw, tm, sd)
        #[arg(long = "parameter")]
        parameters: Vec<String>,
    },
    /// Every job above, one after the other
    All,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("httplogging=info".parse()?))
        .init();

    let args = Args::parse();

    // Load configuration
    let mut cfg = Config::load();
    if let Some(db_path) = args.db_path {
        cfg.db_path = db_path;
    }
    if let Some(output_dir) = args.output_dir {
        cfg.output_dir = output_dir;
    }
    tracing::info!("Using database at {}", cfg.db_path.display());

    let store = Store::new(&cfg.db_path)?;

    let opts = OutputOptions {
        write_to_file: args.write_to_file,
        make_plot: args.make_plot,
    };

    match args.job {
        Job::Kdvelements => {
            StatusJob::kdvelements(&cfg)
                .run(&cfg, &store, opts)
                .await?
        }
        Job::Observations => {
            StatusJob::observations_within_radius(&cfg)
                .run(&cfg, &store, opts)
                .await?
        }
        Job::Gts { parameters } => {
            SeriesJob::gts(&cfg, parameters)
                .run(&cfg, &store, opts)
                .await?
        }
        Job::Chartserver { parameters } => {
            SeriesJob::chartserver(&cfg, parameters)
                .run(&cfg, &store, opts)
                .await?
        }
        Job::All => {
            StatusJob::kdvelements(&cfg).run(&cfg, &store, opts).await?;
            StatusJob::observations_within_radius(&cfg)
                .run(&cfg, &store, opts)
                .await?;
            SeriesJob::gts(&cfg, Vec::new()).run(&cfg, &store, opts).await?;
            SeriesJob::chartserver(&cfg, Vec::new())
                .run(&cfg, &store, opts)
                .await?;
        }
    }

    Ok(())
}
