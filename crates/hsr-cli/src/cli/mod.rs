//! CLI for the HSR stats downloader and reconciler.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hsr_core::config;
use hsr_core::store::StatsDb;

use commands::{run_fetch, run_health, run_status, run_validate};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "hsr")]
#[command(about = "HSR: multi-source stats downloader and reconciler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a season from every source and reconcile it.
    Fetch {
        /// Season identifier, year-pair encoded (e.g. 20232024).
        #[arg(long)]
        season: i64,
        /// Restrict the pass to these sources (api, events, shifts, standings).
        #[arg(long = "source", value_name = "NAME")]
        sources: Vec<String>,
        /// Re-fetch items that are already satisfied.
        #[arg(long)]
        force: bool,
    },

    /// Show per-source download progress for a season.
    Status {
        /// Season identifier.
        #[arg(long)]
        season: i64,
    },

    /// Reconcile stored data and report discrepancies. Exits 0 when the run
    /// completes, whatever the rules found; non-zero only on operational
    /// failure.
    Validate {
        /// Season identifier.
        #[arg(long)]
        season: i64,
        /// Validate a single game instead of the whole season.
        #[arg(long)]
        game: Option<i64>,
        /// Write a text report alongside the console output.
        #[arg(long)]
        report: bool,
        /// Directory for the report (defaults to the configured report dir,
        /// then the current directory).
        #[arg(long, value_name = "DIR")]
        output_dir: Option<String>,
    },

    /// Probe each source's reachability.
    Health,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let db = StatsDb::open_default().await?;

        match cli.command {
            CliCommand::Fetch {
                season,
                sources,
                force,
            } => run_fetch(&db, &cfg, season, &sources, force).await?,
            CliCommand::Status { season } => run_status(&db, season).await?,
            CliCommand::Validate {
                season,
                game,
                report,
                output_dir,
            } => run_validate(&db, &cfg, season, game, report, output_dir.as_deref()).await?,
            CliCommand::Health => run_health(&db, &cfg).await?,
        }

        Ok(())
    }
}
