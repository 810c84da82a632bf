mod commands;
mod render;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

/// Exit status for runs that stopped before anything was reconciled.
const EXIT_ABORTED: u8 = 2;

#[derive(Parser)]
#[command(name = "schedsync")]
#[command(about = "Mirror a university class schedule into a Google Calendar")]
struct Cli {
    /// Extra config file, layered over ~/.config/schedsync/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log JSON lines to stderr instead of text
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the schedule and apply the changes to the calendar
    Sync {
        #[command(flatten)]
        run: RunArgs,

        /// Show the plan without writing to the calendar
        #[arg(long)]
        dry_run: bool,
    },
    /// Show what a sync would change
    Plan {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Write a config file holding every default
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Student group (defaults to scraping.default_group)
    #[arg(short, long)]
    pub group: Option<String>,

    /// Default building for bare room numbers
    #[arg(short, long)]
    pub building: Option<String>,

    /// First day to sync (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub from: Option<String>,

    /// Last day to sync, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Cancel the run after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// List every operation instead of per-kind counts
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(EXIT_ABORTED)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Sync { run, dry_run } => commands::sync::run(cli.config.as_deref(), run, dry_run).await,
        Commands::Plan { run } => commands::plan::run(cli.config.as_deref(), run).await,
        Commands::Init { force } => commands::init::run(force),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}
