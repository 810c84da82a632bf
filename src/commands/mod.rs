pub mod init;
pub mod plan;
pub mod sync;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use schedsync_core::cancel::CancelHandle;
use schedsync_core::config::SyncConfig;
use schedsync_core::date_range::DateRange;
use schedsync_core::sync::{RunOptions, RunOutcome, SyncRun};

use crate::RunArgs;
use crate::utils::tui;

/// Load the config, wire up cancellation and run one sync.
async fn run_once(config_path: Option<&Path>, args: RunArgs, dry_run: bool) -> Result<RunOutcome> {
    let config = SyncConfig::load(config_path)?;
    let range = DateRange::from_args(
        args.from.as_deref(),
        args.to.as_deref(),
        config.scraping.window_days,
    )?;

    let run = SyncRun::from_config(config)?;
    let query = run.query(args.group, args.building, Some(range));

    let cancel = CancelHandle::new();
    watch_ctrl_c(cancel.clone());
    if let Some(secs) = args.timeout {
        cancel_after(cancel.clone(), Duration::from_secs(secs));
    }

    let spinner = tui::create_spinner(format!("Syncing {} ({})", query.group, query.range));
    let outcome = run.run(&query, RunOptions { dry_run }, &cancel.token()).await;
    spinner.finish_and_clear();

    Ok(outcome?)
}

fn watch_ctrl_c(cancel: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, waiting for in-flight operations");
            cancel.cancel();
        }
    });
}

fn cancel_after(cancel: CancelHandle, timeout: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        tracing::warn!(timeout_secs = timeout.as_secs(), "Run timed out, cancelling");
        cancel.cancel();
    });
}
