use std::process::ExitCode;

use anyhow::Result;
use owo_colors::OwoColorize;
use schedsync_core::config::SyncConfig;

pub fn run(force: bool) -> Result<ExitCode> {
    let path = SyncConfig::config_path()?;

    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists.\n\nPass --force to overwrite it.",
            path.display()
        );
    }

    SyncConfig::write_default(&path)?;

    println!("{} {}", "Wrote".green(), path.display());
    println!();
    println!("Set the target calendar and a schedule source:");
    println!();
    println!("[calendar]");
    println!("calendar_id = \"primary\"");
    println!();
    println!("[source]");
    println!("provider = \"mtuci\"");
    println!();
    println!("Then run `schedsync plan` to preview the first sync.");

    Ok(ExitCode::SUCCESS)
}
