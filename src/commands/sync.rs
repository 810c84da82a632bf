use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::RunArgs;
use crate::render::{PlanRender, Render};

pub async fn run(config_path: Option<&Path>, args: RunArgs, dry_run: bool) -> Result<ExitCode> {
    let verbose = args.verbose;
    let outcome = super::run_once(config_path, args, dry_run).await?;

    println!("📅 {}", outcome.calendar_id);
    println!("{}", outcome.plan.render(verbose));

    if dry_run {
        println!("\n{}", "Dry run: nothing was written".dimmed());
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", outcome.report.render());

    if outcome.report.exit_code() == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
