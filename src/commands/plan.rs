use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use crate::RunArgs;

pub async fn run(config_path: Option<&Path>, args: RunArgs) -> Result<ExitCode> {
    super::sync::run(config_path, args, true).await
}
