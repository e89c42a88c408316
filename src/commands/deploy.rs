// ABOUTME: Deploy command implementation.
// ABOUTME: Builds a release on every selected target and promotes it.

use super::{RunOptions, run_task};
use skyhook::config::Config;
use skyhook::error::Result;
use skyhook::output::Output;
use skyhook::pipeline::Selection;
use skyhook::tasks::deploy_task;
use std::sync::Arc;

pub async fn deploy(
    config: Config,
    selection: Selection,
    parallel: Option<usize>,
    force_lock: bool,
    output: Output,
) -> Result<i32> {
    let task = deploy_task(&config);
    let options = RunOptions {
        concurrency: parallel,
        force_lock,
        read_only: false,
    };
    run_task(Arc::new(config), selection, task, options, output).await
}
