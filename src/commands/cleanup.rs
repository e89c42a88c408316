// ABOUTME: Cleanup command implementation.
// ABOUTME: Removes releases beyond the retention count on every selected target.

use super::{RunOptions, run_task};
use skyhook::config::Config;
use skyhook::error::Result;
use skyhook::output::Output;
use skyhook::pipeline::Selection;
use skyhook::tasks::cleanup_task;
use std::sync::Arc;

pub async fn cleanup(config: Config, selection: Selection, output: Output) -> Result<i32> {
    let task = cleanup_task(&config);
    run_task(Arc::new(config), selection, task, RunOptions::default(), output).await
}
