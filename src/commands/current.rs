// ABOUTME: Current command implementation.
// ABOUTME: Lists the release history recorded for every selected target.

use super::{RunOptions, run_task};
use skyhook::config::Config;
use skyhook::error::Result;
use skyhook::output::Output;
use skyhook::pipeline::Selection;
use skyhook::tasks::current_task;
use std::sync::Arc;

pub async fn current(config: Config, selection: Selection, output: Output) -> Result<i32> {
    let task = current_task(&config);
    let options = RunOptions {
        read_only: true,
        ..RunOptions::default()
    };
    run_task(Arc::new(config), selection, task, options, output).await
}
