// ABOUTME: Rollback command implementation.
// ABOUTME: Re-links the previous (or a named) release without rebuilding it.

use super::{RunOptions, run_task};
use skyhook::config::Config;
use skyhook::error::Result;
use skyhook::output::Output;
use skyhook::pipeline::Selection;
use skyhook::tasks::rollback_task;
use skyhook::types::ReleaseId;
use std::sync::Arc;

pub async fn rollback(
    config: Config,
    selection: Selection,
    release: Option<&str>,
    force_lock: bool,
    output: Output,
) -> Result<i32> {
    let release = release.map(ReleaseId::parse).transpose()?;
    let task = rollback_task(&config, release);
    let options = RunOptions {
        force_lock,
        ..RunOptions::default()
    };
    run_task(Arc::new(config), selection, task, options, output).await
}
