// ABOUTME: Command module aggregator for the skyhook CLI.
// ABOUTME: Shared plumbing runs a task on the selected targets and reports per target.

mod cleanup;
mod current;
mod deploy;
mod option;
mod rollback;

pub use cleanup::cleanup;
pub use current::current;
pub use deploy::deploy;
pub use option::option;
pub use rollback::rollback;

use skyhook::config::Config;
use skyhook::error::Result;
use skyhook::output::Output;
use skyhook::pipeline::{Pipeline, Selection};
use skyhook::releases::{LocalStorage, Storage};
use skyhook::tasks::Task;
use std::env;
use std::sync::Arc;

/// How a task is driven across targets.
#[derive(Debug, Clone, Copy, Default)]
struct RunOptions {
    /// Overrides the configured concurrency.
    concurrency: Option<usize>,
    force_lock: bool,
    /// Read-only tasks skip the deploy lock.
    read_only: bool,
}

/// Run `task` on the selected targets and return the exit code.
async fn run_task(
    config: Arc<Config>,
    selection: Selection,
    task: Task,
    options: RunOptions,
    mut output: Output,
) -> Result<i32> {
    let cwd = env::current_dir()?;
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::in_project(&cwd));

    let mut pipeline = Pipeline::new(config.clone(), storage)?.force_lock(options.force_lock);
    if options.read_only {
        pipeline = pipeline.lock(false);
    }
    if let Some(concurrency) = options.concurrency {
        pipeline = pipeline.concurrency(concurrency);
    }

    output.start_timer();
    let targets = selection.targets(&config).await?;
    output.progress(&format!(
        "Running {} for {} on {} target(s)",
        task.name,
        config.application,
        targets.len()
    ));

    let report = pipeline.run(targets, &task).await;
    for target in &report.targets {
        output.target(target);
    }
    for warning in report.diagnostics.warnings() {
        output.warning(&warning.message);
    }

    let code = report.exit_code();
    if code == 0 {
        output.success(&format!("{} complete!", capitalize(&task.name)));
    } else {
        let failed = report.targets.iter().filter(|t| !t.is_success()).count();
        output.error(&format!("{} failed on {} target(s)", task.name, failed));
    }
    Ok(code)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
