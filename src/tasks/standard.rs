// ABOUTME: The built-in tasks: deploy, rollback, cleanup, current.
// ABOUTME: Hook commands from the config run as before/after tasks around them.

use super::{
    CleanupReleases, CreateRelease, ListReleases, PromoteRelease, RollbackRelease, SetPermissions,
    ShareFolders, Task,
};
use crate::config::Config;
use crate::strategies::Capability;
use crate::types::ReleaseId;

/// Build a new release, link it as current, then prune old releases.
pub fn deploy_task(config: &Config) -> Task {
    let mut task = Task::new("deploy", "Deploys a new release")
        .action(CreateRelease)
        .strategy(Capability::Deploy)
        .action(ShareFolders);

    if config.strategies.dependencies.is_some() {
        task = task.strategy(Capability::Dependencies);
    }
    task = task.action(SetPermissions);
    if config.migrations.enabled {
        task = task.strategy(Capability::Migrate);
    }

    let task = task
        .action(PromoteRelease)
        .action(CleanupReleases::best_effort());
    with_hooks(task, config)
}

pub fn rollback_task(config: &Config, to: Option<ReleaseId>) -> Task {
    let task =
        Task::new("rollback", "Rolls back to a previous release").action(RollbackRelease { to });
    with_hooks(task, config)
}

pub fn cleanup_task(config: &Config) -> Task {
    let task = Task::new("cleanup", "Removes releases beyond the retention count")
        .action(CleanupReleases::default());
    with_hooks(task, config)
}

pub fn current_task(config: &Config) -> Task {
    let task = Task::new("current", "Shows the release history").action(ListReleases);
    with_hooks(task, config)
}

/// Wrap `task` with the hook commands configured for its name.
///
/// Before-hooks run from the login folder; after-hooks run inside the
/// release that was just built or linked.
fn with_hooks(mut task: Task, config: &Config) -> Task {
    if let Some(commands) = config.hooks.before.get(&task.name) {
        let hook = commands.iter().fold(
            Task::new(format!("before {}", task.name), "Runs before hooks"),
            |hook, command| hook.run(command),
        );
        task = task.before(hook);
    }

    if let Some(commands) = config.hooks.after.get(&task.name) {
        let hook = commands.iter().fold(
            Task::new(format!("after {}", task.name), "Runs after hooks"),
            |hook, command| hook.run_in_release(command),
        );
        task = task.after(hook);
    }

    task
}
