// ABOUTME: Everything a task needs on one target: shell, releases, strategies, config.
// ABOUTME: Built once per target from explicit collaborators; nothing is looked up globally.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::paths::Paths;
use crate::pipeline::Target;
use crate::releases::{ReleasesManager, Storage};
use crate::shell::Shell;
use crate::strategies::StrategyRegistry;

pub struct TaskContext {
    pub target: Target,
    pub shell: Shell,
    pub releases: ReleasesManager,
    pub registry: Arc<StrategyRegistry>,
    pub config: Arc<Config>,
    diagnostics: Mutex<Diagnostics>,
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("target", &self.target)
            .field("shell", &self.shell)
            .finish()
    }
}

impl TaskContext {
    pub fn new(
        target: Target,
        config: Arc<Config>,
        registry: Arc<StrategyRegistry>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let paths = Paths::new(&config.root_directory, config.application.clone())
            .stage(target.stage());

        let mut shell = Shell::new(target.connection().clone(), paths)
            .normalizer(config.normalizer(target.stage()))
            .symlink_mode(config.remote.symlink)
            .atomic_symlinks(config.remote.atomic_symlinks);
        if let Some(callback) = config.permissions_callback() {
            shell = shell.permissions(callback);
        }

        let releases = ReleasesManager::new(storage, target.key(), config.keep_releases);

        Self {
            target,
            shell,
            releases,
            registry,
            config,
            diagnostics: Mutex::new(Diagnostics::default()),
        }
    }

    /// Record a non-fatal warning for this target.
    pub fn warn(&self, warning: Warning) {
        self.diagnostics.lock().warn(warning);
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.diagnostics.into_inner().into_warnings()
    }
}
