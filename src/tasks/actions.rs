// ABOUTME: Built-in task steps for the release lifecycle and shared folder setup.
// ABOUTME: Each action is a small value implementing the Action trait.

use async_trait::async_trait;

use super::{StepOutcome, TaskContext, TaskError};
use crate::diagnostics::Warning;
use crate::releases::ReleaseErrorKind;
use crate::types::ReleaseId;

/// A built-in step.
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError>;
}

/// Create a pending release and make it the active one.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateRelease;

#[async_trait]
impl Action for CreateRelease {
    fn name(&self) -> &str {
        "create release"
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        match context.releases.create_release(&context.shell).await {
            Ok(release) => Ok(StepOutcome::note(format!("Created release {}", release))),
            Err(e) => StepOutcome::from_release_error(e),
        }
    }
}

/// Link every configured shared folder into the active release.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareFolders;

#[async_trait]
impl Action for ShareFolders {
    fn name(&self) -> &str {
        "share folders"
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        let shared = &context.config.remote.shared;
        if shared.is_empty() {
            return Ok(StepOutcome::Skipped("no shared folders".to_string()));
        }

        for folder in shared {
            match context.shell.share(folder).await? {
                Some(output) if !output.success() => return Ok(StepOutcome::from_output(&output)),
                Some(_) => {}
                None => tracing::debug!("Nothing to share at {}", folder),
            }
        }
        Ok(StepOutcome::ok())
    }
}

/// Apply the permission commands to each configured folder of the release.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetPermissions;

#[async_trait]
impl Action for SetPermissions {
    fn name(&self) -> &str {
        "set permissions"
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        let files = &context.config.remote.permissions.files;
        if files.is_empty() {
            return Ok(StepOutcome::Skipped("no folders need permissions".to_string()));
        }

        for folder in files {
            let output = context.shell.set_permissions(folder).await?;
            if !output.success() {
                return Ok(StepOutcome::from_output(&output));
            }
        }
        Ok(StepOutcome::ok())
    }
}

/// Point `current` at the active release.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromoteRelease;

#[async_trait]
impl Action for PromoteRelease {
    fn name(&self) -> &str {
        "promote release"
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        let Some(release) = context.shell.release() else {
            return Ok(StepOutcome::failed("no release was created to promote"));
        };

        match context.releases.promote(&context.shell, &release).await {
            Ok(()) => Ok(StepOutcome::note(format!("Release {} is live", release))),
            Err(e) => StepOutcome::from_release_error(e),
        }
    }
}

/// Remove releases beyond the retention count.
///
/// In best-effort mode a failure is recorded as a warning instead of halting,
/// so a deploy that already went live is not reported as failed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupReleases {
    pub best_effort: bool,
}

impl CleanupReleases {
    pub fn best_effort() -> Self {
        Self { best_effort: true }
    }
}

#[async_trait]
impl Action for CleanupReleases {
    fn name(&self) -> &str {
        "clean up releases"
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        match context.releases.cleanup(&context.shell).await {
            Ok(evicted) if evicted.is_empty() => {
                Ok(StepOutcome::Skipped("no old releases to remove".to_string()))
            }
            Ok(evicted) => Ok(StepOutcome::note(format!(
                "Removed {} old release(s)",
                evicted.len()
            ))),
            Err(e) if self.best_effort && e.kind() == ReleaseErrorKind::CommandFailed => {
                context.warn(Warning::cleanup(format!(
                    "old releases on {} were kept: {}",
                    context.target, e
                )));
                Ok(StepOutcome::Skipped("old releases were kept".to_string()))
            }
            Err(e) => StepOutcome::from_release_error(e),
        }
    }
}

/// Re-link an earlier release.
#[derive(Debug, Clone, Default)]
pub struct RollbackRelease {
    pub to: Option<ReleaseId>,
}

#[async_trait]
impl Action for RollbackRelease {
    fn name(&self) -> &str {
        "roll back"
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        match context
            .releases
            .rollback(&context.shell, self.to.clone())
            .await
        {
            Ok(release) => Ok(StepOutcome::note(format!("Rolled back to {}", release))),
            Err(e) => StepOutcome::from_release_error(e),
        }
    }
}

/// Report the release history of the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListReleases;

#[async_trait]
impl Action for ListReleases {
    fn name(&self) -> &str {
        "list releases"
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        let history = context.releases.history()?;
        if history.is_empty() {
            return Ok(StepOutcome::Skipped("no releases yet".to_string()));
        }

        let lines: Vec<String> = history
            .iter()
            .rev()
            .map(|(release, state)| format!("{} {}", release, state))
            .collect();
        Ok(StepOutcome::note(lines.join("\n")))
    }
}
