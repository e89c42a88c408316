// ABOUTME: Deploy strategies: how the application's code gets into a new release.
// ABOUTME: Clone checks out fresh; Copy reuses the current release and updates it.

use async_trait::async_trait;

use super::scm::{checkout, update};
use super::{Capability, Strategy};
use crate::tasks::{StepOutcome, TaskContext, TaskError};

/// Fresh checkout into the new release.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneDeploy;

#[async_trait]
impl Strategy for CloneDeploy {
    fn capability(&self) -> Capability {
        Capability::Deploy
    }

    fn name(&self) -> &str {
        "clone"
    }

    fn description(&self) -> &str {
        "Clones a fresh instance of the repository"
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        let scm = context.registry.scm()?;
        let destination = context.shell.current_release_path("");
        checkout(context, scm.as_ref(), &destination).await
    }
}

/// Copy the current release, then update it. Falls back to a clone when
/// there is nothing to copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyDeploy;

#[async_trait]
impl Strategy for CopyDeploy {
    fn capability(&self) -> Capability {
        Capability::Deploy
    }

    fn name(&self) -> &str {
        "copy"
    }

    fn description(&self) -> &str {
        "Copies the previously cloned instance and updates it"
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        let scm = context.registry.scm()?;
        let destination = context.shell.current_release_path("");

        let previous = context
            .releases
            .current_release()?
            .filter(|release| Some(release) != context.shell.release().as_ref())
            .map(|release| context.shell.paths().release_folder(&release));

        let Some(previous) = previous else {
            tracing::info!("No previous release to copy, cloning instead");
            return checkout(context, scm.as_ref(), &destination).await;
        };

        let copied = context
            .shell
            .copy(&format!("{}/.", previous), &destination)
            .await?;
        match copied {
            None => {
                tracing::info!("{} is missing, cloning instead", previous);
                checkout(context, scm.as_ref(), &destination).await
            }
            Some(output) if !output.success() => Ok(StepOutcome::from_output(&output)),
            Some(_) => update(context, scm.as_ref()).await,
        }
    }
}
