// ABOUTME: Source control strategies. Git is the only one provided.
// ABOUTME: Command lists are built as values so they can be checked without a target.

use async_trait::async_trait;

use super::{Capability, Strategy, require_binary};
use crate::config::RepositoryConfig;
use crate::tasks::{StepOutcome, TaskContext, TaskError};

/// Source control commands a deploy strategy needs.
pub trait Scm: Strategy {
    /// Clone `repository` into `destination`.
    fn checkout_commands(
        &self,
        repository: &RepositoryConfig,
        destination: &str,
    ) -> Result<Vec<String>, TaskError>;

    /// Bring an existing checkout up to date. Runs inside the checkout.
    fn update_commands(&self, repository: &RepositoryConfig) -> Vec<String>;

    /// Fetch submodules. Runs inside the checkout.
    fn submodule_commands(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Git;

impl Scm for Git {
    fn checkout_commands(
        &self,
        repository: &RepositoryConfig,
        destination: &str,
    ) -> Result<Vec<String>, TaskError> {
        let url = repository
            .authenticated_url()
            .map_err(|e| TaskError::Config(e.to_string()))?;

        let mut clone = format!(
            "git clone \"{}\" \"{}\" --branch=\"{}\"",
            url, destination, repository.branch
        );
        if repository.shallow {
            clone.push_str(" --depth=\"1\"");
        }
        if repository.submodules {
            clone.push_str(" --recursive");
        }
        Ok(vec![clone])
    }

    fn update_commands(&self, repository: &RepositoryConfig) -> Vec<String> {
        let mut commands = vec!["git reset --hard".to_string(), "git pull".to_string()];
        if repository.submodules {
            commands.extend(self.submodule_commands());
        }
        commands
    }

    fn submodule_commands(&self) -> Vec<String> {
        vec!["git submodule update --init --recursive".to_string()]
    }
}

#[async_trait]
impl Strategy for Git {
    fn capability(&self) -> Capability {
        Capability::Scm
    }

    fn name(&self) -> &str {
        "git"
    }

    fn description(&self) -> &str {
        "Clones the repository with Git"
    }

    fn binary(&self) -> Option<&str> {
        Some("git")
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        let destination = context.shell.current_release_path("");
        checkout(context, self, &destination).await
    }
}

fn repository(context: &TaskContext) -> Result<&RepositoryConfig, TaskError> {
    context
        .config
        .repository
        .as_ref()
        .ok_or_else(|| TaskError::Config("no repository is configured".to_string()))
}

async fn ensure_binary(
    context: &TaskContext,
    scm: &dyn Scm,
) -> Result<Option<StepOutcome>, TaskError> {
    if let Some(binary) = scm.binary()
        && let Err(missing) = require_binary(context, binary).await?
    {
        return Ok(Some(missing));
    }
    Ok(None)
}

/// Check out the configured repository into `destination`.
pub async fn checkout(
    context: &TaskContext,
    scm: &dyn Scm,
    destination: &str,
) -> Result<StepOutcome, TaskError> {
    let repository = repository(context)?;
    if let Some(missing) = ensure_binary(context, scm).await? {
        return Ok(missing);
    }

    tracing::info!("Cloning {} ({})", repository.url, repository.branch);
    let output = context
        .shell
        .run(scm.checkout_commands(repository, destination)?)
        .await?;
    Ok(StepOutcome::from_output(&output))
}

/// Update the checkout in the active release.
pub async fn update(context: &TaskContext, scm: &dyn Scm) -> Result<StepOutcome, TaskError> {
    let repository = repository(context)?;
    if let Some(missing) = ensure_binary(context, scm).await? {
        return Ok(missing);
    }

    let output = context
        .shell
        .run_for_current_release(scm.update_commands(repository))
        .await?;
    Ok(StepOutcome::from_output(&output))
}
