// ABOUTME: Dependency installers for the common package ecosystems.
// ABOUTME: Each package manager is a value; Polyglot runs every one whose manifest exists.

use async_trait::async_trait;

use super::{Capability, Strategy, require_binary};
use crate::tasks::{StepOutcome, TaskContext, TaskError};

/// A package manager: its binary, the manifest that signals it is used,
/// and the arguments that install dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageManager {
    pub name: &'static str,
    pub binary: &'static str,
    pub manifest: &'static str,
    pub install: &'static str,
    pub description: &'static str,
}

impl PackageManager {
    pub const NPM: PackageManager = PackageManager {
        name: "npm",
        binary: "npm",
        manifest: "package.json",
        install: "install",
        description: "Installs dependencies with NPM",
    };

    pub const YARN: PackageManager = PackageManager {
        name: "yarn",
        binary: "yarn",
        manifest: "yarn.lock",
        install: "install",
        description: "Installs dependencies with Yarn",
    };

    pub const COMPOSER: PackageManager = PackageManager {
        name: "composer",
        binary: "composer",
        manifest: "composer.json",
        install: "install --no-interaction --no-dev --prefer-dist",
        description: "Installs dependencies with Composer",
    };

    pub const BUNDLER: PackageManager = PackageManager {
        name: "bundler",
        binary: "bundle",
        manifest: "Gemfile",
        install: "install",
        description: "Installs dependencies with Bundler",
    };

    pub const BOWER: PackageManager = PackageManager {
        name: "bower",
        binary: "bower",
        manifest: "bower.json",
        install: "install --allow-root",
        description: "Installs dependencies with Bower",
    };

    pub const ALL: [PackageManager; 5] = [
        PackageManager::BUNDLER,
        PackageManager::COMPOSER,
        PackageManager::YARN,
        PackageManager::NPM,
        PackageManager::BOWER,
    ];

    pub fn named(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|manager| manager.name == name)
    }

    pub fn install_command(&self) -> String {
        format!("{} {}", self.binary, self.install)
    }

    /// Whether the active release uses this package manager.
    async fn is_used(&self, context: &TaskContext) -> bool {
        let manifest = context.shell.current_release_path(self.manifest);
        context.shell.file_exists(&manifest).await
    }

    async fn install(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        if !self.is_used(context).await {
            return Ok(StepOutcome::Skipped(format!("no {} found", self.manifest)));
        }
        if let Err(missing) = require_binary(context, self.binary).await? {
            return Ok(missing);
        }

        tracing::info!("{}", self.description);
        let output = context
            .shell
            .run_for_current_release(self.install_command())
            .await?;
        Ok(StepOutcome::from_output(&output))
    }
}

#[async_trait]
impl Strategy for PackageManager {
    fn capability(&self) -> Capability {
        Capability::Dependencies
    }

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn binary(&self) -> Option<&str> {
        Some(self.binary)
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        self.install(context).await
    }
}

/// Runs every package manager the release uses. Yarn replaces npm when a
/// `yarn.lock` is present.
#[derive(Debug, Clone)]
pub struct Polyglot {
    managers: Vec<PackageManager>,
}

impl Default for Polyglot {
    fn default() -> Self {
        Self {
            managers: PackageManager::ALL.to_vec(),
        }
    }
}

#[async_trait]
impl Strategy for Polyglot {
    fn capability(&self) -> Capability {
        Capability::Dependencies
    }

    fn name(&self) -> &str {
        "polyglot"
    }

    fn description(&self) -> &str {
        "Installs dependencies with every package manager the application uses"
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        let mut installed = Vec::new();

        for manager in &self.managers {
            if *manager == PackageManager::NPM && installed.contains(&PackageManager::YARN.name) {
                continue;
            }
            match manager.install(context).await? {
                StepOutcome::Skipped(_) => {}
                StepOutcome::Failed(failure) => return Ok(StepOutcome::Failed(failure)),
                StepOutcome::Succeeded(_) => installed.push(manager.name),
            }
        }

        if installed.is_empty() {
            return Ok(StepOutcome::Skipped(
                "no dependency manifests found".to_string(),
            ));
        }
        Ok(StepOutcome::note(format!(
            "Installed dependencies with {}",
            installed.join(", ")
        )))
    }
}
