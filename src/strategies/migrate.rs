// ABOUTME: Migration strategy for Laravel applications.
// ABOUTME: Runs artisan migrate and, when enabled, the database seeders.

use async_trait::async_trait;

use super::{Capability, Strategy, require_binary};
use crate::tasks::{StepOutcome, TaskContext, TaskError};

#[derive(Debug, Clone, Copy, Default)]
pub struct Artisan;

impl Artisan {
    pub fn commands(seed: bool) -> Vec<String> {
        let mut commands = vec!["php artisan migrate --force".to_string()];
        if seed {
            commands.push("php artisan db:seed --force".to_string());
        }
        commands
    }
}

#[async_trait]
impl Strategy for Artisan {
    fn capability(&self) -> Capability {
        Capability::Migrate
    }

    fn name(&self) -> &str {
        "artisan"
    }

    fn description(&self) -> &str {
        "Migrates the database with Artisan"
    }

    fn binary(&self) -> Option<&str> {
        Some("php")
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        let migrations = &context.config.migrations;
        if !migrations.enabled {
            return Ok(StepOutcome::Skipped("migrations are disabled".to_string()));
        }

        let artisan = context.shell.current_release_path("artisan");
        if !context.shell.file_exists(&artisan).await {
            return Ok(StepOutcome::Skipped("no artisan file found".to_string()));
        }
        if let Err(missing) = require_binary(context, "php").await? {
            return Ok(missing);
        }

        let output = context
            .shell
            .run_for_current_release(Self::commands(migrations.seed))
            .await?;
        Ok(StepOutcome::from_output(&output))
    }
}
