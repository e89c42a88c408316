// ABOUTME: Tasks: named, ordered, haltable step sequences run against one target.
// ABOUTME: Steps are commands, strategy invocations, built-in actions, or nested tasks.

mod actions;
mod context;
mod standard;

pub use actions::{
    Action, CleanupReleases, CreateRelease, ListReleases, PromoteRelease, RollbackRelease,
    SetPermissions, ShareFolders,
};
pub use context::TaskContext;
pub use standard::{cleanup_task, current_task, deploy_task, rollback_task};

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::releases::{ReleaseError, ReleaseErrorKind};
use crate::shell::{CommandInput, RunOutput};
use crate::strategies::{Capability, StrategyError};

/// Errors that stop a target outright instead of halting a task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Connection(#[from] crate::connection::Error),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TaskError {
    pub fn is_config_error(&self) -> bool {
        matches!(self, TaskError::Strategy(_) | TaskError::Config(_))
    }
}

/// Why a step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// The command that failed, when one ran.
    pub command: Option<String>,
    /// Diagnostic text from the target.
    pub message: String,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            command: None,
            message: message.into(),
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.command {
            Some(command) => write!(f, "`{}` failed: {}", command, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step did its work. Carries an optional line for the user.
    Succeeded(Option<String>),
    /// Nothing to do; counts as success.
    Skipped(String),
    Failed(Failure),
}

impl StepOutcome {
    pub fn ok() -> Self {
        StepOutcome::Succeeded(None)
    }

    pub fn note(note: impl Into<String>) -> Self {
        StepOutcome::Succeeded(Some(note.into()))
    }

    pub fn failed(message: impl Into<String>) -> Self {
        StepOutcome::Failed(Failure::new(message))
    }

    /// Success or failure of a command, with its diagnostic text.
    pub fn from_output(output: &RunOutput) -> Self {
        if output.success() {
            return StepOutcome::ok();
        }

        let message = match output.error_text() {
            "" => format!("exited with status {}", output.exit_code),
            text => text.to_string(),
        };
        StepOutcome::Failed(Failure::new(message).with_command(output.command.clone()))
    }

    /// Release errors that come from the target become step failures;
    /// transport and storage errors stop the target.
    pub fn from_release_error(error: ReleaseError) -> Result<Self, TaskError> {
        match error.kind() {
            ReleaseErrorKind::Transport | ReleaseErrorKind::Storage => Err(error.into()),
            _ => {
                let mut failure = Failure::new(error.to_string());
                failure.command = error.command().map(str::to_string);
                Ok(StepOutcome::Failed(failure))
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// One entry of a task's step list.
#[derive(Clone)]
pub enum Step {
    /// Commands run from the login folder.
    Run(CommandInput),
    /// Commands run from inside the active release.
    RunInRelease(CommandInput),
    /// Whatever strategy is configured for a capability.
    Strategy(Capability),
    Action(Arc<dyn Action>),
    Task(Task),
}

impl Step {
    fn label(&self) -> String {
        match self {
            Step::Run(commands) | Step::RunInRelease(commands) => {
                commands.clone().flatten().join(" && ")
            }
            Step::Strategy(capability) => format!("{} strategy", capability),
            Step::Action(action) => action.name().to_string(),
            Step::Task(task) => task.name.clone(),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Run(_) => write!(f, "Run({})", self.label()),
            Step::RunInRelease(_) => write!(f, "RunInRelease({})", self.label()),
            Step::Strategy(capability) => write!(f, "Strategy({})", capability),
            Step::Action(action) => write!(f, "Action({})", action.name()),
            Step::Task(task) => write!(f, "Task({})", task.name),
        }
    }
}

/// What happened to a step during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded(Option<String>),
    /// Ran, had nothing to do.
    NothingToDo(String),
    Failed(Failure),
    /// Not run because the task halted earlier.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub task: String,
    pub step: String,
    pub status: StepStatus,
}

/// Final state of a task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Halted {
        task: String,
        step: String,
        failure: Failure,
    },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Every step record of a run, in execution order, plus the outcome.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: String,
    pub records: Vec<StepRecord>,
    pub outcome: TaskOutcome,
}

impl TaskReport {
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.records
            .iter()
            .filter(|record| matches!(record.status, StepStatus::Failed(_)))
    }

    pub fn skipped_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.records
            .iter()
            .filter(|record| record.status == StepStatus::Skipped)
    }

    /// Lines steps asked to show the user.
    pub fn notes(&self) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(|record| match &record.status {
            StepStatus::Succeeded(Some(note)) => Some(note.as_str()),
            _ => None,
        })
    }
}

/// A named sequence of steps with optional before and after tasks.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub description: String,
    steps: Vec<Step>,
    before: Vec<Task>,
    after: Vec<Task>,
    local: bool,
}

impl Task {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            steps: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            local: false,
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn run(self, commands: impl Into<CommandInput>) -> Self {
        self.step(Step::Run(commands.into()))
    }

    pub fn run_in_release(self, commands: impl Into<CommandInput>) -> Self {
        self.step(Step::RunInRelease(commands.into()))
    }

    pub fn strategy(self, capability: Capability) -> Self {
        self.step(Step::Strategy(capability))
    }

    pub fn action(self, action: impl Action + 'static) -> Self {
        self.step(Step::Action(Arc::new(action)))
    }

    pub fn task(self, task: Task) -> Self {
        self.step(Step::Task(task))
    }

    /// Run `task` before this one.
    pub fn before(mut self, task: Task) -> Self {
        self.before.push(task);
        self
    }

    /// Run `task` after this one, unless it halts.
    pub fn after(mut self, task: Task) -> Self {
        self.after.push(task);
        self
    }

    /// Route every step through the local shell.
    pub fn local(mut self, local: bool) -> Self {
        self.local = local;
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    /// Run the task on the context's target.
    ///
    /// A failed step halts the task: later steps and after-tasks are
    /// recorded as skipped. `Err` is reserved for configuration and
    /// transport errors.
    pub async fn execute(&self, context: &TaskContext) -> Result<TaskReport, TaskError> {
        let mut records = Vec::new();
        let outcome = self.execute_into(context, &mut records).await?;
        Ok(TaskReport {
            task: self.name.clone(),
            records,
            outcome,
        })
    }

    fn execute_into<'a>(
        &'a self,
        context: &'a TaskContext,
        records: &'a mut Vec<StepRecord>,
    ) -> BoxFuture<'a, Result<TaskOutcome, TaskError>> {
        Box::pin(async move {
            let was_local = context.shell.is_local();
            if self.local {
                context.shell.set_local(true);
            }
            let result = self.run_phases(context, records).await;
            context.shell.set_local(was_local);
            result
        })
    }

    async fn run_phases(
        &self,
        context: &TaskContext,
        records: &mut Vec<StepRecord>,
    ) -> Result<TaskOutcome, TaskError> {
        tracing::info!(task = %self.name, host = context.target.host(), "{}", self.description);

        let mut halted = None;
        for before in &self.before {
            let outcome = before.execute_into(context, records).await?;
            if !outcome.is_success() {
                halted = Some(outcome);
                break;
            }
        }

        for step in &self.steps {
            if halted.is_some() {
                self.record(records, step.label(), StepStatus::Skipped);
                continue;
            }

            let outcome = match step {
                Step::Task(task) => match task.execute_into(context, records).await? {
                    TaskOutcome::Success => StepOutcome::ok(),
                    TaskOutcome::Halted { failure, .. } => StepOutcome::Failed(failure),
                },
                _ => self.run_step(step, context).await?,
            };

            let status = match outcome {
                StepOutcome::Succeeded(note) => StepStatus::Succeeded(note),
                StepOutcome::Skipped(reason) => {
                    tracing::info!(task = %self.name, "{}: {}", step.label(), reason);
                    StepStatus::NothingToDo(reason)
                }
                StepOutcome::Failed(failure) => {
                    tracing::warn!(task = %self.name, host = context.target.host(), "{}", failure);
                    halted = Some(TaskOutcome::Halted {
                        task: self.name.clone(),
                        step: step.label(),
                        failure: failure.clone(),
                    });
                    StepStatus::Failed(failure)
                }
            };
            self.record(records, step.label(), status);
        }

        if let Some(outcome) = halted {
            for after in &self.after {
                self.record(records, after.name.clone(), StepStatus::Skipped);
            }
            return Ok(outcome);
        }

        for after in &self.after {
            let outcome = after.execute_into(context, records).await?;
            if !outcome.is_success() {
                return Ok(outcome);
            }
        }

        Ok(TaskOutcome::Success)
    }

    async fn run_step(&self, step: &Step, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        match step {
            Step::Run(commands) => {
                let output = context.shell.run(commands.clone()).await?;
                Ok(StepOutcome::from_output(&output))
            }
            Step::RunInRelease(commands) => {
                let output = context
                    .shell
                    .run_for_current_release(commands.clone())
                    .await?;
                Ok(StepOutcome::from_output(&output))
            }
            Step::Strategy(capability) => {
                let strategy = context.registry.resolve(*capability)?;
                tracing::info!(
                    task = %self.name,
                    "{} ({})",
                    strategy.description(),
                    strategy.name()
                );
                strategy.execute(context).await
            }
            Step::Action(action) => action.execute(context).await,
            Step::Task(_) => Ok(StepOutcome::ok()),
        }
    }

    fn record(&self, records: &mut Vec<StepRecord>, step: String, status: StepStatus) {
        records.push(StepRecord {
            task: self.name.clone(),
            step,
            status,
        });
    }
}
