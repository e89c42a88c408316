// ABOUTME: Runs a task on many targets, sequentially or with bounded parallelism.
// ABOUTME: Targets are independent: one halting never stops the others.

mod target;

pub use target::{PlannedTarget, Selection, Target, connect};

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::config::Config;
use crate::connection::Connection;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Error;
use crate::releases::{DeployLock, Storage};
use crate::strategies::{StrategyError, StrategyRegistry};
use crate::tasks::{Task, TaskContext, TaskOutcome, TaskReport};

/// What happened on one target.
#[derive(Debug)]
pub struct TargetReport {
    pub target: String,
    pub result: Result<TaskReport, Error>,
}

impl TargetReport {
    pub fn is_success(&self) -> bool {
        matches!(&self.result, Ok(report) if report.outcome.is_success())
    }
}

/// Results of a run, in target order.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub targets: Vec<TargetReport>,
    pub diagnostics: Diagnostics,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.targets.iter().all(TargetReport::is_success)
    }

    /// 0 when every target succeeded, 2 when any target hit a configuration
    /// error, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        let config_error = self
            .targets
            .iter()
            .any(|target| matches!(&target.result, Err(e) if e.is_config_error()));
        if config_error {
            2
        } else if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Drives a task across targets.
pub struct Pipeline {
    config: Arc<Config>,
    registry: Arc<StrategyRegistry>,
    storage: Arc<dyn Storage>,
    concurrency: usize,
    lock: bool,
    force_lock: bool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("application", &self.config.application)
            .field("registry", &self.registry)
            .field("concurrency", &self.concurrency)
            .field("lock", &self.lock)
            .finish()
    }
}

impl Pipeline {
    /// Pipeline with the strategies, concurrency and locking from `config`.
    pub fn new(config: Arc<Config>, storage: Arc<dyn Storage>) -> Result<Self, StrategyError> {
        let registry = StrategyRegistry::from_config(&config.strategies)?;
        Ok(Self {
            concurrency: config.concurrency,
            lock: config.lock,
            config,
            registry: Arc::new(registry),
            storage,
            force_lock: false,
        })
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Number of targets run at once.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Hold the deploy lock on each target while the task runs.
    pub fn lock(mut self, lock: bool) -> Self {
        self.lock = lock;
        self
    }

    /// Break existing deploy locks.
    pub fn force_lock(mut self, force: bool) -> Self {
        self.force_lock = force;
        self
    }

    /// Run `task` on every target and close their connections. Unreachable
    /// targets are reported as failed without running anything.
    pub async fn run<I>(&self, targets: I, task: &Task) -> PipelineReport
    where
        I: IntoIterator,
        I::Item: Into<PlannedTarget>,
    {
        let targets: Vec<PlannedTarget> = targets.into_iter().map(Into::into).collect();
        let connections = unique_connections(&targets);

        let mut results: Vec<(usize, TargetReport, Vec<Warning>)> =
            stream::iter(targets.into_iter().enumerate())
                .map(|(index, planned)| async move {
                    let (report, warnings) = match planned {
                        PlannedTarget::Ready(target) => self.run_target(target, task).await,
                        PlannedTarget::Unreachable { target, error } => {
                            let report = TargetReport {
                                target,
                                result: Err(error),
                            };
                            (report, Vec::new())
                        }
                    };
                    (index, report, warnings)
                })
                .buffer_unordered(self.concurrency.max(1))
                .collect()
                .await;
        results.sort_by_key(|(index, _, _)| *index);

        let mut report = PipelineReport::default();
        for (_, target, warnings) in results {
            report.diagnostics.extend(warnings);
            report.targets.push(target);
        }

        for connection in connections {
            if let Err(e) = connection.disconnect().await {
                report.diagnostics.warn(Warning::disconnect(format!(
                    "disconnect from {} failed: {}",
                    connection.host(),
                    e
                )));
            }
        }

        report
    }

    async fn run_target(&self, target: Target, task: &Task) -> (TargetReport, Vec<Warning>) {
        let label = target.to_string();
        let context = TaskContext::new(
            target,
            self.config.clone(),
            self.registry.clone(),
            self.storage.clone(),
        );

        tracing::info!(host = %label, "Running {}", task.name);
        let result = if self.lock {
            self.run_locked(&context, task).await
        } else {
            task.execute(&context).await.map_err(Error::from)
        };

        match &result {
            Ok(report) => match &report.outcome {
                TaskOutcome::Success => tracing::info!(host = %label, "{} finished", task.name),
                TaskOutcome::Halted { step, .. } => {
                    tracing::warn!(host = %label, "{} halted at {}", task.name, step)
                }
            },
            Err(e) => tracing::error!(host = %label, "{} failed: {}", task.name, e),
        }

        let report = TargetReport {
            target: label,
            result,
        };
        (report, context.into_warnings())
    }

    async fn run_locked(&self, context: &TaskContext, task: &Task) -> Result<TaskReport, Error> {
        let lock = DeployLock::acquire(&context.shell, self.force_lock).await?;
        let result = task.execute(context).await;

        let path = lock.path().to_string();
        if let Err(e) = lock.release().await {
            context.warn(Warning::lock_release(format!(
                "lock {} on {} may remain: {}",
                path, context.target, e
            )));
        }

        Ok(result?)
    }
}

fn unique_connections(targets: &[PlannedTarget]) -> Vec<Arc<dyn Connection>> {
    let mut connections: Vec<Arc<dyn Connection>> = Vec::new();
    let ready = targets.iter().filter_map(|planned| match planned {
        PlannedTarget::Ready(target) => Some(target),
        PlannedTarget::Unreachable { .. } => None,
    });
    for target in ready {
        if !connections
            .iter()
            .any(|known| Arc::ptr_eq(known, target.connection()))
        {
            connections.push(target.connection().clone());
        }
    }
    connections
}
