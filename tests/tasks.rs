// ABOUTME: Integration tests for task execution: halting, hooks, and the deploy task.
// ABOUTME: Uses a scripted connection for command flow and a temp dir for full deploys.

mod support;

use async_trait::async_trait;
use skyhook::strategies::{Capability, Strategy, StrategyRegistry};
use skyhook::tasks::{
    StepOutcome, StepStatus, Task, TaskContext, TaskError, TaskOutcome, deploy_task,
};
use std::path::Path;
use std::sync::Arc;
use support::MockConnection;

fn mock_context(connection: Arc<MockConnection>) -> TaskContext {
    support::context(connection, support::config("/srv", ""))
}

/// Deploy strategy that writes a marker file into the release, or fails.
struct MarkerDeploy {
    fail: bool,
}

#[async_trait]
impl Strategy for MarkerDeploy {
    fn capability(&self) -> Capability {
        Capability::Deploy
    }

    fn name(&self) -> &str {
        "marker"
    }

    fn description(&self) -> &str {
        "Writes a marker file"
    }

    async fn execute(&self, context: &TaskContext) -> Result<StepOutcome, TaskError> {
        let command = if self.fail {
            "echo 'checkout refused' >&2; exit 1"
        } else {
            "echo built > index.html"
        };
        let output = context.shell.run_for_current_release(command).await?;
        Ok(StepOutcome::from_output(&output))
    }
}

fn marker_registry(fail: bool) -> StrategyRegistry {
    let mut registry = StrategyRegistry::new();
    registry.register(Arc::new(MarkerDeploy { fail }));
    registry
}

#[tokio::test]
async fn a_failed_step_halts_the_rest_of_the_task() {
    support::init_tracing();
    let connection = Arc::new(MockConnection::new("web1").fail("false-step", "boom"));
    let ctx = mock_context(connection.clone());

    let task = Task::new("build", "Builds")
        .run("echo first")
        .run("false-step")
        .run("echo third");
    let report = task.execute(&ctx).await.unwrap();

    match &report.outcome {
        TaskOutcome::Halted {
            task,
            step,
            failure,
        } => {
            assert_eq!(task, "build");
            assert_eq!(step, "false-step");
            assert_eq!(failure.command.as_deref(), Some("false-step"));
            assert_eq!(failure.message, "boom");
        }
        other => panic!("expected a halt, got {:?}", other),
    }

    let statuses: Vec<&StepStatus> = report.records.iter().map(|r| &r.status).collect();
    assert!(matches!(statuses[0], StepStatus::Succeeded(None)));
    assert!(matches!(statuses[1], StepStatus::Failed(_)));
    assert_eq!(statuses[2], &StepStatus::Skipped);
    assert!(!connection.ran("echo third"));
}

#[tokio::test]
async fn failure_without_output_reports_the_exit_status() {
    let connection = Arc::new(MockConnection::new("web1").fail("quiet", ""));
    let ctx = mock_context(connection);

    let report = Task::new("t", "").run("quiet").execute(&ctx).await.unwrap();

    let failed: Vec<_> = report.failed_steps().collect();
    assert_eq!(failed.len(), 1);
    match &failed[0].status {
        StepStatus::Failed(failure) => assert_eq!(failure.message, "exited with status 1"),
        other => panic!("unexpected status {:?}", other),
    }
}

#[tokio::test]
async fn failing_before_task_halts_the_primary_task() {
    let connection = Arc::new(MockConnection::new("web1").fail("check-disk", "disk full"));
    let ctx = mock_context(connection.clone());

    let task = Task::new("deploy", "")
        .before(Task::new("preflight", "").run("check-disk"))
        .run("echo deploying")
        .after(Task::new("notify", "").run("echo notified"));
    let report = task.execute(&ctx).await.unwrap();

    assert!(matches!(
        &report.outcome,
        TaskOutcome::Halted { task, .. } if task == "preflight"
    ));
    assert!(!connection.ran("echo deploying"));
    assert!(!connection.ran("echo notified"));
    assert_eq!(report.skipped_steps().count(), 2);
}

#[tokio::test]
async fn after_tasks_run_only_when_the_task_succeeds() {
    let connection = Arc::new(MockConnection::new("web1"));
    let ctx = mock_context(connection.clone());

    let task = Task::new("deploy", "")
        .run("echo deploying")
        .after(Task::new("notify", "").run("echo notified"));
    let report = task.execute(&ctx).await.unwrap();

    assert!(report.outcome.is_success());
    let commands = connection.commands();
    let deploying = commands.iter().position(|c| c.contains("echo deploying"));
    let notified = commands.iter().position(|c| c.contains("echo notified"));
    assert!(deploying.unwrap() < notified.unwrap());
}

#[tokio::test]
async fn nested_task_failure_halts_the_parent() {
    let connection = Arc::new(MockConnection::new("web1").fail("composer", "no lock file"));
    let ctx = mock_context(connection.clone());

    let task = Task::new("deploy", "")
        .task(Task::new("vendors", "").run("composer install"))
        .run("echo after");
    let report = task.execute(&ctx).await.unwrap();

    assert!(!report.outcome.is_success());
    assert!(!connection.ran("echo after"));
}

#[tokio::test]
async fn local_tasks_do_not_touch_the_target() {
    let connection = Arc::new(MockConnection::new("web1"));
    let ctx = mock_context(connection.clone());

    let task = Task::new("package", "").local(true).run("echo local-only");
    let report = task.execute(&ctx).await.unwrap();

    assert!(report.outcome.is_success());
    assert!(!connection.ran("local-only"));
    assert!(!ctx.shell.is_local(), "local mode is restored after the task");
}

#[tokio::test]
async fn unconfigured_capability_is_a_configuration_error() {
    let connection = Arc::new(MockConnection::new("web1"));
    let ctx = support::context_with_registry(
        connection,
        support::config("/srv", ""),
        StrategyRegistry::new(),
    );

    let err = Task::new("t", "")
        .strategy(Capability::Migrate)
        .execute(&ctx)
        .await
        .unwrap_err();

    assert!(err.is_config_error());
}

#[tokio::test]
async fn deploy_builds_links_and_runs_hooks() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap();
    let config = support::config(
        root,
        "strategies:\n  dependencies: null\nhooks:\n  after:\n    deploy:\n      - touch deployed\n",
    );
    let task = deploy_task(&config);
    let ctx = support::context_with_registry(
        Arc::new(skyhook::connection::LocalConnection::new()),
        config,
        marker_registry(false),
    );

    let report = task.execute(&ctx).await.unwrap();

    assert!(report.outcome.is_success(), "{:?}", report.records);
    let current = ctx.shell.paths().current_folder();
    assert_eq!(
        std::fs::read_to_string(format!("{}/index.html", current))
            .unwrap()
            .trim(),
        "built"
    );
    assert!(Path::new(&format!("{}/deployed", current)).exists());
    assert!(report.notes().any(|note| note.starts_with("Created release")));
}

#[tokio::test]
async fn failed_deploy_leaves_current_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap();
    let config = support::config(root, "strategies:\n  dependencies: null\n");
    let task = deploy_task(&config);
    let ctx = support::context_with_registry(
        Arc::new(skyhook::connection::LocalConnection::new()),
        config,
        marker_registry(true),
    );

    let report = task.execute(&ctx).await.unwrap();

    match &report.outcome {
        TaskOutcome::Halted { step, failure, .. } => {
            assert_eq!(step, "deploy strategy");
            assert_eq!(failure.message, "checkout refused");
        }
        other => panic!("expected a halt, got {:?}", other),
    }
    assert!(!Path::new(&ctx.shell.paths().current_folder()).exists());
    assert_eq!(ctx.releases.current_release().unwrap(), None);
}
