// ABOUTME: Integration tests for the configured strategies against a scripted target.
// ABOUTME: Checks binary checks, manifest detection, and the commands each strategy sends.

mod support;

use skyhook::pipeline::Target;
use skyhook::releases::MemoryStorage;
use skyhook::strategies::{Capability, StrategyRegistry};
use skyhook::tasks::{StepOutcome, TaskContext};
use skyhook::types::ReleaseId;
use std::sync::Arc;
use support::MockConnection;

const RELEASE: &str = "20240301120000";
const REPOSITORY: &str = "repository:\n  url: https://example.com/shop.git\n";

fn context(connection: Arc<MockConnection>, extra: &str) -> TaskContext {
    let ctx = support::context(connection, support::config("/srv", extra));
    ctx.shell.set_release(Some(ReleaseId::parse(RELEASE).unwrap()));
    ctx
}

async fn run(ctx: &TaskContext, capability: Capability) -> StepOutcome {
    let strategy = ctx.registry.resolve(capability).unwrap();
    strategy.execute(ctx).await.unwrap()
}

#[tokio::test]
async fn missing_binary_fails_with_a_uniform_message() {
    support::init_tracing();
    let connection = Arc::new(MockConnection::new("web1").fail("command -v git", ""));
    let ctx = context(connection.clone(), REPOSITORY);

    let outcome = run(&ctx, Capability::Deploy).await;

    assert_eq!(outcome, StepOutcome::failed("git could not be found on web1"));
    assert!(!connection.ran("git clone"));
}

#[tokio::test]
async fn clone_checks_out_into_the_new_release() {
    let connection =
        Arc::new(MockConnection::new("web1").respond("command -v git", "/usr/bin/git"));
    let ctx = context(connection.clone(), REPOSITORY);

    let outcome = run(&ctx, Capability::Deploy).await;

    assert!(!outcome.is_failure());
    assert!(connection.ran(&format!(
        "git clone \"https://example.com/shop.git\" \"/srv/demo/releases/{}\" --branch=\"main\"",
        RELEASE
    )));
}

#[tokio::test]
async fn clone_without_repository_is_a_configuration_error() {
    let connection = Arc::new(MockConnection::new("web1"));
    let ctx = context(connection, "");

    let strategy = ctx.registry.resolve(Capability::Deploy).unwrap();
    let err = strategy.execute(&ctx).await.unwrap_err();

    assert!(err.is_config_error());
    assert!(err.to_string().contains("no repository"));
}

#[tokio::test]
async fn copy_reuses_the_current_release_and_updates_it() {
    let connection = Arc::new(
        MockConnection::new("web1")
            .respond("command -v git", "/usr/bin/git")
            .respond("[ -e", "true"),
    );
    let extra = format!("{}strategies:\n  deploy: copy\n", REPOSITORY);
    let ctx = context(connection.clone(), &extra);
    let live = ReleaseId::parse("20240201120000").unwrap();
    ctx.releases.promote(&ctx.shell, &live).await.unwrap();

    let outcome = run(&ctx, Capability::Deploy).await;

    assert!(!outcome.is_failure());
    assert!(connection.ran(&format!(
        "cp -a /srv/demo/releases/{}/. /srv/demo/releases/{}",
        live, RELEASE
    )));
    assert!(connection.ran("git reset --hard && git pull"));
    assert!(!connection.ran("git clone"));
}

#[tokio::test]
async fn copy_without_a_current_release_clones() {
    let connection =
        Arc::new(MockConnection::new("web1").respond("command -v git", "/usr/bin/git"));
    let extra = format!("{}strategies:\n  deploy: copy\n", REPOSITORY);
    let ctx = context(connection.clone(), &extra);

    let outcome = run(&ctx, Capability::Deploy).await;

    assert!(!outcome.is_failure());
    assert!(connection.ran("git clone"));
    assert!(!connection.ran("cp -a"));
}

#[tokio::test]
async fn polyglot_installs_with_every_manager_in_use() {
    let connection = Arc::new(
        MockConnection::new("web1")
            .respond("composer.json\" ]", "true")
            .respond("Gemfile\" ]", "true")
            .respond("command -v composer", "/usr/bin/composer")
            .respond("command -v bundle", "/usr/bin/bundle"),
    );
    let ctx = context(connection.clone(), "");

    let outcome = run(&ctx, Capability::Dependencies).await;

    assert_eq!(
        outcome,
        StepOutcome::note("Installed dependencies with bundler, composer")
    );
    assert!(connection.ran(&format!(
        "cd /srv/demo/releases/{} && composer install --no-interaction --no-dev --prefer-dist",
        RELEASE
    )));
    assert!(connection.ran("bundle install"));
    assert!(!connection.ran("npm install"));
}

#[tokio::test]
async fn yarn_replaces_npm_when_both_manifests_exist() {
    let connection = Arc::new(
        MockConnection::new("web1")
            .respond("package.json\" ]", "true")
            .respond("yarn.lock\" ]", "true")
            .respond("command -v", "/usr/local/bin/tool"),
    );
    let ctx = context(connection.clone(), "");

    let outcome = run(&ctx, Capability::Dependencies).await;

    assert_eq!(outcome, StepOutcome::note("Installed dependencies with yarn"));
    assert!(connection.ran("yarn install"));
    assert!(!connection.ran("npm install"));
}

#[tokio::test]
async fn polyglot_without_manifests_has_nothing_to_do() {
    let connection = Arc::new(MockConnection::new("web1"));
    let ctx = context(connection.clone(), "");

    let outcome = run(&ctx, Capability::Dependencies).await;

    assert_eq!(
        outcome,
        StepOutcome::Skipped("no dependency manifests found".to_string())
    );
    assert!(!connection.ran("command -v"));
}

#[tokio::test]
async fn installer_failure_reports_the_command() {
    let connection = Arc::new(
        MockConnection::new("web1")
            .respond("package.json\" ]", "true")
            .respond("command -v npm", "/usr/bin/npm")
            .fail("npm install", "ERR! missing script"),
    );
    let ctx = context(connection, "");

    let outcome = run(&ctx, Capability::Dependencies).await;

    match outcome {
        StepOutcome::Failed(failure) => {
            assert_eq!(failure.message, "ERR! missing script");
            assert!(failure.command.unwrap().ends_with("npm install"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn artisan_migrates_with_the_stage_environment() {
    let connection = Arc::new(
        MockConnection::new("web1")
            .respond("artisan\" ]", "true")
            .respond("command -v php", "/usr/bin/php"),
    );
    let config = support::config(
        "/srv",
        "stages: [production]\nmigrations:\n  enabled: true\n  seed: true\n",
    );
    let registry = StrategyRegistry::from_config(&config.strategies).unwrap();
    let target = Target::new(connection.clone(), Some("production".to_string()));
    let ctx = TaskContext::new(
        target,
        Arc::new(config),
        Arc::new(registry),
        Arc::new(MemoryStorage::new()),
    );
    ctx.shell.set_release(Some(ReleaseId::parse(RELEASE).unwrap()));

    let outcome = run(&ctx, Capability::Migrate).await;

    assert!(!outcome.is_failure());
    assert!(connection.ran(&format!(
        "cd /srv/demo/production/releases/{} && php artisan migrate --force --env=\"production\" && php artisan db:seed --force --env=\"production\"",
        RELEASE
    )));
}

#[tokio::test]
async fn disabled_migrations_are_skipped() {
    let connection = Arc::new(MockConnection::new("web1"));
    let ctx = context(connection.clone(), "");

    let outcome = run(&ctx, Capability::Migrate).await;

    assert!(matches!(outcome, StepOutcome::Skipped(_)));
    assert!(!connection.ran("artisan"));
}
