// ABOUTME: Test support utilities.
// ABOUTME: Provides a scripted connection and task contexts backed by temp directories.

use async_trait::async_trait;
use parking_lot::Mutex;
use skyhook::config::Config;
use skyhook::connection::{CommandOutput, Connection, LocalConnection, Result};
use skyhook::pipeline::Target;
use skyhook::releases::{MemoryStorage, Storage};
use skyhook::strategies::StrategyRegistry;
use skyhook::tasks::TaskContext;
use std::path::Path;
use std::sync::{Arc, Once};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("skyhook=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A connection that records every command and answers from a script.
///
/// Responses are matched by substring; later registrations win. Unmatched
/// commands succeed with empty output.
#[allow(dead_code)]
pub struct MockConnection {
    host: String,
    os: String,
    responses: Mutex<Vec<(String, CommandOutput)>>,
    commands: Mutex<Vec<String>>,
    disconnects: Mutex<usize>,
}

#[allow(dead_code)]
impl MockConnection {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            os: "Linux".to_string(),
            responses: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            disconnects: Mutex::new(0),
        }
    }

    pub fn os(mut self, os: &str) -> Self {
        self.os = os.to_string();
        self
    }

    /// Succeed with `stdout` for commands containing `pattern`.
    pub fn respond(self, pattern: &str, stdout: &str) -> Self {
        self.responses.lock().push((
            pattern.to_string(),
            CommandOutput {
                exit_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        ));
        self
    }

    /// Fail with `stderr` for commands containing `pattern`.
    pub fn fail(self, pattern: &str, stderr: &str) -> Self {
        self.responses.lock().push((
            pattern.to_string(),
            CommandOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        ));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    /// Whether any recorded command contains `needle`.
    pub fn ran(&self, needle: &str) -> bool {
        self.commands.lock().iter().any(|c| c.contains(needle))
    }

    pub fn disconnects(&self) -> usize {
        *self.disconnects.lock()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn host(&self) -> &str {
        &self.host
    }

    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.commands.lock().push(command.to_string());
        let responses = self.responses.lock();
        let output = responses
            .iter()
            .rev()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        Ok(output)
    }

    async fn get_string(&self, _path: &str) -> Result<String> {
        Ok(String::new())
    }

    async fn put_string(&self, _path: &str, _contents: &str) -> Result<()> {
        Ok(())
    }

    async fn put(&self, _local: &Path, _remote: &str) -> Result<()> {
        Ok(())
    }

    async fn operating_system(&self) -> Result<String> {
        Ok(self.os.clone())
    }

    async fn disconnect(&self) -> Result<()> {
        *self.disconnects.lock() += 1;
        Ok(())
    }
}

/// A minimal configuration rooted at `root`, extended with `extra` YAML.
#[allow(dead_code)]
pub fn config(root: &str, extra: &str) -> Config {
    let yaml = format!(
        "application: demo\nroot_directory: {}\nservers:\n  - local\n{}",
        root, extra
    );
    Config::from_yaml(&yaml).unwrap()
}

/// A task context for `connection` with an in-memory release history.
#[allow(dead_code)]
pub fn context(connection: Arc<dyn Connection>, config: Config) -> TaskContext {
    context_with_storage(connection, config, Arc::new(MemoryStorage::new()))
}

#[allow(dead_code)]
pub fn context_with_storage(
    connection: Arc<dyn Connection>,
    config: Config,
    storage: Arc<dyn Storage>,
) -> TaskContext {
    let registry = StrategyRegistry::from_config(&config.strategies).unwrap();
    let target = Target::new(connection, None);
    TaskContext::new(target, Arc::new(config), Arc::new(registry), storage)
}

/// A context that runs on this machine, rooted in `dir`.
#[allow(dead_code)]
pub fn local_context(dir: &Path, extra: &str) -> TaskContext {
    let root = dir.to_str().unwrap();
    let connection = Arc::new(LocalConnection::new().working_dir(dir));
    context(connection, config(root, extra))
}

/// A context that resolves strategies from `registry` instead of the config.
#[allow(dead_code)]
pub fn context_with_registry(
    connection: Arc<dyn Connection>,
    config: Config,
    registry: StrategyRegistry,
) -> TaskContext {
    let target = Target::new(connection, None);
    TaskContext::new(
        target,
        Arc::new(config),
        Arc::new(registry),
        Arc::new(MemoryStorage::new()),
    )
}
