// ABOUTME: Command execution core bound to one target: run, capture, and route commands.
// ABOUTME: Filesystem operations and binary discovery are implemented on top of it.

mod binaries;
mod filesystem;
mod normalizer;

pub use normalizer::{CommandInput, Normalizer, rewrite_separators, strip_noise};

use crate::config::{AtomicSymlinks, SymlinkMode};
use crate::connection::{Connection, LocalConnection, Result};
use crate::paths::Paths;
use crate::types::ReleaseId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Produces permission commands for an absolute folder path.
pub type PermissionsCallback = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Result of running one or more commands on a target.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    /// The command line that was sent to the shell.
    pub command: String,
    pub exit_code: u32,
    /// Standard output with shell noise stripped.
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Non-empty output lines.
    pub fn lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The most useful diagnostic text: stderr when present, else stdout.
    pub fn error_text(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// A shell session on one target.
///
/// Commands run strictly in call order. When switched to local mode every
/// command goes to the local connection with the same normalization rules.
pub struct Shell {
    remote: Arc<dyn Connection>,
    local: Arc<dyn Connection>,
    use_local: AtomicBool,
    normalizer: Normalizer,
    paths: Paths,
    release: Mutex<Option<ReleaseId>>,
    symlink_mode: SymlinkMode,
    atomic_symlinks: AtomicSymlinks,
    permissions: Option<PermissionsCallback>,
    binaries: Mutex<HashMap<(bool, String), Option<String>>>,
    operating_systems: Mutex<HashMap<bool, String>>,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("host", &self.remote.host())
            .field("local", &self.is_local())
            .field("paths", &self.paths)
            .finish()
    }
}

impl Shell {
    pub fn new(remote: Arc<dyn Connection>, paths: Paths) -> Self {
        Self {
            remote,
            local: Arc::new(LocalConnection::new()),
            use_local: AtomicBool::new(false),
            normalizer: Normalizer::default(),
            paths,
            release: Mutex::new(None),
            symlink_mode: SymlinkMode::default(),
            atomic_symlinks: AtomicSymlinks::default(),
            permissions: None,
            binaries: Mutex::new(HashMap::new()),
            operating_systems: Mutex::new(HashMap::new()),
        }
    }

    pub fn normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn symlink_mode(mut self, mode: SymlinkMode) -> Self {
        self.symlink_mode = mode;
        self
    }

    pub fn atomic_symlinks(mut self, atomic: AtomicSymlinks) -> Self {
        self.atomic_symlinks = atomic;
        self
    }

    pub fn permissions(mut self, callback: PermissionsCallback) -> Self {
        self.permissions = Some(callback);
        self
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn host(&self) -> &str {
        self.connection().host()
    }

    pub fn is_local(&self) -> bool {
        self.use_local.load(Ordering::SeqCst)
    }

    /// Route subsequent commands to the local connection (or back).
    pub fn set_local(&self, local: bool) {
        self.use_local.store(local, Ordering::SeqCst);
    }

    /// The connection commands currently go to.
    pub fn connection(&self) -> &Arc<dyn Connection> {
        if self.is_local() {
            &self.local
        } else {
            &self.remote
        }
    }

    /// Release that release-relative paths resolve against.
    pub fn release(&self) -> Option<ReleaseId> {
        self.release.lock().clone()
    }

    pub fn set_release(&self, release: Option<ReleaseId>) {
        *self.release.lock() = release;
    }

    /// A folder inside the active release, or inside `current` when no
    /// release is active.
    pub fn current_release_path(&self, folder: &str) -> String {
        match self.release() {
            Some(release) => self.paths.release_path(&release, folder),
            None => {
                let folder = folder.trim_matches('/');
                if folder.is_empty() {
                    self.paths.current_folder()
                } else {
                    format!("{}/{}", self.paths.current_folder(), folder)
                }
            }
        }
    }

    /// Normalize and run commands, chained with `&&`.
    pub async fn run(&self, commands: impl Into<CommandInput>) -> Result<RunOutput> {
        let commands = self.normalizer.normalize(commands);
        if commands.is_empty() {
            return Ok(RunOutput::default());
        }
        self.execute(commands.join(" && ")).await
    }

    /// Run a command exactly as given.
    pub async fn run_raw(&self, command: &str) -> Result<RunOutput> {
        self.execute(command.to_string()).await
    }

    /// Run commands from inside a folder.
    pub async fn run_in_folder(
        &self,
        folder: &str,
        commands: impl Into<CommandInput>,
    ) -> Result<RunOutput> {
        let cd = format!("cd {}", self.paths.folder(folder));
        self.run(CommandInput::Many(vec![cd.into(), commands.into()]))
            .await
    }

    /// Run commands from inside the active release.
    pub async fn run_for_current_release(
        &self,
        commands: impl Into<CommandInput>,
    ) -> Result<RunOutput> {
        let folder = self.current_release_path("");
        self.run_in_folder(&folder, commands).await
    }

    /// Wall-clock time of the target as a release id.
    ///
    /// Falls back to the local clock when the target's clock cannot be read;
    /// both are formatted identically.
    pub async fn timestamp(&self) -> ReleaseId {
        let remote = self.run_raw("date +\"%Y%m%d%H%M%S\"").await;
        match remote {
            Ok(output) if output.success() => match ReleaseId::parse(&output.stdout) {
                Ok(id) => return id,
                Err(e) => tracing::warn!("Unexpected date output on {}: {}", self.host(), e),
            },
            Ok(output) => tracing::warn!(
                "Could not read clock on {}: {}",
                self.host(),
                output.error_text()
            ),
            Err(e) => tracing::warn!("Could not read clock on {}: {}", self.host(), e),
        }

        tracing::warn!("Using local clock for release timestamp");
        ReleaseId::from_datetime(&chrono::Local::now())
    }

    /// Kernel name of the target, cached per mode.
    pub async fn operating_system(&self) -> Result<String> {
        let local = self.is_local();
        let cached = self.operating_systems.lock().get(&local).cloned();
        if let Some(os) = cached {
            return Ok(os);
        }
        let os = self.connection().operating_system().await?;
        self.operating_systems.lock().insert(local, os.clone());
        Ok(os)
    }

    /// Whether symlinks can be swapped atomically (`mv -T` over the link).
    pub async fn supports_atomic_swap(&self) -> bool {
        match self.atomic_symlinks {
            AtomicSymlinks::Always => true,
            AtomicSymlinks::Never => false,
            AtomicSymlinks::Auto => match self.operating_system().await {
                Ok(os) => os == "Linux",
                Err(e) => {
                    tracing::warn!("Could not detect OS on {}: {}", self.host(), e);
                    false
                }
            },
        }
    }

    async fn execute(&self, command: String) -> Result<RunOutput> {
        tracing::debug!(host = self.host(), "$ {}", command);

        let output = self.connection().exec(&command).await?;
        if !output.success() {
            tracing::debug!(
                host = self.host(),
                exit_code = output.exit_code,
                "command failed: {}",
                output.stderr.trim()
            );
        }

        Ok(RunOutput {
            command,
            exit_code: output.exit_code,
            stdout: strip_noise(&output.stdout),
            stderr: strip_noise(&output.stderr),
        })
    }
}
