// ABOUTME: The remote execution port: run a command on a target and read its output.
// ABOUTME: Implemented over russh for remote targets and tokio::process for local ones.

mod error;
mod local;
mod ssh;

pub use error::{Error, Result};
pub use local::LocalConnection;
pub use ssh::{SessionConfig, SshConnection};

use async_trait::async_trait;
use std::path::Path;

/// Output from a command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A shell on a target that can run commands and move files.
///
/// Every call completes before returning; there is no streaming contract.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Host name used in logs and error messages.
    fn host(&self) -> &str;

    /// Run a command through the target's POSIX shell.
    async fn exec(&self, command: &str) -> Result<CommandOutput>;

    /// Read a file's contents.
    async fn get_string(&self, path: &str) -> Result<String>;

    /// Write `contents` to a file, replacing it.
    async fn put_string(&self, path: &str, contents: &str) -> Result<()>;

    /// Upload a local file.
    async fn put(&self, local: &Path, remote: &str) -> Result<()>;

    /// Kernel name as reported by `uname -s` (`Linux`, `Darwin`, ...).
    async fn operating_system(&self) -> Result<String>;

    /// Close the underlying session, if any.
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}
