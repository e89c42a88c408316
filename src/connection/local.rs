// ABOUTME: Connection that runs commands on the orchestrating machine.
// ABOUTME: Used for targets flagged local and for tasks that must not leave the host.

use super::error::{Error, Result};
use super::{CommandOutput, Connection};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Runs commands through `sh -c` on the local machine.
#[derive(Debug, Clone)]
pub struct LocalConnection {
    host: String,
    working_dir: Option<PathBuf>,
}

impl Default for LocalConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalConnection {
    pub fn new() -> Self {
        Self {
            host: "localhost".to_string(),
            working_dir: None,
        }
    }

    /// Name this connection after a configured server.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Run commands from this directory instead of the process's.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl Connection for LocalConnection {
    fn host(&self) -> &str {
        &self.host
    }

    async fn exec(&self, command: &str) -> Result<CommandOutput> {
        let mut process = Command::new("sh");
        process
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.working_dir {
            process.current_dir(dir);
        }

        let output = process
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to spawn sh: {}", e)))?;

        Ok(CommandOutput {
            // Killed by a signal: no code, report a generic failure
            exit_code: output.status.code().map(|c| c as u32).unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn get_string(&self, path: &str) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Transfer {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn put_string(&self, path: &str, contents: &str) -> Result<()> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| Error::Transfer {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn put(&self, local: &Path, remote: &str) -> Result<()> {
        tokio::fs::copy(local, remote)
            .await
            .map(|_| ())
            .map_err(|e| Error::Transfer {
                path: remote.to_string(),
                reason: e.to_string(),
            })
    }

    async fn operating_system(&self) -> Result<String> {
        let name = match std::env::consts::OS {
            "linux" => "Linux",
            "macos" => "Darwin",
            "windows" => "Windows",
            "freebsd" => "FreeBSD",
            other => other,
        };
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exec_captures_output_and_status() {
        let connection = LocalConnection::new();

        let output = connection.exec("echo hello; echo oops >&2").await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");

        let output = connection.exec("exit 3").await.unwrap();
        assert_eq!(output.exit_code, 3);
    }

    #[tokio::test]
    async fn files_round_trip_through_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let path = path.to_str().unwrap();
        let connection = LocalConnection::new();

        connection.put_string(path, "contents").await.unwrap();
        assert_eq!(connection.get_string(path).await.unwrap(), "contents");
    }

    #[tokio::test]
    async fn missing_file_is_a_transfer_error() {
        let connection = LocalConnection::new();
        let result = connection.get_string("/nonexistent/skyhook/file").await;
        assert!(matches!(result, Err(Error::Transfer { .. })));
    }

    #[tokio::test]
    async fn working_dir_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let connection = LocalConnection::new().working_dir(dir.path());

        let output = connection.exec("pwd").await.unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(
            Path::new(output.stdout.trim()).canonicalize().unwrap(),
            expected
        );
    }
}
