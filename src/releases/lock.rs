// ABOUTME: Deploy lock to prevent concurrent deployments to the same target.
// ABOUTME: Uses atomic noclobber file creation with lock info stored next to the releases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReleaseError;
use crate::paths::Paths;
use crate::shell::Shell;

/// Lock file name inside the stage folder.
const LOCK_FILENAME: &str = ".skyhook.lock";

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new() -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }

    pub fn lock_path(paths: &Paths) -> String {
        paths.folder(LOCK_FILENAME)
    }
}

impl Default for LockInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// A held deploy lock. Call [`DeployLock::release`] when done.
pub struct DeployLock<'a> {
    shell: &'a Shell,
    path: String,
}

impl std::fmt::Debug for DeployLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployLock")
            .field("host", &self.shell.host())
            .field("path", &self.path)
            .finish()
    }
}

impl<'a> DeployLock<'a> {
    /// Acquire the deploy lock of the shell's application.
    ///
    /// Uses shell noclobber mode for atomic lock acquisition (no TOCTOU race).
    /// Stale locks (>1 hour) are broken with a warning; `force` breaks any lock.
    pub async fn acquire(shell: &'a Shell, force: bool) -> Result<Self, ReleaseError> {
        let path = LockInfo::lock_path(shell.paths());

        Self::ensure_home(shell).await?;

        let lock_json = serde_json::to_string(&LockInfo::new()).map_err(|e| {
            ReleaseError::Lock {
                message: format!("failed to serialize lock: {}", e),
            }
        })?;
        let escaped_json = lock_json.replace('\'', "'\\''");

        // set -C makes > fail if the file already exists
        let acquire_cmd = format!(
            "(set -C; echo '{}' > \"{}\") 2>/dev/null",
            escaped_json, path
        );

        if Self::exec(shell, &acquire_cmd).await?.success() {
            return Ok(Self { shell, path });
        }

        if !Self::should_break(shell, &path, force).await? {
            let output = Self::exec(shell, &format!("cat \"{}\"", path)).await?;
            if let Ok(existing) = serde_json::from_str::<LockInfo>(&output.stdout) {
                return Err(ReleaseError::LockHeld {
                    holder: existing.holder,
                    pid: existing.pid,
                    started_at: existing.started_at,
                });
            }
            return Err(ReleaseError::Lock {
                message: "lock held by another process".to_string(),
            });
        }

        tracing::debug!("Removing stale/forced lock at {}", path);
        Self::exec(shell, &format!("rm -f \"{}\"", path)).await?;

        if !Self::exec(shell, &acquire_cmd).await?.success() {
            return Err(ReleaseError::Lock {
                message: "lock acquired by another process during break".to_string(),
            });
        }

        Ok(Self { shell, path })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Release the lock.
    pub async fn release(self) -> Result<(), ReleaseError> {
        let output = Self::exec(self.shell, &format!("rm -f \"{}\"", self.path)).await?;
        if !output.success() {
            return Err(ReleaseError::Lock {
                message: format!("failed to remove {}: {}", self.path, output.error_text()),
            });
        }
        Ok(())
    }

    async fn ensure_home(shell: &Shell) -> Result<(), ReleaseError> {
        let folder = shell.paths().stage_folder();
        let output = shell.create_folder(&folder, true).await.map_err(|e| {
            ReleaseError::Lock {
                message: format!("failed to create {}: {}", folder, e),
            }
        })?;
        if !output.success() {
            return Err(ReleaseError::Lock {
                message: format!("failed to create {}: {}", folder, output.error_text()),
            });
        }
        Ok(())
    }

    /// Whether an existing lock should be broken (stale, forced, or corrupted).
    async fn should_break(shell: &Shell, path: &str, force: bool) -> Result<bool, ReleaseError> {
        let output = Self::exec(shell, &format!("cat \"{}\"", path)).await?;
        if !output.success() {
            tracing::warn!("Lock info unreadable, breaking lock");
            return Ok(true);
        }

        match serde_json::from_str::<LockInfo>(&output.stdout) {
            Ok(existing) if force => {
                tracing::warn!(
                    "Breaking lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                Ok(true)
            }
            Ok(existing) if existing.is_stale() => {
                tracing::warn!(
                    "Auto-breaking stale lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(_) => {
                tracing::warn!("Lock info corrupted, breaking lock");
                Ok(true)
            }
        }
    }

    async fn exec(shell: &Shell, command: &str) -> Result<crate::shell::RunOutput, ReleaseError> {
        shell
            .run_raw(command)
            .await
            .map_err(|source| ReleaseError::Shell {
                host: shell.host().to_string(),
                source,
            })
    }
}
