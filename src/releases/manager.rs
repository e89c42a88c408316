// ABOUTME: Release manager: mints release ids, promotes via atomic symlink, rolls back, cleans up.
// ABOUTME: Every history change is a single read-modify-write on the Storage collaborator.

use snafu::{OptionExt, ResultExt};
use std::sync::Arc;

use super::error::{
    CleanupSnafu, CreateFolderSnafu, HistorySnafu, NothingToRollbackSnafu, PromoteSnafu,
    ShellSnafu, UnknownReleaseSnafu,
};
use super::{ReleaseError, ReleaseHistory, Storage};
use crate::shell::Shell;
use crate::types::ReleaseId;

/// Releases of one target.
#[derive(Clone)]
pub struct ReleasesManager {
    storage: Arc<dyn Storage>,
    key: String,
    keep: usize,
}

impl std::fmt::Debug for ReleasesManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleasesManager")
            .field("key", &self.key)
            .field("keep", &self.keep)
            .finish()
    }
}

impl ReleasesManager {
    /// `key` identifies the target in storage; `keep` is how many releases
    /// older than `current` survive cleanup.
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>, keep: usize) -> Self {
        Self {
            storage,
            key: key.into(),
            keep,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn history(&self) -> Result<ReleaseHistory, ReleaseError> {
        self.storage.load(&self.key).context(HistorySnafu)
    }

    pub fn current_release(&self) -> Result<Option<ReleaseId>, ReleaseError> {
        Ok(self.history()?.current().cloned())
    }

    pub fn previous_release(&self) -> Result<Option<ReleaseId>, ReleaseError> {
        Ok(self.history()?.previous().cloned())
    }

    /// Release folders present on the target, newest first.
    pub async fn releases_on_disk(&self, shell: &Shell) -> Result<Vec<ReleaseId>, ReleaseError> {
        let entries = shell
            .list_contents(&shell.paths().releases_folder())
            .await
            .context(ShellSnafu { host: shell.host() })?;

        let mut releases: Vec<ReleaseId> = entries
            .iter()
            .filter_map(|entry| ReleaseId::parse(entry).ok())
            .collect();
        releases.sort_by(|a, b| b.cmp(a));
        Ok(releases)
    }

    /// Mint an id from the target's clock, create its folder, and record it
    /// as pending. The shell's active release becomes the new one.
    pub async fn create_release(&self, shell: &Shell) -> Result<ReleaseId, ReleaseError> {
        let mut release = shell.timestamp().await;

        let history = self.history()?;
        if let Some(latest) = history.latest()
            && release <= *latest
        {
            tracing::debug!("Release {} not newer than {}, bumping", release, latest);
            release = latest.next();
        }

        let folder = shell.paths().release_folder(&release);
        let output = shell
            .create_folder(&folder, true)
            .await
            .context(ShellSnafu { host: shell.host() })?;
        if !output.success() {
            return CreateFolderSnafu {
                path: folder,
                message: output.error_text(),
            }
            .fail();
        }

        self.storage
            .update(&self.key, &mut |history| {
                history.insert_pending(release.clone())
            })
            .context(HistorySnafu)?;

        tracing::info!("Created release {} on {}", release, shell.host());
        shell.set_release(Some(release.clone()));
        Ok(release)
    }

    /// Point `current` at `release` and record it as current.
    ///
    /// If the link cannot be swapped the history is left untouched and the
    /// release stays pending.
    pub async fn promote(&self, shell: &Shell, release: &ReleaseId) -> Result<(), ReleaseError> {
        let paths = shell.paths();
        let folder = paths.release_folder(release);

        let output = shell
            .symlink(&folder, &paths.current_folder())
            .await
            .context(ShellSnafu { host: shell.host() })?
            .context(UnknownReleaseSnafu {
                release: release.clone(),
                host: shell.host(),
            })?;
        if !output.success() {
            return PromoteSnafu {
                release: release.clone(),
                command: output.command.clone(),
                message: output.error_text(),
            }
            .fail();
        }

        self.storage
            .update(&self.key, &mut |history| history.promote(release))
            .context(HistorySnafu)?;

        tracing::info!("Release {} is now current on {}", release, shell.host());
        Ok(())
    }

    /// Re-link an earlier release without rebuilding it. Defaults to the most
    /// recent old release.
    pub async fn rollback(
        &self,
        shell: &Shell,
        to: Option<ReleaseId>,
    ) -> Result<ReleaseId, ReleaseError> {
        let release = match to {
            Some(release) => release,
            None => self.previous_release()?.context(NothingToRollbackSnafu)?,
        };

        if !shell
            .file_exists(&shell.paths().release_folder(&release))
            .await
        {
            return UnknownReleaseSnafu {
                release,
                host: shell.host(),
            }
            .fail();
        }

        self.promote(shell, &release).await?;
        Ok(release)
    }

    /// Delete releases beyond the retention count, oldest first. `current`
    /// and anything newer are never touched.
    pub async fn cleanup(&self, shell: &Shell) -> Result<Vec<ReleaseId>, ReleaseError> {
        let on_disk = self.releases_on_disk(shell).await?;
        let evicted = self.history()?.evictable(self.keep, &on_disk);
        if evicted.is_empty() {
            return Ok(evicted);
        }

        let folders: Vec<String> = evicted
            .iter()
            .map(|release| shell.paths().release_folder(release))
            .collect();
        let output = shell
            .remove_folder(&folders)
            .await
            .context(ShellSnafu { host: shell.host() })?;
        if !output.success() {
            return CleanupSnafu {
                command: output.command.clone(),
                message: output.error_text(),
            }
            .fail();
        }

        self.storage
            .update(&self.key, &mut |history| {
                for release in &evicted {
                    history.remove(release);
                }
            })
            .context(HistorySnafu)?;

        tracing::info!(
            "Removed {} old release(s) on {}",
            evicted.len(),
            shell.host()
        );
        Ok(evicted)
    }
}
