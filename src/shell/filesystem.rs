// ABOUTME: File and folder operations on a target: tests, copy/move, symlinks, permissions.
// ABOUTME: Symlinks are swapped atomically where supported so `current` is never missing.

use super::{RunOutput, Shell};
use crate::config::SymlinkMode;
use crate::connection::Result;
use crate::paths::relative_path;
use std::path::Path;

/// Suffix of the temporary link created before an atomic swap.
const TEMPORARY_LINK_SUFFIX: &str = "-temp";

impl Shell {
    /// Whether a file or folder exists. Any failure reads as "does not exist".
    pub async fn file_exists(&self, path: &str) -> bool {
        self.check_statement(&format!("-e \"{}\"", path)).await
    }

    /// Whether a path is a symlink. Any failure reads as "not a symlink".
    pub async fn is_symlink(&self, path: &str) -> bool {
        self.check_statement(&format!("-L \"{}\"", path)).await
    }

    /// Move a file or folder, creating the destination's parent first.
    ///
    /// Returns `None` without running anything when `origin` does not exist.
    pub async fn move_path(&self, origin: &str, destination: &str) -> Result<Option<RunOutput>> {
        if !self.file_exists(origin).await {
            return Ok(None);
        }
        self.from_to("mv", origin, destination).await.map(Some)
    }

    /// Copy a file or folder preserving attributes, creating the destination's
    /// parent first.
    ///
    /// Returns `None` without running anything when `origin` does not exist.
    pub async fn copy(&self, origin: &str, destination: &str) -> Result<Option<RunOutput>> {
        if !self.file_exists(origin).await {
            return Ok(None);
        }
        self.from_to("cp -a", origin, destination).await.map(Some)
    }

    /// Entry names of a folder, in the order the shell lists them.
    pub async fn list_contents(&self, folder: &str) -> Result<Vec<String>> {
        let output = self.run_raw(&format!("ls -1 {}", folder)).await?;
        if !output.success() {
            return Ok(Vec::new());
        }
        Ok(output.lines())
    }

    /// Point `link` at `target`.
    ///
    /// If `target` is missing but `link` exists (a real folder that should have
    /// been shared), the folder is moved to `target` first. Returns `None` when
    /// neither exists.
    pub async fn symlink(&self, target: &str, link: &str) -> Result<Option<RunOutput>> {
        if !self.file_exists(target).await {
            if !self.file_exists(link).await {
                return Ok(None);
            }
            self.move_path(link, target).await?;
        }

        let target = match self.symlink_mode {
            SymlinkMode::Relative => relative_path(link, target).to_string(),
            SymlinkMode::Absolute => target.to_string(),
        };

        if self.supports_atomic_swap().await {
            return self.symlink_swap(&target, link).await.map(Some);
        }

        if self.file_exists(link).await {
            self.remove_folder([link]).await?;
        }
        self.run(format!("ln -s {} {}", target, link)).await.map(Some)
    }

    /// Replace `link` atomically: create a temporary link next to it, then
    /// rename it over `link`. Readers see the old target or the new one, never
    /// a missing path.
    pub async fn symlink_swap(&self, target: &str, link: &str) -> Result<RunOutput> {
        // A real folder cannot be renamed over
        if self.file_exists(link).await && !self.is_symlink(link).await {
            self.remove_folder([link]).await?;
        }

        let temporary = format!("{}{}", link, TEMPORARY_LINK_SUFFIX);
        self.run([
            format!("ln -sfn {} {}", target, temporary),
            format!("mv -Tf {} {}", temporary, link),
        ])
        .await
    }

    /// Create a folder under the application's home folder.
    pub async fn create_folder(&self, folder: &str, recursive: bool) -> Result<RunOutput> {
        let flag = if recursive { "-p " } else { "" };
        self.run(format!("mkdir {}{}", flag, self.paths.folder(folder)))
            .await
    }

    /// Remove folders under the application's home folder.
    pub async fn remove_folder<I, S>(&self, folders: I) -> Result<RunOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let folders: Vec<String> = folders
            .into_iter()
            .map(|folder| self.paths.folder(folder.as_ref()))
            .collect();
        if folders.is_empty() {
            return Ok(RunOutput::default());
        }
        self.run(format!("rm -rf {}", folders.join(" "))).await
    }

    /// Apply the configured permission commands to a folder of the active
    /// release. Without a permissions callback, or when it yields nothing,
    /// this succeeds without running anything.
    pub async fn set_permissions(&self, folder: &str) -> Result<RunOutput> {
        let folder = self.current_release_path(folder);
        tracing::info!("Setting permissions for {}", folder);

        let commands = match &self.permissions {
            Some(callback) => callback(&folder),
            None => Vec::new(),
        };
        if commands.is_empty() {
            return Ok(RunOutput::default());
        }

        self.run_for_current_release(commands).await
    }

    /// Link `shared/<folder>` into the active release.
    pub async fn share(&self, folder: &str) -> Result<Option<RunOutput>> {
        let shared = self.paths.shared_folder(folder);
        let link = self.current_release_path(folder);
        tracing::info!("Sharing {}", folder);
        self.symlink(&shared, &link).await
    }

    pub async fn get_file(&self, path: &str) -> Result<String> {
        self.connection().get_string(path).await
    }

    pub async fn put_file(&self, path: &str, contents: &str) -> Result<()> {
        self.connection().put_string(path, contents).await
    }

    /// Upload a local file. Returns `false` when the local file is missing.
    /// The destination defaults to the file's name.
    pub async fn upload(&self, file: &Path, destination: Option<&str>) -> Result<bool> {
        if !file.exists() {
            return Ok(false);
        }

        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let destination = destination.unwrap_or(&name);

        self.connection().put(file, destination).await?;
        Ok(true)
    }

    /// Evaluate a `test` expression on the target.
    async fn check_statement(&self, condition: &str) -> bool {
        let command = format!("[ {} ] && echo \"true\"", condition);
        match self.run_raw(&command).await {
            Ok(output) => output.stdout.trim() == "true",
            Err(e) => {
                tracing::debug!("Statement {} failed on {}: {}", condition, self.host(), e);
                false
            }
        }
    }

    async fn from_to(&self, command: &str, from: &str, to: &str) -> Result<RunOutput> {
        if let Some((parent, _)) = to.rsplit_once('/')
            && !parent.is_empty()
            && !self.file_exists(parent).await
        {
            self.create_folder(parent, true).await?;
        }

        self.run(format!("{} {} {}", command, from, to)).await
    }
}
