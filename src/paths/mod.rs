// ABOUTME: Deployment folder layout on a target plus pure path arithmetic.
// ABOUTME: Maps application-relative folders to absolute paths under the root directory.

mod resolver;

pub use resolver::{PathSpec, explode_path, relative_path};

use crate::types::{ApplicationName, ReleaseId};

pub const RELEASES_FOLDER: &str = "releases";
pub const CURRENT_FOLDER: &str = "current";
pub const SHARED_FOLDER: &str = "shared";

/// Folder layout of one application on a target:
///
/// ```text
/// {root}/{application}[/{stage}]/releases/{id}
/// {root}/{application}[/{stage}]/current -> releases/{id}
/// {root}/{application}[/{stage}]/shared
/// ```
#[derive(Debug, Clone)]
pub struct Paths {
    root: String,
    application: ApplicationName,
    stage: Option<String>,
}

impl Paths {
    pub fn new(root: impl Into<String>, application: ApplicationName) -> Self {
        let root = root.into().trim_end_matches('/').to_string();
        Self {
            root,
            application,
            stage: None,
        }
    }

    /// Keep each stage's releases in its own folder.
    pub fn stage(mut self, stage: Option<&str>) -> Self {
        self.stage = stage
            .map(|stage| stage.trim_matches('/'))
            .filter(|stage| !stage.is_empty())
            .map(str::to_string);
        self
    }

    pub fn application(&self) -> &ApplicationName {
        &self.application
    }

    /// The application's home folder, `{root}/{application}`.
    pub fn home_folder(&self) -> String {
        format!("{}/{}", self.root, self.application)
    }

    /// The home folder of the stage, or the home folder without one.
    pub fn stage_folder(&self) -> String {
        match &self.stage {
            Some(stage) => format!("{}/{}", self.home_folder(), stage),
            None => self.home_folder(),
        }
    }

    /// Resolve a folder against the stage folder.
    ///
    /// Absolute paths are returned unchanged; relative ones are placed under
    /// the stage folder. An empty folder resolves to the stage folder itself.
    pub fn folder(&self, folder: &str) -> String {
        if folder.starts_with('/') {
            return folder.to_string();
        }
        join(&self.stage_folder(), folder.trim_end_matches('/'))
    }

    pub fn releases_folder(&self) -> String {
        self.folder(RELEASES_FOLDER)
    }

    pub fn release_folder(&self, release: &ReleaseId) -> String {
        format!("{}/{}", self.releases_folder(), release)
    }

    /// A folder inside a given release.
    pub fn release_path(&self, release: &ReleaseId, folder: &str) -> String {
        join(&self.release_folder(release), folder)
    }

    pub fn current_folder(&self) -> String {
        self.folder(CURRENT_FOLDER)
    }

    pub fn shared_folder(&self, folder: &str) -> String {
        join(&self.folder(SHARED_FOLDER), folder)
    }
}

fn join(base: &str, folder: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> Paths {
        Paths::new("/home/www/", ApplicationName::new("shop").unwrap())
    }

    #[test]
    fn home_folder_strips_trailing_slash() {
        assert_eq!(paths().home_folder(), "/home/www/shop");
    }

    #[test]
    fn relative_folders_resolve_under_home() {
        assert_eq!(paths().folder("shared/logs"), "/home/www/shop/shared/logs");
        assert_eq!(paths().folder(""), "/home/www/shop");
    }

    #[test]
    fn absolute_folders_are_untouched() {
        assert_eq!(paths().folder("/tmp/build"), "/tmp/build");
    }

    #[test]
    fn release_paths() {
        let id = ReleaseId::parse("20240101120000").unwrap();
        assert_eq!(
            paths().release_folder(&id),
            "/home/www/shop/releases/20240101120000"
        );
        assert_eq!(
            paths().release_path(&id, "storage/logs"),
            "/home/www/shop/releases/20240101120000/storage/logs"
        );
        assert_eq!(
            paths().release_path(&id, ""),
            "/home/www/shop/releases/20240101120000"
        );
    }

    #[test]
    fn current_and_shared_folders() {
        assert_eq!(paths().current_folder(), "/home/www/shop/current");
        assert_eq!(paths().shared_folder(".env"), "/home/www/shop/shared/.env");
    }

    #[test]
    fn stages_get_their_own_folders() {
        let staged = paths().stage(Some("staging"));
        assert_eq!(staged.home_folder(), "/home/www/shop");
        assert_eq!(staged.stage_folder(), "/home/www/shop/staging");
        assert_eq!(staged.current_folder(), "/home/www/shop/staging/current");
        assert_eq!(staged.folder(""), "/home/www/shop/staging");
        assert_eq!(paths().stage(Some("")).stage_folder(), "/home/www/shop");
    }

    #[test]
    fn root_directory_can_be_filesystem_root() {
        let paths = Paths::new("/", ApplicationName::new("shop").unwrap());
        assert_eq!(paths.home_folder(), "/shop");
    }
}
