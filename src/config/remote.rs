// ABOUTME: Remote filesystem options: symlink style, separators, shared folders, permissions.
// ABOUTME: Read as `remote.*` keys of the configuration file.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub symlink: SymlinkMode,

    #[serde(default)]
    pub atomic_symlinks: AtomicSymlinks,

    #[serde(default)]
    pub variables: RemoteVariables,

    /// Folders kept across releases, relative to the release root.
    #[serde(default)]
    pub shared: Vec<String>,

    #[serde(default)]
    pub permissions: PermissionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteVariables {
    #[serde(default = "default_directory_separator")]
    pub directory_separator: String,
}

impl Default for RemoteVariables {
    fn default() -> Self {
        RemoteVariables {
            directory_separator: default_directory_separator(),
        }
    }
}

fn default_directory_separator() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Folders of the release that receive the permission commands.
    #[serde(default)]
    pub files: Vec<String>,

    /// Command templates; `{folder}` is replaced by the absolute folder path.
    #[serde(default)]
    pub callback: Vec<String>,
}

impl PermissionsConfig {
    /// Render the command templates for one folder.
    pub fn commands_for(&self, folder: &str) -> Vec<String> {
        self.callback
            .iter()
            .map(|template| template.replace("{folder}", folder))
            .collect()
    }
}

/// How the `current` and shared-folder links point at their targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymlinkMode {
    #[default]
    Absolute,
    Relative,
}

impl FromStr for SymlinkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absolute" => Ok(SymlinkMode::Absolute),
            "relative" => Ok(SymlinkMode::Relative),
            _ => Err(format!("unknown symlink mode: {} (expected absolute or relative)", s)),
        }
    }
}

impl fmt::Display for SymlinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymlinkMode::Absolute => write!(f, "absolute"),
            SymlinkMode::Relative => write!(f, "relative"),
        }
    }
}

/// Whether symlinks are replaced with an atomic rename.
///
/// `auto` uses the rename on Linux targets, where `mv -T` is available, and
/// falls back to remove-then-link elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtomicSymlinks {
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for AtomicSymlinks {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(AtomicSymlinks::Auto),
            "always" => Ok(AtomicSymlinks::Always),
            "never" => Ok(AtomicSymlinks::Never),
            _ => Err(format!("unknown atomic_symlinks value: {}", s)),
        }
    }
}

impl fmt::Display for AtomicSymlinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicSymlinks::Auto => write!(f, "auto"),
            AtomicSymlinks::Always => write!(f, "always"),
            AtomicSymlinks::Never => write!(f, "never"),
        }
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    };
}

string_serde!(SymlinkMode);
string_serde!(AtomicSymlinks);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symlink_mode_parses() {
        assert_eq!("relative".parse::<SymlinkMode>(), Ok(SymlinkMode::Relative));
        assert_eq!("absolute".parse::<SymlinkMode>(), Ok(SymlinkMode::Absolute));
        assert!("hard".parse::<SymlinkMode>().is_err());
    }

    #[test]
    fn atomic_symlinks_round_trips_through_display() {
        for value in [AtomicSymlinks::Auto, AtomicSymlinks::Always, AtomicSymlinks::Never] {
            assert_eq!(value.to_string().parse::<AtomicSymlinks>(), Ok(value));
        }
    }

    #[test]
    fn permission_templates_receive_folder() {
        let permissions = PermissionsConfig {
            files: vec!["storage".to_string()],
            callback: vec![
                "chmod -R 755 {folder}".to_string(),
                "chown -R www-data:www-data {folder}".to_string(),
            ],
        };
        assert_eq!(
            permissions.commands_for("/srv/app/releases/1/storage"),
            vec![
                "chmod -R 755 /srv/app/releases/1/storage",
                "chown -R www-data:www-data /srv/app/releases/1/storage",
            ]
        );
    }

    #[test]
    fn default_separator_is_slash() {
        assert_eq!(RemoteConfig::default().variables.directory_separator, "/");
    }
}
