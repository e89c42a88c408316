// ABOUTME: Configuration types and parsing for skyhook.yml.
// ABOUTME: Handles YAML parsing, discovery, defaults, and dotted option lookup.

mod deserialize;
mod env_value;
mod init;
mod remote;
mod repository;
mod server;

pub use env_value::EnvValue;
pub use init::init_config;
pub use remote::{AtomicSymlinks, PermissionsConfig, RemoteConfig, RemoteVariables, SymlinkMode};
pub use repository::RepositoryConfig;
pub use server::ServerConfig;

use crate::error::{Error, Result};
use crate::shell::{Normalizer, PermissionsCallback};
use crate::types::ApplicationName;
use deserialize::{deserialize_application_name, deserialize_servers};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "skyhook.yml";
pub const CONFIG_FILENAME_ALT: &str = "skyhook.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".skyhook/config.yml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_application_name")]
    pub application: ApplicationName,

    #[serde(default = "default_root_directory")]
    pub root_directory: String,

    #[serde(deserialize_with = "deserialize_servers")]
    pub servers: NonEmpty<ServerConfig>,

    /// Stages deployed to on every server. Empty means a single unnamed stage.
    #[serde(default)]
    pub stages: Vec<String>,

    #[serde(default = "default_keep_releases")]
    pub keep_releases: usize,

    /// Number of targets deployed in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,

    #[serde(default)]
    pub repository: Option<RepositoryConfig>,

    #[serde(default)]
    pub strategies: StrategiesConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub migrations: MigrationsConfig,

    /// Binaries whose invocations receive `--env="<stage>"`.
    #[serde(default = "default_env_tagged")]
    pub env_tagged: Vec<String>,

    #[serde(default)]
    pub hooks: HooksConfig,

    /// Hold a lock file on each target while deploying.
    #[serde(default = "default_lock")]
    pub lock: bool,
}

/// Strategy names per capability. `null` leaves a capability unconfigured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategiesConfig {
    #[serde(default = "default_deploy_strategy")]
    pub deploy: Option<String>,

    #[serde(default = "default_scm_strategy")]
    pub scm: Option<String>,

    #[serde(default = "default_dependencies_strategy")]
    pub dependencies: Option<String>,

    #[serde(default = "default_migrate_strategy")]
    pub migrate: Option<String>,
}

impl Default for StrategiesConfig {
    fn default() -> Self {
        StrategiesConfig {
            deploy: default_deploy_strategy(),
            scm: default_scm_strategy(),
            dependencies: default_dependencies_strategy(),
            migrate: default_migrate_strategy(),
        }
    }
}

fn default_deploy_strategy() -> Option<String> {
    Some("clone".to_string())
}

fn default_scm_strategy() -> Option<String> {
    Some("git".to_string())
}

fn default_dependencies_strategy() -> Option<String> {
    Some("polyglot".to_string())
}

fn default_migrate_strategy() -> Option<String> {
    Some("artisan".to_string())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub seed: bool,
}

/// Commands run before or after a named task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub before: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub after: HashMap<String, Vec<String>>,
}

fn default_root_directory() -> String {
    "/home/www".to_string()
}

fn default_keep_releases() -> usize {
    4
}

fn default_concurrency() -> usize {
    1
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_env_tagged() -> Vec<String> {
    vec!["artisan".to_string()]
}

fn default_lock() -> bool {
    true
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.remote.variables.directory_separator.is_empty() {
            return Err(Error::InvalidConfig(
                "remote.variables.directory_separator cannot be empty".to_string(),
            ));
        }
        if let Some(stage) = self.stages.iter().find(|s| s.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!("invalid stage name: '{}'", stage)));
        }
        Ok(())
    }

    /// Look up an option by dotted key, e.g. `remote.symlink`.
    pub fn option(&self, key: &str) -> Option<serde_json::Value> {
        let mut value = serde_json::to_value(self).ok()?;
        for part in key.split('.') {
            value = value.get_mut(part)?.take();
        }
        Some(value)
    }

    /// Stages to deploy: the configured ones, or a single unnamed stage.
    pub fn stage_list(&self) -> Vec<Option<String>> {
        if self.stages.is_empty() {
            vec![None]
        } else {
            self.stages.iter().cloned().map(Some).collect()
        }
    }

    /// Normalizer for commands sent to a target of `stage`.
    pub fn normalizer(&self, stage: Option<&str>) -> Normalizer {
        Normalizer::new()
            .stage(stage)
            .separator(self.remote.variables.directory_separator.clone())
            .env_tagged(self.env_tagged.clone())
    }

    /// Permission command callback, if any commands are configured.
    pub fn permissions_callback(&self) -> Option<PermissionsCallback> {
        if self.remote.permissions.callback.is_empty() {
            return None;
        }
        let permissions = self.remote.permissions.clone();
        Some(Arc::new(move |folder: &str| permissions.commands_for(folder)))
    }

    pub fn template() -> Self {
        Config {
            application: ApplicationName::new("my-app").expect("template name is valid"),
            root_directory: default_root_directory(),
            servers: NonEmpty::new(ServerConfig {
                host: "server.example.com".to_string(),
                port: 22,
                user: Some("deploy".to_string()),
                key: None,
                local: false,
                trust_first_connection: true,
            }),
            stages: Vec::new(),
            keep_releases: default_keep_releases(),
            concurrency: default_concurrency(),
            command_timeout: default_command_timeout(),
            repository: Some(RepositoryConfig::new("git@github.com:acme/my-app.git")),
            strategies: StrategiesConfig::default(),
            remote: RemoteConfig::default(),
            migrations: MigrationsConfig::default(),
            env_tagged: default_env_tagged(),
            hooks: HooksConfig::default(),
            lock: default_lock(),
        }
    }
}
