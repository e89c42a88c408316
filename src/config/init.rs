// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates skyhook.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::ApplicationName;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(
    dir: &Path,
    application: Option<&str>,
    repository: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(name) = application {
        config.application =
            ApplicationName::new(name).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    let repository = repository
        .map(str::to_string)
        .or_else(|| config.repository.as_ref().map(|r| r.url.clone()))
        .unwrap_or_default();

    let yaml = generate_template_yaml(&config, &repository);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config, repository: &str) -> String {
    let first_server = config.servers.first();
    format!(
        r#"application: {}
root_directory: {}
servers:
  - host: {}
    port: {}
    user: {}
# stages: [staging, production]
keep_releases: {}

repository:
  url: {}
  branch: main

strategies:
  deploy: clone
  scm: git
  dependencies: polyglot

remote:
  # absolute or relative
  symlink: absolute
  shared: []
  permissions:
    files: []
    # callback:
    #   - chmod -R 755 {{folder}}
"#,
        config.application,
        config.root_directory,
        first_server.host,
        first_server.port,
        first_server.user.as_deref().unwrap_or("deploy"),
        config.keep_releases,
        repository,
    )
}
