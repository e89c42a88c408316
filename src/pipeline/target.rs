// ABOUTME: Deployment targets: one per (server, stage), each with its own connection.
// ABOUTME: Also resolves which servers and stages a command line selects, and which are unreachable.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ServerConfig};
use crate::connection::{self, Connection, LocalConnection, SshConnection};
use crate::error::{Error, Result};

/// One (server, stage) deployment destination.
#[derive(Clone)]
pub struct Target {
    host: String,
    stage: Option<String>,
    connection: Arc<dyn Connection>,
}

impl Target {
    pub fn new(connection: Arc<dyn Connection>, stage: Option<String>) -> Self {
        Self {
            host: connection.host().to_string(),
            stage,
            connection,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Key of this target's release history.
    pub fn key(&self) -> String {
        match &self.stage {
            Some(stage) => format!("{}.{}", self.host, stage),
            None => self.host.clone(),
        }
    }
}

fn label(host: &str, stage: Option<&str>) -> String {
    match stage {
        Some(stage) => format!("{} ({})", host, stage),
        None => host.to_string(),
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&label(&self.host, self.stage.as_deref()))
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("host", &self.host)
            .field("stage", &self.stage)
            .finish()
    }
}

/// A selected target, or the reason its server could not be reached.
#[derive(Debug)]
pub enum PlannedTarget {
    Ready(Target),
    Unreachable { target: String, error: Error },
}

impl PlannedTarget {
    /// Name of the target in reports.
    pub fn label(&self) -> String {
        match self {
            PlannedTarget::Ready(target) => target.to_string(),
            PlannedTarget::Unreachable { target, .. } => target.clone(),
        }
    }
}

impl From<Target> for PlannedTarget {
    fn from(target: Target) -> Self {
        PlannedTarget::Ready(target)
    }
}

/// Open the connection for a configured server.
pub async fn connect(
    server: &ServerConfig,
    command_timeout: Duration,
) -> connection::Result<Arc<dyn Connection>> {
    if server.local {
        return Ok(Arc::new(LocalConnection::new().with_host(&server.host)));
    }
    let session = SshConnection::connect(server.ssh_session_config(command_timeout)).await?;
    Ok(Arc::new(session))
}

/// Which servers and stages a run covers.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Only this stage.
    pub stage: Option<String>,
    /// Only servers with this host name.
    pub host: Option<String>,
}

impl Selection {
    pub fn servers<'a>(&self, config: &'a Config) -> Result<Vec<&'a ServerConfig>> {
        let servers: Vec<&ServerConfig> = config
            .servers
            .iter()
            .filter(|server| self.host.as_ref().is_none_or(|host| &server.host == host))
            .collect();

        match (&self.host, servers.is_empty()) {
            (Some(host), true) => Err(Error::UnknownServer(host.clone())),
            _ => Ok(servers),
        }
    }

    pub fn stages(&self, config: &Config) -> Result<Vec<Option<String>>> {
        match &self.stage {
            None => Ok(config.stage_list()),
            Some(stage) if config.stages.contains(stage) => Ok(vec![Some(stage.clone())]),
            Some(stage) => Err(Error::UnknownStage(stage.clone())),
        }
    }

    /// Connect to every selected server and pair each with every selected
    /// stage. Servers are connected once and shared across their stages; a
    /// server that cannot be reached yields one unreachable entry per stage.
    pub async fn targets(&self, config: &Config) -> Result<Vec<PlannedTarget>> {
        let servers = self.servers(config)?;
        let stages = self.stages(config)?;

        let mut targets = Vec::new();
        for server in servers {
            tracing::debug!("Connecting to {}", server.host);
            match connect(server, config.command_timeout).await {
                Ok(connection) => {
                    for stage in &stages {
                        targets.push(Target::new(connection.clone(), stage.clone()).into());
                    }
                }
                Err(e) => {
                    tracing::error!(host = %server.host, "Connection failed: {}", e);
                    for stage in &stages {
                        targets.push(PlannedTarget::Unreachable {
                            target: label(&server.host, stage.as_deref()),
                            error: Error::Unreachable {
                                host: server.host.clone(),
                                reason: e.to_string(),
                            },
                        });
                    }
                }
            }
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::from_yaml(
            "application: shop\nservers:\n  - web1.example.com\n  - deploy@web2.example.com\nstages: [staging, production]\n",
        )
        .unwrap()
    }

    #[test]
    fn target_key_includes_stage() {
        let connection: Arc<dyn Connection> = Arc::new(LocalConnection::new().with_host("web1"));
        let target = Target::new(connection.clone(), Some("staging".to_string()));
        assert_eq!(target.key(), "web1.staging");
        assert_eq!(target.to_string(), "web1 (staging)");
        assert_eq!(Target::new(connection, None).key(), "web1");
    }

    #[tokio::test]
    async fn unreachable_servers_do_not_abort_selection() {
        let config = Config::from_yaml(
            "application: shop\nservers:\n  - local\n  - host: 127.0.0.1\n    port: 1\n    key: /nonexistent/skyhook_id_ed25519\nstages: [staging]\n",
        )
        .unwrap();

        let targets = Selection::default().targets(&config).await.unwrap();

        assert_eq!(targets.len(), 2);
        assert!(matches!(&targets[0], PlannedTarget::Ready(t) if t.host() == "localhost"));
        match &targets[1] {
            PlannedTarget::Unreachable { target, error } => {
                assert_eq!(target, "127.0.0.1 (staging)");
                assert!(!error.is_config_error());
            }
            other => panic!("expected an unreachable target, got {:?}", other),
        }
    }

    #[test]
    fn selection_filters_servers_by_host() {
        let config = config();
        let selection = Selection {
            host: Some("web2.example.com".to_string()),
            ..Selection::default()
        };
        let servers = selection.servers(&config).unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].user.as_deref(), Some("deploy"));
    }

    #[test]
    fn unknown_host_is_rejected() {
        let selection = Selection {
            host: Some("db1".to_string()),
            ..Selection::default()
        };
        assert!(matches!(
            selection.servers(&config()),
            Err(Error::UnknownServer(_))
        ));
    }

    #[test]
    fn stages_default_to_all_configured() {
        let stages = Selection::default().stages(&config()).unwrap();
        assert_eq!(
            stages,
            vec![Some("staging".to_string()), Some("production".to_string())]
        );
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let selection = Selection {
            stage: Some("qa".to_string()),
            ..Selection::default()
        };
        assert!(matches!(
            selection.stages(&config()),
            Err(Error::UnknownStage(_))
        ));
    }
}
