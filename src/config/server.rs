// ABOUTME: Server entries from the configuration file.
// ABOUTME: Parses formats like "host", "user@host", "host:port", "user@host:port".

use crate::connection::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    /// Private key file; the SSH agent and default keys are tried otherwise.
    #[serde(default)]
    pub key: Option<PathBuf>,
    /// Run commands on this machine instead of connecting over SSH.
    #[serde(default)]
    pub local: bool,
    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
}

fn default_port() -> u16 {
    22
}

fn default_trust_first_connection() -> bool {
    true
}

impl ServerConfig {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("server address cannot be empty".to_string());
        }

        // Parse format: [user@]host[:port]
        let (user_part, rest) = match s.split_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, s),
        };

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {}", port_str))?;
                (host, port)
            }
            None => (rest, 22),
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(ServerConfig {
            host: host.to_string(),
            port,
            user: user_part.map(|s| s.to_string()),
            key: None,
            local: false,
            trust_first_connection: true,
        })
    }

    /// A server that runs everything on the orchestrating machine.
    pub fn local() -> Self {
        ServerConfig {
            host: "localhost".to_string(),
            port: default_port(),
            user: None,
            key: None,
            local: true,
            trust_first_connection: true,
        }
    }

    /// SSH settings for this server. The user defaults to `$USER`.
    pub fn ssh_session_config(&self, command_timeout: Duration) -> SessionConfig {
        let user = self
            .user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()));

        let config = SessionConfig::new(&self.host, user)
            .port(self.port)
            .trust_on_first_use(self.trust_first_connection)
            .command_timeout(command_timeout);

        match &self.key {
            Some(key) => config.key_path(key),
            None => config,
        }
    }
}
