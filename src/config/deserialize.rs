// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Servers may be written as "local", "user@host:port", or a full mapping.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::ServerConfig;
use crate::types::ApplicationName;

pub fn deserialize_application_name<'de, D>(deserializer: D) -> Result<ApplicationName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ApplicationName::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_servers<'de, D>(deserializer: D) -> Result<NonEmpty<ServerConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let servers = Vec::<ServerSpec>::deserialize(deserializer)?
        .into_iter()
        .map(ServerSpec::resolve)
        .collect::<Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)?;

    NonEmpty::from_vec(servers)
        .ok_or_else(|| serde::de::Error::custom("at least one server is required"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerSpec {
    Shorthand(String),
    Full(ServerConfig),
}

impl ServerSpec {
    fn resolve(self) -> Result<ServerConfig, String> {
        match self {
            ServerSpec::Shorthand(spec) if spec == "local" => Ok(ServerConfig::local()),
            ServerSpec::Shorthand(spec) => ServerConfig::parse(&spec),
            ServerSpec::Full(server) => Ok(server),
        }
    }
}
