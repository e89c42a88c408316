// ABOUTME: Application-wide error types for skyhook.
// ABOUTME: Uses thiserror for ergonomic error handling and maps errors to exit codes.

use std::path::PathBuf;
use thiserror::Error;

use crate::releases::{ReleaseError, StorageError};
use crate::strategies::StrategyError;
use crate::tasks::TaskError;
use crate::types::ReleaseIdError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error("no configured server matches: {0}")]
    UnknownServer(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no configuration value at: {0}")]
    UnknownOption(String),

    #[error("invalid release: {0}")]
    InvalidRelease(#[from] ReleaseIdError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Connection(#[from] crate::connection::Error),

    #[error("{host} is unreachable: {reason}")]
    Unreachable { host: String, reason: String },

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether this error stems from configuration rather than execution.
    pub fn is_config_error(&self) -> bool {
        match self {
            Error::ConfigNotFound(_)
            | Error::UnknownStage(_)
            | Error::UnknownServer(_)
            | Error::MissingEnvVar(_)
            | Error::InvalidConfig(_)
            | Error::UnknownOption(_)
            | Error::InvalidRelease(_)
            | Error::Strategy(_)
            | Error::Yaml(_) => true,
            Error::Task(e) => e.is_config_error(),
            _ => false,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_config_error() { 2 } else { 1 }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_exit_with_two() {
        assert_eq!(Error::UnknownStage("qa".to_string()).exit_code(), 2);
        assert_eq!(Error::InvalidConfig("bad".to_string()).exit_code(), 2);
        assert_eq!(
            Error::Strategy(StrategyError::Unconfigured {
                capability: "scm".to_string()
            })
            .exit_code(),
            2
        );
    }

    #[test]
    fn execution_errors_exit_with_one() {
        let io = std::io::Error::other("disk full");
        assert_eq!(Error::Io(io).exit_code(), 1);
        assert_eq!(
            Error::Connection(crate::connection::Error::ChannelClosed).exit_code(),
            1
        );
    }
}
