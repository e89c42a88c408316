// ABOUTME: Transport-level error types for local and SSH connections.
// ABOUTME: A non-zero exit status is not an error here; only failing to run a command is.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not reach target: {0}")]
    Connection(String),

    #[error("target rejected every offered credential")]
    AuthenticationFailed,

    #[error("no usable SSH agent: {0}")]
    AgentUnavailable(String),

    #[error("unreadable private key {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("could not run command: {0}")]
    CommandFailed(String),

    #[error("no exit status within {0:?}")]
    CommandTimeout(Duration),

    #[error("session channel closed before reporting an exit status")]
    ChannelClosed,

    #[error("copying {path} failed: {reason}")]
    Transfer { path: String, reason: String },

    #[error(transparent)]
    Protocol(#[from] russh::Error),

    #[error("local I/O: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
