// ABOUTME: Release manager error types with SNAFU pattern.
// ABOUTME: Wraps transport and storage failures with the release operation that hit them.

use chrono::{DateTime, Utc};
use snafu::Snafu;

use super::StorageError;
use crate::types::ReleaseId;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReleaseError {
    #[snafu(display("command could not be sent to {host}: {source}"))]
    Shell {
        host: String,
        source: crate::connection::Error,
    },

    #[snafu(display("release history unavailable: {source}"))]
    History { source: StorageError },

    #[snafu(display("failed to create release folder {path}: {message}"))]
    CreateFolder { path: String, message: String },

    #[snafu(display("failed to promote release {release}: {message}"))]
    Promote {
        release: ReleaseId,
        command: String,
        message: String,
    },

    #[snafu(display("no previous release to roll back to"))]
    NothingToRollback,

    #[snafu(display("release {release} does not exist on {host}"))]
    UnknownRelease { release: ReleaseId, host: String },

    #[snafu(display("failed to remove old releases: {message}"))]
    Cleanup { command: String, message: String },

    #[snafu(display("deploy lock error: {message}"))]
    Lock { message: String },

    #[snafu(display("deploy lock held by {holder} (pid {pid}) since {started_at}"))]
    LockHeld {
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseErrorKind {
    /// The command never reached the target.
    Transport,
    /// Release history could not be read or written.
    Storage,
    /// A remote command ran and failed.
    CommandFailed,
    /// Nothing to roll back to, or the requested release is missing.
    NoSuchRelease,
    /// Another deployment holds the target.
    Locked,
}

impl ReleaseError {
    pub fn kind(&self) -> ReleaseErrorKind {
        match self {
            ReleaseError::Shell { .. } => ReleaseErrorKind::Transport,
            ReleaseError::History { .. } => ReleaseErrorKind::Storage,
            ReleaseError::CreateFolder { .. }
            | ReleaseError::Promote { .. }
            | ReleaseError::Cleanup { .. }
            | ReleaseError::Lock { .. } => ReleaseErrorKind::CommandFailed,
            ReleaseError::NothingToRollback | ReleaseError::UnknownRelease { .. } => {
                ReleaseErrorKind::NoSuchRelease
            }
            ReleaseError::LockHeld { .. } => ReleaseErrorKind::Locked,
        }
    }

    /// The command that failed, when one ran.
    pub fn command(&self) -> Option<&str> {
        match self {
            ReleaseError::Promote { command, .. } | ReleaseError::Cleanup { command, .. } => {
                Some(command)
            }
            _ => None,
        }
    }
}
