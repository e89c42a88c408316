// ABOUTME: Validated application name used as the deployment folder name.
// ABOUTME: Restricts names to characters that are safe inside unquoted shell paths.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationNameError {
    #[error("application name cannot be empty")]
    Empty,

    #[error("application name exceeds maximum length of 64 characters")]
    TooLong,

    #[error("application name cannot start with '{0}'")]
    InvalidStart(char),

    #[error("invalid character in application name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApplicationName(String);

impl ApplicationName {
    pub fn new(value: &str) -> Result<Self, ApplicationNameError> {
        if value.is_empty() {
            return Err(ApplicationNameError::Empty);
        }

        if value.len() > 64 {
            return Err(ApplicationNameError::TooLong);
        }

        // A leading dot or hyphen would turn the folder into a hidden file or a flag
        if let Some(first) = value.chars().next()
            && (first == '.' || first == '-')
        {
            return Err(ApplicationNameError::InvalidStart(first));
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
                return Err(ApplicationNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ApplicationName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
