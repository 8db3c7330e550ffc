use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    Parse,
    KeyNotFound,
    Identity,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("parse error at byte {offset}: {reason}")]
    Parse { offset: usize, reason: String },

    #[error("key not found: {segment}")]
    KeyNotFound { segment: String },

    #[error("user not found: {input}")]
    Identity { input: String },

    /// A per-user file was requested before any user was selected.
    #[error("no user selected")]
    NoUser,

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CoreError {
    pub fn parse(offset: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            reason: reason.into(),
        }
    }

    pub fn key_not_found(segment: impl Into<String>) -> Self {
        Self::KeyNotFound {
            segment: segment.into(),
        }
    }

    pub fn identity(input: impl Into<String>) -> Self {
        Self::Identity {
            input: input.into(),
        }
    }

    pub fn no_user() -> Self {
        Self::NoUser
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> CoreErrorCode {
        match self {
            Self::Parse { .. } => CoreErrorCode::Parse,
            Self::KeyNotFound { .. } => CoreErrorCode::KeyNotFound,
            Self::Identity { .. } | Self::NoUser => CoreErrorCode::Identity,
            Self::Io { .. } => CoreErrorCode::Io,
        }
    }

    /// The missing path segment, if this is a lookup failure.
    pub fn missing_segment(&self) -> Option<&str> {
        match self {
            Self::KeyNotFound { segment } => Some(segment),
            _ => None,
        }
    }
}
