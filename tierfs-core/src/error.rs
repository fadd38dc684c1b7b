use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TierError>;

#[derive(Error, Debug)]
pub enum TierError {
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Tier has not been started")]
    NotStarted,

    #[error("Tier is already started")]
    AlreadyStarted,

    #[error("Tier is already shut down")]
    AlreadyShutDown,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unknown drive: {0}")]
    UnknownDrive(String),

    #[error("Duplicate drive: {0}")]
    DuplicateDrive(String),

    #[error("Duplicate index entry: {0}")]
    DuplicateEntry(String),

    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    #[error("Storage error on {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wire name of an error, sent back to the supervisor in error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "MalformedCommandError")]
    MalformedCommand,
    #[serde(rename = "UnknownCommandError")]
    UnknownCommand,
    #[serde(rename = "MissingArgumentError")]
    MissingArgument,
    #[serde(rename = "NotStartedError")]
    NotStarted,
    #[serde(rename = "AlreadyStartedError")]
    AlreadyStarted,
    #[serde(rename = "AlreadyShutDownError")]
    AlreadyShutDown,
    #[serde(rename = "InvalidStateError")]
    InvalidState,
    #[serde(rename = "NotFoundError")]
    NotFound,
    #[serde(rename = "AlreadyExistsError")]
    AlreadyExists,
    #[serde(rename = "UnknownDriveError")]
    UnknownDrive,
    #[serde(rename = "DuplicateDriveError")]
    DuplicateDrive,
    #[serde(rename = "DuplicateEntryError")]
    DuplicateEntry,
    #[serde(rename = "IndexCorruptionError")]
    IndexCorruption,
    #[serde(rename = "StorageError")]
    Storage,
    #[serde(rename = "ConfigError")]
    Config,
    #[serde(rename = "InternalError")]
    Internal,
}

impl TierError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedCommand(_) => ErrorKind::MalformedCommand,
            Self::UnknownCommand(_) => ErrorKind::UnknownCommand,
            Self::MissingArgument(_) => ErrorKind::MissingArgument,
            Self::NotStarted => ErrorKind::NotStarted,
            Self::AlreadyStarted => ErrorKind::AlreadyStarted,
            Self::AlreadyShutDown => ErrorKind::AlreadyShutDown,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::UnknownDrive(_) => ErrorKind::UnknownDrive,
            Self::DuplicateDrive(_) => ErrorKind::DuplicateDrive,
            Self::DuplicateEntry(_) => ErrorKind::DuplicateEntry,
            Self::IndexCorruption(_) => ErrorKind::IndexCorruption,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Config(_) => ErrorKind::Config,
            Self::Protocol(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Internal,
        }
    }

    /// Classify an I/O failure against a tier path. A missing file is reported
    /// as `NotFound`, an occupied target as `AlreadyExists`; everything else
    /// keeps its native cause as a storage error.
    pub fn from_io(path: &str, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_string()),
            _ => Self::Storage {
                path: path.to_string(),
                source,
            },
        }
    }

    pub fn storage(path: &str, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.to_string(),
            source: std::io::Error::other(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_are_classified() {
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(
            TierError::from_io("a.txt", missing).kind(),
            ErrorKind::NotFound
        );

        let occupied = std::io::Error::from(std::io::ErrorKind::AlreadyExists);
        assert_eq!(
            TierError::from_io("a.txt", occupied).kind(),
            ErrorKind::AlreadyExists
        );

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let error = TierError::from_io("a.txt", denied);
        assert_eq!(error.kind(), ErrorKind::Storage);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_error_kind_wire_names() {
        let encoded = serde_json::to_string(&ErrorKind::AlreadyShutDown).unwrap();
        assert_eq!(encoded, "\"AlreadyShutDownError\"");

        let decoded: ErrorKind = serde_json::from_str("\"IndexCorruptionError\"").unwrap();
        assert_eq!(decoded, ErrorKind::IndexCorruption);
    }
}
