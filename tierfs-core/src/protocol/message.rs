use crate::operations::FileHandle;
use crate::storage::{IndexEntry, IndexSnapshot, MergeReport};
use crate::{ErrorKind, TierError};
use serde::{Deserialize, Serialize};

/// Successful result of one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    None,
    FileInfo(IndexEntry),
    Handle(FileHandle),
    Exists(bool),
    Snapshot(IndexSnapshot),
    Merged(MergeReport),
    DriveNames(Vec<String>),
}

/// One reply per request, sent over the same channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { payload: Payload },
    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn ok(payload: Payload) -> Self {
        Self::Ok { payload }
    }

    pub fn error(error: &TierError) -> Self {
        Self::Error {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Ok { .. } => None,
            Self::Error { kind, .. } => Some(*kind),
        }
    }
}

impl From<crate::Result<Payload>> for Response {
    fn from(result: crate::Result<Payload>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(error) => Self::error(&error),
        }
    }
}
