use crate::storage::IndexSnapshot;
use crate::{Result, TierError};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Startup,
    GetFileInfo,
    OpenFile,
    CopyFile,
    MoveFile,
    MakeNewFile,
    DeleteFile,
    Exists,
    Shutdown,
    DumpIndex,
    RefreshIndex,
    ApplySavedIndex,
    GetDriveNames,
}

/// Shape of one positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    Path,
    Snapshot,
}

/// Every accepted spelling of every command. Lookup is case-sensitive.
pub const ALIASES: &[(&str, CommandKind)] = &[
    ("STARTUP", CommandKind::Startup),
    ("START", CommandKind::Startup),
    ("INIT", CommandKind::Startup),
    ("GET_FILE_INFO", CommandKind::GetFileInfo),
    ("OPEN_FILE", CommandKind::OpenFile),
    ("COPY_FILE", CommandKind::CopyFile),
    ("MOVE_FILE", CommandKind::MoveFile),
    ("MAKE_NEW_FILE", CommandKind::MakeNewFile),
    ("NEW_FILE", CommandKind::MakeNewFile),
    ("DELETE_FILE", CommandKind::DeleteFile),
    ("REMOVE_FILE", CommandKind::DeleteFile),
    ("REMOVE", CommandKind::DeleteFile),
    ("DELETE", CommandKind::DeleteFile),
    ("EXISTS", CommandKind::Exists),
    ("SHUTDOWN", CommandKind::Shutdown),
    ("DUMP_INDEX", CommandKind::DumpIndex),
    ("REFRESH_INDEX", CommandKind::RefreshIndex),
    ("APPLY_SAVED_INDEX", CommandKind::ApplySavedIndex),
    ("GET_DRIVE_NAMES", CommandKind::GetDriveNames),
];

impl CommandKind {
    pub const ALL: [CommandKind; 13] = [
        CommandKind::Startup,
        CommandKind::GetFileInfo,
        CommandKind::OpenFile,
        CommandKind::CopyFile,
        CommandKind::MoveFile,
        CommandKind::MakeNewFile,
        CommandKind::DeleteFile,
        CommandKind::Exists,
        CommandKind::Shutdown,
        CommandKind::DumpIndex,
        CommandKind::RefreshIndex,
        CommandKind::ApplySavedIndex,
        CommandKind::GetDriveNames,
    ];

    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Startup => "STARTUP",
            Self::GetFileInfo => "GET_FILE_INFO",
            Self::OpenFile => "OPEN_FILE",
            Self::CopyFile => "COPY_FILE",
            Self::MoveFile => "MOVE_FILE",
            Self::MakeNewFile => "MAKE_NEW_FILE",
            Self::DeleteFile => "DELETE_FILE",
            Self::Exists => "EXISTS",
            Self::Shutdown => "SHUTDOWN",
            Self::DumpIndex => "DUMP_INDEX",
            Self::RefreshIndex => "REFRESH_INDEX",
            Self::ApplySavedIndex => "APPLY_SAVED_INDEX",
            Self::GetDriveNames => "GET_DRIVE_NAMES",
        }
    }

    pub fn arguments(self) -> &'static [ArgShape] {
        match self {
            Self::Startup | Self::Shutdown | Self::DumpIndex | Self::GetDriveNames => &[],
            Self::GetFileInfo
            | Self::OpenFile
            | Self::MakeNewFile
            | Self::DeleteFile
            | Self::Exists => &[ArgShape::Path],
            Self::CopyFile | Self::MoveFile => &[ArgShape::Path, ArgShape::Path],
            Self::RefreshIndex | Self::ApplySavedIndex => &[ArgShape::Snapshot],
        }
    }

    pub fn resolve(name: &str) -> Result<Self> {
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| TierError::UnknownCommand(name.to_string()))
    }
}

/// Check the alias table: every kind is reachable through its canonical
/// name and no spelling is claimed twice.
pub fn validate_alias_table() -> Result<()> {
    let mut seen: HashMap<&str, CommandKind> = HashMap::new();
    for (alias, kind) in ALIASES {
        if let Some(previous) = seen.insert(*alias, *kind) {
            return Err(TierError::Config(format!(
                "alias {} is mapped to both {:?} and {:?}",
                alias, previous, kind
            )));
        }
    }

    for kind in CommandKind::ALL {
        if seen.get(kind.canonical_name()) != Some(&kind) {
            return Err(TierError::Config(format!(
                "command {:?} has no spelling {}",
                kind,
                kind.canonical_name()
            )));
        }
    }
    Ok(())
}

/// A decoded request with its arguments checked against the command's shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Startup,
    GetFileInfo { path: String },
    OpenFile { path: String },
    CopyFile { src: String, dest: String },
    MoveFile { src: String, dest: String },
    MakeNewFile { path: String },
    DeleteFile { path: String },
    Exists { path: String },
    Shutdown,
    DumpIndex,
    RefreshIndex { snapshot: IndexSnapshot },
    ApplySavedIndex { snapshot: IndexSnapshot },
    GetDriveNames,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Startup => CommandKind::Startup,
            Self::GetFileInfo { .. } => CommandKind::GetFileInfo,
            Self::OpenFile { .. } => CommandKind::OpenFile,
            Self::CopyFile { .. } => CommandKind::CopyFile,
            Self::MoveFile { .. } => CommandKind::MoveFile,
            Self::MakeNewFile { .. } => CommandKind::MakeNewFile,
            Self::DeleteFile { .. } => CommandKind::DeleteFile,
            Self::Exists { .. } => CommandKind::Exists,
            Self::Shutdown => CommandKind::Shutdown,
            Self::DumpIndex => CommandKind::DumpIndex,
            Self::RefreshIndex { .. } => CommandKind::RefreshIndex,
            Self::ApplySavedIndex { .. } => CommandKind::ApplySavedIndex,
            Self::GetDriveNames => CommandKind::GetDriveNames,
        }
    }

    /// Decode `[name, arg...]`.
    pub fn decode(message: Vec<Value>) -> Result<Self> {
        let mut parts = message.into_iter();
        let name = match parts.next() {
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(TierError::MalformedCommand(format!(
                    "command name must be a string, got {}",
                    other
                )));
            }
            None => return Err(TierError::MalformedCommand("empty message".to_string())),
        };

        let kind = CommandKind::resolve(&name)?;
        let raw: Vec<Value> = parts.collect();
        let shapes = kind.arguments();
        if raw.len() != shapes.len() {
            return Err(TierError::MalformedCommand(format!(
                "{} expects {} argument(s), got {}",
                kind.canonical_name(),
                shapes.len(),
                raw.len()
            )));
        }

        let mut args = ArgReader {
            kind,
            values: raw.into_iter(),
            position: 0,
        };

        Ok(match kind {
            CommandKind::Startup => Command::Startup,
            CommandKind::GetFileInfo => Command::GetFileInfo { path: args.path()? },
            CommandKind::OpenFile => Command::OpenFile { path: args.path()? },
            CommandKind::CopyFile => Command::CopyFile {
                src: args.path()?,
                dest: args.path()?,
            },
            CommandKind::MoveFile => Command::MoveFile {
                src: args.path()?,
                dest: args.path()?,
            },
            CommandKind::MakeNewFile => Command::MakeNewFile { path: args.path()? },
            CommandKind::DeleteFile => Command::DeleteFile { path: args.path()? },
            CommandKind::Exists => Command::Exists { path: args.path()? },
            CommandKind::Shutdown => Command::Shutdown,
            CommandKind::DumpIndex => Command::DumpIndex,
            CommandKind::RefreshIndex => Command::RefreshIndex {
                snapshot: args.snapshot()?,
            },
            CommandKind::ApplySavedIndex => Command::ApplySavedIndex {
                snapshot: args.snapshot()?,
            },
            CommandKind::GetDriveNames => Command::GetDriveNames,
        })
    }
}

/// Positional arguments of one message, consumed in order.
struct ArgReader {
    kind: CommandKind,
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl ArgReader {
    fn next(&mut self) -> Result<Value> {
        self.position += 1;
        self.values.next().ok_or_else(|| {
            TierError::MalformedCommand(format!(
                "{} is missing argument {}",
                self.kind.canonical_name(),
                self.position
            ))
        })
    }

    fn path(&mut self) -> Result<String> {
        match self.next()? {
            Value::String(path) => Ok(path),
            other => Err(TierError::MalformedCommand(format!(
                "{} argument {} must be a path string, got {}",
                self.kind.canonical_name(),
                self.position,
                other
            ))),
        }
    }

    fn snapshot(&mut self) -> Result<IndexSnapshot> {
        let value = self.next()?;
        serde_json::from_value(value).map_err(|e| {
            TierError::MalformedCommand(format!(
                "{} argument {} is not an index snapshot: {}",
                self.kind.canonical_name(),
                self.position,
                e
            ))
        })
    }
}
