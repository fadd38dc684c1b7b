//! Wire protocol between a tier process and its supervisor.

pub mod codec;
pub mod command;
pub mod message;

pub use codec::{read_frame, write_frame};
pub use command::{ALIASES, ArgShape, Command, CommandKind, validate_alias_table};
pub use message::{Payload, Response};
