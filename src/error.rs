// src/error.rs

//! Error taxonomy for command execution.
//!
//! Every variant carries the stable, user-facing message the protocol
//! layer sends back verbatim. Command failures are local and synchronous:
//! they never corrupt store state and never abort other queued commands.

use thiserror::Error;

/// Result alias used by the type stores and the engine internals.
pub type CmdResult<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("value is not an integer or out of range")]
    NotAnInteger,

    #[error("value is not a valid float")]
    NotAFloat,

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("MULTI calls can not be nested")]
    NestedMulti,

    #[error("EXEC without MULTI")]
    ExecWithoutMulti,

    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,

    #[error("index out of range")]
    IndexOutOfRange,

    #[error("min or max not valid string range item")]
    BadLexRange,

    #[error("syntax error")]
    Syntax,

    #[error("wrong number of arguments for '{0}'")]
    WrongArity(String),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sled::Error> for CommandError {
    fn from(e: sled::Error) -> Self {
        CommandError::Storage(e.to_string())
    }
}

impl CommandError {
    /// Wire form of the error. WRONGTYPE carries its own tag; everything
    /// else gets the generic ERR prefix.
    pub fn reply_message(&self) -> String {
        match self {
            CommandError::WrongType => self.to_string(),
            other => format!("ERR {}", other),
        }
    }
}
