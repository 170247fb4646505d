//! Bridge error taxonomy.
//!
//! Only boundary failures become Rust errors. An operation the engine
//! refuses (false/zero return) is not an error here; dispatch degrades
//! it to a false/null result plus a notification so the host keeps
//! running.

use thiserror::Error;

/// What a host argument slot was expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Unsigned session identifier.
    SessionId,
    /// Signed integer (key code, modifier mask).
    Integer,
    /// UTF-8 string (schema id).
    Text,
}

impl ArgKind {
    pub fn describe(self) -> &'static str {
        match self {
            ArgKind::SessionId => "session id",
            ArgKind::Integer => "integer",
            ArgKind::Text => "string",
        }
    }
}

/// Errors surfaced to the host at the bridge boundary.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The engine library could not be bound, or its initialization
    /// sequence failed. Detected before any command can be dispatched.
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A host-supplied argument did not match the command's declared
    /// type. Rejected at the boundary instead of being coerced to a
    /// zero or empty value the engine would silently accept.
    #[error("{command}: argument {index} is not a valid {}", .expected.describe())]
    InvalidArgument {
        command: &'static str,
        index: usize,
        expected: ArgKind,
    },

    /// Dispatch was asked for a command that does not exist.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}
