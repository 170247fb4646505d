//! Session identifiers.
//!
//! Sessions live inside the engine; the bridge never creates or tracks
//! them. All it holds is the opaque identifier the engine issued, and the
//! only local judgement it makes is screening out the zero sentinel before
//! forwarding a call. Everything else (stale ids, foreign ids) is decided
//! by the engine's own return codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque session identifier issued by the engine.
///
/// Zero means "no session": it is what session creation returns on
/// failure, and no live session ever has it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    /// The "no session" sentinel.
    pub const NONE: SessionId = SessionId(0);

    /// Whether this identifier can possibly name a live session.
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Raw engine-side value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for SessionId {
    fn from(raw: u64) -> Self {
        SessionId(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
