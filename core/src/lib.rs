//! rimebridge-core
//!
//! Engine-agnostic half of the session bridge: everything between a
//! host's dynamically-typed call surface and a native input-method
//! engine, minus the FFI itself. The native binding lives in the
//! `rimebridge` crate; tests and alternative backends plug in through
//! the same [`EngineApi`] seam.
//!
//! Public API:
//! - `Bridge` - Explicit bridge context: typed commands + named dispatch
//! - `EngineApi` / `ConfigReader` - The native-engine seam
//! - `ContextSnapshot`, `Commit`, `SchemaEntry` - Owned engine snapshots
//! - `NotificationQueue` - Drainable engine→host message relay
//! - `Traits` - Engine startup configuration
//! - `BridgeError` - Boundary error taxonomy

pub mod session;
pub use session::SessionId;

pub mod key;
pub use key::{AsciiSwitchKey, RELEASE_MASK};

pub mod composition;
pub use composition::Composition;

pub mod candidate;
pub use candidate::{candidates_to_value, Candidate};

pub mod context;
pub use context::{ContextSnapshot, Menu};

pub mod commit;
pub use commit::Commit;

pub mod schema;
pub use schema::{schema_list_to_value, SchemaEntry};

pub mod traits;
pub use traits::Traits;

pub mod engine;
pub use engine::{ConfigReader, EngineApi};

pub mod notify;
pub use notify::{Notification, NotificationQueue};

pub mod error;
pub use error::{ArgKind, BridgeError};

pub mod args;

pub mod dispatch;
pub use dispatch::{Bridge, BridgeOptions, CommandSpec, COMMANDS};

pub mod testing;
