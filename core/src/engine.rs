//! The seam between command dispatch and the native engine.
//!
//! `EngineApi` mirrors the engine's session/query/config surface with
//! owned snapshot returns. Implementations are responsible for the
//! acquire/release pairing on the engine's ephemeral structures: the
//! native binding wraps each query in a release-on-drop guard, and the
//! test double counts acquisitions and releases so the pairing is
//! checkable.
//!
//! Failure vocabulary matches the engine's: queries return `None`/`false`
//! when the engine refuses, and the caller decides how to report that.
//! Only `init` can error, because only binding/initialization failures
//! are unrecoverable.

use crate::commit::Commit;
use crate::context::ContextSnapshot;
use crate::error::BridgeError;
use crate::notify::NotificationQueue;
use crate::schema::SchemaEntry;
use crate::session::SessionId;
use crate::traits::Traits;

/// Read access to one opened engine configuration.
///
/// Dropping the reader closes the underlying handle; implementations tie
/// their close/free call to `Drop` so a handle cannot leak across calls.
pub trait ConfigReader {
    /// String value at a `/`-separated config path, if present.
    fn get_string(&self, key: &str) -> Option<String>;
}

/// The native engine surface the bridge consumes.
///
/// Calls are forwarded as-is: the bridge performs no session bookkeeping
/// beyond the zero-sentinel screen, and an invalid identifier simply
/// comes back as `false`/`None` from the engine.
pub trait EngineApi {
    /// Run the engine's startup sequence: setup, initialize, install the
    /// notification relay, then trigger maintenance and block until it
    /// completes. Maintenance may rebuild dictionaries, so this call has
    /// unbounded latency and no cancellation; run it off the host's main
    /// thread if responsiveness matters.
    fn init(&self, traits: &Traits, notifications: NotificationQueue)
        -> Result<(), BridgeError>;

    /// Release engine resources. Callers serialize this against in-flight
    /// commands; the owning bridge does so by consuming itself first.
    fn finalize(&self);

    /// New session, or `SessionId::NONE` on failure.
    fn create_session(&self) -> SessionId;

    fn destroy_session(&self, session: SessionId) -> bool;

    /// Identifier of the schema active in this session.
    fn current_schema(&self, session: SessionId) -> Option<String>;

    /// Installed schemas, engine order.
    fn schema_list(&self) -> Option<Vec<SchemaEntry>>;

    fn select_schema(&self, session: SessionId, schema_id: &str) -> bool;

    /// Feed one key event; `true` when the engine consumed it.
    fn process_key(&self, session: SessionId, key_code: i32, mask: i32) -> bool;

    /// Copy of the session's current composition state, if the engine
    /// has one to report.
    fn context(&self, session: SessionId) -> Option<ContextSnapshot>;

    /// Pending committed text, if any.
    fn commit(&self, session: SessionId) -> Option<Commit>;

    fn commit_composition(&self, session: SessionId) -> bool;

    fn clear_composition(&self, session: SessionId);

    /// Open a user configuration by name. The returned reader closes the
    /// handle when dropped.
    fn open_user_config(&self, config_name: &str) -> Option<Box<dyn ConfigReader + '_>>;
}
