//! Host-callable command surface.
//!
//! `Bridge` is the explicit context object threaded through every
//! operation: it owns the engine handle and the notification queue, so
//! there is no process-global state and no hidden re-initialization
//! race. Construction runs the engine's startup sequence; `finalize`
//! consumes the bridge, which makes use-after-finalize unrepresentable.
//!
//! Error policy is uniform: a native call the engine refuses never
//! raises. It enqueues a notification and degrades to false/null, so
//! the host stays responsive. Only boundary violations, such as a
//! wrong-typed argument or an unknown command name, are `BridgeError`s.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::args;
use crate::commit::Commit;
use crate::context::ContextSnapshot;
use crate::engine::EngineApi;
use crate::error::{ArgKind, BridgeError};
use crate::key::{AsciiSwitchKey, RELEASE_MASK};
use crate::notify::{Notification, NotificationQueue};
use crate::schema::{schema_list_to_value, SchemaEntry};
use crate::session::SessionId;
use crate::traits::Traits;

/// Binding value the engine uses for the inline-ASCII toggle.
const INLINE_ASCII: &str = "inline_ascii";

/// Bridge-level options, separate from the engine's traits descriptor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BridgeOptions {
    /// User configuration probed by `inlineAscii` for switch-key
    /// bindings. The engine layers the active schema's `ascii_composer`
    /// section into its user config, so the default user config is the
    /// right place to look.
    pub ascii_switch_config: String,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        BridgeOptions {
            ascii_switch_config: "default".to_string(),
        }
    }
}

/// One entry of the typed command schema: the host-visible name and the
/// positional argument types dispatch enforces.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub args: &'static [ArgKind],
}

/// Every host-callable command, with its declared argument types.
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "createSession", args: &[] },
    CommandSpec { name: "destroySession", args: &[ArgKind::SessionId] },
    CommandSpec {
        name: "processKey",
        args: &[ArgKind::SessionId, ArgKind::Integer, ArgKind::Integer],
    },
    CommandSpec { name: "getCurrentSchema", args: &[ArgKind::SessionId] },
    CommandSpec { name: "getSchemaList", args: &[] },
    CommandSpec {
        name: "selectSchema",
        args: &[ArgKind::SessionId, ArgKind::Text],
    },
    CommandSpec { name: "getContext", args: &[ArgKind::SessionId] },
    CommandSpec { name: "getCommit", args: &[ArgKind::SessionId] },
    CommandSpec { name: "commitComposition", args: &[ArgKind::SessionId] },
    CommandSpec { name: "clearComposition", args: &[ArgKind::SessionId] },
    CommandSpec { name: "inlineAscii", args: &[ArgKind::SessionId] },
];

/// The session bridge: engine handle + notification queue, initialized
/// once and threaded through every command.
pub struct Bridge<E: EngineApi> {
    engine: E,
    options: BridgeOptions,
    notifications: NotificationQueue,
}

impl<E: EngineApi> Bridge<E> {
    /// Run the engine startup sequence and construct the bridge.
    ///
    /// Blocks until engine maintenance completes, which can take as long
    /// as a dictionary rebuild; there is no timeout and no cancellation.
    pub fn init(engine: E, options: BridgeOptions, traits: &Traits) -> Result<Self, BridgeError> {
        let notifications = NotificationQueue::new();
        engine.init(traits, notifications.clone())?;
        info!("engine initialized, maintenance complete");
        Ok(Bridge {
            engine,
            options,
            notifications,
        })
    }

    /// The queue the host drains for engine messages and failure
    /// reports.
    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// The engine handle this bridge owns.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Release engine resources, consuming the bridge.
    pub fn finalize(self) {
        info!("finalizing engine");
        self.engine.finalize();
    }

    fn report(&self, session: SessionId, command: &'static str, message: &str) {
        warn!(command, session = session.raw(), "{message}");
        self.notifications
            .push(Notification::new(session, command, message));
    }

    /// Request a new session. Returns `SessionId::NONE` on failure, with
    /// the failure also reported on the notification queue.
    pub fn create_session(&self) -> SessionId {
        let id = self.engine.create_session();
        if !id.is_valid() {
            self.report(SessionId::NONE, "createSession", "cannot create session");
        }
        id
    }

    /// Request session destruction. The identifier is forwarded to the
    /// engine unvalidated beyond the zero screen; the engine's verdict
    /// is authoritative.
    pub fn destroy_session(&self, session: SessionId) -> bool {
        let ok = session.is_valid() && self.engine.destroy_session(session);
        if !ok {
            self.report(session, "destroySession", "cannot destroy session");
        }
        ok
    }

    pub fn current_schema(&self, session: SessionId) -> Option<String> {
        let schema = if session.is_valid() {
            self.engine.current_schema(session)
        } else {
            None
        };
        if schema.is_none() {
            self.report(session, "getCurrentSchema", "cannot get current schema");
        }
        schema
    }

    pub fn schema_list(&self) -> Option<Vec<SchemaEntry>> {
        let list = self.engine.schema_list();
        if list.is_none() {
            self.report(SessionId::NONE, "getSchemaList", "cannot get schema list");
        }
        list
    }

    pub fn select_schema(&self, session: SessionId, schema_id: &str) -> bool {
        let ok = session.is_valid() && self.engine.select_schema(session, schema_id);
        if !ok {
            self.report(session, "selectSchema", "cannot select schema for session");
        }
        ok
    }

    /// Feed one key event. Always yields a boolean: an invalid session
    /// surfaces as the engine's false-path, never as an absent result.
    pub fn process_key(&self, session: SessionId, key_code: i32, mask: i32) -> bool {
        let consumed = session.is_valid() && self.engine.process_key(session, key_code, mask);
        debug!(
            session = session.raw(),
            key_code, mask, consumed, "processKey"
        );
        consumed
    }

    pub fn context(&self, session: SessionId) -> Option<ContextSnapshot> {
        let snapshot = if session.is_valid() {
            self.engine.context(session)
        } else {
            None
        };
        if snapshot.is_none() {
            self.report(session, "getContext", "cannot get context for session");
        }
        snapshot
    }

    pub fn commit(&self, session: SessionId) -> Option<Commit> {
        let commit = if session.is_valid() {
            self.engine.commit(session)
        } else {
            None
        };
        if commit.is_none() {
            self.report(session, "getCommit", "cannot get commit for session");
        }
        commit
    }

    pub fn commit_composition(&self, session: SessionId) -> bool {
        session.is_valid() && self.engine.commit_composition(session)
    }

    pub fn clear_composition(&self, session: SessionId) {
        if session.is_valid() {
            self.engine.clear_composition(session);
        }
    }

    /// Toggle inline-ASCII mode by synthesizing the bound switch key.
    ///
    /// The engine has no direct toggle call, but it binds one of the four
    /// modifier keys to `inline_ascii` in its `ascii_composer`
    /// configuration. This probes the configured user config for that
    /// binding and, on a match, feeds the engine a key-down/key-up pair
    /// for the bound key. Returns the matched binding value, or `None`
    /// when no key is bound to inline ASCII.
    ///
    /// The configuration handle is opened and closed within this call.
    pub fn inline_ascii(&self, session: SessionId) -> Option<&'static str> {
        let config = match self.engine.open_user_config(&self.options.ascii_switch_config) {
            Some(config) => config,
            None => {
                self.report(session, "inlineAscii", "cannot open user config");
                return None;
            }
        };
        for key in AsciiSwitchKey::ALL {
            if config.get_string(key.config_key()).as_deref() == Some(INLINE_ASCII) {
                self.engine.process_key(session, key.key_code(), 0);
                self.engine.process_key(session, key.key_code(), RELEASE_MASK);
                return Some(INLINE_ASCII);
            }
        }
        None
    }

    /// Dispatch a named command with positional host-value arguments.
    ///
    /// Argument types are enforced against [`COMMANDS`]; mismatches and
    /// unknown names error instead of silently defaulting. Engine-side
    /// failures follow the degrade-to-false/null policy of the typed
    /// methods above.
    pub fn dispatch(&self, command: &str, args: &[Value]) -> Result<Value, BridgeError> {
        match command {
            "createSession" => Ok(json!(self.create_session().raw())),
            "destroySession" => {
                let id = args::session_id("destroySession", args, 0)?;
                Ok(Value::Bool(self.destroy_session(id)))
            }
            "processKey" => {
                let id = args::session_id("processKey", args, 0)?;
                let key_code = args::integer("processKey", args, 1)?;
                let mask = args::integer("processKey", args, 2)?;
                Ok(Value::Bool(self.process_key(id, key_code, mask)))
            }
            "getCurrentSchema" => {
                let id = args::session_id("getCurrentSchema", args, 0)?;
                Ok(self
                    .current_schema(id)
                    .map(Value::String)
                    .unwrap_or(Value::Null))
            }
            "getSchemaList" => Ok(self
                .schema_list()
                .map(|list| schema_list_to_value(&list))
                .unwrap_or(Value::Null)),
            "selectSchema" => {
                let id = args::session_id("selectSchema", args, 0)?;
                let schema_id = args::text("selectSchema", args, 1)?;
                Ok(Value::Bool(self.select_schema(id, schema_id)))
            }
            "getContext" => {
                let id = args::session_id("getContext", args, 0)?;
                Ok(self
                    .context(id)
                    .map(|snapshot| snapshot.to_value())
                    .unwrap_or(Value::Null))
            }
            "getCommit" => {
                let id = args::session_id("getCommit", args, 0)?;
                Ok(self
                    .commit(id)
                    .map(|commit| commit.to_value())
                    .unwrap_or(Value::Null))
            }
            "commitComposition" => {
                let id = args::session_id("commitComposition", args, 0)?;
                Ok(Value::Bool(self.commit_composition(id)))
            }
            "clearComposition" => {
                let id = args::session_id("clearComposition", args, 0)?;
                self.clear_composition(id);
                Ok(Value::Null)
            }
            "inlineAscii" => {
                let id = args::session_id("inlineAscii", args, 0)?;
                Ok(self
                    .inline_ascii(id)
                    .map(|binding| Value::String(binding.to_string()))
                    .unwrap_or(Value::Null))
            }
            other => Err(BridgeError::UnknownCommand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;

    fn bridge(engine: FakeEngine) -> Bridge<FakeEngine> {
        Bridge::init(engine, BridgeOptions::default(), &Traits::new()).unwrap()
    }

    #[test]
    fn init_runs_the_engine_startup_sequence() {
        let bridge = bridge(FakeEngine::new());
        assert_eq!(
            bridge.engine.init_sequence(),
            vec![
                "setup",
                "initialize",
                "set_notification_handler",
                "start_maintenance",
                "join_maintenance_thread",
            ]
        );
    }

    #[test]
    fn init_failure_is_engine_unavailable() {
        let err = Bridge::init(
            FakeEngine::new().with_failing_init(),
            BridgeOptions::default(),
            &Traits::new(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, BridgeError::EngineUnavailable(_)));
    }

    #[test]
    fn failed_session_creation_returns_sentinel_and_notifies() {
        let bridge = bridge(FakeEngine::new().with_failing_session_creation());
        assert_eq!(bridge.create_session(), SessionId::NONE);

        let notes = bridge.notifications().drain();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message_type, "createSession");
        assert_eq!(notes[0].message_value, "cannot create session");
    }

    #[test]
    fn selected_schema_is_the_current_schema() {
        let bridge = bridge(FakeEngine::new());
        let id = bridge.create_session();
        assert!(bridge.select_schema(id, "cangjie5"));
        assert_eq!(bridge.current_schema(id).as_deref(), Some("cangjie5"));
    }

    #[test]
    fn destroy_after_create_succeeds() {
        let bridge = bridge(FakeEngine::new());
        let id = bridge.create_session();
        assert!(id.is_valid());
        assert!(bridge.destroy_session(id));
    }

    #[test]
    fn process_key_is_always_boolean_even_for_dead_sessions() {
        let bridge = bridge(FakeEngine::new());
        assert!(!bridge.process_key(SessionId::NONE, i32::from(b'a'), 0));
        assert!(!bridge.process_key(SessionId(9999), i32::from(b'a'), 0));

        let value = bridge
            .dispatch("processKey", &[json!(0), json!(97), json!(0)])
            .unwrap();
        assert_eq!(value, Value::Bool(false));
    }

    #[test]
    fn inline_ascii_matches_a_bound_switch_key() {
        let bridge = bridge(
            FakeEngine::new().with_config_string("ascii_composer/switch_key/Shift_R", "inline_ascii"),
        );
        let id = bridge.create_session();
        assert_eq!(bridge.inline_ascii(id), Some("inline_ascii"));

        // Synthesized pair: key-down then key-up with the release bit.
        let keys = bridge.engine.key_log();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], (id.raw(), 65506, 0));
        assert_eq!(keys[1], (id.raw(), 65506, RELEASE_MASK));
    }

    #[test]
    fn inline_ascii_returns_none_when_nothing_is_bound() {
        let bridge = bridge(
            FakeEngine::new().with_config_string("ascii_composer/switch_key/Shift_L", "commit_code"),
        );
        let id = bridge.create_session();
        assert_eq!(bridge.inline_ascii(id), None);
        assert!(bridge.engine.key_log().is_empty());
    }

    #[test]
    fn inline_ascii_never_leaks_the_config_handle() {
        let bridge = bridge(
            FakeEngine::new().with_config_string("ascii_composer/switch_key/Control_L", "inline_ascii"),
        );
        let id = bridge.create_session();
        for _ in 0..100 {
            bridge.inline_ascii(id);
        }
        let counters = bridge.engine.counters();
        assert_eq!(counters.configs_opened, 100);
        assert_eq!(counters.configs_closed, 100);
    }

    #[test]
    fn inline_ascii_reports_unopenable_config() {
        let bridge = Bridge::init(
            FakeEngine::new(),
            BridgeOptions {
                ascii_switch_config: "missing".to_string(),
            },
            &Traits::new(),
        )
        .unwrap();
        let id = bridge.create_session();
        assert_eq!(bridge.inline_ascii(id), None);

        let notes = bridge.notifications().drain();
        assert_eq!(notes[0].message_type, "inlineAscii");
        assert_eq!(notes[0].message_value, "cannot open user config");
    }

    #[test]
    fn dispatch_rejects_wrong_argument_types() {
        let bridge = bridge(FakeEngine::new());
        let err = bridge
            .dispatch("destroySession", &[json!("not a number")])
            .err()
            .unwrap();
        assert!(matches!(
            err,
            BridgeError::InvalidArgument {
                command: "destroySession",
                index: 0,
                expected: ArgKind::SessionId,
            }
        ));

        let err = bridge
            .dispatch("selectSchema", &[json!(1)])
            .err()
            .unwrap();
        assert!(matches!(
            err,
            BridgeError::InvalidArgument {
                command: "selectSchema",
                index: 1,
                expected: ArgKind::Text,
            }
        ));
    }

    #[test]
    fn dispatch_rejects_unknown_commands() {
        let bridge = bridge(FakeEngine::new());
        let err = bridge.dispatch("simulateKeySequence", &[]).err().unwrap();
        assert!(matches!(err, BridgeError::UnknownCommand(name) if name == "simulateKeySequence"));
    }

    #[test]
    fn command_table_covers_every_dispatch_arm() {
        let bridge = bridge(FakeEngine::new());
        let id = bridge.create_session();
        for spec in COMMANDS {
            let args: Vec<Value> = spec
                .args
                .iter()
                .map(|kind| match kind {
                    ArgKind::SessionId => json!(id.raw()),
                    ArgKind::Integer => json!(0),
                    ArgKind::Text => json!("luna_pinyin"),
                })
                .collect();
            // Every declared command must dispatch without an
            // UnknownCommand or InvalidArgument error.
            bridge.dispatch(spec.name, &args).unwrap();
        }
    }
}
