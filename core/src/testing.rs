//! Scripted engine double for tests.
//!
//! `FakeEngine` implements [`EngineApi`] over an in-memory script: a
//! fixed schema list, a per-key composition model (lowercase ASCII
//! extends the preedit, anything else is refused), and a configurable
//! user-config table. Alongside the scripted behavior it keeps counters
//! for every acquire/release pairing the bridge relies on, so tests can
//! assert the pairing balances, and a log of every key event forwarded
//! to the engine.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::candidate::Candidate;
use crate::commit::Commit;
use crate::composition::Composition;
use crate::context::{ContextSnapshot, Menu};
use crate::engine::{ConfigReader, EngineApi};
use crate::error::BridgeError;
use crate::notify::NotificationQueue;
use crate::schema::SchemaEntry;
use crate::session::SessionId;
use crate::traits::Traits;

#[derive(Debug, Default)]
struct FakeState {
    next_session: u64,
    live: HashSet<u64>,
    schema_by_session: HashMap<u64, String>,
    preedit: HashMap<u64, String>,
    pending_commit: HashMap<u64, String>,
    key_log: Vec<(u64, i32, i32)>,
    init_sequence: Vec<&'static str>,
}

/// Counter snapshot for pairing assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeCounters {
    pub contexts_acquired: usize,
    pub contexts_released: usize,
    pub commits_acquired: usize,
    pub commits_released: usize,
    pub configs_opened: usize,
    pub configs_closed: usize,
}

/// In-memory engine standing in for the native layer.
pub struct FakeEngine {
    state: Mutex<FakeState>,
    schemas: Vec<SchemaEntry>,
    config_strings: HashMap<String, String>,
    fail_init: bool,
    fail_session_creation: bool,
    contexts_acquired: AtomicUsize,
    contexts_released: AtomicUsize,
    commits_acquired: AtomicUsize,
    commits_released: AtomicUsize,
    configs_opened: AtomicUsize,
    configs_closed: AtomicUsize,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        FakeEngine {
            state: Mutex::new(FakeState {
                next_session: 1,
                ..FakeState::default()
            }),
            schemas: vec![
                SchemaEntry::new("luna_pinyin", "朙月拼音"),
                SchemaEntry::new("cangjie5", "倉頡五代"),
            ],
            config_strings: HashMap::new(),
            fail_init: false,
            fail_session_creation: false,
            contexts_acquired: AtomicUsize::new(0),
            contexts_released: AtomicUsize::new(0),
            commits_acquired: AtomicUsize::new(0),
            commits_released: AtomicUsize::new(0),
            configs_opened: AtomicUsize::new(0),
            configs_closed: AtomicUsize::new(0),
        }
    }

    /// Replace the installed-schema fixture.
    pub fn with_schemas(mut self, schemas: Vec<SchemaEntry>) -> Self {
        self.schemas = schemas;
        self
    }

    /// Add a string to the `"default"` user config fixture.
    pub fn with_config_string<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config_strings.insert(key.into(), value.into());
        self
    }

    /// Make `init` fail, as when the engine library cannot start.
    pub fn with_failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Make session creation return the zero sentinel.
    pub fn with_failing_session_creation(mut self) -> Self {
        self.fail_session_creation = true;
        self
    }

    pub fn counters(&self) -> FakeCounters {
        FakeCounters {
            contexts_acquired: self.contexts_acquired.load(Ordering::SeqCst),
            contexts_released: self.contexts_released.load(Ordering::SeqCst),
            commits_acquired: self.commits_acquired.load(Ordering::SeqCst),
            commits_released: self.commits_released.load(Ordering::SeqCst),
            configs_opened: self.configs_opened.load(Ordering::SeqCst),
            configs_closed: self.configs_closed.load(Ordering::SeqCst),
        }
    }

    /// Every key event forwarded to the engine, in order:
    /// (session, key code, modifier mask).
    pub fn key_log(&self) -> Vec<(u64, i32, i32)> {
        self.state.lock().unwrap().key_log.clone()
    }

    /// Startup calls recorded by `init`, in order.
    pub fn init_sequence(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().init_sequence.clone()
    }

    fn candidates_for(preedit: &str) -> Vec<Candidate> {
        // Deterministic ranked fixture derived from the preedit so order
        // checks have something engine-like to bite on.
        vec![
            Candidate::new(format!("第一[{preedit}]"), None),
            Candidate::new(format!("第二[{preedit}]"), Some("fixture".to_string())),
            Candidate::new(format!("第三[{preedit}]"), None),
        ]
    }
}

impl EngineApi for FakeEngine {
    fn init(&self, _traits: &Traits, _notifications: NotificationQueue) -> Result<(), BridgeError> {
        let mut state = self.state.lock().unwrap();
        state.init_sequence.extend([
            "setup",
            "initialize",
            "set_notification_handler",
            "start_maintenance",
            "join_maintenance_thread",
        ]);
        if self.fail_init {
            return Err(BridgeError::EngineUnavailable(
                "scripted init failure".to_string(),
            ));
        }
        Ok(())
    }

    fn finalize(&self) {}

    fn create_session(&self) -> SessionId {
        if self.fail_session_creation {
            return SessionId::NONE;
        }
        let mut state = self.state.lock().unwrap();
        let id = state.next_session;
        state.next_session += 1;
        state.live.insert(id);
        if let Some(first) = self.schemas.first() {
            state
                .schema_by_session
                .insert(id, first.schema_id.clone());
        }
        SessionId(id)
    }

    fn destroy_session(&self, session: SessionId) -> bool {
        let mut state = self.state.lock().unwrap();
        state.preedit.remove(&session.raw());
        state.pending_commit.remove(&session.raw());
        state.schema_by_session.remove(&session.raw());
        state.live.remove(&session.raw())
    }

    fn current_schema(&self, session: SessionId) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.schema_by_session.get(&session.raw()).cloned()
    }

    fn schema_list(&self) -> Option<Vec<SchemaEntry>> {
        Some(self.schemas.clone())
    }

    fn select_schema(&self, session: SessionId, schema_id: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.live.contains(&session.raw()) {
            return false;
        }
        if !self.schemas.iter().any(|s| s.schema_id == schema_id) {
            return false;
        }
        state
            .schema_by_session
            .insert(session.raw(), schema_id.to_string());
        true
    }

    fn process_key(&self, session: SessionId, key_code: i32, mask: i32) -> bool {
        let mut state = self.state.lock().unwrap();
        state.key_log.push((session.raw(), key_code, mask));
        if !state.live.contains(&session.raw()) {
            return false;
        }
        // Lowercase ASCII extends the composition; modifier presses are
        // accepted without composing; everything else passes through.
        match u8::try_from(key_code).ok().map(char::from) {
            Some(ch) if ch.is_ascii_lowercase() && mask == 0 => {
                state.preedit.entry(session.raw()).or_default().push(ch);
                true
            }
            _ => (65505..=65508).contains(&key_code),
        }
    }

    fn context(&self, session: SessionId) -> Option<ContextSnapshot> {
        self.contexts_acquired.fetch_add(1, Ordering::SeqCst);
        let snapshot = {
            let state = self.state.lock().unwrap();
            if !state.live.contains(&session.raw()) {
                None
            } else {
                let preedit = state
                    .preedit
                    .get(&session.raw())
                    .cloned()
                    .unwrap_or_default();
                let candidates = if preedit.is_empty() {
                    Vec::new()
                } else {
                    Self::candidates_for(&preedit)
                };
                Some(ContextSnapshot {
                    composition: Composition {
                        length: preedit.len() as i32,
                        cursor_pos: preedit.len() as i32,
                        sel_start: 0,
                        sel_end: preedit.len() as i32,
                        preedit,
                    },
                    menu: Menu {
                        page_size: 5,
                        page_no: 0,
                        is_last_page: true,
                        highlighted_candidate_index: 0,
                        num_candidates: candidates.len() as i32,
                        select_keys: "12345".to_string(),
                        candidates,
                    },
                })
            }
        };
        self.contexts_released.fetch_add(1, Ordering::SeqCst);
        snapshot
    }

    fn commit(&self, session: SessionId) -> Option<Commit> {
        self.commits_acquired.fetch_add(1, Ordering::SeqCst);
        let commit = {
            let mut state = self.state.lock().unwrap();
            state
                .pending_commit
                .remove(&session.raw())
                .map(Commit::new)
        };
        self.commits_released.fetch_add(1, Ordering::SeqCst);
        commit
    }

    fn commit_composition(&self, session: SessionId) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.live.contains(&session.raw()) {
            return false;
        }
        match state.preedit.remove(&session.raw()) {
            Some(preedit) if !preedit.is_empty() => {
                state.pending_commit.insert(session.raw(), preedit);
                true
            }
            _ => false,
        }
    }

    fn clear_composition(&self, session: SessionId) {
        let mut state = self.state.lock().unwrap();
        state.preedit.remove(&session.raw());
    }

    fn open_user_config(&self, config_name: &str) -> Option<Box<dyn ConfigReader + '_>> {
        if config_name != "default" {
            return None;
        }
        self.configs_opened.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(FakeConfigReader { engine: self }))
    }
}

struct FakeConfigReader<'a> {
    engine: &'a FakeEngine,
}

impl ConfigReader for FakeConfigReader<'_> {
    fn get_string(&self, key: &str) -> Option<String> {
        self.engine.config_strings.get(key).cloned()
    }
}

impl Drop for FakeConfigReader<'_> {
    fn drop(&mut self) {
        self.engine.configs_closed.fetch_add(1, Ordering::SeqCst);
    }
}
