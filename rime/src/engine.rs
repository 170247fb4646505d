//! The native engine handle.
//!
//! Binds to the engine's shared library at runtime, obtains its function
//! table through the exported entry point, and implements the bridge's
//! [`EngineApi`] seam on top of it. Loading at runtime (rather than link
//! time) keeps the crate buildable and testable on machines without the
//! engine installed.

use core::ffi::{c_char, c_void};
use std::ffi::CString;
use std::path::Path;
use std::sync::Mutex;

use libloading::Library;
use tracing::{debug, info, warn};

use rimebridge_core::{
    BridgeError, Commit, ConfigReader, ContextSnapshot, EngineApi, Notification,
    NotificationQueue, SchemaEntry, SessionId, Traits,
};

use crate::ffi::{ApiFns, RimeApiTable, RimeSessionId, RimeTraits};
use crate::guard::{
    owned_string, read_string_buffer, CommitGuard, ConfigGuard, ContextGuard, SchemaListGuard,
};

/// Exported entry point yielding the function table.
const API_ENTRY: &[u8] = b"rime_get_api\0";

/// Platform default name of the engine library.
#[cfg(target_os = "linux")]
const DEFAULT_LIBRARY: &str = "librime.so.1";
#[cfg(target_os = "macos")]
const DEFAULT_LIBRARY: &str = "librime.1.dylib";
#[cfg(target_os = "windows")]
const DEFAULT_LIBRARY: &str = "rime.dll";

/// Notification relay handed to the engine as its context object.
///
/// Boxed so the pointer the engine holds stays stable for the lifetime
/// of the registration; the box lives in the engine handle until the
/// handle is dropped.
struct Relay {
    queue: NotificationQueue,
}

/// The engine's callback. May run on an engine-managed thread, so the
/// only thing it touches is the thread-safe queue; it never calls into
/// the host.
unsafe extern "C" fn notification_trampoline(
    context_object: *mut c_void,
    session_id: RimeSessionId,
    message_type: *const c_char,
    message_value: *const c_char,
) {
    if context_object.is_null() {
        return;
    }
    let relay = &*(context_object as *const Relay);
    let message_type = owned_string(message_type);
    let message_value = owned_string(message_value);
    relay.queue.push(Notification::new(
        SessionId(session_id as u64),
        message_type,
        message_value,
    ));
}

/// Process-wide handle to the loaded engine.
pub struct NativeEngine {
    fns: ApiFns,
    relay: Mutex<Option<Box<Relay>>>,
    // Dropped last: the function pointers in `fns` point into it.
    _library: Option<Library>,
}

impl NativeEngine {
    /// Load the engine library and bind its function table.
    ///
    /// `library_path` overrides the platform default name, which is
    /// otherwise resolved through the regular dynamic-linker search
    /// path.
    pub fn load(library_path: Option<&Path>) -> Result<Self, BridgeError> {
        let name = library_path
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_LIBRARY.to_string());

        let library = unsafe { Library::new(&name) }.map_err(|e| {
            BridgeError::EngineUnavailable(format!("cannot load engine library {name}: {e}"))
        })?;

        let get_api = unsafe {
            library.get::<unsafe extern "C" fn() -> *mut RimeApiTable>(API_ENTRY)
        }
        .map_err(|e| {
            BridgeError::EngineUnavailable(format!("engine library lacks rime_get_api: {e}"))
        })?;

        let table = unsafe { get_api() };
        if table.is_null() {
            return Err(BridgeError::EngineUnavailable(
                "engine returned a null API table".to_string(),
            ));
        }
        let fns = ApiFns::from_table(unsafe { &*table })?;
        info!(library = %name, "engine library bound");

        Ok(NativeEngine {
            fns,
            relay: Mutex::new(None),
            _library: Some(library),
        })
    }

    /// Bind an already-obtained function table.
    ///
    /// This is how a statically linked engine (or a test harness) plugs
    /// in without going through the dynamic loader.
    ///
    /// # Safety
    /// The table, and every function it points to, must stay valid for
    /// the lifetime of the handle.
    pub unsafe fn from_table(table: &RimeApiTable) -> Result<Self, BridgeError> {
        Ok(NativeEngine {
            fns: ApiFns::from_table(table)?,
            relay: Mutex::new(None),
            _library: None,
        })
    }

    fn session_raw(session: SessionId) -> RimeSessionId {
        session.raw() as RimeSessionId
    }
}

/// Owned C strings backing one `RimeTraits`, kept alive for the
/// duration of the setup/initialize calls that borrow them.
struct TraitsStorage {
    strings: Vec<CString>,
}

impl TraitsStorage {
    fn build(traits: &Traits) -> (TraitsStorage, RimeTraits) {
        let mut storage = TraitsStorage {
            strings: Vec::new(),
        };
        let mut raw = RimeTraits::new();

        let mut field = |value: &Option<String>| -> *const c_char {
            match value {
                Some(s) => match CString::new(s.as_str()) {
                    Ok(cstring) => {
                        storage.strings.push(cstring);
                        storage.strings[storage.strings.len() - 1].as_ptr()
                    }
                    // Interior NUL: leave the engine default in place.
                    Err(_) => std::ptr::null(),
                },
                None => std::ptr::null(),
            }
        };

        raw.shared_data_dir = field(&traits.shared_data_dir);
        raw.user_data_dir = field(&traits.user_data_dir);
        raw.distribution_name = field(&traits.distribution_name);
        raw.distribution_code_name = field(&traits.distribution_code_name);
        raw.distribution_version = field(&traits.distribution_version);
        raw.app_name = field(&traits.app_name);
        raw.log_dir = field(&traits.log_dir);
        if let Some(level) = traits.min_log_level {
            raw.min_log_level = level;
        }

        (storage, raw)
    }
}

impl EngineApi for NativeEngine {
    fn init(&self, traits: &Traits, notifications: NotificationQueue) -> Result<(), BridgeError> {
        let (storage, mut raw_traits) = TraitsStorage::build(traits);

        let relay = Box::new(Relay {
            queue: notifications,
        });
        let relay_ptr = &*relay as *const Relay as *mut c_void;

        unsafe {
            (self.fns.setup)(&mut raw_traits);
            (self.fns.initialize)(&mut raw_traits);
            (self.fns.set_notification_handler)(Some(notification_trampoline), relay_ptr);
        }
        // The relay must outlive the registration; it is replaced, not
        // dropped, if init ever runs again.
        *self.relay.lock().unwrap_or_else(|e| e.into_inner()) = Some(relay);

        info!("starting engine maintenance");
        let maintenance = unsafe { (self.fns.start_maintenance)(1) } != 0;
        if maintenance {
            // Blocks until dictionaries and schemas are rebuilt.
            unsafe { (self.fns.join_maintenance_thread)() };
        } else {
            debug!("engine skipped maintenance");
        }
        info!("engine maintenance complete");

        drop(storage);
        Ok(())
    }

    fn finalize(&self) {
        unsafe { (self.fns.finalize)() };
    }

    fn create_session(&self) -> SessionId {
        SessionId(unsafe { (self.fns.create_session)() } as u64)
    }

    fn destroy_session(&self, session: SessionId) -> bool {
        unsafe { (self.fns.destroy_session)(Self::session_raw(session)) != 0 }
    }

    fn current_schema(&self, session: SessionId) -> Option<String> {
        read_string_buffer(|buffer, size| unsafe {
            (self.fns.get_current_schema)(Self::session_raw(session), buffer, size)
        })
    }

    fn schema_list(&self) -> Option<Vec<SchemaEntry>> {
        let guard = SchemaListGuard::acquire(&self.fns)?;
        Some(guard.entries())
    }

    fn select_schema(&self, session: SessionId, schema_id: &str) -> bool {
        let Ok(schema_id) = CString::new(schema_id) else {
            return false;
        };
        unsafe {
            (self.fns.select_schema)(Self::session_raw(session), schema_id.as_ptr()) != 0
        }
    }

    fn process_key(&self, session: SessionId, key_code: i32, mask: i32) -> bool {
        unsafe { (self.fns.process_key)(Self::session_raw(session), key_code, mask) != 0 }
    }

    fn context(&self, session: SessionId) -> Option<ContextSnapshot> {
        let guard = ContextGuard::acquire(&self.fns, session)?;
        Some(guard.snapshot())
    }

    fn commit(&self, session: SessionId) -> Option<Commit> {
        let guard = CommitGuard::acquire(&self.fns, session)?;
        Some(guard.snapshot())
    }

    fn commit_composition(&self, session: SessionId) -> bool {
        unsafe { (self.fns.commit_composition)(Self::session_raw(session)) != 0 }
    }

    fn clear_composition(&self, session: SessionId) {
        unsafe { (self.fns.clear_composition)(Self::session_raw(session)) };
    }

    fn open_user_config(&self, config_name: &str) -> Option<Box<dyn ConfigReader + '_>> {
        match ConfigGuard::open_user_config(&self.fns, config_name) {
            Some(guard) => Some(Box::new(guard)),
            None => {
                warn!(config = config_name, "cannot open user config");
                None
            }
        }
    }
}
