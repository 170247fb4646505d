//! C ABI mirrors of the engine's structs and function table.
//!
//! Layout follows the engine's versioned-struct protocol: every struct
//! that crosses the boundary starts with a `data_size` field recording
//! how much of it the caller knows about, so old callers and new engines
//! can coexist. Constructors here zero the struct and stamp `data_size`
//! the way the engine's own init macro does.
//!
//! The function table is declared down to the last member this bridge
//! consumes (`user_config_open`). Members are nullable function pointers;
//! [`ApiFns`] validates presence once at bind time and extracts plain
//! pointers so call sites never re-check.

use core::ffi::{c_char, c_int, c_void};
use std::mem;

use rimebridge_core::BridgeError;

/// The engine's boolean: nonzero is true.
pub type Bool = c_int;

/// Opaque session identifier (`uintptr_t` on the C side).
pub type RimeSessionId = usize;

/// Asynchronous notification callback installed into the engine.
pub type RimeNotificationHandler = Option<
    unsafe extern "C" fn(
        context_object: *mut c_void,
        session_id: RimeSessionId,
        message_type: *const c_char,
        message_value: *const c_char,
    ),
>;

/// Stamp a zeroed versioned struct with its `data_size`.
macro_rules! rime_struct_new {
    ($ty:ty) => {
        impl $ty {
            /// Zeroed instance with `data_size` set for this struct
            /// version, ready to pass to the engine.
            pub fn new() -> Self {
                let mut value: Self = unsafe { mem::zeroed() };
                value.data_size = (mem::size_of::<Self>() - mem::size_of::<c_int>()) as c_int;
                value
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

#[repr(C)]
pub struct RimeTraits {
    pub data_size: c_int,
    pub shared_data_dir: *const c_char,
    pub user_data_dir: *const c_char,
    pub distribution_name: *const c_char,
    pub distribution_code_name: *const c_char,
    pub distribution_version: *const c_char,
    pub app_name: *const c_char,
    pub min_log_level: c_int,
    pub log_dir: *const c_char,
    pub prebuilt_data_dir: *const c_char,
    pub staging_dir: *const c_char,
}
rime_struct_new!(RimeTraits);

#[repr(C)]
pub struct RimeComposition {
    pub length: c_int,
    pub cursor_pos: c_int,
    pub sel_start: c_int,
    pub sel_end: c_int,
    pub preedit: *mut c_char,
}

#[repr(C)]
pub struct RimeCandidate {
    pub text: *mut c_char,
    pub comment: *mut c_char,
    pub reserved: *mut c_void,
}

#[repr(C)]
pub struct RimeMenu {
    pub page_size: c_int,
    pub page_no: c_int,
    pub is_last_page: Bool,
    pub highlighted_candidate_index: c_int,
    pub num_candidates: c_int,
    pub candidates: *mut RimeCandidate,
    pub select_keys: *mut c_char,
}

#[repr(C)]
pub struct RimeContext {
    pub data_size: c_int,
    pub composition: RimeComposition,
    pub menu: RimeMenu,
    pub commit_text_preview: *mut c_char,
    pub select_labels: *mut *mut c_char,
}
rime_struct_new!(RimeContext);

#[repr(C)]
pub struct RimeCommit {
    pub data_size: c_int,
    pub text: *mut c_char,
}
rime_struct_new!(RimeCommit);

#[repr(C)]
pub struct RimeStatus {
    pub data_size: c_int,
    pub schema_id: *mut c_char,
    pub schema_name: *mut c_char,
    pub is_disabled: Bool,
    pub is_composing: Bool,
    pub is_ascii_mode: Bool,
    pub is_full_shape: Bool,
    pub is_simplified: Bool,
    pub is_traditional: Bool,
    pub is_ascii_punct: Bool,
}
rime_struct_new!(RimeStatus);

#[repr(C)]
pub struct RimeSchemaListItem {
    pub schema_id: *mut c_char,
    pub name: *mut c_char,
    pub reserved: *mut c_void,
}

#[repr(C)]
pub struct RimeSchemaList {
    pub size: usize,
    pub list: *mut RimeSchemaListItem,
}

impl RimeSchemaList {
    pub fn new() -> Self {
        unsafe { mem::zeroed() }
    }
}

impl Default for RimeSchemaList {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
pub struct RimeConfig {
    pub ptr: *mut c_void,
}

impl RimeConfig {
    pub fn new() -> Self {
        RimeConfig {
            ptr: std::ptr::null_mut(),
        }
    }
}

impl Default for RimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
pub struct RimeConfigIterator {
    pub list: *mut c_void,
    pub map: *mut c_void,
    pub index: c_int,
    pub key: *const c_char,
    pub path: *const c_char,
}

#[repr(C)]
pub struct RimeCandidateListIterator {
    pub ptr: *mut c_void,
    pub index: c_int,
    pub candidate: RimeCandidate,
}

#[repr(C)]
pub struct RimeCustomApi {
    pub data_size: c_int,
}

#[repr(C)]
pub struct RimeModule {
    pub data_size: c_int,
    pub module_name: *const c_char,
    pub initialize: Option<unsafe extern "C" fn()>,
    pub finalize: Option<unsafe extern "C" fn()>,
    pub get_api: Option<unsafe extern "C" fn() -> *mut RimeCustomApi>,
}

/// The engine's exported function table, as returned by its API entry
/// point. Declared through `user_config_open`, the last member the
/// bridge consumes; the engine's `data_size` tells us whether the real
/// table reaches that far.
#[repr(C)]
pub struct RimeApiTable {
    pub data_size: c_int,

    pub setup: Option<unsafe extern "C" fn(traits: *mut RimeTraits)>,
    pub set_notification_handler:
        Option<unsafe extern "C" fn(handler: RimeNotificationHandler, context_object: *mut c_void)>,
    pub initialize: Option<unsafe extern "C" fn(traits: *mut RimeTraits)>,
    pub finalize: Option<unsafe extern "C" fn()>,
    pub start_maintenance: Option<unsafe extern "C" fn(full_check: Bool) -> Bool>,
    pub is_maintenance_mode: Option<unsafe extern "C" fn() -> Bool>,
    pub join_maintenance_thread: Option<unsafe extern "C" fn()>,
    pub deployer_initialize: Option<unsafe extern "C" fn(traits: *mut RimeTraits)>,
    pub prebuild: Option<unsafe extern "C" fn() -> Bool>,
    pub deploy: Option<unsafe extern "C" fn() -> Bool>,
    pub deploy_schema: Option<unsafe extern "C" fn(schema_file: *const c_char) -> Bool>,
    pub deploy_config_file:
        Option<unsafe extern "C" fn(file_name: *const c_char, version_key: *const c_char) -> Bool>,
    pub sync_user_data: Option<unsafe extern "C" fn() -> Bool>,

    pub create_session: Option<unsafe extern "C" fn() -> RimeSessionId>,
    pub find_session: Option<unsafe extern "C" fn(session_id: RimeSessionId) -> Bool>,
    pub destroy_session: Option<unsafe extern "C" fn(session_id: RimeSessionId) -> Bool>,
    pub cleanup_stale_sessions: Option<unsafe extern "C" fn()>,
    pub cleanup_all_sessions: Option<unsafe extern "C" fn()>,

    pub process_key:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, keycode: c_int, mask: c_int) -> Bool>,
    pub commit_composition: Option<unsafe extern "C" fn(session_id: RimeSessionId) -> Bool>,
    pub clear_composition: Option<unsafe extern "C" fn(session_id: RimeSessionId)>,
    pub get_commit:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, commit: *mut RimeCommit) -> Bool>,
    pub free_commit: Option<unsafe extern "C" fn(commit: *mut RimeCommit) -> Bool>,
    pub get_context:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, context: *mut RimeContext) -> Bool>,
    pub free_context: Option<unsafe extern "C" fn(context: *mut RimeContext) -> Bool>,
    pub get_status:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, status: *mut RimeStatus) -> Bool>,
    pub free_status: Option<unsafe extern "C" fn(status: *mut RimeStatus) -> Bool>,

    pub set_option:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, option: *const c_char, value: Bool)>,
    pub get_option:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, option: *const c_char) -> Bool>,
    pub set_property: Option<
        unsafe extern "C" fn(session_id: RimeSessionId, prop: *const c_char, value: *const c_char),
    >,
    pub get_property: Option<
        unsafe extern "C" fn(
            session_id: RimeSessionId,
            prop: *const c_char,
            value: *mut c_char,
            buffer_size: usize,
        ) -> Bool,
    >,

    pub get_schema_list: Option<unsafe extern "C" fn(schema_list: *mut RimeSchemaList) -> Bool>,
    pub free_schema_list: Option<unsafe extern "C" fn(schema_list: *mut RimeSchemaList)>,
    pub get_current_schema: Option<
        unsafe extern "C" fn(
            session_id: RimeSessionId,
            schema_id: *mut c_char,
            buffer_size: usize,
        ) -> Bool,
    >,
    pub select_schema:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, schema_id: *const c_char) -> Bool>,

    pub schema_open:
        Option<unsafe extern "C" fn(schema_id: *const c_char, config: *mut RimeConfig) -> Bool>,
    pub config_open:
        Option<unsafe extern "C" fn(config_id: *const c_char, config: *mut RimeConfig) -> Bool>,
    pub config_close: Option<unsafe extern "C" fn(config: *mut RimeConfig) -> Bool>,
    pub config_get_bool: Option<
        unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char, value: *mut Bool) -> Bool,
    >,
    pub config_get_int: Option<
        unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char, value: *mut c_int) -> Bool,
    >,
    pub config_get_double: Option<
        unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char, value: *mut f64) -> Bool,
    >,
    pub config_get_string: Option<
        unsafe extern "C" fn(
            config: *mut RimeConfig,
            key: *const c_char,
            value: *mut c_char,
            buffer_size: usize,
        ) -> Bool,
    >,
    pub config_get_cstring:
        Option<unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char) -> *const c_char>,
    pub config_update_signature:
        Option<unsafe extern "C" fn(config: *mut RimeConfig, signer: *const c_char) -> Bool>,
    pub config_begin_map: Option<
        unsafe extern "C" fn(
            iterator: *mut RimeConfigIterator,
            config: *mut RimeConfig,
            key: *const c_char,
        ) -> Bool,
    >,
    pub config_next: Option<unsafe extern "C" fn(iterator: *mut RimeConfigIterator) -> Bool>,
    pub config_end: Option<unsafe extern "C" fn(iterator: *mut RimeConfigIterator)>,

    pub simulate_key_sequence: Option<
        unsafe extern "C" fn(session_id: RimeSessionId, key_sequence: *const c_char) -> Bool,
    >,
    pub register_module: Option<unsafe extern "C" fn(module: *mut RimeModule) -> Bool>,
    pub find_module: Option<unsafe extern "C" fn(module_name: *const c_char) -> *mut RimeModule>,
    pub run_task: Option<unsafe extern "C" fn(task_name: *const c_char) -> Bool>,

    pub get_shared_data_dir: Option<unsafe extern "C" fn() -> *const c_char>,
    pub get_user_data_dir: Option<unsafe extern "C" fn() -> *const c_char>,
    pub get_sync_dir: Option<unsafe extern "C" fn() -> *const c_char>,
    pub get_user_id: Option<unsafe extern "C" fn() -> *const c_char>,
    pub get_user_data_sync_dir: Option<unsafe extern "C" fn(dir: *mut c_char, buffer_size: usize)>,

    pub config_init: Option<unsafe extern "C" fn(config: *mut RimeConfig) -> Bool>,
    pub config_load_string:
        Option<unsafe extern "C" fn(config: *mut RimeConfig, yaml: *const c_char) -> Bool>,
    pub config_set_bool:
        Option<unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char, value: Bool) -> Bool>,
    pub config_set_int: Option<
        unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char, value: c_int) -> Bool,
    >,
    pub config_set_double:
        Option<unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char, value: f64) -> Bool>,
    pub config_set_string: Option<
        unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char, value: *const c_char) -> Bool,
    >,
    pub config_get_item: Option<
        unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char, value: *mut RimeConfig) -> Bool,
    >,
    pub config_set_item: Option<
        unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char, value: *mut RimeConfig) -> Bool,
    >,
    pub config_clear:
        Option<unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char) -> Bool>,
    pub config_create_list:
        Option<unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char) -> Bool>,
    pub config_create_map:
        Option<unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char) -> Bool>,
    pub config_list_size:
        Option<unsafe extern "C" fn(config: *mut RimeConfig, key: *const c_char) -> usize>,
    pub config_begin_list: Option<
        unsafe extern "C" fn(
            iterator: *mut RimeConfigIterator,
            config: *mut RimeConfig,
            key: *const c_char,
        ) -> Bool,
    >,

    pub get_input: Option<unsafe extern "C" fn(session_id: RimeSessionId) -> *const c_char>,
    pub get_caret_pos: Option<unsafe extern "C" fn(session_id: RimeSessionId) -> usize>,
    pub select_candidate:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, index: usize) -> Bool>,
    pub get_version: Option<unsafe extern "C" fn() -> *const c_char>,
    pub set_caret_pos: Option<unsafe extern "C" fn(session_id: RimeSessionId, caret_pos: usize)>,
    pub select_candidate_on_current_page:
        Option<unsafe extern "C" fn(session_id: RimeSessionId, index: usize) -> Bool>,
    pub candidate_list_begin: Option<
        unsafe extern "C" fn(
            session_id: RimeSessionId,
            iterator: *mut RimeCandidateListIterator,
        ) -> Bool,
    >,
    pub candidate_list_next:
        Option<unsafe extern "C" fn(iterator: *mut RimeCandidateListIterator) -> Bool>,
    pub candidate_list_end:
        Option<unsafe extern "C" fn(iterator: *mut RimeCandidateListIterator)>,
    pub user_config_open:
        Option<unsafe extern "C" fn(config_id: *const c_char, config: *mut RimeConfig) -> Bool>,
}

/// Plain function pointers for everything the bridge calls, extracted
/// from the table once its version and member presence are validated.
#[derive(Clone, Copy)]
pub struct ApiFns {
    pub setup: unsafe extern "C" fn(traits: *mut RimeTraits),
    pub set_notification_handler:
        unsafe extern "C" fn(handler: RimeNotificationHandler, context_object: *mut c_void),
    pub initialize: unsafe extern "C" fn(traits: *mut RimeTraits),
    pub finalize: unsafe extern "C" fn(),
    pub start_maintenance: unsafe extern "C" fn(full_check: Bool) -> Bool,
    pub join_maintenance_thread: unsafe extern "C" fn(),
    pub create_session: unsafe extern "C" fn() -> RimeSessionId,
    pub destroy_session: unsafe extern "C" fn(session_id: RimeSessionId) -> Bool,
    pub process_key:
        unsafe extern "C" fn(session_id: RimeSessionId, keycode: c_int, mask: c_int) -> Bool,
    pub commit_composition: unsafe extern "C" fn(session_id: RimeSessionId) -> Bool,
    pub clear_composition: unsafe extern "C" fn(session_id: RimeSessionId),
    pub get_commit:
        unsafe extern "C" fn(session_id: RimeSessionId, commit: *mut RimeCommit) -> Bool,
    pub free_commit: unsafe extern "C" fn(commit: *mut RimeCommit) -> Bool,
    pub get_context:
        unsafe extern "C" fn(session_id: RimeSessionId, context: *mut RimeContext) -> Bool,
    pub free_context: unsafe extern "C" fn(context: *mut RimeContext) -> Bool,
    pub get_schema_list: unsafe extern "C" fn(schema_list: *mut RimeSchemaList) -> Bool,
    pub free_schema_list: unsafe extern "C" fn(schema_list: *mut RimeSchemaList),
    pub get_current_schema: unsafe extern "C" fn(
        session_id: RimeSessionId,
        schema_id: *mut c_char,
        buffer_size: usize,
    ) -> Bool,
    pub select_schema:
        unsafe extern "C" fn(session_id: RimeSessionId, schema_id: *const c_char) -> Bool,
    pub config_close: unsafe extern "C" fn(config: *mut RimeConfig) -> Bool,
    pub config_get_string: unsafe extern "C" fn(
        config: *mut RimeConfig,
        key: *const c_char,
        value: *mut c_char,
        buffer_size: usize,
    ) -> Bool,
    pub user_config_open:
        unsafe extern "C" fn(config_id: *const c_char, config: *mut RimeConfig) -> Bool,
}

/// Size the engine must report for its table to contain every member the
/// bridge consumes.
fn required_data_size() -> usize {
    mem::size_of::<RimeApiTable>() - mem::size_of::<c_int>()
}

fn require<T>(member: Option<T>, name: &str) -> Result<T, BridgeError> {
    member.ok_or_else(|| BridgeError::EngineUnavailable(format!("engine API lacks {name}")))
}

impl ApiFns {
    /// Validate the table version and extract every member the bridge
    /// calls. Fails if the engine's table is older than the members the
    /// bridge needs, or if any needed member is null.
    pub fn from_table(table: &RimeApiTable) -> Result<ApiFns, BridgeError> {
        if (table.data_size as usize) < required_data_size() {
            return Err(BridgeError::EngineUnavailable(format!(
                "engine API table too old: data_size {} < required {}",
                table.data_size,
                required_data_size()
            )));
        }
        Ok(ApiFns {
            setup: require(table.setup, "setup")?,
            set_notification_handler: require(
                table.set_notification_handler,
                "set_notification_handler",
            )?,
            initialize: require(table.initialize, "initialize")?,
            finalize: require(table.finalize, "finalize")?,
            start_maintenance: require(table.start_maintenance, "start_maintenance")?,
            join_maintenance_thread: require(
                table.join_maintenance_thread,
                "join_maintenance_thread",
            )?,
            create_session: require(table.create_session, "create_session")?,
            destroy_session: require(table.destroy_session, "destroy_session")?,
            process_key: require(table.process_key, "process_key")?,
            commit_composition: require(table.commit_composition, "commit_composition")?,
            clear_composition: require(table.clear_composition, "clear_composition")?,
            get_commit: require(table.get_commit, "get_commit")?,
            free_commit: require(table.free_commit, "free_commit")?,
            get_context: require(table.get_context, "get_context")?,
            free_context: require(table.free_context, "free_context")?,
            get_schema_list: require(table.get_schema_list, "get_schema_list")?,
            free_schema_list: require(table.free_schema_list, "free_schema_list")?,
            get_current_schema: require(table.get_current_schema, "get_current_schema")?,
            select_schema: require(table.select_schema, "select_schema")?,
            config_close: require(table.config_close, "config_close")?,
            config_get_string: require(table.config_get_string, "config_get_string")?,
            user_config_open: require(table.user_config_open, "user_config_open")?,
        })
    }
}
