//! FFI-layer tests against a fake native function table.
//!
//! The fake engine here allocates real C strings and candidate arrays in
//! its query calls and reclaims them in its free calls, counting both
//! sides. That exercises the actual contract the guards uphold: every
//! acquired ephemeral structure is released exactly once, on every exit
//! path, across repeated calls.
//!
//! The fakes share process-global state, so each test takes `TEST_LOCK`
//! and resets what it uses.

use core::ffi::{c_char, c_int, c_void};
use std::ffi::{CStr, CString};
use std::mem;
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::thread;

use rimebridge::ffi::{
    ApiFns, Bool, RimeApiTable, RimeCommit, RimeConfig, RimeContext, RimeNotificationHandler,
    RimeSchemaList, RimeSchemaListItem, RimeSessionId, RimeTraits,
};
use rimebridge::NativeEngine;
use rimebridge_core::{Bridge, BridgeOptions, SessionId, Traits, RELEASE_MASK};

static TEST_LOCK: Mutex<()> = Mutex::new(());

static CALLS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
static KEYS: Mutex<Vec<(usize, i32, i32)>> = Mutex::new(Vec::new());
static PREEDIT: Mutex<String> = Mutex::new(String::new());
static PENDING_COMMIT: Mutex<Option<String>> = Mutex::new(None);
static CURRENT_SCHEMA: Mutex<Option<String>> = Mutex::new(None);
static HANDLER: Mutex<Option<(RimeNotificationHandler, usize)>> = Mutex::new(None);

static NEXT_SESSION: AtomicUsize = AtomicUsize::new(1);
static CONTEXT_ALLOCS: AtomicUsize = AtomicUsize::new(0);
static CONTEXT_FREES: AtomicUsize = AtomicUsize::new(0);
static COMMIT_ALLOCS: AtomicUsize = AtomicUsize::new(0);
static COMMIT_FREES: AtomicUsize = AtomicUsize::new(0);
static SCHEMA_LIST_ALLOCS: AtomicUsize = AtomicUsize::new(0);
static SCHEMA_LIST_FREES: AtomicUsize = AtomicUsize::new(0);
static CONFIG_OPENS: AtomicUsize = AtomicUsize::new(0);
static CONFIG_CLOSES: AtomicUsize = AtomicUsize::new(0);

fn lock_tests() -> MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn reset_fakes() {
    CALLS.lock().unwrap().clear();
    KEYS.lock().unwrap().clear();
    PREEDIT.lock().unwrap().clear();
    *PENDING_COMMIT.lock().unwrap() = None;
    *CURRENT_SCHEMA.lock().unwrap() = None;
    for counter in [
        &CONTEXT_ALLOCS,
        &CONTEXT_FREES,
        &COMMIT_ALLOCS,
        &COMMIT_FREES,
        &SCHEMA_LIST_ALLOCS,
        &SCHEMA_LIST_FREES,
        &CONFIG_OPENS,
        &CONFIG_CLOSES,
    ] {
        counter.store(0, Ordering::SeqCst);
    }
}

fn leak_cstring(text: &str) -> *mut c_char {
    CString::new(text).unwrap().into_raw()
}

unsafe fn reclaim_cstring(ptr: &mut *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(*ptr));
        *ptr = ptr::null_mut();
    }
}

// ---------------------------------------------------------------------
// Fake engine entry points
// ---------------------------------------------------------------------

unsafe extern "C" fn fake_setup(_traits: *mut RimeTraits) {
    CALLS.lock().unwrap().push("setup");
}

unsafe extern "C" fn fake_initialize(_traits: *mut RimeTraits) {
    CALLS.lock().unwrap().push("initialize");
}

unsafe extern "C" fn fake_finalize() {
    CALLS.lock().unwrap().push("finalize");
}

unsafe extern "C" fn fake_set_notification_handler(
    handler: RimeNotificationHandler,
    context_object: *mut c_void,
) {
    CALLS.lock().unwrap().push("set_notification_handler");
    *HANDLER.lock().unwrap() = Some((handler, context_object as usize));
}

unsafe extern "C" fn fake_start_maintenance(_full_check: Bool) -> Bool {
    CALLS.lock().unwrap().push("start_maintenance");
    1
}

unsafe extern "C" fn fake_join_maintenance_thread() {
    CALLS.lock().unwrap().push("join_maintenance_thread");
}

unsafe extern "C" fn fake_create_session() -> RimeSessionId {
    NEXT_SESSION.fetch_add(1, Ordering::SeqCst)
}

unsafe extern "C" fn fake_destroy_session(session_id: RimeSessionId) -> Bool {
    (session_id != 0) as Bool
}

unsafe extern "C" fn fake_process_key(
    session_id: RimeSessionId,
    keycode: c_int,
    mask: c_int,
) -> Bool {
    KEYS.lock().unwrap().push((session_id, keycode, mask));
    if session_id == 0 {
        return 0;
    }
    match u8::try_from(keycode).ok().map(char::from) {
        Some(ch) if ch.is_ascii_lowercase() && mask == 0 => {
            PREEDIT.lock().unwrap().push(ch);
            1
        }
        _ => ((65505..=65508).contains(&keycode)) as Bool,
    }
}

unsafe extern "C" fn fake_commit_composition(session_id: RimeSessionId) -> Bool {
    if session_id == 0 {
        return 0;
    }
    let mut preedit = PREEDIT.lock().unwrap();
    if preedit.is_empty() {
        return 0;
    }
    *PENDING_COMMIT.lock().unwrap() = Some(mem::take(&mut *preedit));
    1
}

unsafe extern "C" fn fake_clear_composition(_session_id: RimeSessionId) {
    PREEDIT.lock().unwrap().clear();
}

unsafe extern "C" fn fake_get_commit(session_id: RimeSessionId, commit: *mut RimeCommit) -> Bool {
    if session_id == 0 {
        return 0;
    }
    let Some(text) = PENDING_COMMIT.lock().unwrap().take() else {
        return 0;
    };
    (*commit).text = leak_cstring(&text);
    COMMIT_ALLOCS.fetch_add(1, Ordering::SeqCst);
    1
}

unsafe extern "C" fn fake_free_commit(commit: *mut RimeCommit) -> Bool {
    reclaim_cstring(&mut (*commit).text);
    COMMIT_FREES.fetch_add(1, Ordering::SeqCst);
    1
}

unsafe extern "C" fn fake_get_context(
    session_id: RimeSessionId,
    context: *mut RimeContext,
) -> Bool {
    if session_id == 0 {
        return 0;
    }
    let preedit = PREEDIT.lock().unwrap().clone();
    if preedit.is_empty() {
        return 0;
    }

    let context = &mut *context;
    context.composition.length = preedit.len() as c_int;
    context.composition.cursor_pos = preedit.len() as c_int;
    context.composition.sel_start = 0;
    context.composition.sel_end = preedit.len() as c_int;
    context.composition.preedit = leak_cstring(&preedit);

    let candidates = vec![
        rimebridge::ffi::RimeCandidate {
            text: leak_cstring(&format!("甲[{preedit}]")),
            comment: ptr::null_mut(),
            reserved: ptr::null_mut(),
        },
        rimebridge::ffi::RimeCandidate {
            text: leak_cstring(&format!("乙[{preedit}]")),
            comment: leak_cstring("fixture"),
            reserved: ptr::null_mut(),
        },
        rimebridge::ffi::RimeCandidate {
            text: leak_cstring(&format!("丙[{preedit}]")),
            comment: ptr::null_mut(),
            reserved: ptr::null_mut(),
        },
    ];
    let mut candidates = candidates.into_boxed_slice();
    context.menu.page_size = 5;
    context.menu.page_no = 0;
    context.menu.is_last_page = 1;
    context.menu.highlighted_candidate_index = 0;
    context.menu.num_candidates = candidates.len() as c_int;
    context.menu.candidates = candidates.as_mut_ptr();
    mem::forget(candidates);
    context.menu.select_keys = leak_cstring("12345");

    CONTEXT_ALLOCS.fetch_add(1, Ordering::SeqCst);
    1
}

unsafe extern "C" fn fake_free_context(context: *mut RimeContext) -> Bool {
    let context = &mut *context;
    reclaim_cstring(&mut context.composition.preedit);
    reclaim_cstring(&mut context.menu.select_keys);
    if !context.menu.candidates.is_null() {
        let len = context.menu.num_candidates as usize;
        let items = slice::from_raw_parts_mut(context.menu.candidates, len);
        for item in items.iter_mut() {
            reclaim_cstring(&mut item.text);
            reclaim_cstring(&mut item.comment);
        }
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
            context.menu.candidates,
            len,
        )));
        context.menu.candidates = ptr::null_mut();
    }
    CONTEXT_FREES.fetch_add(1, Ordering::SeqCst);
    1
}

unsafe extern "C" fn fake_get_schema_list(schema_list: *mut RimeSchemaList) -> Bool {
    let items = vec![
        RimeSchemaListItem {
            schema_id: leak_cstring("luna_pinyin"),
            name: leak_cstring("朙月拼音"),
            reserved: ptr::null_mut(),
        },
        RimeSchemaListItem {
            schema_id: leak_cstring("cangjie5"),
            name: leak_cstring("倉頡五代"),
            reserved: ptr::null_mut(),
        },
    ];
    let mut items = items.into_boxed_slice();
    (*schema_list).size = items.len();
    (*schema_list).list = items.as_mut_ptr();
    mem::forget(items);
    SCHEMA_LIST_ALLOCS.fetch_add(1, Ordering::SeqCst);
    1
}

unsafe extern "C" fn fake_free_schema_list(schema_list: *mut RimeSchemaList) {
    let schema_list = &mut *schema_list;
    if !schema_list.list.is_null() {
        let items = slice::from_raw_parts_mut(schema_list.list, schema_list.size);
        for item in items.iter_mut() {
            reclaim_cstring(&mut item.schema_id);
            reclaim_cstring(&mut item.name);
        }
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
            schema_list.list,
            schema_list.size,
        )));
        schema_list.list = ptr::null_mut();
        schema_list.size = 0;
    }
    SCHEMA_LIST_FREES.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn fake_get_current_schema(
    session_id: RimeSessionId,
    schema_id: *mut c_char,
    buffer_size: usize,
) -> Bool {
    if session_id == 0 {
        return 0;
    }
    let current = CURRENT_SCHEMA.lock().unwrap();
    let name = current.as_deref().unwrap_or("luna_pinyin");
    if name.len() + 1 > buffer_size {
        return 0;
    }
    ptr::copy_nonoverlapping(name.as_ptr(), schema_id as *mut u8, name.len());
    *schema_id.add(name.len()) = 0;
    1
}

unsafe extern "C" fn fake_select_schema(
    session_id: RimeSessionId,
    schema_id: *const c_char,
) -> Bool {
    if session_id == 0 || schema_id.is_null() {
        return 0;
    }
    let requested = CStr::from_ptr(schema_id).to_string_lossy().into_owned();
    if requested != "luna_pinyin" && requested != "cangjie5" {
        return 0;
    }
    *CURRENT_SCHEMA.lock().unwrap() = Some(requested);
    1
}

unsafe extern "C" fn fake_user_config_open(
    config_id: *const c_char,
    config: *mut RimeConfig,
) -> Bool {
    if config_id.is_null() || CStr::from_ptr(config_id).to_bytes() != b"default" {
        return 0;
    }
    (*config).ptr = Box::into_raw(Box::new(0u8)) as *mut c_void;
    CONFIG_OPENS.fetch_add(1, Ordering::SeqCst);
    1
}

unsafe extern "C" fn fake_config_close(config: *mut RimeConfig) -> Bool {
    let config = &mut *config;
    if !config.ptr.is_null() {
        drop(Box::from_raw(config.ptr as *mut u8));
        config.ptr = ptr::null_mut();
    }
    CONFIG_CLOSES.fetch_add(1, Ordering::SeqCst);
    1
}

unsafe extern "C" fn fake_config_get_string(
    config: *mut RimeConfig,
    key: *const c_char,
    value: *mut c_char,
    buffer_size: usize,
) -> Bool {
    if (*config).ptr.is_null() || key.is_null() {
        return 0;
    }
    if CStr::from_ptr(key).to_bytes() != b"ascii_composer/switch_key/Shift_L" {
        return 0;
    }
    let binding = b"inline_ascii";
    if binding.len() + 1 > buffer_size {
        return 0;
    }
    ptr::copy_nonoverlapping(binding.as_ptr(), value as *mut u8, binding.len());
    *value.add(binding.len()) = 0;
    1
}

fn fake_table() -> &'static RimeApiTable {
    static TABLE: OnceLock<RimeApiTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table: RimeApiTable = unsafe { mem::zeroed() };
        table.data_size = (mem::size_of::<RimeApiTable>() - mem::size_of::<c_int>()) as c_int;
        table.setup = Some(fake_setup);
        table.initialize = Some(fake_initialize);
        table.finalize = Some(fake_finalize);
        table.set_notification_handler = Some(fake_set_notification_handler);
        table.start_maintenance = Some(fake_start_maintenance);
        table.join_maintenance_thread = Some(fake_join_maintenance_thread);
        table.create_session = Some(fake_create_session);
        table.destroy_session = Some(fake_destroy_session);
        table.process_key = Some(fake_process_key);
        table.commit_composition = Some(fake_commit_composition);
        table.clear_composition = Some(fake_clear_composition);
        table.get_commit = Some(fake_get_commit);
        table.free_commit = Some(fake_free_commit);
        table.get_context = Some(fake_get_context);
        table.free_context = Some(fake_free_context);
        table.get_schema_list = Some(fake_get_schema_list);
        table.free_schema_list = Some(fake_free_schema_list);
        table.get_current_schema = Some(fake_get_current_schema);
        table.select_schema = Some(fake_select_schema);
        table.config_close = Some(fake_config_close);
        table.config_get_string = Some(fake_config_get_string);
        table.user_config_open = Some(fake_user_config_open);
        table
    })
}

fn fake_bridge() -> Bridge<NativeEngine> {
    let engine = unsafe { NativeEngine::from_table(fake_table()) }.unwrap();
    Bridge::init(engine, BridgeOptions::default(), &Traits::new()).unwrap()
}

// ---------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------

#[test]
fn init_runs_the_native_startup_sequence() {
    let _guard = lock_tests();
    reset_fakes();

    let _bridge = fake_bridge();
    assert_eq!(
        *CALLS.lock().unwrap(),
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
fn table_validation_catches_missing_members() {
    let _guard = lock_tests();

    let mut table: RimeApiTable = unsafe { mem::zeroed() };
    table.data_size = (mem::size_of::<RimeApiTable>() - mem::size_of::<c_int>()) as c_int;
    table.setup = Some(fake_setup);
    // Everything else left null.
    let err = ApiFns::from_table(&table).err().unwrap();
    assert!(err.to_string().contains("engine API lacks"));
}

#[test]
fn notifications_reach_the_queue_from_a_foreign_thread() {
    let _guard = lock_tests();
    reset_fakes();

    let bridge = fake_bridge();
    let (handler, context_object) = HANDLER.lock().unwrap().expect("handler registered");
    let handler = handler.expect("non-null handler installed");

    let worker = thread::spawn(move || {
        let message_type = CString::new("deploy").unwrap();
        for i in 0..8 {
            let message_value = CString::new(format!("step {i}")).unwrap();
            unsafe {
                handler(
                    context_object as *mut c_void,
                    31,
                    message_type.as_ptr(),
                    message_value.as_ptr(),
                );
            }
        }
    });
    worker.join().unwrap();

    let notes = bridge.notifications().drain();
    assert_eq!(notes.len(), 8);
    assert_eq!(notes[0].session, SessionId(31));
    assert_eq!(notes[0].message_type, "deploy");
    assert_eq!(notes[7].message_value, "step 7");
}

#[test]
fn context_queries_balance_allocations_under_stress() {
    let _guard = lock_tests();
    reset_fakes();

    let bridge = fake_bridge();
    let session = bridge.create_session();
    for byte in b"nihao" {
        assert!(bridge.process_key(session, i32::from(*byte), 0));
    }

    let context = bridge.context(session).expect("composition in progress");
    assert_eq!(context.composition.preedit, "nihao");
    assert_eq!(context.composition.cursor_pos, 5);
    let texts: Vec<&str> = context
        .menu
        .candidates
        .iter()
        .map(|c| c.text.as_str())
        .collect();
    assert_eq!(texts, vec!["甲[nihao]", "乙[nihao]", "丙[nihao]"]);
    assert_eq!(context.menu.candidates[0].comment, None);
    assert_eq!(context.menu.candidates[1].comment.as_deref(), Some("fixture"));
    assert_eq!(context.menu.select_keys, "12345");

    for _ in 0..500 {
        bridge.context(session).expect("still composing");
    }

    assert_eq!(CONTEXT_ALLOCS.load(Ordering::SeqCst), 501);
    assert_eq!(CONTEXT_FREES.load(Ordering::SeqCst), 501);
}

#[test]
fn commit_round_trip_frees_the_commit_record() {
    let _guard = lock_tests();
    reset_fakes();

    let bridge = fake_bridge();
    let session = bridge.create_session();
    for byte in b"hao" {
        bridge.process_key(session, i32::from(*byte), 0);
    }

    assert!(bridge.commit_composition(session));
    let commit = bridge.commit(session).expect("pending commit");
    assert_eq!(commit.text, "hao");

    // Second query: nothing pending, nothing allocated.
    assert!(bridge.commit(session).is_none());

    assert_eq!(COMMIT_ALLOCS.load(Ordering::SeqCst), 1);
    assert_eq!(COMMIT_FREES.load(Ordering::SeqCst), 1);
    assert!(bridge.destroy_session(session));
}

#[test]
fn schema_list_is_copied_then_freed() {
    let _guard = lock_tests();
    reset_fakes();

    let bridge = fake_bridge();
    for _ in 0..10 {
        let list = bridge.schema_list().expect("fixture schema list");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].schema_id, "luna_pinyin");
        assert_eq!(list[1].name, "倉頡五代");
    }
    assert_eq!(SCHEMA_LIST_ALLOCS.load(Ordering::SeqCst), 10);
    assert_eq!(SCHEMA_LIST_FREES.load(Ordering::SeqCst), 10);
}

#[test]
fn selected_schema_becomes_current_schema() {
    let _guard = lock_tests();
    reset_fakes();

    let bridge = fake_bridge();
    let session = bridge.create_session();
    assert!(bridge.select_schema(session, "cangjie5"));
    assert_eq!(bridge.current_schema(session).as_deref(), Some("cangjie5"));
    assert!(!bridge.select_schema(session, "missing_schema"));
}

#[test]
fn inline_ascii_synthesizes_keys_and_closes_its_config() {
    let _guard = lock_tests();
    reset_fakes();

    let bridge = fake_bridge();
    let session = bridge.create_session();
    assert_eq!(bridge.inline_ascii(session), Some("inline_ascii"));

    let keys = KEYS.lock().unwrap().clone();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], (session.raw() as usize, 65505, 0));
    assert_eq!(keys[1], (session.raw() as usize, 65505, RELEASE_MASK));

    for _ in 0..50 {
        bridge.inline_ascii(session);
    }
    assert_eq!(CONFIG_OPENS.load(Ordering::SeqCst), 51);
    assert_eq!(CONFIG_CLOSES.load(Ordering::SeqCst), 51);
}
