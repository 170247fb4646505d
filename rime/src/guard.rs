//! Release-on-drop guards for the engine's ephemeral structures.
//!
//! Every query that hands back an engine-allocated structure is wrapped
//! in a guard: `acquire` performs the query, `Drop` invokes the matching
//! free exactly once, on every exit path. Copy-out happens while the
//! guard is alive; nothing engine-owned escapes it. When the query
//! itself fails the engine has allocated nothing, so no guard is
//! constructed and nothing is freed.

use core::ffi::{c_char, c_int};
use std::ffi::{CStr, CString};
use std::slice;

use rimebridge_core::{
    Candidate, Commit, Composition, ConfigReader, ContextSnapshot, Menu, SchemaEntry, SessionId,
};

use crate::ffi::{ApiFns, RimeCommit, RimeConfig, RimeContext, RimeSchemaList, RimeSessionId};

/// Buffer size for fixed-size string reads, matching the engine's own
/// sample code.
pub const BUFFER_SIZE: usize = 1024;

/// Copy a possibly-null engine string. Truncation happened on the
/// engine side if at all; here the bytes are taken as-is.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays
/// valid for the duration of the call.
pub unsafe fn owned_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

fn session_raw(session: SessionId) -> RimeSessionId {
    session.raw() as RimeSessionId
}

/// Context query result, freed on drop.
pub struct ContextGuard<'a> {
    fns: &'a ApiFns,
    raw: RimeContext,
}

impl<'a> ContextGuard<'a> {
    pub fn acquire(fns: &'a ApiFns, session: SessionId) -> Option<Self> {
        let mut raw = RimeContext::new();
        let ok = unsafe { (fns.get_context)(session_raw(session), &mut raw) } != 0;
        if !ok {
            return None;
        }
        Some(ContextGuard { fns, raw })
    }

    /// Owned copy of the composition and menu, candidate order intact.
    pub fn snapshot(&self) -> ContextSnapshot {
        let composition = Composition {
            length: self.raw.composition.length,
            cursor_pos: self.raw.composition.cursor_pos,
            sel_start: self.raw.composition.sel_start,
            sel_end: self.raw.composition.sel_end,
            preedit: unsafe { owned_string(self.raw.composition.preedit) },
        };

        let menu = &self.raw.menu;
        let candidates = if menu.candidates.is_null() || menu.num_candidates <= 0 {
            Vec::new()
        } else {
            unsafe { slice::from_raw_parts(menu.candidates, menu.num_candidates as usize) }
                .iter()
                .map(|candidate| {
                    let comment = if candidate.comment.is_null() {
                        None
                    } else {
                        Some(unsafe { owned_string(candidate.comment) })
                    };
                    Candidate::new(unsafe { owned_string(candidate.text) }, comment)
                })
                .collect()
        };

        ContextSnapshot {
            composition,
            menu: Menu {
                page_size: menu.page_size,
                page_no: menu.page_no,
                is_last_page: menu.is_last_page != 0,
                highlighted_candidate_index: menu.highlighted_candidate_index,
                num_candidates: menu.num_candidates,
                select_keys: unsafe { owned_string(menu.select_keys) },
                candidates,
            },
        }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            (self.fns.free_context)(&mut self.raw);
        }
    }
}

/// Commit query result, freed on drop.
pub struct CommitGuard<'a> {
    fns: &'a ApiFns,
    raw: RimeCommit,
}

impl<'a> CommitGuard<'a> {
    pub fn acquire(fns: &'a ApiFns, session: SessionId) -> Option<Self> {
        let mut raw = RimeCommit::new();
        let ok = unsafe { (fns.get_commit)(session_raw(session), &mut raw) } != 0;
        if !ok {
            return None;
        }
        Some(CommitGuard { fns, raw })
    }

    pub fn snapshot(&self) -> Commit {
        Commit::new(unsafe { owned_string(self.raw.text) })
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            (self.fns.free_commit)(&mut self.raw);
        }
    }
}

/// Schema list query result, freed on drop.
///
/// The engine allocates the item array, so the list-level structure
/// needs its own free after the entries are copied out.
pub struct SchemaListGuard<'a> {
    fns: &'a ApiFns,
    raw: RimeSchemaList,
}

impl<'a> SchemaListGuard<'a> {
    pub fn acquire(fns: &'a ApiFns) -> Option<Self> {
        let mut raw = RimeSchemaList::new();
        let ok = unsafe { (fns.get_schema_list)(&mut raw) } != 0;
        if !ok {
            return None;
        }
        Some(SchemaListGuard { fns, raw })
    }

    pub fn entries(&self) -> Vec<SchemaEntry> {
        if self.raw.list.is_null() || self.raw.size == 0 {
            return Vec::new();
        }
        unsafe { slice::from_raw_parts(self.raw.list, self.raw.size) }
            .iter()
            .map(|item| {
                SchemaEntry::new(unsafe { owned_string(item.schema_id) }, unsafe {
                    owned_string(item.name)
                })
            })
            .collect()
    }
}

impl Drop for SchemaListGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            (self.fns.free_schema_list)(&mut self.raw);
        }
    }
}

/// Open user configuration, closed on drop.
///
/// This is what keeps repeated `inlineAscii` calls from leaking handles:
/// the dispatch layer drops the reader at the end of each call, and the
/// drop is the close.
pub struct ConfigGuard<'a> {
    fns: &'a ApiFns,
    raw: RimeConfig,
}

impl<'a> ConfigGuard<'a> {
    pub fn open_user_config(fns: &'a ApiFns, config_name: &str) -> Option<Self> {
        let name = CString::new(config_name).ok()?;
        let mut raw = RimeConfig::new();
        let ok = unsafe { (fns.user_config_open)(name.as_ptr(), &mut raw) } != 0;
        if !ok {
            return None;
        }
        Some(ConfigGuard { fns, raw })
    }
}

impl ConfigReader for ConfigGuard<'_> {
    fn get_string(&self, key: &str) -> Option<String> {
        let key = CString::new(key).ok()?;
        let mut buffer = [0u8; 128];
        let ok = unsafe {
            (self.fns.config_get_string)(
                // The engine takes the handle mutably even for reads.
                &self.raw as *const RimeConfig as *mut RimeConfig,
                key.as_ptr(),
                buffer.as_mut_ptr() as *mut c_char,
                buffer.len(),
            )
        } != 0;
        if !ok {
            return None;
        }
        let value = CStr::from_bytes_until_nul(&buffer).ok()?;
        Some(value.to_string_lossy().into_owned())
    }
}

impl Drop for ConfigGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            (self.fns.config_close)(&mut self.raw);
        }
    }
}

/// Read a fixed-size string out parameter, e.g. the current schema id.
pub fn read_string_buffer<F>(fill: F) -> Option<String>
where
    F: FnOnce(*mut c_char, usize) -> c_int,
{
    let mut buffer = [0u8; BUFFER_SIZE];
    if fill(buffer.as_mut_ptr() as *mut c_char, buffer.len()) == 0 {
        return None;
    }
    let value = CStr::from_bytes_until_nul(&buffer).ok()?;
    Some(value.to_string_lossy().into_owned())
}
