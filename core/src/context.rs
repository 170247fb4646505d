//! Context snapshots for host communication.
//!
//! A context query returns everything the host needs to draw the IME
//! state: the composition sub-record and the candidate menu sub-record.
//! The engine's own structure is ephemeral and engine-allocated; what
//! crosses the boundary is this owned copy. No callbacks, no borrowed
//! buffers; the host reads plain values.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::candidate::{candidates_to_value, Candidate};
use crate::composition::Composition;

/// Candidate menu sub-record: pagination state plus the ranked
/// candidates for the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub page_size: i32,
    pub page_no: i32,
    pub is_last_page: bool,
    pub highlighted_candidate_index: i32,
    /// Number of candidates on this page, as counted by the engine.
    pub num_candidates: i32,
    /// Keys that select candidates by position (e.g. "1234567890").
    pub select_keys: String,
    /// Ranked candidates, engine order.
    pub candidates: Vec<Candidate>,
}

impl Menu {
    pub fn to_value(&self) -> Value {
        json!({
            "page_size": self.page_size,
            "page_no": self.page_no,
            "is_last_page": self.is_last_page,
            "highlighted_candidate_index": self.highlighted_candidate_index,
            "num_candidates": self.num_candidates,
            "select_keys": self.select_keys,
            "candidates": candidates_to_value(&self.candidates),
        })
    }
}

/// Owned copy of one engine context query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub composition: Composition,
    pub menu: Menu,
}

impl ContextSnapshot {
    /// Host-value form: `{composition: {...}, menu: {...}}`, field names
    /// matching the engine's context record.
    pub fn to_value(&self) -> Value {
        json!({
            "composition": self.composition.to_value(),
            "menu": self.menu.to_value(),
        })
    }
}
