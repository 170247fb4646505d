//! Composition state copied out of the engine.
//!
//! This is the preedit sub-record of a context query: the in-progress
//! input, where the caret sits in it, and which span is selected. All
//! positions are non-negative offsets into the preedit text; a cursor or
//! selection bound equal to `length` means "at end".

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Snapshot of the engine's in-progress composition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    /// Raw composition length as reported by the engine.
    pub length: i32,

    /// Caret position within the preedit.
    pub cursor_pos: i32,

    /// Selection start offset.
    pub sel_start: i32,

    /// Selection end offset.
    pub sel_end: i32,

    /// Rendered preedit text. Empty when nothing is being composed.
    pub preedit: String,
}

impl Composition {
    /// Whether anything is being composed.
    pub fn is_empty(&self) -> bool {
        self.preedit.is_empty() && self.length == 0
    }

    /// Host-value form, field names matching the engine's context record.
    pub fn to_value(&self) -> Value {
        json!({
            "length": self.length,
            "cursor_pos": self.cursor_pos,
            "sel_start": self.sel_start,
            "sel_end": self.sel_end,
            "preedit": self.preedit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_composition_marshals_zeroes() {
        let value = Composition::default().to_value();
        assert_eq!(value["length"], 0);
        assert_eq!(value["preedit"], "");
    }

    #[test]
    fn cursor_at_end_is_preserved() {
        let comp = Composition {
            length: 5,
            cursor_pos: 5,
            sel_start: 0,
            sel_end: 5,
            preedit: "nihao".to_string(),
        };
        let value = comp.to_value();
        assert_eq!(value["cursor_pos"], 5);
        assert_eq!(value["sel_end"], 5);
        assert_eq!(value["preedit"], "nihao");
        assert!(!comp.is_empty());
    }
}
