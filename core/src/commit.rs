//! Committed text records.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Finalized text produced when a composition is accepted.
///
/// Like the context snapshot, the engine-side structure is ephemeral;
/// this is the owned copy handed to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub text: String,
}

impl Commit {
    pub fn new<T: Into<String>>(text: T) -> Self {
        Commit { text: text.into() }
    }

    /// Host-value form: `{text: ...}`.
    pub fn to_value(&self) -> Value {
        json!({ "text": self.text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marshals_committed_text() {
        let value = Commit::new("你好").to_value();
        assert_eq!(value["text"], "你好");
    }
}
