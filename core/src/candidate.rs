//! Conversion candidates.
//!
//! Candidates arrive from the engine already ranked. The order is part of
//! the engine's contract with the user (select keys map onto it), so the
//! bridge copies it verbatim and never re-sorts.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One selectable conversion option: display text plus an optional
/// annotation (pronunciation hint, source marker, etc.).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub comment: Option<String>,
}

impl Candidate {
    pub fn new<T: Into<String>>(text: T, comment: Option<String>) -> Self {
        Candidate {
            text: text.into(),
            comment,
        }
    }

    /// Host-value form. A missing comment marshals as an empty string,
    /// matching what the engine's fixed buffers would have produced.
    pub fn to_value(&self) -> Value {
        json!({
            "text": self.text,
            "comment": self.comment.as_deref().unwrap_or(""),
        })
    }
}

/// Marshal a ranked candidate slice into an ordered host array.
pub fn candidates_to_value(candidates: &[Candidate]) -> Value {
    Value::Array(candidates.iter().map(Candidate::to_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marshals_text_and_comment() {
        let cand = Candidate::new("你好", Some("ni hao".to_string()));
        let value = cand.to_value();
        assert_eq!(value["text"], "你好");
        assert_eq!(value["comment"], "ni hao");
    }

    #[test]
    fn missing_comment_becomes_empty_string() {
        let value = Candidate::new("好", None).to_value();
        assert_eq!(value["comment"], "");
    }

    #[test]
    fn array_preserves_ranking_order() {
        let ranked = vec![
            Candidate::new("一", None),
            Candidate::new("二", None),
            Candidate::new("三", None),
        ];
        let value = candidates_to_value(&ranked);
        let texts: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["一", "二", "三"]);
    }
}
