//! Schema metadata.
//!
//! A schema is a named input method configuration selectable per session.
//! The engine reports the installed set as an ordered list of
//! (identifier, display name) pairs.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One installed schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub schema_id: String,
    pub name: String,
}

impl SchemaEntry {
    pub fn new<I: Into<String>, N: Into<String>>(schema_id: I, name: N) -> Self {
        SchemaEntry {
            schema_id: schema_id.into(),
            name: name.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "schema_id": self.schema_id,
            "name": self.name,
        })
    }
}

/// Marshal a schema list into an ordered host array.
pub fn schema_list_to_value(entries: &[SchemaEntry]) -> Value {
    Value::Array(entries.iter().map(SchemaEntry::to_value).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marshals_id_and_name_in_order() {
        let list = vec![
            SchemaEntry::new("luna_pinyin", "朙月拼音"),
            SchemaEntry::new("cangjie5", "倉頡五代"),
        ];
        let value = schema_list_to_value(&list);
        let arr = value.as_array().unwrap();
        assert_eq!(arr[0]["schema_id"], "luna_pinyin");
        assert_eq!(arr[0]["name"], "朙月拼音");
        assert_eq!(arr[1]["schema_id"], "cangjie5");
    }
}
