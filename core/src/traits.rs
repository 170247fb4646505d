//! Traits descriptor: the flat configuration record consumed once at
//! engine initialization.
//!
//! Every field is optional; absent fields leave the engine's own default
//! in place. The descriptor is immutable after init and only borrowed for
//! the duration of that call, so it carries owned strings and nothing
//! else.

use serde::{Deserialize, Serialize};

/// Engine startup configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Traits {
    /// Directory holding distribution-wide schema data.
    pub shared_data_dir: Option<String>,

    /// Directory holding per-user state (deployed schemas, sync data).
    pub user_data_dir: Option<String>,

    /// Directory the engine writes its logs to.
    pub log_dir: Option<String>,

    pub distribution_name: Option<String>,
    pub distribution_code_name: Option<String>,
    pub distribution_version: Option<String>,

    /// Name the engine registers itself under (shows up in logs and
    /// per-app options).
    pub app_name: Option<String>,

    /// Minimum engine log level (0 = info, 1 = warning, 2 = error,
    /// 3 = fatal).
    pub min_log_level: Option<i32>,
}

impl Traits {
    /// Descriptor with every field absent; engine defaults apply.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_partial_descriptors() {
        let traits: Traits = serde_json::from_str(
            r#"{"user_data_dir": "/home/u/.config/rime", "min_log_level": 2}"#,
        )
        .unwrap();
        assert_eq!(traits.user_data_dir.as_deref(), Some("/home/u/.config/rime"));
        assert_eq!(traits.min_log_level, Some(2));
        assert!(traits.shared_data_dir.is_none());
        assert!(traits.app_name.is_none());
    }

    #[test]
    fn default_descriptor_is_all_absent() {
        assert_eq!(Traits::new(), Traits::default());
        assert!(Traits::new().distribution_name.is_none());
    }
}
