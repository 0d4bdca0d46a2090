//! File browser configuration section

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tracing::warn;

/// Music root used when no configuration is given
pub const DEFAULT_ROOT: &str = "/var/aircat/files";

/// `"files"` section of the configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Root directory every playlist and listing path is resolved against
    pub path: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_ROOT),
        }
    }
}

impl FilesConfig {
    /// Build from a configuration section.
    ///
    /// `None` and malformed sections give the defaults; unknown keys are ignored.
    pub fn from_section(section: Option<&Value>) -> Self {
        match section {
            None | Some(Value::Null) => Self::default(),
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Invalid files configuration ({}), using defaults", e);
                    Self::default()
                }
            },
        }
    }

    /// Configuration section for the document
    pub fn to_section(&self) -> Value {
        serde_json::json!({ "path": self.path.to_string_lossy() })
    }
}
