//! HTTP layer configuration section

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Key of the HTTP layer section in the configuration document
pub const HTTPD_SECTION: &str = "httpd";

/// Listening port used when no configuration is given
pub const DEFAULT_PORT: u16 = 8080;

/// `"httpd"` section of the configuration document.
///
/// A port change is only recorded; the listener is bound once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpdConfig {
    pub port: u16,
}

impl Default for HttpdConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl HttpdConfig {
    /// `None` and malformed sections give the defaults
    pub fn from_section(section: Option<&Value>) -> Self {
        match section {
            None | Some(Value::Null) => Self::default(),
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Invalid httpd configuration ({}), using defaults", e);
                    Self::default()
                }
            },
        }
    }

    pub fn to_section(&self) -> Value {
        serde_json::json!({ "port": self.port })
    }
}
