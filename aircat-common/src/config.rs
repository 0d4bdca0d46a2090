//! Configuration store and config file resolution
//!
//! The whole daemon configuration is one JSON object whose top-level keys
//! are module ids (plus `"httpd"` for the HTTP layer). Each value is an
//! opaque section owned by that module. The document is only written to
//! disk on an explicit [`ConfigStore::save`].

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "aircat.conf";

/// System-wide configuration file used when no user config exists
pub const SYSTEM_CONFIG_PATH: &str = "/etc/aircat/aircat.conf";

/// JSON configuration document backed by a file
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: Map<String, Value>,
}

impl ConfigStore {
    /// Create a store bound to `path` and load it.
    ///
    /// A missing or malformed file yields an empty document.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            document: Map::new(),
        };
        store.load();
        store
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the whole document with the content of the backing file.
    ///
    /// Never fails: unreadable or malformed files leave an empty document
    /// and a warning in the log.
    pub fn load(&mut self) {
        self.document = match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => {
                    info!(
                        "Loaded configuration from {} ({} sections)",
                        self.path.display(),
                        map.len()
                    );
                    map
                }
                Ok(_) => {
                    warn!(
                        "Configuration {} is not a JSON object, using defaults",
                        self.path.display()
                    );
                    Map::new()
                }
                Err(e) => {
                    warn!(
                        "Malformed configuration {}: {}, using defaults",
                        self.path.display(),
                        e
                    );
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No configuration file at {}, using defaults",
                    self.path.display()
                );
                Map::new()
            }
            Err(e) => {
                warn!(
                    "Failed to read configuration {}: {}, using defaults",
                    self.path.display(),
                    e
                );
                Map::new()
            }
        };
    }

    /// Serialize the whole document to the backing file.
    ///
    /// Writes a sibling temporary file first and renames it over the
    /// target, so a crash never leaves a truncated configuration.
    pub fn save(&self) -> Result<()> {
        let Some(file_name) = self.path.file_name() else {
            return Err(Error::Config(format!(
                "{} does not name a file",
                self.path.display()
            )));
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(&self.document)?;

        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!("Saved configuration to {}", self.path.display());
        Ok(())
    }

    /// Detached copy of one section, or `None` if absent
    pub fn get_section(&self, id: &str) -> Option<Value> {
        self.document.get(id).cloned()
    }

    /// Replace one section. `None` removes it.
    pub fn set_section(&mut self, id: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.document.insert(id.to_string(), value);
            }
            None => {
                self.document.remove(id);
            }
        }
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. User config directory, if a file exists there
/// 4. System-wide `/etc/aircat/aircat.conf`
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: User configuration
    if let Some(user_config) = dirs::config_dir().map(|d| d.join("aircat").join(CONFIG_FILE_NAME)) {
        if user_config.exists() {
            return user_config;
        }
    }

    // Priority 4: System default
    PathBuf::from(SYSTEM_CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_empty_document() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::open(dir.path().join("none.conf"));
        assert!(store.document.is_empty());
        assert!(store.get_section("files").is_none());
    }

    #[test]
    fn test_malformed_file_gives_empty_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.conf");
        fs::write(&path, "{ not json").unwrap();

        let store = ConfigStore::open(&path);
        assert!(store.document.is_empty());
    }

    #[test]
    fn test_non_object_file_gives_empty_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("array.conf");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let store = ConfigStore::open(&path);
        assert!(store.document.is_empty());
        store.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_set_get_section_is_detached() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::open(dir.path().join("a.conf"));

        store.set_section("files", Some(json!({"path": "/music"})));
        let mut copy = store.get_section("files").unwrap();
        copy["path"] = json!("/elsewhere");

        assert_eq!(store.get_section("files").unwrap()["path"], "/music");
    }

    #[test]
    fn test_set_section_none_removes() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::open(dir.path().join("a.conf"));

        store.set_section("httpd", Some(json!({"port": 8080})));
        store.set_section("httpd", None);
        assert!(store.get_section("httpd").is_none());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("aircat.conf");

        let mut store = ConfigStore::open(&path);
        store.set_section("httpd", Some(json!({"port": 9000})));
        store.set_section("files", Some(json!({"path": "/srv/music"})));
        store.save().unwrap();

        assert!(path.exists());
        assert!(!path.with_file_name("aircat.conf.tmp").exists());

        let reloaded = ConfigStore::open(&path);
        assert_eq!(reloaded.get_section("httpd").unwrap()["port"], 9000);
        assert_eq!(reloaded.get_section("files").unwrap()["path"], "/srv/music");
    }

    #[test]
    fn test_load_replaces_unsaved_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aircat.conf");
        fs::write(&path, r#"{"files": {"path": "/a"}}"#).unwrap();

        let mut store = ConfigStore::open(&path);
        store.set_section("files", Some(json!({"path": "/b"})));
        store.set_section("extra", Some(json!(1)));
        store.load();

        assert_eq!(store.get_section("files").unwrap()["path"], "/a");
        assert!(store.get_section("extra").is_none());
    }

    #[test]
    fn test_save_needs_a_file_name() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::open(dir.path().join(".."));
        assert!(matches!(store.save(), Err(Error::Config(_))));
    }

    #[test]
    fn test_resolve_config_path_cli_wins() {
        let path = resolve_config_path(Some(Path::new("/tmp/custom.conf")), "AIRCAT_TEST_UNSET_VAR");
        assert_eq!(path, PathBuf::from("/tmp/custom.conf"));
    }
}
