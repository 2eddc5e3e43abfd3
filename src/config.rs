use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{FileSlot, NoteContext, NoteError, PersistenceAdapter, Result};

/// Storage key the collection is saved under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "pocketQuillNotes";

/// Environment variable overriding [`Config::data_dir`].
pub const DATA_DIR_ENV: &str = "QUILLNOTES_DATA_DIR";

const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the stored note collection
    pub data_dir: PathBuf,

    /// Key (file stem) the whole collection is stored under
    pub storage_key: String,

    /// How long to wait for the tag-suggestion service, in seconds
    pub suggestion_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".quillnotes"));

        Self {
            data_dir,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            suggestion_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from the platform config directory
    /// when no path is given.
    ///
    /// An explicitly given file must exist. The implicit file may be absent,
    /// in which case defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (Some(p.to_path_buf()), true),
            None => (Self::default_config_path(), false),
        };

        let config = match path {
            Some(p) if p.exists() => {
                debug!("Reading configuration from {}", p.display());
                let raw = fs::read_to_string(&p)?;
                let config: Config = serde_json::from_str(&raw).map_err(|e| NoteError::ConfigError {
                    message: format!("{}: {}", p.display(), e),
                })?;
                info!("Loaded configuration from {}", p.display());
                config
            }
            Some(p) if required => {
                return Err(NoteError::ConfigError {
                    message: format!("configuration file not found: {}", p.display()),
                });
            }
            _ => {
                debug!("No configuration file, using defaults");
                Config::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Location of the implicit configuration file.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Applies the `QUILLNOTES_DATA_DIR` environment override.
    pub fn apply_env(self) -> Self {
        self.with_data_dir(std::env::var(DATA_DIR_ENV).ok())
    }

    /// Replaces the data directory when `dir` is set and non-empty.
    pub fn with_data_dir(mut self, dir: Option<String>) -> Self {
        if let Some(dir) = dir.filter(|d| !d.trim().is_empty()) {
            debug!("Data directory overridden: {}", dir);
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn suggestion_timeout(&self) -> Duration {
        Duration::from_secs(self.suggestion_timeout_secs)
    }

    /// The persistence adapter backed by a file in [`Config::data_dir`].
    pub fn open_adapter(&self) -> PersistenceAdapter {
        PersistenceAdapter::new(FileSlot::new(&self.data_dir), self.storage_key.clone())
    }

    /// A not-yet-initialized context over the configured storage.
    pub fn open_context(&self) -> NoteContext {
        NoteContext::new(self.open_adapter()).with_suggestion_timeout(self.suggestion_timeout())
    }

    fn validate(&self) -> Result<()> {
        let key = self.storage_key.trim();
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(NoteError::ConfigError {
                message: format!("invalid storage key: '{}'", self.storage_key),
            });
        }

        if self.suggestion_timeout_secs == 0 {
            return Err(NoteError::ConfigError {
                message: "suggestion_timeout_secs must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "quillnotes")
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"data_dir": "/tmp/notes-here"}"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/notes-here"));
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.suggestion_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, NoteError::ConfigError { .. }));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "data_dir = 'toml?'").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(NoteError::ConfigError { .. })
        ));
    }

    #[test]
    fn storage_key_cannot_escape_the_data_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"storage_key": "../elsewhere"}"#).unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(NoteError::ConfigError { .. })
        ));
    }

    #[test]
    fn data_dir_override_ignores_blank_values() {
        let base = Config::default();
        assert_eq!(base.clone().with_data_dir(Some("  ".to_string())), base);

        let moved = base.with_data_dir(Some("/srv/notes".to_string()));
        assert_eq!(moved.data_dir, PathBuf::from("/srv/notes"));
    }

    #[test]
    fn adapter_writes_under_data_dir() {
        let dir = TempDir::new().unwrap();
        let config = Config::default().with_data_dir(Some(dir.path().display().to_string()));

        config.open_adapter().save(&[]).unwrap();
        assert!(dir.path().join("pocketQuillNotes.json").exists());
    }
}
