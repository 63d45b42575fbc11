//! Core runtime configuration.
//!
//! # Responsibility
//! - Load storage, logging and limit settings from an optional TOML file.
//! - Layer `RUNDOWN_*` environment overrides on top.
//!
//! # Invariants
//! - A missing config file yields defaults, never an error.
//! - Invalid override values are logged and ignored.

use crate::db::{open_target, DbResult, DbTarget};
use crate::model::project::MAX_PROJECTS;
use crate::store::StorageLayout;
use log::warn;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageLayout,
    /// SQLite file; in-memory when unset.
    pub db_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageLayout::Referential,
            db_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Falls back to `default_log_level()` when unset.
    pub level: Option<String>,
    /// File logging stays off when unset.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_projects: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_projects: MAX_PROJECTS,
        }
    }
}

impl CoreConfig {
    /// Loads `path` (if it exists) and applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parses TOML without touching the environment.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `RUNDOWN_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup.
    pub fn apply_env_overrides_from<F>(&mut self, mut lookup: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = non_blank(lookup("RUNDOWN_BACKEND")) {
            match StorageLayout::parse(&raw) {
                Some(layout) => self.storage.backend = layout,
                None => warn!(
                    "event=config_override module=config status=ignored key=RUNDOWN_BACKEND reason=unknown_layout"
                ),
            }
        }

        if let Some(raw) = non_blank(lookup("RUNDOWN_DB_PATH")) {
            self.storage.db_path = Some(PathBuf::from(raw));
        }

        if let Some(raw) = non_blank(lookup("RUNDOWN_LOG_LEVEL")) {
            self.logging.level = Some(raw);
        }

        if let Some(raw) = non_blank(lookup("RUNDOWN_LOG_DIR")) {
            self.logging.dir = Some(PathBuf::from(raw));
        }

        if let Some(raw) = non_blank(lookup("RUNDOWN_MAX_PROJECTS")) {
            match raw.parse::<usize>() {
                Ok(value) => self.limits.max_projects = value,
                Err(err) => warn!(
                    "event=config_override module=config status=ignored key=RUNDOWN_MAX_PROJECTS reason={err}"
                ),
            }
        }
    }

    /// Opens the configured database with migrations applied.
    pub fn open_connection(&self) -> DbResult<Connection> {
        open_target(&DbTarget::from_path(self.storage.db_path.as_deref()))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}
