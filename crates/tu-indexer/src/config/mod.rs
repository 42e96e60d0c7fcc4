//! Indexer configuration.
//!
//! Settings are split into one file per category. [`Settings`] aggregates
//! them and handles deserialization of `tu-indexer.toml`. Command-line
//! options are applied on top by the binary.

pub mod compiler;
pub mod indexing;
pub mod logging;
pub mod thread_pool;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use compiler::CompilerSettings;
use compiler::CompilerSettingsPatch;
use indexing::IndexingSettingsPatch;
pub use indexing::{DEFAULT_EXTENSIONS, IndexingSettings, MAX_MAX_TYPE_DEPTH, MIN_MAX_TYPE_DEPTH};
use logging::LoggingSettingsPatch;
pub use logging::{LogLevel, LoggingSettings};
use serde::Deserialize;
use thread_pool::ThreadPoolSettingsPatch;
pub use thread_pool::{MAX_WORKER_THREADS, MIN_WORKER_THREADS, ThreadPoolSettings};

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "tu-indexer.toml";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Settings {
    pub compiler: CompilerSettings,
    pub indexing: IndexingSettings,
    pub logging: LoggingSettings,
    pub thread_pool: ThreadPoolSettings,
}

impl Settings {
    /// Defaults overlaid with the tables present in `text`. Unknown keys are
    /// ignored.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let patch: SettingsPatch = toml::from_str(text)?;
        let mut settings = Self::default();
        settings.apply_patch(patch);
        settings.normalize();
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the nearest `tu-indexer.toml` at or above `start`, or defaults
    /// when there is none.
    pub fn discover(start: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match find_config(start) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Re-apply the clamps after a caller edited fields directly.
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    fn apply_patch(
        &mut self,
        patch: SettingsPatch,
    ) {
        if let Some(p) = patch.compiler {
            self.compiler.apply_patch(p);
        }
        if let Some(p) = patch.indexing {
            self.indexing.apply_patch(p);
        }
        if let Some(p) = patch.logging {
            self.logging.apply_patch(p);
        }
        if let Some(p) = patch.thread_pool {
            self.thread_pool.apply_patch(p);
        }
    }

    fn normalize(&mut self) {
        self.compiler.normalize();
        self.indexing.normalize();
        self.thread_pool.normalize();
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct SettingsPatch {
    compiler: Option<CompilerSettingsPatch>,
    indexing: Option<IndexingSettingsPatch>,
    logging: Option<LoggingSettingsPatch>,
    thread_pool: Option<ThreadPoolSettingsPatch>,
    #[serde(flatten)]
    _extra: HashMap<String, toml::Value>,
}

/// Walk up from `start` looking for [`CONFIG_FILE_NAME`].
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let start = if start.is_file() { start.parent()? } else { start };
    start.ancestors().map(|dir| dir.join(CONFIG_FILE_NAME)).find(|candidate| candidate.is_file())
}

#[cfg(test)]
#[path = "../../tests/src/config/settings_tests.rs"]
mod tests;
