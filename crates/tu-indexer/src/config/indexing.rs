use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Deserialize;

use crate::index::{DEFAULT_MAX_TYPE_DEPTH, IndexOptions};

pub const MIN_MAX_TYPE_DEPTH: usize = 4;
pub const MAX_MAX_TYPE_DEPTH: usize = 256;

pub const DEFAULT_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx", "c++", "m", "mm"];

#[derive(Debug, Clone, PartialEq)]
pub struct IndexingSettings {
    pub index_locals: bool,
    pub type_uses: bool,
    pub max_type_depth: usize,
    /// Source file extensions picked up when a directory is indexed.
    pub extensions: Vec<String>,
    /// Per-job deadline after which the job is aborted.
    pub timeout_secs: Option<u64>,
}

impl Default for IndexingSettings {
    fn default() -> Self {
        Self {
            index_locals: false,
            type_uses: false,
            max_type_depth: DEFAULT_MAX_TYPE_DEPTH,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            timeout_secs: None,
        }
    }
}

impl IndexingSettings {
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            index_locals: self.index_locals,
            type_uses: self.type_uses,
            max_type_depth: self.max_type_depth,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn matches_extension(
        &self,
        ext: &str,
    ) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub(crate) fn apply_patch(
        &mut self,
        patch: IndexingSettingsPatch,
    ) {
        if let Some(v) = patch.index_locals {
            self.index_locals = v;
        }
        if let Some(v) = patch.type_uses {
            self.type_uses = v;
        }
        if let Some(v) = patch.max_type_depth {
            self.max_type_depth = v;
        }
        if let Some(v) = patch.extensions {
            self.extensions = v;
        }
        if let Some(v) = patch.timeout_secs {
            self.timeout_secs = Some(v);
        }
    }

    pub(crate) fn normalize(&mut self) {
        self.max_type_depth = self.max_type_depth.clamp(MIN_MAX_TYPE_DEPTH, MAX_MAX_TYPE_DEPTH);
        self.timeout_secs = self.timeout_secs.filter(|s| *s > 0);
        let mut seen = HashSet::new();
        self.extensions = self
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .filter(|e| seen.insert(e.clone()))
            .collect();
        if self.extensions.is_empty() {
            self.extensions = Self::default().extensions;
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub(crate) struct IndexingSettingsPatch {
    pub(crate) index_locals: Option<bool>,
    pub(crate) type_uses: Option<bool>,
    pub(crate) max_type_depth: Option<usize>,
    pub(crate) extensions: Option<Vec<String>>,
    pub(crate) timeout_secs: Option<u64>,
    #[serde(flatten)]
    pub(crate) _extra: HashMap<String, toml::Value>,
}
