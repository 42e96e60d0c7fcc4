use std::collections::HashMap;

use serde::Deserialize;

use crate::frontend::DEFAULT_CLANG;

#[derive(Debug, Clone, PartialEq)]
pub struct CompilerSettings {
    pub clang_path: String,
    /// Language standard passed as `-std=`.
    pub std: Option<String>,
    pub include_paths: Vec<String>,
    /// `NAME` or `NAME=VALUE`.
    pub defines: Vec<String>,
    /// Headers force-included with `-include`.
    pub pre_includes: Vec<String>,
    pub extra_flags: Vec<String>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            clang_path: DEFAULT_CLANG.to_string(),
            std: None,
            include_paths: Vec::new(),
            defines: Vec::new(),
            pre_includes: Vec::new(),
            extra_flags: Vec::new(),
        }
    }
}

impl CompilerSettings {
    /// Front-end flags in the order standard, defines, include paths,
    /// pre-includes, extra flags.
    pub fn flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(std) = &self.std {
            flags.push(format!("-std={std}"));
        }
        flags.extend(self.defines.iter().map(|d| format!("-D{d}")));
        flags.extend(self.include_paths.iter().map(|p| format!("-I{p}")));
        for header in &self.pre_includes {
            flags.push("-include".to_string());
            flags.push(header.clone());
        }
        flags.extend(self.extra_flags.iter().cloned());
        flags
    }

    pub(crate) fn apply_patch(
        &mut self,
        patch: CompilerSettingsPatch,
    ) {
        if let Some(v) = patch.clang_path {
            self.clang_path = v;
        }
        if let Some(v) = patch.std {
            self.std = Some(v);
        }
        if let Some(v) = patch.include_paths {
            self.include_paths = v;
        }
        if let Some(v) = patch.defines {
            self.defines = v;
        }
        if let Some(v) = patch.pre_includes {
            self.pre_includes = v;
        }
        if let Some(v) = patch.extra_flags {
            self.extra_flags = v;
        }
    }

    pub(crate) fn normalize(&mut self) {
        self.clang_path = self.clang_path.trim().to_string();
        if self.clang_path.is_empty() {
            self.clang_path = DEFAULT_CLANG.to_string();
        }
        self.std = self.std.take().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        for list in [&mut self.include_paths, &mut self.defines, &mut self.pre_includes, &mut self.extra_flags] {
            *list = list.iter().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect();
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub(crate) struct CompilerSettingsPatch {
    pub(crate) clang_path: Option<String>,
    pub(crate) std: Option<String>,
    pub(crate) include_paths: Option<Vec<String>>,
    pub(crate) defines: Option<Vec<String>>,
    pub(crate) pre_includes: Option<Vec<String>>,
    pub(crate) extra_flags: Option<Vec<String>>,
    #[serde(flatten)]
    pub(crate) _extra: HashMap<String, toml::Value>,
}
