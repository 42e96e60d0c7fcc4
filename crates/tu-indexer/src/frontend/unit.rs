use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::DescriptorError;

/// Everything needed to parse exactly one translation unit.
///
/// Immutable once built. The unsaved buffer is shared, so retrying a unit
/// never copies the editor's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    source_file: PathBuf,
    working_directory: PathBuf,
    flags: Vec<String>,
    unsaved_content: Option<Arc<str>>,
}

impl CompilationUnit {
    /// Describe a compilation of `source_file` with `flags` passed through
    /// verbatim. A relative source path is taken relative to
    /// `working_directory`.
    ///
    /// Flags are not validated; bad ones surface as front-end diagnostics.
    pub fn build(
        source_file: impl Into<PathBuf>,
        working_directory: impl Into<PathBuf>,
        flags: Vec<String>,
        unsaved_content: Option<Arc<str>>,
    ) -> Result<Self, DescriptorError> {
        let source_file = source_file.into();
        let working_directory = working_directory.into();
        if source_file.as_os_str().is_empty() {
            return Err(DescriptorError::EmptySourceFile);
        }
        let source_file = if source_file.is_relative() {
            working_directory.join(source_file)
        } else {
            source_file
        };
        if source_file.is_dir() {
            return Err(DescriptorError::Directory(source_file));
        }
        Ok(Self {
            source_file,
            working_directory,
            flags,
            unsaved_content,
        })
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// In-memory replacement for the source file's on-disk bytes.
    pub fn unsaved_content(&self) -> Option<&str> {
        self.unsaved_content.as_deref()
    }

    /// Shared handle to the unsaved buffer, for building a retry.
    pub fn unsaved_buffer(&self) -> Option<Arc<str>> {
        self.unsaved_content.clone()
    }

    /// Front-end language name for the source file, used when the file's
    /// content is fed through standard input.
    pub fn language(&self) -> &'static str {
        let ext = self.source_file.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match ext.to_ascii_lowercase().as_str() {
            "c" => "c",
            "m" => "objective-c",
            "mm" => "objective-c++",
            "h" if self.flags_are_c() => "c",
            _ => "c++",
        }
    }

    /// Whether the flags already choose a language with `-x`.
    pub fn flags_specify_language(&self) -> bool {
        self.flags.iter().any(|f| f.starts_with("-x"))
    }

    fn flags_are_c(&self) -> bool {
        self.flags
            .iter()
            .any(|f| (f.starts_with("-std=c") || f.starts_with("-std=gnu")) && !f.contains("++"))
    }
}

#[cfg(test)]
#[path = "../../tests/src/frontend/unit_tests.rs"]
mod tests;
