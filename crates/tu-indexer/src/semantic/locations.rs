use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clang_ast::{SourceLocation, SourceRange};

use crate::frontend::clang_nodes::resolve_loc;
use crate::index::facts::FileLocation;

/// File name clang reports for a buffer read from standard input.
pub const STDIN_FILE: &str = "<stdin>";

/// Maps the file names clang prints to canonical absolute paths.
///
/// Two locations reached through different include spellings of the same
/// file (`../inc/a.h`, `/abs/inc/a.h`, a symlink) compare equal once mapped.
#[derive(Debug, Clone)]
pub struct LocationMap {
    primary: String,
    working_directory: PathBuf,
    canonical: HashMap<String, String>,
}

impl LocationMap {
    pub fn new(
        primary: &Path,
        working_directory: &Path,
    ) -> Self {
        let mut map = Self {
            primary: String::new(),
            working_directory: working_directory.to_path_buf(),
            canonical: HashMap::new(),
        };
        map.primary = map.compute_canonical(&primary.display().to_string());
        map
    }

    /// Canonical path of the translation unit's main file.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Canonicalize and cache every file named by `loc`.
    pub fn record(
        &mut self,
        loc: &SourceLocation,
    ) {
        for bare in [loc.spelling_loc.as_ref(), loc.expansion_loc.as_ref()].into_iter().flatten() {
            if bare.file.is_empty() || self.canonical.contains_key(bare.file.as_ref()) {
                continue;
            }
            let canonical = self.compute_canonical(&bare.file);
            self.canonical.insert(bare.file.to_string(), canonical);
        }
    }

    pub fn record_range(
        &mut self,
        range: &SourceRange,
    ) {
        self.record(&range.begin);
        self.record(&range.end);
    }

    /// Canonical form of a file name printed by the front-end.
    pub fn canonical_file(
        &self,
        raw: &str,
    ) -> String {
        match self.canonical.get(raw) {
            Some(c) => c.clone(),
            None => self.compute_canonical(raw),
        }
    }

    /// Resolve a front-end location to a [`FileLocation`].
    ///
    /// The file is left empty when clang printed none; the caller fills it
    /// from the preprocessor file tracker.
    pub fn resolve(
        &self,
        loc: &SourceLocation,
    ) -> Option<FileLocation> {
        let bare = resolve_loc(loc)?;
        if bare.line == 0 {
            return None;
        }
        let file = if bare.file.is_empty() {
            String::new()
        } else {
            self.canonical_file(&bare.file)
        };
        Some(FileLocation {
            file,
            line: bare.line as u32,
            column: bare.col as u32,
            offset: bare.offset as u32,
        })
    }

    fn compute_canonical(
        &self,
        raw: &str,
    ) -> String {
        if raw == STDIN_FILE {
            return self.primary.clone();
        }
        if !is_physical_file(raw) {
            return raw.to_owned();
        }
        let path = Path::new(raw);
        let joined = if path.is_relative() {
            self.working_directory.join(path)
        } else {
            path.to_path_buf()
        };
        joined.canonicalize().unwrap_or(joined).display().to_string()
    }
}

/// Whether `file` names a real file rather than a front-end pseudo buffer
/// such as `<built-in>` or `<scratch space>`.
pub fn is_physical_file(file: &str) -> bool {
    !file.is_empty() && !(file.starts_with('<') && file.ends_with('>'))
}

#[cfg(test)]
#[path = "../../tests/src/semantic/locations_tests.rs"]
mod tests;
