use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::frontend::unit::CompilationUnit;

/// Flags that make clang stop after semantic analysis and print the AST.
const AST_DUMP_FLAGS: &[&str] = &["-fsyntax-only", "-fno-color-diagnostics", "-Xclang", "-ast-dump=json"];

/// One entry of a `compile_commands.json` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
    pub directory: PathBuf,
    pub file: PathBuf,
    /// Program followed by its arguments.
    pub arguments: Vec<String>,
}

impl CompileCommand {
    pub fn program(&self) -> &str {
        self.arguments.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.arguments.get(1..).unwrap_or_default()
    }
}

/// A compilation database holding exactly one command for exactly one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationDatabase {
    command: CompileCommand,
}

impl CompilationDatabase {
    /// The AST-dump invocation of `clang` for `unit`.
    ///
    /// With unsaved content the source is read from standard input: the
    /// language is passed explicitly and the source directory becomes a
    /// quote-include path so `#include "sibling.h"` still resolves.
    pub fn for_unit(
        unit: &CompilationUnit,
        clang: &str,
    ) -> Self {
        let mut arguments = Vec::with_capacity(unit.flags().len() + AST_DUMP_FLAGS.len() + 6);
        arguments.push(clang.to_owned());
        arguments.extend(unit.flags().iter().cloned());
        arguments.extend(AST_DUMP_FLAGS.iter().map(|f| (*f).to_owned()));

        if unit.unsaved_content().is_some() {
            if let Some(dir) = unit.source_file().parent() {
                arguments.push("-iquote".to_owned());
                arguments.push(dir.display().to_string());
            }
            if !unit.flags_specify_language() {
                arguments.push("-x".to_owned());
                arguments.push(unit.language().to_owned());
            }
            arguments.push("-".to_owned());
        } else {
            arguments.push(unit.source_file().display().to_string());
        }

        Self {
            command: CompileCommand {
                directory: unit.working_directory().to_path_buf(),
                file: unit.source_file().to_path_buf(),
                arguments,
            },
        }
    }

    /// Commands for `file`: the single entry when it names this database's
    /// file, nothing otherwise.
    pub fn commands_for(
        &self,
        file: &Path,
    ) -> Option<&CompileCommand> {
        (self.command.file == file).then_some(&self.command)
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.command.file.as_path())
    }

    /// Render as the contents of a `compile_commands.json` file.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(std::slice::from_ref(&self.command))
    }
}

#[cfg(test)]
#[path = "../../tests/src/frontend/database_tests.rs"]
mod tests;
