use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ParseFailure;
use crate::frontend::database::{CompilationDatabase, CompileCommand};
use crate::frontend::diagnostics::{Severity, first_fatal, parse_diagnostics, summarize};
use crate::frontend::parsed::ParsedUnit;
use crate::frontend::unit::CompilationUnit;

static NEXT_PARSE_ID: AtomicU64 = AtomicU64::new(1);

#[cfg(test)]
pub(crate) fn parse_counter() -> u64 {
    NEXT_PARSE_ID.load(Ordering::Relaxed)
}

pub const DEFAULT_CLANG: &str = "clang";

/// Runs the external C/C++ front-end, one translation unit per call.
///
/// Holds no state across calls; concurrent invocations each get their own
/// process.
#[derive(Debug, Clone)]
pub struct FrontEnd {
    clang_path: String,
}

impl Default for FrontEnd {
    fn default() -> Self {
        Self::new(DEFAULT_CLANG)
    }
}

fn clang_command(command: &CompileCommand) -> Command {
    let mut cmd = Command::new(command.program());
    cmd.kill_on_drop(true)
        .args(command.args())
        .current_dir(&command.directory)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

impl FrontEnd {
    pub fn new(clang_path: impl Into<String>) -> Self {
        Self {
            clang_path: clang_path.into(),
        }
    }

    pub fn clang_path(&self) -> &str {
        &self.clang_path
    }

    /// Check whether the configured front-end can be executed.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.clang_path)
            .kill_on_drop(true)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Parse `unit` to completion.
    ///
    /// Fatal diagnostics fail the parse; other errors are logged and the
    /// partial AST clang still produces is returned.
    pub async fn parse(
        &self,
        unit: &CompilationUnit,
    ) -> Result<ParsedUnit, ParseFailure> {
        let parse_id = NEXT_PARSE_ID.fetch_add(1, Ordering::Relaxed);
        let source = unit.source_file();
        if unit.unsaved_content().is_none() && !source.is_file() {
            return Err(ParseFailure::FileNotFound(source.to_path_buf()));
        }

        let database = CompilationDatabase::for_unit(unit, &self.clang_path);
        let Some(command) = database.commands_for(source) else {
            return Err(ParseFailure::FileNotFound(source.to_path_buf()));
        };
        debug!("[parse {parse_id}] {} {}", command.program(), command.args().join(" "));

        let mut cmd = clang_command(command);
        if unit.unsaved_content().is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }
        let mut child = cmd.spawn().map_err(|source| ParseFailure::Spawn {
            program: command.program().to_owned(),
            source,
        })?;

        let stdin = child.stdin.take();
        let feed = async move {
            match (stdin, unit.unsaved_content()) {
                (Some(mut stdin), Some(content)) => {
                    stdin.write_all(content.as_bytes()).await?;
                    stdin.shutdown().await
                },
                _ => Ok(()),
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|source| ParseFailure::Spawn {
            program: command.program().to_owned(),
            source,
        })?;
        if let Err(e) = fed {
            // A front-end that exits early closes the pipe; its stderr says why.
            if output.status.success() {
                return Err(ParseFailure::Stdin(e));
            }
            debug!("[parse {parse_id}] stdin closed early: {e}");
        }

        let source_display = source.display().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics = parse_diagnostics(&stderr, Some(&source_display));
        if let Some(fatal) = first_fatal(&diagnostics) {
            return Err(ParseFailure::Fatal {
                file: fatal.file.clone(),
                message: fatal.message.clone(),
            });
        }
        for diag in diagnostics.iter().filter(|d| d.severity == Severity::Error) {
            warn!("[parse {parse_id}] {diag}");
        }
        if !output.status.success() {
            debug!("[parse {parse_id}] exited with {} (partial AST may still be usable)", output.status);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim_start().starts_with('{') {
            return Err(ParseFailure::NoAst {
                status: output.status.to_string(),
                summary: summarize(&diagnostics, &stderr),
            });
        }
        debug!("[parse {parse_id}] {} bytes of AST for {source_display}", stdout.len());

        let parsed = ParsedUnit::from_json(parse_id, &stdout, source, unit.working_directory())?;
        debug!("[parse {parse_id}] {} declarations", parsed.decls().len());
        Ok(parsed.with_diagnostics(diagnostics))
    }
}

#[cfg(test)]
#[path = "../../tests/src/frontend/driver_tests.rs"]
mod tests;
