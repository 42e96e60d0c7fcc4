use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::semantic::locations::STDIN_FILE;

/// `file:line:col: severity: message`
static DIAGNOSTIC_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(.*?):(\d+):(\d+):\s*(fatal error|error|warning|note):\s*(.*)$").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "fatal error" => Some(Self::Fatal),
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "note" => Some(Self::Note),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal error",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
        }
    }
}

/// A diagnostic line printed by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: Option<String>,
    /// 1-based.
    pub line: u32,
    /// 1-based.
    pub column: u32,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file.as_deref().unwrap_or("<unknown>");
        write!(f, "{}:{}:{}: {}: {}", file, self.line, self.column, self.severity.as_str(), self.message)
    }
}

/// Parse the front-end's stderr. Lines that are not diagnostics (source
/// snippets, carets, summaries) are skipped. `<stdin>` is reported as
/// `stdin_file` when given.
pub fn parse_diagnostics(
    stderr: &str,
    stdin_file: Option<&str>,
) -> Vec<Diagnostic> {
    stderr.lines().filter_map(|line| parse_diagnostic_line(line, stdin_file)).collect()
}

fn parse_diagnostic_line(
    line: &str,
    stdin_file: Option<&str>,
) -> Option<Diagnostic> {
    let caps = DIAGNOSTIC_RE.as_ref()?.captures(line)?;
    let file = caps.get(1).map(|m| m.as_str()).filter(|f| !f.is_empty()).map(|f| match stdin_file {
        Some(real) if f == STDIN_FILE => real.to_owned(),
        _ => f.to_owned(),
    });
    Some(Diagnostic {
        file,
        line: caps.get(2)?.as_str().parse().ok()?,
        column: caps.get(3)?.as_str().parse().ok()?,
        severity: Severity::parse(caps.get(4)?.as_str())?,
        message: caps.get(5)?.as_str().to_owned(),
    })
}

/// First fatal diagnostic, if any.
pub fn first_fatal(diagnostics: &[Diagnostic]) -> Option<&Diagnostic> {
    diagnostics.iter().find(|d| d.severity == Severity::Fatal)
}

/// Human-readable summary of the errors in `diagnostics`, falling back to
/// the raw stderr text when nothing parsed.
pub fn summarize(
    diagnostics: &[Diagnostic],
    stderr: &str,
) -> String {
    let errors: Vec<String> = diagnostics
        .iter()
        .filter(|d| d.severity >= Severity::Error)
        .take(5)
        .map(ToString::to_string)
        .collect();
    if errors.is_empty() {
        stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("no output").trim().to_owned()
    } else {
        errors.join("; ")
    }
}

#[cfg(test)]
#[path = "../../tests/src/frontend/diagnostics_tests.rs"]
mod tests;
