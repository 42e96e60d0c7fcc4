use std::path::PathBuf;

use thiserror::Error;

/// The front-end could not produce a usable AST for a compilation unit.
#[derive(Error, Debug)]
pub enum ParseFailure {
    #[error("source file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write unsaved buffer to the front-end: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("{}: fatal error: {message}", file.as_deref().unwrap_or("<unknown>"))]
    Fatal { file: Option<String>, message: String },

    #[error("front-end produced no AST (exit status {status}): {summary}")]
    NoAst { status: String, summary: String },

    #[error("malformed AST dump: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("front-end task failed: {0}")]
    Task(String),
}

/// A compilation unit could not be described.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("compilation unit needs a source file")]
    EmptySourceFile,

    #[error("source path {} names a directory", .0.display())]
    Directory(PathBuf),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Any failure of one indexing invocation.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Parse(#[from] ParseFailure),

    #[error("failed to write facts: {0}")]
    Output(#[from] std::io::Error),

    #[error("gave up after {}s", .0.as_secs())]
    TimedOut(std::time::Duration),
}
