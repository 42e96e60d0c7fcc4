//! One complete indexing invocation: parse a compilation unit, then walk it.

use tracing::{debug, info};

use crate::error::ParseFailure;
use crate::frontend::{CompilationUnit, Diagnostic, FrontEnd, ParsedUnit};
use crate::index::{AbortHandle, FactSink, IndexOptions, TraversalCoordinator, TraversalStats};

/// Result of a finished (or aborted) invocation.
#[derive(Debug)]
pub struct IndexOutcome<S> {
    pub stats: TraversalStats,
    /// Non-fatal diagnostics the front-end reported.
    pub diagnostics: Vec<Diagnostic>,
    /// The sink handed in, after every fact was emitted into it.
    pub sink: S,
}

/// Parse `unit` and emit its facts into `sink`.
///
/// Parsing runs on the async runtime; the traversal is CPU-bound and runs on
/// the blocking pool. An abort requested before parsing finishes skips the
/// traversal entirely.
pub async fn index_unit<S>(
    front_end: &FrontEnd,
    unit: &CompilationUnit,
    options: IndexOptions,
    abort: AbortHandle,
    sink: S,
) -> Result<IndexOutcome<S>, ParseFailure>
where
    S: FactSink + Send + 'static,
{
    let source = unit.source_file().display().to_string();
    let parsed = front_end.parse(unit).await?;
    if abort.is_aborted() {
        debug!("[session] {source}: aborted before traversal");
        return Ok(IndexOutcome {
            stats: TraversalStats {
                aborted: true,
                ..TraversalStats::default()
            },
            diagnostics: parsed.diagnostics().to_vec(),
            sink,
        });
    }

    let outcome = tokio::task::spawn_blocking(move || index_parsed(&parsed, options, abort, sink))
        .await
        .map_err(|e| ParseFailure::Task(e.to_string()))?;
    info!(
        "[session] {source}: {} symbols, {} references{}",
        outcome.stats.symbols,
        outcome.stats.references,
        if outcome.stats.aborted { " (aborted)" } else { "" }
    );
    Ok(outcome)
}

/// Walk an already parsed unit on the current thread.
pub fn index_parsed<S: FactSink>(
    parsed: &ParsedUnit,
    options: IndexOptions,
    abort: AbortHandle,
    mut sink: S,
) -> IndexOutcome<S> {
    let stats = TraversalCoordinator::new(parsed, options).with_abort_handle(abort).run(&mut sink);
    IndexOutcome {
        stats,
        diagnostics: parsed.diagnostics().to_vec(),
        sink,
    }
}

#[cfg(test)]
#[path = "../tests/src/session_tests.rs"]
mod tests;
