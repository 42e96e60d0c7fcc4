use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::{DirEntry, WalkDir};

use tu_indexer::config::{IndexingSettings, LogLevel};
use tu_indexer::index::{AbortHandle, Fact, FactSink, IndexOptions, JsonLinesSink};
use tu_indexer::{CompilationUnit, ConfigError, FrontEnd, IndexError, Settings, index_unit};

/// Exit status after Ctrl-C, as shells report it.
const INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "tu-indexer", version, about)]
struct Args {
    /// Add a directory to the include search path.
    #[arg(short = 'I', long = "include-path", value_name = "DIR")]
    include_paths: Vec<String>,

    /// Include a header before every source.
    #[arg(short = 'i', long = "include", value_name = "FILE")]
    includes: Vec<String>,

    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    defines: Vec<String>,

    /// Also write logs to this file.
    #[arg(short = 'L', long)]
    log_file: Option<PathBuf>,

    /// Append to the log file instead of truncating it.
    #[arg(short = 'A', long)]
    append: bool,

    /// Raise the log level; repeat for more.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Units indexed concurrently.
    #[arg(short = 'j', long = "thread-count", value_name = "N")]
    thread_count: Option<usize>,

    #[arg(long, value_name = "PATH")]
    clang: Option<String>,

    #[arg(long, value_name = "STANDARD")]
    std: Option<String>,

    /// Settings file. Without it `tu-indexer.toml` is searched upwards from
    /// the current directory.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Index the content of FILE in place of the single source path.
    #[arg(long, value_name = "FILE")]
    unsaved: Option<PathBuf>,

    /// Write facts here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit parameters and function-local variables.
    #[arg(long)]
    index_locals: bool,

    /// Emit type uses of casts and `sizeof`/`alignof` operands.
    #[arg(long)]
    type_uses: bool,

    /// Source files, or directories to search for sources.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

/// Settings from the config file, overridden by command-line flags.
fn load_settings(args: &Args) -> Result<(Settings, Option<PathBuf>), ConfigError> {
    let (mut settings, source) = match &args.config {
        Some(path) => (Settings::load(path)?, Some(path.clone())),
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            Settings::discover(&cwd)?
        },
    };

    let compiler = &mut settings.compiler;
    compiler.include_paths.extend(args.include_paths.iter().cloned());
    compiler.pre_includes.extend(args.includes.iter().cloned());
    compiler.defines.extend(args.defines.iter().cloned());
    if let Some(clang) = &args.clang {
        compiler.clang_path = clang.clone();
    }
    if let Some(std) = &args.std {
        compiler.std = Some(std.clone());
    }
    if let Some(threads) = args.thread_count {
        settings.thread_pool.worker_threads = threads;
    }
    settings.indexing.index_locals |= args.index_locals;
    settings.indexing.type_uses |= args.type_uses;
    settings.logging.level = settings.logging.level.raised(args.verbose);
    Ok((settings.normalized(), source))
}

fn init_logging(
    args: &Args,
    level: LogLevel,
) {
    let filter = || EnvFilter::new(format!("tu_indexer={}", level.as_filter()));

    // The appender always opens in append mode.
    let truncated = match &args.log_file {
        Some(path) if !args.append => std::fs::File::create(path).err().map(|e| (path, e)),
        _ => None,
    };

    let file_layer = args.log_file.as_ref().map(|path| {
        let file_appender = tracing_appender::rolling::never(
            path.parent().unwrap_or(Path::new(".")),
            path.file_name().unwrap_or(std::ffi::OsStr::new("tu-indexer.log")),
        );
        fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_target(false)
            .with_filter(filter())
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_filter(filter());

    tracing_subscriber::registry().with(file_layer).with(stderr_layer).init();
    if let Some((path, e)) = truncated {
        warn!("failed to truncate {}: {e}", path.display());
    }
}

/// Expand directories into the sources below them, skipping hidden entries.
fn collect_sources(
    paths: &[PathBuf],
    indexing: &IndexingSettings,
) -> Vec<PathBuf> {
    let mut sources = BTreeSet::new();
    for path in paths {
        if !path.is_dir() {
            sources.insert(path.clone());
            continue;
        }
        for entry in WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let wanted = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| indexing.matches_extension(ext));
            if wanted {
                sources.insert(entry.into_path());
            }
        }
    }
    sources.into_iter().collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

fn open_output(path: Option<&Path>) -> std::io::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(std::io::BufWriter::new(std::io::stdout())),
    })
}

/// Shared state of one run over many units.
struct Batch {
    front_end: FrontEnd,
    options: IndexOptions,
    timeout: Option<Duration>,
    /// Abort handles of the jobs currently running, keyed by job slot.
    active: Arc<DashMap<usize, AbortHandle>>,
    shutdown: AbortHandle,
}

impl Batch {
    async fn index(
        &self,
        slot: usize,
        unit: CompilationUnit,
    ) -> Result<Vec<Fact>, IndexError> {
        if self.shutdown.is_aborted() {
            debug!("[batch] skipping {}: interrupted", unit.source_file().display());
            return Ok(Vec::new());
        }
        let abort = self.register(slot);

        let work = index_unit(&self.front_end, &unit, self.options, abort.clone(), Vec::<Fact>::new());
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result.map_err(IndexError::from),
                Err(_) => {
                    abort.abort();
                    Err(IndexError::TimedOut(limit))
                },
            },
            None => work.await.map_err(IndexError::from),
        };
        self.active.remove(&slot);
        Ok(result?.sink)
    }

    /// Track a job's abort handle so Ctrl-C reaches it.
    fn register(
        &self,
        slot: usize,
    ) -> AbortHandle {
        let abort = AbortHandle::new();
        self.active.insert(slot, abort.clone());
        // Ctrl-C may have swept `active` before this job registered.
        if self.shutdown.is_aborted() {
            abort.abort();
        }
        abort
    }

    /// Cancel every running job, and every job not started yet, on Ctrl-C.
    fn cancel_on_interrupt(&self) {
        let active = Arc::clone(&self.active);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling {} running jobs", active.len());
                shutdown.abort();
                for entry in active.iter() {
                    entry.value().abort();
                }
            }
        });
    }
}

async fn run(
    args: Args,
    settings: Settings,
) -> Result<ExitCode, IndexError> {
    let front_end = FrontEnd::new(settings.compiler.clang_path.clone());
    if !front_end.is_available().await {
        error!("cannot run front-end `{}`", front_end.clang_path());
        return Ok(ExitCode::FAILURE);
    }

    let sources = collect_sources(&args.paths, &settings.indexing);
    if sources.is_empty() {
        warn!("no sources found");
        return Ok(ExitCode::SUCCESS);
    }
    let unsaved = match &args.unsaved {
        Some(_) if sources.len() != 1 => {
            error!("--unsaved needs exactly one source path, got {}", sources.len());
            return Ok(ExitCode::FAILURE);
        },
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => Some(Arc::<str>::from(text)),
            Err(e) => {
                error!("failed to read {}: {e}", path.display());
                return Ok(ExitCode::FAILURE);
            },
        },
        None => None,
    };

    let working_directory = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let flags = settings.compiler.flags();
    debug!("[batch] flags: {}", flags.join(" "));
    let mut units = Vec::with_capacity(sources.len());
    for source in sources {
        units.push(CompilationUnit::build(source, &working_directory, flags.clone(), unsaved.clone())?);
    }

    let workers = settings.thread_pool.resolved_worker_threads();
    let total = units.len();
    info!("indexing {total} units with {workers} workers");

    let batch = Batch {
        front_end,
        options: settings.indexing.index_options(),
        timeout: settings.indexing.timeout(),
        active: Arc::new(DashMap::new()),
        shutdown: AbortHandle::new(),
    };
    batch.cancel_on_interrupt();

    let mut sink = JsonLinesSink::new(open_output(args.output.as_deref())?);
    let mut failed = 0usize;
    let mut results = stream::iter(units.into_iter().enumerate())
        .map(|(slot, unit)| {
            let batch = &batch;
            async move {
                let source = unit.source_file().display().to_string();
                (source, batch.index(slot, unit).await)
            }
        })
        .buffer_unordered(workers);
    while let Some((source, result)) = results.next().await {
        match result {
            Ok(facts) => {
                for fact in facts {
                    sink.emit(fact);
                }
            },
            Err(e) => {
                failed += 1;
                error!("{source}: {e}");
            },
        }
    }

    let written = sink.written();
    sink.finish()?;
    info!("{} of {total} units indexed, {written} facts written", total - failed);

    if batch.shutdown.is_aborted() {
        return Ok(ExitCode::from(INTERRUPTED));
    }
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let (settings, config_path) = match load_settings(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("tu-indexer: {e}");
            return ExitCode::FAILURE;
        },
    };
    init_logging(&args, settings.logging.level);

    info!("tu-indexer v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Settings: {}", path.display());
    }

    match run(args, settings).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        },
    }
}

#[cfg(test)]
#[path = "../tests/src/main_tests.rs"]
mod tests;
