//! Tracing configuration and log routing.
//!
//! Every event goes to stdout through a compact formatter. A second, ANSI-free layer writes
//! to disk through a non‑blocking worker: `ASKPDF_LOG_FILE` names an append-only file, and
//! without it logs rotate daily under `logs/askpdf.log.<date>`.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_PREFIX: &str = "askpdf.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where file logs are written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    /// Append to a fixed file chosen by the operator.
    File(PathBuf),
    /// Daily-rotated files under a directory.
    Rolling { dir: PathBuf, prefix: String },
}

fn resolve_log_target(explicit_path: Option<String>) -> LogTarget {
    match explicit_path.filter(|value| !value.trim().is_empty()) {
        Some(path) => LogTarget::File(PathBuf::from(path)),
        None => LogTarget::Rolling {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            prefix: DEFAULT_LOG_PREFIX.to_string(),
        },
    }
}

/// Configure tracing subscribers for stdout and file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when the target is writable, a file layer.
/// - Keeps the non‑blocking worker guard alive for the process lifetime.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let target = resolve_log_target(std::env::var("ASKPDF_LOG_FILE").ok());
    match open_writer(&target) {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

fn open_writer(target: &LogTarget) -> Option<NonBlocking> {
    let (non_blocking, guard) = match target {
        LogTarget::File(path) => {
            let file = match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
            {
                Ok(file) => file,
                Err(err) => {
                    eprintln!("Failed to open log file {}: {err}", path.display());
                    return None;
                }
            };
            tracing_appender::non_blocking(file)
        }
        LogTarget::Rolling { dir, prefix } => {
            if let Err(err) = std::fs::create_dir_all(dir) {
                eprintln!("Failed to create log directory {}: {err}", dir.display());
                return None;
            }
            let appender = tracing_appender::rolling::daily(Path::new(dir), prefix);
            tracing_appender::non_blocking(appender)
        }
    };
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}
