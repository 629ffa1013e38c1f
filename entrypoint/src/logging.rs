use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_FILE_NAME: &str = "supervisor.log";

static FILE_GUARD: Mutex<Option<WorkerGuard>> = Mutex::new(None);

pub fn init_stderr_only(level: &str) {
  let _ = tracing_subscriber::fmt()
    .with_ansi(false)
    .with_target(false)
    .with_env_filter(filter(level))
    .with_writer(std::io::stderr)
    .try_init();
}

pub fn init_file_and_stderr(
  log_dir: &Path,
  level: &str,
  retention_days: u64,
) -> anyhow::Result<()> {
  fs::create_dir_all(log_dir)?;
  cleanup_old_logs(log_dir, retention_days)?;

  let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
  if let Ok(mut slot) = FILE_GUARD.lock() {
    *slot = Some(guard);
  }

  let file_layer = tracing_subscriber::fmt::layer()
    .with_ansi(false)
    .with_writer(file_writer)
    .with_target(true);

  let stderr_layer = tracing_subscriber::fmt::layer()
    .with_ansi(false)
    .with_writer(std::io::stderr)
    .with_target(true);

  tracing_subscriber::registry()
    .with(filter(level))
    .with(file_layer)
    .with(stderr_layer)
    .try_init()?;

  Ok(())
}

/// Drains the file writer. Must run before the process image is replaced,
/// since exec discards anything still queued in the background worker.
pub fn flush() {
  let guard = FILE_GUARD.lock().ok().and_then(|mut slot| slot.take());
  drop(guard);
}

fn filter(level: &str) -> tracing_subscriber::EnvFilter {
  tracing_subscriber::EnvFilter::try_new(level)
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Removes rolled `supervisor.log*` files last modified before the
/// retention window. A retention of zero keeps everything.
fn cleanup_old_logs(log_dir: &Path, retention_days: u64) -> anyhow::Result<()> {
  if retention_days == 0 {
    return Ok(());
  }

  let window = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60));
  let cutoff = SystemTime::now()
    .checked_sub(window)
    .unwrap_or(SystemTime::UNIX_EPOCH);

  for path in expired_logs(log_dir, cutoff) {
    if let Err(e) = fs::remove_file(&path) {
      eprintln!("entrypoint: could not remove old log {}: {e}", path.display());
    }
  }

  Ok(())
}

fn expired_logs(log_dir: &Path, cutoff: SystemTime) -> Vec<PathBuf> {
  let Ok(entries) = fs::read_dir(log_dir) else {
    return Vec::new();
  };

  entries
    .flatten()
    .filter(|entry| is_supervisor_log_file(&entry.path()))
    .filter(|entry| {
      entry
        .metadata()
        .and_then(|md| md.modified())
        .is_ok_and(|modified| modified < cutoff)
    })
    .map(|entry| entry.path())
    .collect()
}

/// Matches the active file and the dated files the daily roller produces.
fn is_supervisor_log_file(path: &Path) -> bool {
  path
    .file_name()
    .and_then(|n| n.to_str())
    .and_then(|name| name.strip_prefix(LOG_FILE_NAME))
    .is_some_and(|suffix| suffix.is_empty() || suffix.starts_with('.'))
}
