//! Optional aria2 download daemon used by the API role as a transfer backend.
//!
//! The daemon is started detached and never supervised: after launch the only
//! interaction is a single readiness probe whose result is advisory.

mod probe;

pub use probe::{probe, ProbeOutcome, ProbeSettings};

use crate::config::Config;
use crate::paths;
use crate::runtime;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

pub const RPC_PORT: u16 = 6800;
pub const MAX_CONCURRENT_DOWNLOADS: u32 = 5;
pub const MIN_SPLIT_SIZE: &str = "1M";

/// Launch parameters for `aria2c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aria2Daemon {
  pub program: String,
  pub secret: String,
  pub download_dir: PathBuf,
  pub log_path: PathBuf,
  pub max_connections_per_server: String,
  pub split: String,
  pub rpc_url: String,
}

#[derive(Debug)]
pub enum LaunchOutcome {
  Disabled,
  DryRun,
  SpawnFailed { error: String },
  Launched { launcher_status: Option<ExitStatus>, probe: ProbeOutcome },
}

impl LaunchOutcome {
  pub fn launched(&self) -> bool {
    matches!(self, LaunchOutcome::Launched { .. })
  }
}

impl Aria2Daemon {
  pub fn from_config(cfg: &Config) -> Self {
    Self {
      program: "aria2c".to_string(),
      secret: cfg.aria2.secret.clone(),
      download_dir: paths::downloads_dir(&cfg.app_root),
      log_path: paths::aria2_log_path(&cfg.app_root),
      max_connections_per_server: cfg.aria2.max_connections_per_server.clone(),
      split: cfg.aria2.split.clone(),
      rpc_url: format!("http://127.0.0.1:{RPC_PORT}/jsonrpc"),
    }
  }

  pub fn args(&self) -> Vec<String> {
    vec![
      "--enable-rpc".to_string(),
      "--rpc-listen-all=true".to_string(),
      format!("--rpc-listen-port={RPC_PORT}"),
      format!("--rpc-secret={}", self.secret),
      format!("--dir={}", self.download_dir.display()),
      format!("--max-concurrent-downloads={MAX_CONCURRENT_DOWNLOADS}"),
      format!("--max-connection-per-server={}", self.max_connections_per_server),
      format!("--split={}", self.split),
      format!("--min-split-size={MIN_SPLIT_SIZE}"),
      "--file-allocation=prealloc".to_string(),
      "--continue=true".to_string(),
      "--auto-file-renaming=false".to_string(),
      "--daemon=true".to_string(),
      format!("--log={}", self.log_path.display()),
      "--log-level=info".to_string(),
    ]
  }

  fn command(&self) -> Command {
    let mut cmd = Command::new(&self.program);
    cmd
      .args(self.args())
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null());

    #[cfg(unix)]
    {
      use std::os::unix::process::CommandExt;
      cmd.process_group(0);
    }

    cmd
  }

  fn spawn(&self) -> std::io::Result<Child> {
    self.command().spawn()
  }
}

/// Starts the daemon when enabled and probes it once. Never fails: every
/// problem is logged and reported through the returned outcome.
pub fn start_if_enabled(
  cfg: &Config,
  daemon: &Aria2Daemon,
  settings: &ProbeSettings,
) -> LaunchOutcome {
  if !cfg.aria2.enabled {
    tracing::debug!("aria2 disabled; skipping daemon launch");
    return LaunchOutcome::Disabled;
  }

  if runtime::is_dry_run() {
    println!(
      "DRY-RUN: would start {} {}",
      daemon.program,
      redact_secret(&daemon.args()).join(" ")
    );
    return LaunchOutcome::DryRun;
  }

  tracing::info!(
    program = %daemon.program,
    port = RPC_PORT,
    dir = %daemon.download_dir.display(),
    "starting aria2 daemon"
  );

  let mut child = match daemon.spawn() {
    Ok(child) => child,
    Err(e) => {
      tracing::warn!(
        error = %e,
        "failed to start aria2 daemon; continuing without download acceleration"
      );
      return LaunchOutcome::SpawnFailed { error: e.to_string() };
    }
  };

  std::thread::sleep(settings.settle_delay);

  // aria2c forks into the background and its foreground process exits;
  // reap it if it already has, without waiting otherwise.
  let launcher_status = match child.try_wait() {
    Ok(status) => status,
    Err(e) => {
      tracing::debug!(error = %e, "could not query aria2 launcher status");
      None
    }
  };
  if let Some(status) = launcher_status.filter(|s| !s.success()) {
    tracing::warn!(%status, "aria2 launcher exited with failure status");
  }
  drop(child);

  let probe = probe(&daemon.rpc_url, &daemon.secret, settings);
  match &probe {
    ProbeOutcome::Ready { version } => {
      tracing::info!(version = version.as_deref().unwrap_or("unknown"), "aria2 daemon ready");
    }
    ProbeOutcome::Rejected { reason } => {
      tracing::warn!(%reason, "aria2 daemon answered but rejected the readiness check");
    }
    ProbeOutcome::Unreachable { error } => {
      tracing::warn!(
        %error,
        url = %daemon.rpc_url,
        "aria2 daemon not reachable; downloads will not be accelerated"
      );
    }
  }

  LaunchOutcome::Launched { launcher_status, probe }
}

fn redact_secret(args: &[String]) -> Vec<String> {
  args
    .iter()
    .map(|a| {
      if a.starts_with("--rpc-secret=") {
        "--rpc-secret=<redacted>".to_string()
      } else {
        a.clone()
      }
    })
    .collect()
}
