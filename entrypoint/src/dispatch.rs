use crate::config::Config;
use crate::mode::Mode;
use crate::paths;
use anyhow::Context;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

pub const API_PORT: u16 = 8000;
pub const API_WORKERS: u32 = 4;
pub const WORKER_CONCURRENCY: u32 = 4;
pub const WORKER_MAX_TASKS_PER_CHILD: u32 = 1000;
pub const FLOWER_PORT: u16 = 5555;
pub const CELERY_APP: &str = "app.core.celery_app";

/// Command line of the service this process turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
  pub program: String,
  pub args: Vec<String>,
  pub workdir: PathBuf,
}

impl LaunchSpec {
  fn new(program: &str, args: Vec<String>, workdir: PathBuf) -> Self {
    Self {
      program: program.to_string(),
      args,
      workdir,
    }
  }

  pub fn command(&self) -> Command {
    let mut cmd = Command::new(&self.program);
    cmd.args(&self.args).current_dir(&self.workdir);
    cmd
  }
}

impl fmt::Display for LaunchSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.program)?;
    for arg in &self.args {
      write!(f, " {arg}")?;
    }
    Ok(())
  }
}

pub fn launch_spec(mode: Mode, cfg: &Config) -> LaunchSpec {
  let root = cfg.app_root.clone();
  match mode {
    Mode::Api => LaunchSpec::new(
      "uvicorn",
      strings(&[
        "app.main:app",
        "--host",
        "0.0.0.0",
        "--port",
        &API_PORT.to_string(),
        "--workers",
        &API_WORKERS.to_string(),
      ]),
      root,
    ),
    Mode::Worker => LaunchSpec::new(
      "celery",
      strings(&[
        "-A",
        CELERY_APP,
        "worker",
        "--loglevel=info",
        &format!("--concurrency={WORKER_CONCURRENCY}"),
        &format!("--max-tasks-per-child={WORKER_MAX_TASKS_PER_CHILD}"),
      ]),
      root,
    ),
    Mode::Beat => LaunchSpec::new(
      "celery",
      strings(&[
        "-A",
        CELERY_APP,
        "beat",
        "--loglevel=info",
        "--scheduler",
        "celery.beat:PersistentScheduler",
        "--schedule",
        &paths::beat_schedule_path(&cfg.app_root).display().to_string(),
      ]),
      root,
    ),
    Mode::Flower => LaunchSpec::new(
      "celery",
      strings(&[
        "-A",
        CELERY_APP,
        "flower",
        &format!("--port={FLOWER_PORT}"),
        &format!("--broker={}", cfg.broker_url),
      ]),
      root,
    ),
  }
}

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

/// Replaces the current process image with `spec`. Only returns on failure.
#[cfg(unix)]
pub fn exec(spec: &LaunchSpec) -> anyhow::Error {
  use std::os::unix::process::CommandExt;

  let err = spec.command().exec();
  anyhow::Error::new(err).context(format!("exec {}", spec.program))
}

/// Without exec, run the service as a child and leave with its status so
/// nothing of the supervisor runs after it.
#[cfg(not(unix))]
pub fn exec(spec: &LaunchSpec) -> anyhow::Error {
  let status = match spec.command().status().with_context(|| format!("spawn {}", spec.program)) {
    Ok(status) => status,
    Err(e) => return e,
  };
  std::process::exit(status.code().unwrap_or(1));
}

/// Spawns `spec` in its own process group and returns without waiting for
/// it. The `Child` is dropped unreaped: after exec the service inherits it,
/// so a monitor that exits early lingers as a zombie until the container
/// stops. The monitor loops for the container's lifetime.
pub fn spawn_detached(spec: &LaunchSpec) -> anyhow::Result<u32> {
  let mut cmd = spec.command();
  cmd.stdin(std::process::Stdio::null());

  #[cfg(unix)]
  {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
  }

  let child = cmd
    .spawn()
    .with_context(|| format!("spawn {}", spec.program))?;
  Ok(child.id())
}
