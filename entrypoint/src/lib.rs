pub mod bootstrap;
pub mod config;
pub mod daemon;
pub mod dispatch;
pub mod logging;
pub mod mode;
pub mod monitor;
pub mod paths;
pub mod prepare;
pub mod runtime;

use anyhow::Context;

pub const USAGE: &str = "\
usage: entrypoint [--dry-run] [MODE]

modes:
  api      API server (default)
  worker   background task worker
  beat     scheduled-task dispatcher
  flower   task-monitoring dashboard

options:
  --dry-run   resolve and report the launch without starting anything
  --version   print version
  -h, --help  print this help";

/// Resolves configuration, prepares the host and replaces this process with
/// the selected service. Returns only on failure or in dry-run mode.
pub fn run(args: &[String]) -> anyhow::Result<()> {
  let dry_run = runtime::configure_from_args(args);
  let cfg = config::Config::from_env();
  let mode = mode::Mode::parse(mode_token(args)?)?;

  let bootstrap = bootstrap::Bootstrap::new(cfg);
  bootstrap
    .prepare_dirs()
    .context("prepare working directories")?;

  let cfg = bootstrap.config();
  if dry_run {
    logging::init_stderr_only(&cfg.logging.level);
  } else {
    logging::init_file_and_stderr(
      &paths::logs_dir(&cfg.app_root),
      &cfg.logging.level,
      cfg.logging.retention_days,
    )?;
  }

  let handoff = bootstrap.handoff(mode);

  if dry_run {
    println!("DRY-RUN: resolved configuration:\n{}", cfg.to_toml()?);
    println!(
      "DRY-RUN: would exec {} (cwd {})",
      handoff.spec,
      handoff.spec.workdir.display()
    );
    return Ok(());
  }

  logging::flush();
  Err(dispatch::exec(&handoff.spec))
}

const KNOWN_FLAGS: [&str; 4] = ["--dry-run", "--version", "--help", "-h"];

/// The single argument that is not a recognised flag. Unknown flags are
/// handed to mode parsing so they fail like any other bad token.
fn mode_token(args: &[String]) -> anyhow::Result<Option<&str>> {
  let mut rest = args
    .iter()
    .skip(1)
    .map(String::as_str)
    .filter(|a| !KNOWN_FLAGS.contains(a));

  let token = rest.next();
  if let Some(extra) = rest.next() {
    anyhow::bail!(
      "unexpected argument '{extra}'; expected a single mode ({})",
      mode::valid_modes()
    );
  }
  Ok(token)
}
