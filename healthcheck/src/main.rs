use std::time::Duration;

use entrypoint::config::Config;
use entrypoint::daemon::{self, Aria2Daemon, ProbeOutcome, ProbeSettings};

fn main() -> anyhow::Result<()> {
  let args: Vec<String> = std::env::args().collect();

  if args.iter().any(|a| a == "--version") {
    println!("{}", env!("CARGO_PKG_VERSION"));
    return Ok(());
  }

  let cfg = Config::from_env();
  entrypoint::logging::init_stderr_only(&cfg.logging.level);

  let settings = ProbeSettings {
    settle_delay: Duration::ZERO,
    ..ProbeSettings::default()
  };
  let target = Aria2Daemon::from_config(&cfg);
  tracing::debug!(url = %target.rpc_url, "probing aria2");

  match daemon::probe(&target.rpc_url, &target.secret, &settings) {
    ProbeOutcome::Ready { version } => {
      println!("aria2 ready: version={}", version.as_deref().unwrap_or("unknown"));
      Ok(())
    }
    ProbeOutcome::Rejected { reason } => {
      anyhow::bail!("aria2 rejected readiness check: {reason}")
    }
    ProbeOutcome::Unreachable { error } => {
      anyhow::bail!("aria2 unreachable at {}: {error}", target.rpc_url)
    }
  }
}
