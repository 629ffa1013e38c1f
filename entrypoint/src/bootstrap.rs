use crate::config::Config;
use crate::daemon::{self, Aria2Daemon, LaunchOutcome, ProbeSettings};
use crate::dispatch::{self, LaunchSpec};
use crate::mode::Mode;
use crate::{monitor, prepare};
use std::path::PathBuf;

/// Everything decided before the process is replaced.
#[derive(Debug)]
pub struct Handoff {
  pub mode: Mode,
  pub spec: LaunchSpec,
  pub daemon: LaunchOutcome,
  pub monitor_started: bool,
}

pub struct Bootstrap {
  cfg: Config,
  daemon: Aria2Daemon,
  monitor: LaunchSpec,
  probe: ProbeSettings,
}

impl Bootstrap {
  pub fn new(cfg: Config) -> Self {
    let daemon = Aria2Daemon::from_config(&cfg);
    let monitor = monitor::monitor_spec(&cfg);
    Self {
      cfg,
      daemon,
      monitor,
      probe: ProbeSettings::default(),
    }
  }

  pub fn with_daemon(mut self, daemon: Aria2Daemon) -> Self {
    self.daemon = daemon;
    self
  }

  pub fn with_monitor(mut self, monitor: LaunchSpec) -> Self {
    self.monitor = monitor;
    self
  }

  pub fn with_probe_settings(mut self, probe: ProbeSettings) -> Self {
    self.probe = probe;
    self
  }

  pub fn config(&self) -> &Config {
    &self.cfg
  }

  pub fn prepare_dirs(&self) -> anyhow::Result<Vec<PathBuf>> {
    prepare::prepare_working_dirs(&self.cfg.app_root)
  }

  /// Runs the non-fatal pre-dispatch stages and picks the service to become.
  pub fn handoff(&self, mode: Mode) -> Handoff {
    tracing::info!(
      mode = %mode,
      environment = %self.cfg.environment,
      aria2 = self.cfg.aria2.enabled,
      monitoring = self.cfg.monitoring_enabled,
      "bootstrapping service"
    );

    let daemon = daemon::start_if_enabled(&self.cfg, &self.daemon, &self.probe);

    let monitor_started = match mode {
      Mode::Api => monitor::start_if_enabled(&self.cfg, &self.monitor),
      Mode::Worker | Mode::Beat | Mode::Flower => false,
    };

    let spec = dispatch::launch_spec(mode, &self.cfg);
    tracing::info!(mode = %mode, command = %spec, "handing off");

    Handoff {
      mode,
      spec,
      daemon,
      monitor_started,
    }
  }
}
