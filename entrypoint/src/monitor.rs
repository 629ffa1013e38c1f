use crate::config::Config;
use crate::dispatch::{self, LaunchSpec};
use crate::runtime;

const MONITOR_SCRIPT: &str = "import asyncio; \
from app.services.advanced_monitoring import advanced_monitoring; \
asyncio.run(advanced_monitoring.continuous_monitoring())";

pub fn monitor_spec(cfg: &Config) -> LaunchSpec {
  LaunchSpec {
    program: "python".to_string(),
    args: vec!["-c".to_string(), MONITOR_SCRIPT.to_string()],
    workdir: cfg.app_root.clone(),
  }
}

/// Fire-and-forget start of the performance monitor that runs next to the
/// API server. Returns whether a process was started.
pub fn start_if_enabled(cfg: &Config, spec: &LaunchSpec) -> bool {
  if !cfg.monitoring_enabled {
    return false;
  }

  if runtime::is_dry_run() {
    println!("DRY-RUN: would start monitoring task: {spec}");
    return false;
  }

  match dispatch::spawn_detached(spec) {
    Ok(pid) => {
      tracing::info!(pid, "performance monitoring started");
      true
    }
    Err(e) => {
      tracing::warn!(error = ?e, "performance monitoring could not be started");
      false
    }
  }
}
