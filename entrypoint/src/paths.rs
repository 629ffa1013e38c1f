use std::path::{Path, PathBuf};

pub fn downloads_dir(root: &Path) -> PathBuf {
  root.join("downloads")
}

pub fn logs_dir(root: &Path) -> PathBuf {
  root.join("logs")
}

pub fn schedule_dir(root: &Path) -> PathBuf {
  root.join("celerybeat")
}

pub fn aria2_log_path(root: &Path) -> PathBuf {
  logs_dir(root).join("aria2.log")
}

pub fn beat_schedule_path(root: &Path) -> PathBuf {
  schedule_dir(root).join("celerybeat-schedule")
}

/// Directories every service role expects to exist, in creation order.
pub fn working_dirs(root: &Path) -> [PathBuf; 3] {
  [downloads_dir(root), logs_dir(root), schedule_dir(root)]
}
